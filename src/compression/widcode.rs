use crate::core::error::{Error, ErrorKind, Result};

/// Word-id code for per-document token streams.
///
/// Each value is written as big-endian 7-bit groups. The first byte of a
/// value has its high bit set and carries the most significant group; the
/// following bytes are below 0x80. A value therefore starts exactly where a
/// byte >= 0x80 appears, which lets phrase search match encoded runs with a
/// plain byte scan. Values below 2^28 take at most 4 bytes.
pub struct WidCode;

const START: u8 = 0x80;
const PAYLOAD: u32 = 0x7f;
const MAX_BYTES: usize = 5;

impl WidCode {
    /// Encode a single value
    pub fn encode_u32(output: &mut Vec<u8>, value: u32) {
        let mut groups = [0u8; MAX_BYTES];
        let mut n = 0;
        let mut rest = value;
        loop {
            groups[n] = (rest & PAYLOAD) as u8;
            n += 1;
            rest >>= 7;
            if rest == 0 {
                break;
            }
        }
        output.push(groups[n - 1] | START);
        for i in (0..n - 1).rev() {
            output.push(groups[i]);
        }
    }

    pub fn encode_u32_list(nums: &[u32]) -> Vec<u8> {
        let mut output = Vec::with_capacity(nums.len() * 2);
        for &num in nums {
            Self::encode_u32(&mut output, num);
        }
        output
    }

    /// Decode the value at the start of `input`, returns (value, bytes_consumed)
    pub fn decode_u32(input: &[u8]) -> Result<(u32, usize)> {
        let first = match input.first() {
            Some(&b) if b >= START => b,
            Some(&b) => {
                return Err(Error::new(
                    ErrorKind::Corruption,
                    format!("widcode value cannot start with byte {:#04x}", b),
                ));
            }
            None => return Err(Error::new(ErrorKind::Corruption, "empty widcode input")),
        };

        let mut value = (first & 0x7f) as u64;
        let mut consumed = 1;
        for &byte in &input[1..] {
            if byte >= START {
                break;
            }
            consumed += 1;
            if consumed > MAX_BYTES {
                return Err(Error::new(ErrorKind::Corruption, "widcode overflow"));
            }
            value = (value << 7) | byte as u64;
        }

        let value = u32::try_from(value)
            .map_err(|_| Error::new(ErrorKind::Corruption, "widcode value exceeds 32 bits"))?;
        Ok((value, consumed))
    }

    pub fn decode_u32_list(data: &[u8]) -> Result<Vec<u32>> {
        let mut nums = Vec::new();
        let mut pos = 0;

        while pos < data.len() {
            let (value, consumed) = Self::decode_u32(&data[pos..])?;
            nums.push(value);
            pos += consumed;
        }

        Ok(nums)
    }

    /// True if the encoded `needle` occurs in `haystack` as a whole run of
    /// values. A match must end on a value boundary so that a short code is
    /// never taken for the prefix of a longer one.
    pub fn contains_run(haystack: &[u8], needle: &[u8]) -> bool {
        if needle.is_empty() {
            return true;
        }
        if needle.len() > haystack.len() {
            return false;
        }
        haystack
            .windows(needle.len())
            .enumerate()
            .any(|(start, window)| {
                let end = start + needle.len();
                window == needle && haystack.get(end).is_none_or(|&b| b >= START)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_byte_width_boundaries() {
        let cases = [
            (0u32, 1usize),
            (127, 1),
            (128, 2),
            (16383, 2),
            (16384, 3),
            (2097151, 3),
            (2097152, 4),
            ((1 << 28) - 1, 4),
            (1 << 28, 5),
            (u32::MAX, 5),
        ];
        for (value, width) in cases {
            let encoded = WidCode::encode_u32_list(&[value]);
            assert_eq!(encoded.len(), width, "width of {}", value);
            assert!(encoded[0] >= 0x80);
            assert!(encoded[1..].iter().all(|&b| b < 0x80));
            assert_eq!(WidCode::decode_u32_list(&encoded).unwrap(), vec![value]);
        }
    }

    #[test]
    fn test_list_round_trip_random() {
        let mut rng = rand::thread_rng();
        let nums: Vec<u32> = (0..2000).map(|_| rng.gen_range(0..(1u32 << 28))).collect();
        let encoded = WidCode::encode_u32_list(&nums);
        assert_eq!(WidCode::decode_u32_list(&encoded).unwrap(), nums);
    }

    #[test]
    fn test_decode_rejects_continuation_start() {
        let err = WidCode::decode_u32_list(&[0x05, 0x81]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Corruption);
    }

    #[test]
    fn test_contains_run_respects_boundaries() {
        let doc = WidCode::encode_u32_list(&[3, 200, 7, 9]);
        assert!(WidCode::contains_run(&doc, &WidCode::encode_u32_list(&[200, 7])));
        assert!(WidCode::contains_run(&doc, &WidCode::encode_u32_list(&[9])));
        assert!(!WidCode::contains_run(&doc, &WidCode::encode_u32_list(&[7, 3])));
        // 200 encodes as [0x81, 0x48]; 1 encodes as [0x81] and must not match
        // the first byte of 200.
        assert!(!WidCode::contains_run(&doc, &WidCode::encode_u32_list(&[3, 1])));
    }
}
