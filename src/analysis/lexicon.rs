use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::analysis::pipeline::Pipeline;
use crate::core::error::{Error, ErrorKind, Result};

/// Word id. `0` stands for an out-of-vocabulary word.
pub type Wid = u32;

pub const OOV: Wid = 0;

/// Persistent part of a lexicon: the two word tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LexiconData {
    pub wids: BTreeMap<String, Wid>,
    pub words: BTreeMap<Wid, String>,
    pub last_wid: Wid,
}

/// Bidirectional word <-> word id mapping fed by a text pipeline.
#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    data: LexiconData,
    pipeline: Pipeline,
}

impl Lexicon {
    pub fn new(pipeline: Pipeline) -> Self {
        Lexicon {
            data: LexiconData::default(),
            pipeline,
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn length(&self) -> usize {
        self.data.wids.len()
    }

    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.data.wids.keys().map(String::as_str)
    }

    pub fn wids(&self) -> impl Iterator<Item = Wid> + '_ {
        self.data.words.keys().copied()
    }

    pub fn items(&self) -> impl Iterator<Item = (&str, Wid)> {
        self.data.wids.iter().map(|(w, &id)| (w.as_str(), id))
    }

    pub fn get_word(&self, wid: Wid) -> Option<&str> {
        self.data.words.get(&wid).map(String::as_str)
    }

    pub fn get_wid(&self, word: &str) -> Option<Wid> {
        self.data.wids.get(word).copied()
    }

    /// Run `text` through the pipeline and return word ids, assigning new
    /// ids to words never seen before.
    pub fn source_to_word_ids(&mut self, text: &str) -> Vec<Wid> {
        let words = self.pipeline.process(text);
        words.into_iter().map(|word| self.get_or_assign(word)).collect()
    }

    fn get_or_assign(&mut self, word: String) -> Wid {
        if let Some(&wid) = self.data.wids.get(&word) {
            return wid;
        }
        let mut wid = self.data.last_wid + 1;
        while self.data.words.contains_key(&wid) {
            wid += 1;
        }
        self.data.last_wid = wid;
        self.data.words.insert(wid, word.clone());
        self.data.wids.insert(word, wid);
        wid
    }

    /// Read-only lookup; unknown words map to [`OOV`].
    pub fn term_to_word_ids(&self, text: &str) -> Vec<Wid> {
        self.pipeline
            .process(text)
            .iter()
            .map(|word| self.data.wids.get(word).copied().unwrap_or(OOV))
            .collect()
    }

    /// Query terms after the glob-aware pipeline pass.
    pub fn parse_terms(&self, text: &str) -> Vec<String> {
        self.pipeline.process_glob(text)
    }

    pub fn is_glob(word: &str) -> bool {
        word.contains(['*', '?'])
    }

    /// Word ids matching a shell-style pattern. The pattern must start with
    /// a literal prefix; only words sharing that prefix are examined.
    pub fn glob_to_word_ids(&self, pattern: &str) -> Result<Vec<Wid>> {
        let split = pattern.find(['*', '?']).unwrap_or(pattern.len());
        let (prefix, rest) = pattern.split_at(split);

        if rest.is_empty() {
            return Ok(self.get_wid(prefix).into_iter().collect());
        }
        if prefix.is_empty() {
            return Err(Error::new(
                ErrorKind::Query,
                format!("pattern {:?} shouldn't start with glob character", pattern),
            ));
        }

        let mut source = String::from("^");
        source.push_str(&regex::escape(prefix));
        for c in rest.chars() {
            match c {
                '*' => source.push_str(".*"),
                '?' => source.push('.'),
                other => source.push_str(&regex::escape(&other.to_string())),
            }
        }
        source.push('$');
        let matcher = Regex::new(&source)?;

        Ok(self
            .data
            .wids
            .range(prefix.to_string()..)
            .take_while(|(word, _)| word.starts_with(prefix))
            .filter(|(word, _)| matcher.is_match(word))
            .map(|(_, &wid)| wid)
            .collect())
    }

    pub fn snapshot(&self) -> LexiconData {
        self.data.clone()
    }

    pub fn restore(&mut self, data: LexiconData) {
        self.data = data;
    }

    pub fn clear(&mut self) {
        self.data = LexiconData::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lexicon() -> Lexicon {
        let mut lexicon = Lexicon::new(Pipeline::standard());
        lexicon.source_to_word_ids("cats catalog car dog");
        lexicon
    }

    #[test]
    fn test_ids_start_at_one_and_are_stable() {
        let mut lexicon = Lexicon::new(Pipeline::standard());
        assert_eq!(lexicon.source_to_word_ids("Foo bar foo"), vec![1, 2, 1]);
        assert_eq!(lexicon.source_to_word_ids("baz bar"), vec![3, 2]);
        assert_eq!(lexicon.length(), 3);
        assert_eq!(lexicon.get_word(3), Some("baz"));
    }

    #[test]
    fn test_term_lookup_is_read_only() {
        let lexicon = lexicon();
        assert_eq!(lexicon.term_to_word_ids("dog unicorn"), vec![4, OOV]);
        assert_eq!(lexicon.length(), 4);
    }

    #[test]
    fn test_glob() {
        let lexicon = lexicon();
        assert_eq!(lexicon.glob_to_word_ids("cat*").unwrap(), vec![2, 1]);
        assert_eq!(lexicon.glob_to_word_ids("ca?").unwrap(), vec![3]);
        assert_eq!(lexicon.glob_to_word_ids("dog").unwrap(), vec![4]);
        assert!(lexicon.glob_to_word_ids("cow").unwrap().is_empty());
    }

    #[test]
    fn test_leading_wildcard_rejected() {
        let err = lexicon().glob_to_word_ids("*at").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Query);
    }

    #[test]
    fn test_parse_terms_keeps_globs() {
        let lexicon = lexicon();
        let terms = lexicon.parse_terms("Cat* the dog");
        assert_eq!(terms, vec!["cat*", "dog"]);
        assert!(Lexicon::is_glob(&terms[0]));
    }
}
