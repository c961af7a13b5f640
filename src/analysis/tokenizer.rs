use lazy_static::lazy_static;
use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

use crate::analysis::filter::PipelineElement;

lazy_static! {
    static ref WORD: Regex = Regex::new(r"\w+").expect("valid regex");
    static ref GLOB_WORD: Regex = Regex::new(r"\w+[\w*?]*").expect("valid regex");
}

/// Splits text into runs of word characters. Punctuation separates words,
/// so "hyphen-joined" becomes two words.
#[derive(Debug, Clone, Copy, Default)]
pub struct Splitter;

impl PipelineElement for Splitter {
    fn process(&self, words: Vec<String>) -> Vec<String> {
        words
            .iter()
            .flat_map(|text| WORD.find_iter(text).map(|m| m.as_str().to_string()))
            .collect()
    }

    fn process_glob(&self, words: Vec<String>) -> Vec<String> {
        words
            .iter()
            .flat_map(|text| GLOB_WORD.find_iter(text).map(|m| m.as_str().to_string()))
            .collect()
    }

    fn name(&self) -> &str {
        "splitter"
    }

    fn clone_box(&self) -> Box<dyn PipelineElement> {
        Box::new(*self)
    }
}

/// Splits on Unicode word boundaries, keeping intra-word apostrophes
/// ("can't" stays one word).
#[derive(Debug, Clone, Copy, Default)]
pub struct UnicodeSplitter;

impl PipelineElement for UnicodeSplitter {
    fn process(&self, words: Vec<String>) -> Vec<String> {
        words
            .iter()
            .flat_map(|text| text.unicode_words().map(str::to_string).collect::<Vec<_>>())
            .collect()
    }

    fn process_glob(&self, words: Vec<String>) -> Vec<String> {
        // Wildcards are not word characters, fall back to the regex splitter
        Splitter.process_glob(words)
    }

    fn name(&self) -> &str {
        "unicode_splitter"
    }

    fn clone_box(&self) -> Box<dyn PipelineElement> {
        Box::new(*self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(text: &str) -> Vec<String> {
        vec![text.to_string()]
    }

    #[test]
    fn test_splitter_drops_punctuation() {
        assert_eq!(
            Splitter.process(words("Hello, world-wide web_2!")),
            vec!["Hello", "world", "wide", "web_2"]
        );
    }

    #[test]
    fn test_splitter_glob_keeps_wildcards() {
        assert_eq!(Splitter.process_glob(words("foo* b?r *x")), vec!["foo*", "b?r", "x"]);
    }

    #[test]
    fn test_unicode_splitter() {
        assert_eq!(UnicodeSplitter.process(words("can't stop")), vec!["can't", "stop"]);
        assert_eq!(UnicodeSplitter.process_glob(words("sto*")), vec!["sto*"]);
    }
}
