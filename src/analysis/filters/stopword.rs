use std::collections::HashSet;
use std::sync::Arc;

use lazy_static::lazy_static;

use crate::analysis::filter::PipelineElement;

lazy_static! {
    static ref DEFAULT_STOPWORDS: Arc<HashSet<String>> = Arc::new(
        [
            "a", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in",
            "into", "is", "it", "no", "not", "of", "on", "or", "such", "that",
            "the", "their", "then", "there", "these", "they", "this", "to",
            "was", "will", "with",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    );
}

/// Drops common words. Optionally also drops every single-character word.
#[derive(Debug, Clone)]
pub struct StopWordRemover {
    pub stop_words: Arc<HashSet<String>>,
    pub remove_single_chars: bool,
}

impl Default for StopWordRemover {
    fn default() -> Self {
        StopWordRemover {
            stop_words: DEFAULT_STOPWORDS.clone(),
            remove_single_chars: false,
        }
    }
}

impl StopWordRemover {
    pub fn new(stop_words: Vec<String>) -> Self {
        StopWordRemover {
            stop_words: Arc::new(stop_words.into_iter().collect()),
            remove_single_chars: false,
        }
    }

    pub fn with_single_chars(mut self) -> Self {
        self.remove_single_chars = true;
        self
    }

    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(word) || (self.remove_single_chars && word.chars().count() == 1)
    }
}

impl PipelineElement for StopWordRemover {
    fn process(&self, words: Vec<String>) -> Vec<String> {
        words.into_iter().filter(|word| !self.is_stop_word(word)).collect()
    }

    fn name(&self) -> &str {
        if self.remove_single_chars {
            "stop_word_and_single_char_remover"
        } else {
            "stop_word_remover"
        }
    }

    fn clone_box(&self) -> Box<dyn PipelineElement> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_default_list() {
        let out = StopWordRemover::default().process(words(&["now", "is", "the", "time", "x"]));
        assert_eq!(out, words(&["now", "time", "x"]));
    }

    #[test]
    fn test_single_chars() {
        let remover = StopWordRemover::default().with_single_chars();
        assert_eq!(remover.process(words(&["x", "xy", "the"])), words(&["xy"]));
        assert_eq!(remover.name(), "stop_word_and_single_char_remover");
    }

    #[test]
    fn test_custom_list() {
        let remover = StopWordRemover::new(words(&["foo"]));
        assert_eq!(remover.process(words(&["foo", "the"])), words(&["the"]));
    }
}
