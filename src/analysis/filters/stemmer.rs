use rust_stemmers::{Algorithm, Stemmer};

use crate::analysis::filter::PipelineElement;

pub struct StemmerFilter {
    pub algorithm: Algorithm,
}

impl StemmerFilter {
    pub fn new(algorithm: Algorithm) -> Self {
        StemmerFilter { algorithm }
    }
}

impl PipelineElement for StemmerFilter {
    fn process(&self, words: Vec<String>) -> Vec<String> {
        let stemmer = Stemmer::create(self.algorithm);
        words.into_iter().map(|word| stemmer.stem(&word).into_owned()).collect()
    }

    fn process_glob(&self, words: Vec<String>) -> Vec<String> {
        let stemmer = Stemmer::create(self.algorithm);
        words
            .into_iter()
            .map(|word| {
                if word.contains(['*', '?']) {
                    word
                } else {
                    stemmer.stem(&word).into_owned()
                }
            })
            .collect()
    }

    fn name(&self) -> &str {
        "stemmer"
    }

    fn clone_box(&self) -> Box<dyn PipelineElement> {
        Box::new(StemmerFilter {
            algorithm: self.algorithm,
        })
    }
}
