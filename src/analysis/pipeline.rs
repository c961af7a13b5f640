use crate::analysis::filter::PipelineElement;
use crate::analysis::filters::lowercase::CaseNormalizer;
use crate::analysis::filters::stopword::StopWordRemover;
use crate::analysis::tokenizer::Splitter;
use crate::core::config::Config;

/// Ordered chain of pipeline elements a lexicon runs text through.
#[derive(Clone)]
pub struct Pipeline {
    pub elements: Vec<Box<dyn PipelineElement>>,
    pub name: String,
}

impl Pipeline {
    pub fn new(name: &str) -> Self {
        Pipeline {
            elements: Vec::new(),
            name: name.to_string(),
        }
    }

    pub fn add_element(mut self, element: Box<dyn PipelineElement>) -> Self {
        self.elements.push(element);
        self
    }

    pub fn process(&self, text: &str) -> Vec<String> {
        let mut words = vec![text.to_string()];
        for element in &self.elements {
            words = element.process(words);
        }
        words
    }

    pub fn process_glob(&self, text: &str) -> Vec<String> {
        let mut words = vec![text.to_string()];
        for element in &self.elements {
            words = element.process_glob(words);
        }
        words
    }

    /// Splitter, case normalizer and the default stop words.
    pub fn standard() -> Self {
        Pipeline::new("standard")
            .add_element(Box::new(Splitter))
            .add_element(Box::new(CaseNormalizer))
            .add_element(Box::new(StopWordRemover::default()))
    }

    pub fn from_config(config: &Config) -> Self {
        let pipeline = Pipeline::new("configured")
            .add_element(Box::new(Splitter))
            .add_element(Box::new(CaseNormalizer));
        let remover = if config.default_stopwords {
            StopWordRemover::default()
        } else {
            StopWordRemover::new(Vec::new())
        };
        match (config.default_stopwords, config.remove_single_chars) {
            (false, false) => pipeline,
            (_, true) => pipeline.add_element(Box::new(remover.with_single_chars())),
            (true, false) => pipeline.add_element(Box::new(remover)),
        }
    }

    pub fn element_names(&self) -> Vec<&str> {
        self.elements.iter().map(|e| e.name()).collect()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Pipeline::standard()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("elements", &self.element_names())
            .finish()
    }
}
