/// One stage of a lexicon pipeline. Each stage maps a list of words to a
/// new list of words.
pub trait PipelineElement: Send + Sync {
    fn process(&self, words: Vec<String>) -> Vec<String>;

    /// Variant used when parsing query terms, where `*` and `?` are
    /// wildcard characters that must survive the stage.
    fn process_glob(&self, words: Vec<String>) -> Vec<String> {
        self.process(words)
    }

    fn name(&self) -> &str;

    fn clone_box(&self) -> Box<dyn PipelineElement>;
}

impl Clone for Box<dyn PipelineElement> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}
