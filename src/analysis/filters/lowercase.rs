use crate::analysis::filter::PipelineElement;

#[derive(Debug, Clone, Copy, Default)]
pub struct CaseNormalizer;

impl PipelineElement for CaseNormalizer {
    fn process(&self, words: Vec<String>) -> Vec<String> {
        words.into_iter().map(|word| word.to_lowercase()).collect()
    }

    fn name(&self) -> &str {
        "case_normalizer"
    }

    fn clone_box(&self) -> Box<dyn PipelineElement> {
        Box::new(*self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercases_globs_too() {
        let out = CaseNormalizer.process_glob(vec!["FoO*".to_string(), "ÉTÉ".to_string()]);
        assert_eq!(out, vec!["foo*", "été"]);
    }
}
