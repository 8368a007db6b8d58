//! Classification of a job's stderr output.
//!
//! The patterns match text the job's own framework prints, so they are
//! heuristics and can be replaced wholesale with [`ErrorClassifier::new`].

use trainrun_core::FailureCategory;

/// One `(substring, category)` row of the classifier table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierRule {
    pub pattern: String,
    pub category: FailureCategory,
}

impl ClassifierRule {
    pub fn new(pattern: impl Into<String>, category: FailureCategory) -> Self {
        Self {
            pattern: pattern.into(),
            category,
        }
    }
}

/// Ordered substring table; the first matching rule wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorClassifier {
    rules: Vec<ClassifierRule>,
}

impl ErrorClassifier {
    /// Create a classifier with a custom rule table.
    pub fn new(rules: Vec<ClassifierRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[ClassifierRule] {
        &self.rules
    }

    /// Map raw stderr text to a failure category.
    ///
    /// Text that matches no rule is [`FailureCategory::Unknown`].
    pub fn classify(&self, text: &str) -> FailureCategory {
        self.rules
            .iter()
            .find(|rule| text.contains(rule.pattern.as_str()))
            .map(|rule| rule.category)
            .unwrap_or(FailureCategory::Unknown)
    }
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new(vec![
            ClassifierRule::new("FileNotFoundError", FailureCategory::MissingData),
            ClassifierRule::new("CUDA", FailureCategory::GpuFailure),
            ClassifierRule::new("torch", FailureCategory::FrameworkFailure),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table() {
        let classifier = ErrorClassifier::default();

        assert_eq!(
            classifier.classify("RuntimeError: CUDA out of memory"),
            FailureCategory::GpuFailure
        );
        assert_eq!(
            classifier.classify("FileNotFoundError: [Errno 2] No such file: 'data/processed.npy'"),
            FailureCategory::MissingData
        );
        assert_eq!(
            classifier.classify("  File \"/usr/lib/python3/site-packages/torch/nn/modules.py\""),
            FailureCategory::FrameworkFailure
        );
        assert_eq!(
            classifier.classify("Segmentation fault"),
            FailureCategory::Unknown
        );
    }

    #[test]
    fn test_first_match_wins() {
        let classifier = ErrorClassifier::default();
        // Mentions both the framework and the GPU; the GPU rule comes first.
        assert_eq!(
            classifier.classify("torch.cuda.OutOfMemoryError: CUDA out of memory"),
            FailureCategory::GpuFailure
        );
    }

    #[test]
    fn test_custom_table() {
        let classifier = ErrorClassifier::new(vec![ClassifierRule::new(
            "MemoryError",
            FailureCategory::GpuFailure,
        )]);
        assert_eq!(classifier.classify("MemoryError"), FailureCategory::GpuFailure);
        assert_eq!(classifier.classify("CUDA"), FailureCategory::Unknown);
        assert_eq!(classifier.rules().len(), 1);
    }
}
