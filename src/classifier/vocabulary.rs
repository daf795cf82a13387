//! Ordered emotion label vocabulary.
//!
//! Index `i` of the classifier output belongs to label `i` of the
//! vocabulary. The ordering comes from the label encoder used at training
//! time and is never changed after loading.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use super::ClassifierError;

/// On-disk vocabulary layouts
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum VocabularyFile {
    /// `["angry", "calm", ...]`
    List(Vec<String>),
    /// `{"classes": ["angry", "calm", ...]}` as written by a label encoder export
    Encoder { classes: Vec<String> },
}

/// Immutable, ordered list of class labels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassVocabulary {
    labels: Vec<String>,
}

impl ClassVocabulary {
    /// Build a vocabulary, rejecting empty, blank or duplicate labels
    pub fn new<I, S>(labels: I) -> Result<Self, ClassifierError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();

        if labels.is_empty() {
            return Err(ClassifierError::ModelLoad(
                "label vocabulary is empty".to_string(),
            ));
        }

        let mut seen = HashSet::with_capacity(labels.len());
        for label in &labels {
            if label.trim().is_empty() {
                return Err(ClassifierError::ModelLoad(
                    "label vocabulary contains a blank label".to_string(),
                ));
            }
            if !seen.insert(label.as_str()) {
                return Err(ClassifierError::ModelLoad(format!(
                    "label vocabulary contains duplicate label {:?}",
                    label
                )));
            }
        }

        Ok(Self { labels })
    }

    /// Load a vocabulary file
    ///
    /// `.txt` files hold one label per line; everything else is parsed as
    /// JSON, either a bare array or an object with a `classes` array.
    pub fn load(path: &Path) -> Result<Self, ClassifierError> {
        if !path.exists() {
            return Err(ClassifierError::ModelNotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            ClassifierError::ModelLoad(format!("cannot read {}: {}", path.display(), e))
        })?;

        let is_text = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("txt"));

        let vocabulary = if is_text {
            Self::from_lines(&content)?
        } else {
            Self::from_json_str(&content)?
        };

        debug!(
            "Loaded {} class labels from {}",
            vocabulary.len(),
            path.display()
        );

        Ok(vocabulary)
    }

    /// Parse a JSON vocabulary
    pub fn from_json_str(json: &str) -> Result<Self, ClassifierError> {
        let file: VocabularyFile = serde_json::from_str(json)
            .map_err(|e| ClassifierError::ModelLoad(format!("invalid vocabulary JSON: {}", e)))?;

        match file {
            VocabularyFile::List(labels) | VocabularyFile::Encoder { classes: labels } => {
                Self::new(labels)
            }
        }
    }

    /// Parse one label per line, ignoring blank lines
    pub fn from_lines(text: &str) -> Result<Self, ClassifierError> {
        Self::new(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty()),
        )
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Label at `index`
    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_from_json_list() {
        let vocab = ClassVocabulary::from_json_str(r#"["angry", "happy", "sad"]"#).unwrap();
        assert_eq!(vocab.len(), 3);
        assert_eq!(vocab.label(0), Some("angry"));
        assert_eq!(vocab.label(2), Some("sad"));
        assert_eq!(vocab.label(3), None);
    }

    #[test]
    fn test_from_json_encoder_object() {
        let vocab =
            ClassVocabulary::from_json_str(r#"{"classes": ["calm", "fearful"]}"#).unwrap();
        assert_eq!(vocab.labels(), &["calm".to_string(), "fearful".to_string()]);
    }

    #[test]
    fn test_from_lines_skips_blank_lines() {
        let vocab = ClassVocabulary::from_lines("neutral\n\n  happy \nsad\n").unwrap();
        assert_eq!(vocab.labels(), &["neutral", "happy", "sad"]);
    }

    #[test]
    fn test_empty_vocabulary_rejected() {
        assert!(matches!(
            ClassVocabulary::from_json_str("[]"),
            Err(ClassifierError::ModelLoad(_))
        ));
    }

    #[test]
    fn test_duplicate_labels_rejected() {
        assert!(matches!(
            ClassVocabulary::new(["happy", "sad", "happy"]),
            Err(ClassifierError::ModelLoad(_))
        ));
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(matches!(
            ClassVocabulary::from_json_str(r#"{"labels": 3}"#),
            Err(ClassifierError::ModelLoad(_))
        ));
    }

    #[test]
    fn test_load_from_files() {
        let dir = TempDir::new().unwrap();

        let json_path = dir.path().join("labels.json");
        std::fs::write(&json_path, r#"["a", "b"]"#).unwrap();
        assert_eq!(ClassVocabulary::load(&json_path).unwrap().len(), 2);

        let txt_path = dir.path().join("labels.txt");
        std::fs::write(&txt_path, "a\nb\nc\n").unwrap();
        assert_eq!(ClassVocabulary::load(&txt_path).unwrap().len(), 3);
    }

    #[test]
    fn test_load_missing_file() {
        let result = ClassVocabulary::load(Path::new("/nonexistent/labels.json"));
        assert!(matches!(result, Err(ClassifierError::ModelNotFound(_))));
    }
}
