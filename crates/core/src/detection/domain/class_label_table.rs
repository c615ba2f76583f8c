use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LabelLoadError {
    #[error("failed to read class labels from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("class label file {0} contains no labels")]
    Empty(PathBuf),
}

/// Ordered class names, indexed by the class id the model emits.
///
/// Loaded once at startup and shared read-only across inference calls.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassLabelTable {
    labels: Vec<String>,
}

impl ClassLabelTable {
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    /// Loads one class name per line.
    ///
    /// Trailing `\r` is stripped so files written on Windows load cleanly.
    /// Blank lines are kept: they still occupy a class index.
    pub fn load(path: &Path) -> Result<Self, LabelLoadError> {
        let content = fs::read_to_string(path).map_err(|e| LabelLoadError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let table = Self::parse(&content);
        if table.is_empty() {
            return Err(LabelLoadError::Empty(path.to_path_buf()));
        }
        log::info!("Loaded {} class labels from {}", table.len(), path.display());
        Ok(table)
    }

    pub fn parse(content: &str) -> Self {
        let labels = content
            .lines()
            .map(|line| line.trim_end_matches('\r').to_string())
            .collect();
        Self { labels }
    }

    pub fn get(&self, class_id: usize) -> Option<&str> {
        self.labels.get(class_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}
