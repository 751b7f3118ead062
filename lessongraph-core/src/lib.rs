// Lessongraph Core Library
//
// Converts styled lesson documents into a concept tree or a question/answer
// ledger and merges the result into per-subject JSON stores.

pub mod classifier;
pub mod concepts;
pub mod config;
pub mod error;
pub mod extract;
pub mod ids;
pub mod merge;
pub mod preprocessors;
pub mod processor;
pub mod qa;
pub mod report;
pub mod storage;
pub mod store;
pub mod subjects;
pub mod types;
pub mod xml;

// Re-export main types and functions for easy use
pub use config::ConversionConfig;
pub use error::ConversionError;
pub use preprocessors::{DocxPreprocessor, Preprocessor};
pub use processor::{chapter_no_from_path, ChapterJob, ChapterOutcome, DocumentProcessor, StepProfiler};
pub use report::{ConversionIssue, ConversionReport};
pub use types::*;
