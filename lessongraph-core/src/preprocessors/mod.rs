//! Document Preprocessors
//!
//! This module provides the reading layer that turns an authored document into
//! a unified PreprocessorOutput feeding both conversion pipelines.
//!
//! ## Architecture
//!
//! ```text
//! Document (.docx)
//!     ↓
//! [Format-specific Preprocessor]
//!     ↓
//! PreprocessorOutput (ordered paragraphs + media)
//!     ↓
//! [Concept builder | Q&A state machine]
//! ```

pub mod docx;
pub mod traits;

pub use docx::DocxPreprocessor;
pub use traits::Preprocessor;
