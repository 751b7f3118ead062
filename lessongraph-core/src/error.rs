use thiserror::Error;

/// Structural errors abort the conversion of the current document. Nothing
/// is written when one of these is returned.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("paragraph {paragraph}: content \"{preview}\" appears before any heading opens a node")]
    ContentBeforeHeading { paragraph: usize, preview: String },

    #[error("question {ordinal} has no question content")]
    EmptyQuestion { ordinal: usize },

    #[error("document package is missing required part {0}")]
    MissingPart(String),

    #[error("cannot derive a chapter number from '{0}'")]
    InvalidChapterIdentity(String),
}
