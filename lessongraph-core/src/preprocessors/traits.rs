// Preprocessor abstraction for document reading
//
// This module defines the boundary between document reading (package -> paragraphs)
// and semantic processing (paragraphs -> concept tree / Q&A ledger).

use crate::types::*;
use anyhow::Result;
use std::path::Path;

/// Preprocessor trait - converts authored documents to an ordered paragraph stream
///
/// Preprocessors handle:
/// - Container format parsing (zip packages, XML parts)
/// - Style name resolution and relationship lookup
/// - Ordered inline extraction (runs, hyperlinks, math, images)
///
/// Everything after this point works with `DocParagraph`s and is format-agnostic.
///
/// The preprocessing happens in two clear steps:
/// 1. Document bytes -> DocumentPackage (raw parts)
/// 2. DocumentPackage -> PreprocessorOutput (structured data)
pub trait Preprocessor {
    /// Step 1: Unpack the container into its raw parts
    fn unpack(&self, document_bytes: &[u8]) -> Result<DocumentPackage>;

    /// Step 2: Parse the raw parts into the paragraph stream plus media
    fn parse_package(&self, package: &DocumentPackage) -> Result<PreprocessorOutput>;

    /// Full document processing (combines both steps)
    fn process(&self, document_bytes: &[u8]) -> Result<PreprocessorOutput> {
        let package = self.unpack(document_bytes)?;
        self.parse_package(&package)
    }

    /// Get preprocessor name for debugging/logging
    fn name(&self) -> &str;

    /// Check if preprocessor supports the given file type
    fn supports_file_type(&self, path: &Path) -> bool;
}
