//! Document-to-text contract
//!
//! Text extraction itself happens elsewhere; this is the shape it hands over.

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};

/// Marker line placed before appended OCR text
pub const OCR_MARKER: &str = "[OCR supplementary text]";

/// Text recovered from a requirement document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentText {
    /// Text confirmed by the user
    pub confirmed_text: String,
    /// Raw OCR output, if any
    #[serde(default)]
    pub ocr_text: Option<String>,
    /// OCR confidence, 0.0-1.0
    #[serde(default)]
    pub confidence: Option<f32>,
}

impl DocumentText {
    /// Document with confirmed text only
    #[inline]
    #[must_use]
    pub fn new(confirmed_text: impl Into<String>) -> Self {
        Self {
            confirmed_text: confirmed_text.into(),
            ocr_text: None,
            confidence: None,
        }
    }

    /// With OCR text
    #[inline]
    #[must_use]
    pub fn with_ocr(mut self, ocr_text: impl Into<String>, confidence: f32) -> Self {
        self.ocr_text = Some(ocr_text.into());
        self.confidence = Some(confidence);
        self
    }

    /// The requirement text the pipeline runs on
    ///
    /// # Errors
    /// Returns `PipelineError::EmptyRequirement` if both parts are blank.
    pub fn requirement_text(&self) -> Result<String, PipelineError> {
        let confirmed = self.confirmed_text.trim();
        let ocr = self.ocr_text.as_deref().map(str::trim).filter(|t| !t.is_empty());
        let text = match (confirmed.is_empty(), ocr) {
            (false, Some(ocr)) => format!("{confirmed}\n\n{OCR_MARKER}\n{ocr}"),
            (true, Some(ocr)) => ocr.to_string(),
            (false, None) => confirmed.to_string(),
            (true, None) => return Err(PipelineError::EmptyRequirement),
        };
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ocr_appended_under_marker() {
        let doc = DocumentText::new("login spec").with_ocr("scanned table", 0.8);
        assert_eq!(
            doc.requirement_text().unwrap(),
            format!("login spec\n\n{OCR_MARKER}\nscanned table")
        );
    }

    #[test]
    fn blank_document_rejected() {
        let doc = DocumentText::new("   ").with_ocr("  ", 0.1);
        assert!(matches!(
            doc.requirement_text(),
            Err(PipelineError::EmptyRequirement)
        ));
    }

    #[test]
    fn ocr_only() {
        let doc = DocumentText::new("").with_ocr("only ocr", 0.5);
        assert_eq!(doc.requirement_text().unwrap(), "only ocr");
    }
}
