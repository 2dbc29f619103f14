// src/ai/connector.rs
use crate::ai::error::Result;
use crate::invoice::attachment::InvoiceImage;

/// Trait defining the interface for invoice question answering
pub trait InvoiceAnalyzer: Send + Sync {
    /// Ask a question about the attached invoice image and return the model's answer.
    /// Fails with `AiError::MissingImage` before any network activity when no
    /// image is attached.
    fn answer_question(&self, image: Option<&InvoiceImage>, question: &str) -> Result<String>;
}
