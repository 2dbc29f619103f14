// src/ai/error.rs
use std::time::Duration;
use thiserror::Error;

/// Failure reasons for a Gemini request. Callers branch on the variant
/// instead of string-matching a message.
#[derive(Error, Debug)]
pub enum AiError {
    #[error("No file uploaded.")]
    MissingImage,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Gemini request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Could not reach Gemini: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gemini API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("No response received from the Gemini model.")]
    EmptyAnswer,

    #[error("Could not decode Gemini response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl AiError {
    /// Operator-facing fix suggestion for this failure, if one exists.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            AiError::Config(_) => Some("Set GOOGLE_API_KEY in your environment or a .env file."),
            AiError::Api { status: 401 | 403, .. } => {
                Some("Check that GOOGLE_API_KEY is valid and has access to the Gemini API.")
            }
            AiError::Api { status: 429, .. } => {
                Some("The API quota is exhausted. Wait a moment and try again.")
            }
            AiError::Timeout(_) => {
                Some("The model took too long to answer. Try again, or raise the timeout.")
            }
            AiError::Http(_) => Some("Check your network connection and the API URL."),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, AiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_image_display() {
        let err = AiError::MissingImage;
        assert_eq!(err.to_string(), "No file uploaded.");
    }

    #[test]
    fn test_config_error_display() {
        let err = AiError::Config("GOOGLE_API_KEY is not set".to_string());
        assert_eq!(err.to_string(), "Configuration error: GOOGLE_API_KEY is not set");
    }

    #[test]
    fn test_api_error_display() {
        let err = AiError::Api {
            status: 401,
            message: "API key not valid".to_string(),
        };
        assert_eq!(err.to_string(), "Gemini API error (401): API key not valid");
    }

    #[test]
    fn test_empty_answer_display() {
        let err = AiError::EmptyAnswer;
        assert_eq!(err.to_string(), "No response received from the Gemini model.");
    }

    #[test]
    fn test_timeout_display() {
        let err = AiError::Timeout(Duration::from_secs(120));
        assert_eq!(err.to_string(), "Gemini request timed out after 120s");
    }

    #[test]
    fn test_decode_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: AiError = json_err.into();
        match err {
            AiError::Decode(_) => {}
            _ => panic!("Expected Decode"),
        }
    }

    #[test]
    fn test_auth_error_hint() {
        let err = AiError::Api {
            status: 403,
            message: "forbidden".to_string(),
        };
        assert!(err.hint().unwrap().contains("GOOGLE_API_KEY"));
    }

    #[test]
    fn test_quota_error_hint() {
        let err = AiError::Api {
            status: 429,
            message: "quota exceeded".to_string(),
        };
        assert!(err.hint().unwrap().contains("quota"));
    }

    #[test]
    fn test_missing_image_has_no_hint() {
        assert!(AiError::MissingImage.hint().is_none());
        assert!(AiError::EmptyAnswer.hint().is_none());
    }
}
