//! Request and response types for the run endpoint

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Answer substituted when a group's model response has the wrong shape
pub const UNEXPECTED_FORMAT_ANSWER: &str = "Unexpected response format.";

/// Answer substituted when a group's model call fails
pub const LLM_ERROR_ANSWER: &str = "Error in LLM response.";

/// Raw request body for `POST /hackrx/run`.
///
/// Fields are loosely typed so that shape errors become validation errors
/// instead of JSON rejections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunRequest {
    /// URL or local path of the document
    #[serde(default)]
    pub documents: Option<Value>,
    /// Ordered questions
    #[serde(default)]
    pub questions: Option<Value>,
}

/// A request that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRun {
    /// URL or local path of the document
    pub documents: String,
    /// Ordered questions
    pub questions: Vec<String>,
}

impl RunRequest {
    /// Create a request from typed parts
    pub fn new(documents: impl Into<String>, questions: Vec<String>) -> Self {
        Self {
            documents: Some(Value::String(documents.into())),
            questions: Some(Value::Array(
                questions.into_iter().map(Value::String).collect(),
            )),
        }
    }

    /// Check that `documents` is a non-empty string and `questions` an array of strings
    pub fn validate(self) -> Result<ValidatedRun> {
        let documents = match self.documents {
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            _ => {
                return Err(Error::validation(
                    "Missing or invalid 'documents' or 'questions' array",
                ))
            }
        };

        let questions = match self.questions {
            Some(Value::Array(items)) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(q) => Ok(q),
                    other => Err(Error::validation(format!(
                        "Every question must be a string, got {}",
                        other
                    ))),
                })
                .collect::<Result<Vec<_>>>()?,
            _ => {
                return Err(Error::validation(
                    "Missing or invalid 'documents' or 'questions' array",
                ))
            }
        };

        Ok(ValidatedRun {
            documents,
            questions,
        })
    }
}

/// Response body for `POST /hackrx/run`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResponse {
    /// One answer per question, in question order
    pub answers: Vec<String>,
}
