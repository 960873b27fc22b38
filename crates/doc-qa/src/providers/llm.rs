//! Model gateway trait: one LLM call answers one group of questions

use async_trait::async_trait;

use super::rotation::RotationKey;
use crate::error::GatewayError;

/// Outcome of a gateway call that reached the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayResponse {
    /// The model returned a list of answers; its length is not yet checked
    ParsedAnswers(Vec<String>),
    /// The model replied with something that is not an answer list
    Malformed(String),
}

impl GatewayResponse {
    /// Answers if the response has exactly `expected` entries
    pub fn into_answers(self, expected: usize) -> Option<Vec<String>> {
        match self {
            GatewayResponse::ParsedAnswers(answers) if answers.len() == expected => Some(answers),
            _ => None,
        }
    }
}

/// Trait for batched question answering against a context
///
/// Implementations:
/// - `ChatGateway`: OpenAI-compatible `/chat/completions` endpoint
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Answer `questions` from `context`, using the credential slot chosen by `rotation_key`.
    ///
    /// Retries are the implementation's concern; an `Err` means they are exhausted.
    async fn complete(
        &self,
        context: &str,
        questions: &[String],
        rotation_key: RotationKey,
    ) -> Result<GatewayResponse, GatewayError>;

    /// Base rotation key for one request; group `g` then uses `base.offset(g)`.
    ///
    /// Gateways without a credential pool keep the default.
    fn begin_request(&self) -> RotationKey {
        RotationKey::default()
    }

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_answers_checks_length() {
        let response = GatewayResponse::ParsedAnswers(vec!["a".into(), "b".into()]);
        assert_eq!(response.clone().into_answers(2), Some(vec!["a".into(), "b".into()]));
        assert_eq!(response.into_answers(3), None);
        assert_eq!(GatewayResponse::Malformed("oops".into()).into_answers(0), None);
    }
}
