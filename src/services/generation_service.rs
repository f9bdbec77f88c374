use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::{
    config::Config,
    constants::generation_prompt::{build_generation_prompt, GENERATION_SYSTEM_PROMPT},
    errors::{AppError, AppResult},
    models::domain::question::Difficulty,
};

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

static JSON_ARRAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)(\[\s*\{.*\}\s*\])").expect("JSON_ARRAY is a valid regex pattern")
});

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub topic: String,
    pub category: String,
    pub difficulty: Difficulty,
    pub count: usize,
    pub concepts: Vec<String>,
}

/// A candidate question as returned by the provider, before pool
/// deduplication and adoption into an attempt.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CandidateQuestion {
    pub question: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub correct_answer: String,
    #[serde(default)]
    pub explanation: String,
}

/// External question-generation provider. Callers must not assume ordering
/// or that the returned count matches the requested count.
#[async_trait]
pub trait QuestionProvider: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> AppResult<Vec<CandidateQuestion>>;
}

pub struct OpenAiQuestionProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiQuestionProvider {
    pub fn new(config: &Config) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.openai_timeout_seconds))
            .build()
            .map_err(|e| AppError::InternalError(format!("HTTP client build failed: {}", e)))?;

        Ok(Self {
            client,
            api_key: config.openai_api_key.expose_secret().to_string(),
            model: config.openai_model.clone(),
        })
    }
}

/// Strips markdown code fences and extracts the JSON array from the model's
/// reply.
pub fn clean_json(text: &str) -> String {
    let mut text = text.trim();

    if let Some(rest) = text.strip_prefix("```json") {
        text = rest.trim();
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest.trim();
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest.trim();
    }

    if let Some(m) = JSON_ARRAY.captures(text).and_then(|c| c.get(1)) {
        return m.as_str().to_string();
    }

    text.to_string()
}

/// Structural validation of provider output. A correct answer outside A-D is
/// a contract violation that rejects the whole batch.
pub fn validate_candidates(
    candidates: Vec<CandidateQuestion>,
    requested: usize,
) -> AppResult<Vec<CandidateQuestion>> {
    if candidates.len() < requested {
        log::warn!(
            "Provider returned {} questions, expected {}",
            candidates.len(),
            requested
        );
    }

    for candidate in &candidates {
        if !matches!(candidate.correct_answer.as_str(), "A" | "B" | "C" | "D") {
            return Err(AppError::ProviderError(format!(
                "correct_answer must be A/B/C/D, got '{}'",
                candidate.correct_answer
            )));
        }
        if candidate.question.trim().is_empty() {
            return Err(AppError::ProviderError(
                "candidate has empty question text".to_string(),
            ));
        }
    }

    Ok(candidates)
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[async_trait]
impl QuestionProvider for OpenAiQuestionProvider {
    async fn generate(&self, request: &GenerationRequest) -> AppResult<Vec<CandidateQuestion>> {
        log::info!(
            "Requesting {} questions for {} ({}) - {}",
            request.count,
            request.topic,
            request.category,
            request.difficulty
        );

        let prompt = build_generation_prompt(
            &request.topic,
            &request.category,
            request.difficulty,
            request.count,
            &request.concepts,
        );

        let response = self
            .client
            .post(OPENAI_CHAT_URL)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "max_tokens": 4096,
                "temperature": 0.7,
                "messages": [
                    { "role": "system", "content": GENERATION_SYSTEM_PROMPT },
                    { "role": "user", "content": prompt },
                ],
            }))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::ProviderError("request timed out".to_string())
                } else {
                    AppError::ProviderError(format!("request failed: {}", e))
                }
            })?;

        let status = response.status();
        if status.as_u16() == 401 {
            return Err(AppError::ProviderError("invalid API key".to_string()));
        }
        if status.as_u16() == 429 {
            return Err(AppError::ProviderError("rate limit exceeded".to_string()));
        }
        if status.is_server_error() {
            return Err(AppError::ProviderError(format!(
                "provider server error ({})",
                status.as_u16()
            )));
        }
        if !status.is_success() {
            return Err(AppError::ProviderError(format!(
                "unexpected status {}",
                status.as_u16()
            )));
        }

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| AppError::ProviderError(format!("malformed response body: {}", e)))?;

        let content = body
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| AppError::ProviderError("response had no choices".to_string()))?;

        let cleaned = clean_json(content);
        let candidates: Vec<CandidateQuestion> = serde_json::from_str(&cleaned)
            .map_err(|e| AppError::ProviderError(format!("reply is not a JSON array: {}", e)))?;

        let validated = validate_candidates(candidates, request.count)?;
        log::info!("Provider returned {} valid candidates", validated.len());
        Ok(validated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(question: &str, correct: &str) -> CandidateQuestion {
        CandidateQuestion {
            question: question.to_string(),
            option_a: "a".to_string(),
            option_b: "b".to_string(),
            option_c: "c".to_string(),
            option_d: "d".to_string(),
            correct_answer: correct.to_string(),
            explanation: String::new(),
        }
    }

    #[test]
    fn clean_json_strips_fences() {
        let raw = "```json\n[{\"question\": \"q\"}]\n```";
        assert_eq!(clean_json(raw), "[{\"question\": \"q\"}]");
    }

    #[test]
    fn clean_json_extracts_array_from_prose() {
        let raw = "Here you go:\n[{\"question\": \"q\"}]\nEnjoy!";
        assert_eq!(clean_json(raw), "[{\"question\": \"q\"}]");
    }

    #[test]
    fn clean_json_passes_through_bare_arrays() {
        let raw = "[{\"question\": \"q\"}]";
        assert_eq!(clean_json(raw), raw);
    }

    #[test]
    fn validate_rejects_bad_correct_answer() {
        let result = validate_candidates(vec![candidate("What is 1+1?", "E")], 1);
        assert!(matches!(result, Err(AppError::ProviderError(_))));
    }

    #[test]
    fn validate_rejects_empty_question() {
        let result = validate_candidates(vec![candidate("   ", "A")], 1);
        assert!(matches!(result, Err(AppError::ProviderError(_))));
    }

    #[test]
    fn validate_accepts_short_batches_with_warning() {
        let result = validate_candidates(vec![candidate("What is 1+1?", "B")], 5);
        assert_eq!(result.unwrap().len(), 1);
    }

    #[test]
    fn candidate_defaults_missing_explanation() {
        let parsed: CandidateQuestion = serde_json::from_str(
            r#"{"question":"q","option_a":"a","option_b":"b","option_c":"c","option_d":"d","correct_answer":"C"}"#,
        )
        .unwrap();
        assert_eq!(parsed.explanation, "");
        assert_eq!(parsed.correct_answer, "C");
    }
}
