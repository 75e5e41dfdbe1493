use crate::config::PipelineConfig;
use crate::utils::{clean_text, page_context, slug};
use crate::PipelineError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::json;

const SYSTEM_PROMPT: &str = "You turn website text into chatbot training data. \
For the given passage reply with a JSON object with the keys \
\"answer\" (a direct, concise summary of the passage), \
\"question\" (a clear question answered by that summary), \
\"topic\" (a single word topic) and \"subject\" (a single word description).";

/// One generated question/answer pair and the intent it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QaRecord {
    pub question: String,
    pub answer: String,
    pub intent: String,
}

/// Text in, Q/A/intent record out.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, text: &str, page_url: &str) -> Result<QaRecord, PipelineError>;

    /// Cheap check that the generator can be used at all.
    fn ensure_ready(&self) -> Result<(), PipelineError> {
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct Draft {
    answer: String,
    question: String,
    topic: String,
    subject: String,
}

/// [`Generator`] backed by an OpenAI compatible chat-completions endpoint.
pub struct OpenAiGenerator {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_question_length: usize,
    max_intent_length: usize,
}

impl OpenAiGenerator {
    pub fn new(config: &PipelineConfig) -> Result<Self, PipelineError> {
        Ok(Self {
            client: reqwest::Client::builder()
                .connect_timeout(config.connect_timeout)
                .timeout(config.request_timeout * 4)
                .build()?,
            api_key: config.api_key.clone(),
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_question_length: config.max_question_length,
            max_intent_length: config.max_intent_length,
        })
    }

    fn headers(&self) -> Result<HeaderMap, PipelineError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))
                .map_err(|e| PipelineError::Generation(e.to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    fn to_record(&self, draft: Draft, page_url: &str) -> QaRecord {
        let mut question: String = clean_text(&draft.question)
            .chars()
            .take(self.max_question_length)
            .collect();
        if !question.ends_with('?') {
            question.push('?');
        }

        let topic = slug(&draft.topic, self.max_intent_length);
        let subject = slug(&draft.subject, self.max_intent_length);

        QaRecord {
            question,
            answer: clean_text(&draft.answer),
            intent: format!("{}.{}.{}", page_context(page_url), topic, subject),
        }
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    async fn generate(&self, text: &str, page_url: &str) -> Result<QaRecord, PipelineError> {
        let payload = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": text }
            ],
            "response_format": { "type": "json_object" },
            "temperature": 0.7
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .headers(self.headers()?)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;

        let result = response.json::<serde_json::Value>().await?;
        let content = result["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| PipelineError::Generation("completion had no content".into()))?;

        let draft: Draft = serde_json::from_str(content)
            .map_err(|e| PipelineError::Generation(format!("malformed completion: {e}")))?;

        Ok(self.to_record(draft, page_url))
    }

    fn ensure_ready(&self) -> Result<(), PipelineError> {
        if self.api_key.trim().is_empty() {
            return Err(PipelineError::Generation("OPENAI_API_KEY is not set".into()));
        }
        Ok(())
    }
}
