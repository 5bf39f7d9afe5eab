//! Structured extraction from OCR text through an OpenAI-compatible
//! chat completions endpoint.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ChitError, Result};
use crate::models::{Extraction, TrainingExample};
use crate::settings::LlmSettings;

/// Characters of each example's OCR text included in the prompt.
const EXAMPLE_OCR_CHARS: usize = 200;

/// Turns OCR text into an [`Extraction`], optionally primed with
/// previously corrected receipts.
pub trait ReceiptParser {
    fn parse(&self, ocr_text: &str, examples: &[TrainingExample]) -> Result<Extraction>;
}

/// Used when extraction is switched off or no API key is configured.
/// Every field comes back empty.
pub struct DisabledParser;

impl ReceiptParser for DisabledParser {
    fn parse(&self, _ocr_text: &str, _examples: &[TrainingExample]) -> Result<Extraction> {
        Ok(Extraction::default())
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

pub struct OpenAiParser {
    client: reqwest::blocking::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiParser {
    pub fn new(base_url: &str, model: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
        })
    }

    fn chat_completion(&self, prompt: String) -> Result<String> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            temperature: 0.0,
        };

        let mut req = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .json(&request);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send()?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(ChitError::Llm(format!("API error {status}: {}", body.trim())));
        }

        let parsed: ChatCompletionResponse = response.json()?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ChitError::Llm("empty response".to_string()))
    }
}

impl ReceiptParser for OpenAiParser {
    fn parse(&self, ocr_text: &str, examples: &[TrainingExample]) -> Result<Extraction> {
        let prompt = build_prompt(ocr_text, examples);
        tracing::debug!(model = %self.model, examples = examples.len(), "requesting extraction");
        let content = self.chat_completion(prompt)?;
        parse_extraction(&content)
    }
}

/// Build the parser the settings ask for. Falls back to [`DisabledParser`]
/// when extraction is off or the API key variable is unset.
pub fn parser_from_settings(settings: &LlmSettings) -> Result<Box<dyn ReceiptParser>> {
    if !settings.enabled {
        return Ok(Box::new(DisabledParser));
    }
    let key = std::env::var(&settings.api_key_env).ok().filter(|k| !k.trim().is_empty());
    if key.is_none() {
        tracing::warn!(var = %settings.api_key_env, "no API key set, skipping field extraction");
        return Ok(Box::new(DisabledParser));
    }
    Ok(Box::new(OpenAiParser::new(
        &settings.base_url,
        &settings.model,
        key,
        Duration::from_secs(settings.timeout_secs),
    )?))
}

pub fn build_prompt(ocr_text: &str, examples: &[TrainingExample]) -> String {
    let mut prompt = String::from(
        "You extract structured information from restaurant receipts.\n\n",
    );

    if !examples.is_empty() {
        prompt.push_str("Correctly extracted examples from earlier receipts:\n\n");
        for (i, ex) in examples.iter().enumerate() {
            let snippet: String = ex.ocr_text.chars().take(EXAMPLE_OCR_CHARS).collect();
            let answer = serde_json::json!({
                "restaurant_name": ex.restaurant_name,
                "date": ex.date,
                "total_amount": ex.total_amount,
            });
            prompt.push_str(&format!(
                "Example {}:\nOCR text: {snippet}...\nCorrect extraction:\n{answer}\n\n",
                i + 1
            ));
        }
    }

    prompt.push_str(&format!(
        "Extract data from this receipt:\n\n---\n{ocr_text}\n---\n\n\
         Reply with a JSON object with exactly these keys:\n\
         - \"restaurant_name\": name of the restaurant or venue, spelled consistently\n\
         - \"date\": date of purchase as YYYY-MM-DD\n\
         - \"total_amount\": total paid including tip, a plain number without currency symbol\n\n\
         Use null for anything not found.\n"
    ));
    prompt
}

/// Pull an [`Extraction`] out of a model reply.
///
/// Markdown fences and surrounding prose are tolerated. Amounts may come
/// back as numbers or numeric strings. A date that is not `YYYY-MM-DD` and
/// a blank name are dropped rather than stored.
pub fn parse_extraction(content: &str) -> Result<Extraction> {
    let start = content.find('{');
    let end = content.rfind('}');
    let json_str = match (start, end) {
        (Some(s), Some(e)) if e > s => &content[s..=e],
        _ => return Err(ChitError::Llm(format!("no JSON object in reply: {}", content.trim()))),
    };
    let value: Value = serde_json::from_str(json_str)?;

    let restaurant_name = value
        .get("restaurant_name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let date = value
        .get("date")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|d| chrono::NaiveDate::parse_from_str(d, "%Y-%m-%d").is_ok())
        .map(str::to_string);

    let total_amount = value.get("total_amount").and_then(|v| match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s
            .trim()
            .trim_start_matches('$')
            .replace(',', "")
            .parse::<f64>()
            .ok(),
        _ => None,
    }).filter(|a| a.is_finite());

    Ok(Extraction { restaurant_name, date, total_amount })
}
