use std::fs;
use std::path::PathBuf;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde_derive::{Deserialize, Serialize};
use serde_json;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::config::{AuthScheme, Settings};
use crate::helpers::{self, HelperError};

pub const SYSTEM_PROMPT: &str = "You are a helpful e-commerce content generation assistant specialized in creating engaging product descriptions and marketing content.";

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 500;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Message {
	pub role: String,
	pub content: Option<String>,
}

impl Message {
	pub fn normal(role: &str, content: &str) -> Self {
		Message{ role: role.to_string(), content: Some(content.to_string()) }
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
	pub model: String,
	pub temperature: f64,
	pub max_tokens: u32,
}

impl Default for GenerationParams {
	fn default() -> Self {
		GenerationParams {
			model: DEFAULT_MODEL.to_string(),
			temperature: DEFAULT_TEMPERATURE,
			max_tokens: DEFAULT_MAX_TOKENS,
		}
	}
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "snake_case")]
pub struct Chat {
	model: String,
	pub messages: Vec<Message>,
	max_tokens: u32,
	temperature: f64,
}

impl Chat {
	/// A two-message conversation: the fixed system prompt and `prompt` as the
	/// user turn.
	pub fn for_prompt(prompt: &str, params: &GenerationParams) -> Self {
		Chat {
			model: params.model.clone(),
			messages: vec![
				Message::normal("system", SYSTEM_PROMPT),
				Message::normal("user", prompt),
			],
			max_tokens: params.max_tokens,
			temperature: params.temperature,
		}
	}
}

#[derive(Debug, Error)]
pub enum CompletionError {
	#[error("authentication failed ({status}): {message}")]
	Authentication { status: u16, message: String },
	#[error("rate limit exceeded: {0}")]
	RateLimited(String),
	#[error("API error ({status}): {message}")]
	Api { status: u16, message: String },
	#[error("HTTP request failed: {0}")]
	Transport(#[from] reqwest::Error),
	#[error("invalid JSON: {0}")]
	Decode(#[from] serde_json::Error),
	#[error("{0}")]
	MissingContent(&'static str),
	#[error("could not write request/response dump: {0}")]
	Dump(#[from] HelperError),
}

impl CompletionError {
	pub fn hint(&self) -> Option<&'static str> {
		match self {
			CompletionError::Authentication { .. } => Some("Please check your API key configuration"),
			CompletionError::RateLimited(_) => Some("You may have hit the API rate limit. Please wait a moment and try again."),
			_ => None,
		}
	}
}

/// Sends one chat-completion request per call. Failures are classified and
/// returned as is; nothing is retried.
pub struct CompletionClient {
	post_url: Url,
	api_key: String,
	auth: AuthScheme,
	client: reqwest::Client,
	pub write_req_resp: bool,
	/// where `last_request.json` and `last_response.json` go
	pub dump_dir: PathBuf,
}

impl CompletionClient {
	pub fn new(settings: &Settings) -> Self {
		CompletionClient {
			post_url: settings.post_url.clone(),
			api_key: settings.api_key.clone(),
			auth: settings.auth,
			client: reqwest::Client::new(),
			write_req_resp: false,
			dump_dir: PathBuf::from("."),
		}
	}

	pub async fn complete(&self, prompt: &str, params: &GenerationParams) -> Result<String, CompletionError> {
		info!("Using model: {}", params.model);
		info!("Temperature: {}", params.temperature);
		info!("Max tokens: {}", params.max_tokens);

		let chat = Chat::for_prompt(prompt, params);
		if self.write_req_resp {
			helpers::save_to_json(self.dump_dir.join("last_request.json"), &chat)?;
		}
		let serialised = serde_json::to_string(&chat)?;

		let req = self.client
			.post(self.post_url.clone())
			.header(CONTENT_TYPE, "application/json");
		let req = match self.auth {
			AuthScheme::Bearer => req.bearer_auth(&self.api_key),
			AuthScheme::ApiKeyHeader => req.header("api-key", &self.api_key),
		};
		let resp = req.body(serialised).send().await?;

		let status = resp.status();
		let body = resp.text().await?;
		debug!(status = status.as_u16(), bytes = body.len(), "completion response");
		if self.write_req_resp {
			fs::write(self.dump_dir.join("last_response.json"), &body).map_err(HelperError::from)?;
		}

		if !status.is_success() {
			return Err(classify(status, &body));
		}

		let message = Self::parse_response(&body)?;
		let content = message.content
			.ok_or(CompletionError::MissingContent("No content in the returned message"))?;
		Ok(content.trim().to_string())
	}

	pub fn parse_response(response: &str) -> Result<Message, CompletionError> {
		let mut json: serde_json::Value = serde_json::from_str(response)?;
		let message = json
			.get_mut("choices").ok_or(CompletionError::MissingContent("No choices in the return object"))?
			.get_mut(0).ok_or(CompletionError::MissingContent("No element 0 in the choices object"))?
			.get_mut("message").ok_or(CompletionError::MissingContent("No message in the choices element 0"))?
			.take();
		Ok(serde_json::from_value(message)?)
	}
}

fn classify(status: StatusCode, body: &str) -> CompletionError {
	let message = error_message(body);
	match status {
		StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
			CompletionError::Authentication { status: status.as_u16(), message }
		},
		StatusCode::TOO_MANY_REQUESTS => CompletionError::RateLimited(message),
		_ => CompletionError::Api { status: status.as_u16(), message },
	}
}

/// `error.message` from an OpenAI-style error body, else the raw body.
fn error_message(body: &str) -> String {
	serde_json::from_str::<serde_json::Value>(body)
		.ok()
		.and_then(|json| json.pointer("/error/message").and_then(|m| m.as_str()).map(str::to_string))
		.unwrap_or_else(|| body.trim().to_string())
}
