use std::fmt;

use serde_derive::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::helpers::{self, HelperError};

pub const APP_NAME: &str = "contentagent";
pub const CONFIG_NAME: &str = "config";
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const SAMPLE_API_KEY: &str = "YOUR_API_KEY_HERE";

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("OpenAI API key not found. Please set OPENAI_API_KEY environment variable.")]
	MissingApiKey,
	#[error("API key from {0} is empty")]
	EmptyApiKey(KeySource),
	#[error("Please replace the sample API key from {0} with your actual API key")]
	SampleApiKey(KeySource),
	#[error("invalid API endpoint '{url}': {source}")]
	InvalidUrl { url: String, source: url::ParseError },
	#[error("could not read config file: {0}")]
	ConfigFile(#[from] HelperError),
}

impl ConfigError {
	/// Setup advice shown alongside the error.
	pub fn hint(&self) -> Option<&'static str> {
		match self {
			ConfigError::MissingApiKey | ConfigError::EmptyApiKey(_) | ConfigError::SampleApiKey(_) => Some(
				"Set the key in the environment (recommended):\n  export OPENAI_API_KEY='your-api-key-here'\n\
				 or add \"openai_api_key\" to ~/.config/contentagent/config.json (never commit it).",
			),
			_ => None,
		}
	}
}

/// Optional on-disk settings, `<config dir>/contentagent/config.json`.
#[derive(Serialize, Deserialize, Debug, Default, Clone)]
pub struct ConfigFile {
	#[serde(default)]
	pub openai_api_key: Option<String>,
	#[serde(default)]
	pub api_base: Option<String>,
	#[serde(default)]
	pub model: Option<String>,
}

impl ConfigFile {
	pub fn load() -> Result<Option<Self>, ConfigError> {
		Ok(helpers::config_load::<ConfigFile>(APP_NAME, CONFIG_NAME)?)
	}
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeySource {
	Environment,
	ConfigFile,
}

impl fmt::Display for KeySource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			KeySource::Environment => write!(f, "the environment"),
			KeySource::ConfigFile => write!(f, "config.json"),
		}
	}
}

/// How the API key is presented to the endpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AuthScheme {
	/// `Authorization: Bearer <key>`
	Bearer,
	/// `api-key: <key>` (Azure)
	ApiKeyHeader,
}

/// Endpoint and credentials, resolved once at startup.
#[derive(Clone)]
pub struct Settings {
	pub post_url: Url,
	pub api_key: String,
	pub auth: AuthScheme,
	pub key_source: KeySource,
	pub default_model: Option<String>,
}

impl fmt::Debug for Settings {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Settings")
			.field("post_url", &self.post_url.as_str())
			.field("api_key", &"[REDACTED]")
			.field("auth", &self.auth)
			.field("key_source", &self.key_source)
			.field("default_model", &self.default_model)
			.finish()
	}
}

impl Settings {
	/// Reads the process environment and the config file.
	pub fn from_env() -> Result<Self, ConfigError> {
		let file = ConfigFile::load()?;
		Self::resolve(|name| std::env::var(name).ok(), file.as_ref())
	}

	/// Resolves settings from an environment lookup and an optional config
	/// file. Azure variables win when all three are set; otherwise an
	/// OpenAI-compatible endpoint is used with the key taken from
	/// `OPENAI_API_KEY` or, failing that, the config file.
	pub fn resolve<F>(lookup: F, file: Option<&ConfigFile>) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let env = |name: &str| lookup(name).filter(|v| !v.is_empty());
		let default_model = file.and_then(|f| f.model.clone());

		if let (Some(key), Some(base), Some(ver)) = (env("AZURE_API_KEY"), env("AZURE_API_BASE"), env("AZURE_API_VERSION")) {
			info!("Using Azure endpoint from environment");
			let url = format!("{}chat/completions?api-version={}", base, ver);
			return Ok(Settings {
				post_url: parse_url(url)?,
				api_key: key,
				auth: AuthScheme::ApiKeyHeader,
				key_source: KeySource::Environment,
				default_model,
			});
		}

		let (api_key, key_source) = if let Some(key) = env("OPENAI_API_KEY") {
			info!("Using API key from environment variable");
			(key, KeySource::Environment)
		} else if let Some(key) = file.and_then(|f| f.openai_api_key.clone()) {
			warn!("Using API key from config.json (consider using the OPENAI_API_KEY environment variable)");
			(key, KeySource::ConfigFile)
		} else {
			return Err(ConfigError::MissingApiKey);
		};

		if api_key.trim().is_empty() {
			return Err(ConfigError::EmptyApiKey(key_source));
		}
		if api_key == SAMPLE_API_KEY {
			return Err(ConfigError::SampleApiKey(key_source));
		}

		let base = env("OPENAI_API_BASE")
			.or_else(|| file.and_then(|f| f.api_base.clone()))
			.unwrap_or_else(|| DEFAULT_API_BASE.to_string());
		let url = format!("{}/chat/completions", base.trim_end_matches('/'));

		Ok(Settings {
			post_url: parse_url(url)?,
			api_key,
			auth: AuthScheme::Bearer,
			key_source,
			default_model,
		})
	}
}

fn parse_url(url: String) -> Result<Url, ConfigError> {
	Url::parse(&url).map_err(|source| ConfigError::InvalidUrl { url, source })
}
