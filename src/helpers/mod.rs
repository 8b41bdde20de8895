#![allow(dead_code)]

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::env;
use std::string;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
pub enum HelperError {
	#[error("IO error: {0}")]
	Io(#[from] io::Error),
	#[error("Serde error: {0}")]
	Serde(#[from] serde_json::Error),
	#[error("FromUtf8 error: {0}")]
	FromUtf8Error(#[from] string::FromUtf8Error),
	#[error("Product file '{0}' not found")]
	ProductNotFound(PathBuf),
	#[error("Invalid JSON in '{path}': {source}")]
	InvalidProduct { path: PathBuf, source: serde_json::Error },
	#[error("Product file contains an empty list")]
	EmptyProductList,
	#[error("Template file '{path}' not found (templates are looked up in {dir})")]
	TemplateNotFound { path: PathBuf, dir: PathBuf },
	#[error("Other Error {0}")]
	FromString(String),
}

impl HelperError {
	pub fn msg<M: Into<String>>(msg: M) -> Self {
		HelperError::FromString(msg.into())
	}
}

/// Log to stderr at `info` unless `RUST_LOG` says otherwise, keeping stdout
/// for generated content.
pub fn init_logging() {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(io::stderr)
		.with_target(false)
		.init();
}

pub fn config_get_dir(name: Option<&str>) -> Result<PathBuf, io::Error> {
	let mut pb = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
		PathBuf::from(config_home)
	} else if let Ok(home) = env::var("HOME") {
		let mut config_home = PathBuf::from(home);
		config_home.push(".config");
		config_home
	} else {
		return Err(io::Error::new(io::ErrorKind::Other, "XDG_CONFIG_HOME or HOME not found"));
	};
	if let Some(app_name) = name {
		pb.push(app_name);
	}
	debug!(dir = %pb.display(), "config directory");
	Ok(pb)
}

/// Loads `<config dir>/<app_name>/<config_name>.json`. A missing file is not
/// an error and yields `None`, as does having no config directory at all.
pub fn config_load<T: DeserializeOwned>(app_name: &str, config_name: &str) -> Result<Option<T>, HelperError> {
	let mut config_file = match config_get_dir(Some(app_name)) {
		Ok(dir) => dir,
		Err(err) => {
			debug!("no config directory: {}", err);
			return Ok(None);
		},
	};
	config_file.push(config_name.to_string() + ".json");
	if !config_file.exists() {
		return Ok(None);
	}
	read_from_json(&config_file).map(Some)
}

pub fn read_from_json<T: DeserializeOwned>(file_path: impl AsRef<Path>) -> Result<T, HelperError> {
	let mut file = File::open(file_path.as_ref())?;
	let mut content = String::new();
	file.read_to_string(&mut content)?;
	let parsed_json: T = serde_json::from_str(&content)?;
	Ok(parsed_json)
}

pub fn save_to_json<T: Serialize>(file_path: impl AsRef<Path>, object: &T) -> Result<(), HelperError> {
	let serialised = serde_json::to_string_pretty(&object)?;
	let mut file = OpenOptions::new()
		.write(true)
		.create(true)
		.truncate(true)
		.open(file_path.as_ref())?;
	writeln!(file, "{}", &serialised)?;
	Ok(())
}

const MAX_READ_BYTES: usize = 1_048_576;

pub trait FromInputBytes: Sized {
	fn from_bytes(bytes: Vec<u8>) -> Result<Self, HelperError>;
}

impl FromInputBytes for Vec<u8> {
	fn from_bytes(bytes: Vec<u8>) -> Result<Self, HelperError> {
		Ok(bytes)
	}
}

impl FromInputBytes for String {
	fn from_bytes(bytes: Vec<u8>) -> Result<Self, HelperError> {
		Ok(String::from_utf8(bytes)?)
	}
}

pub fn read_stdin<T>() -> Result<T, HelperError>
where
	T: FromInputBytes,
{
	read_bounded(io::stdin())
}

pub(crate) fn read_bounded<T, R>(mut reader: R) -> Result<T, HelperError>
where
	T: FromInputBytes,
	R: Read,
{
	let mut buffer = Vec::new();
	reader.by_ref().take(MAX_READ_BYTES as u64).read_to_end(&mut buffer)?;

	if buffer.len() == MAX_READ_BYTES {
		let mut extra = [0u8; 1];
		if reader.read(&mut extra)? != 0 {
			return Err(HelperError::msg("Input too large"));
		}
	}

	T::from_bytes(buffer)
}

/// Picks the product to work on from parsed product JSON: the first element
/// of an array, or the value itself.
pub fn select_product(data: Value) -> Result<Value, HelperError> {
	match data {
		Value::Array(items) => {
			let count = items.len();
			let first = items.into_iter().next().ok_or(HelperError::EmptyProductList)?;
			if count > 1 {
				info!("Found {} products. Processing the first one...", count);
			}
			Ok(first)
		},
		other => Ok(other),
	}
}

/// Reads product JSON from `path`, or from stdin when `path` is `-`.
pub fn load_product(path: &Path) -> Result<Value, HelperError> {
	let content: String = if path == Path::new("-") {
		read_stdin()?
	} else {
		match fs::read_to_string(path) {
			Ok(content) => content,
			Err(err) if err.kind() == io::ErrorKind::NotFound => {
				return Err(HelperError::ProductNotFound(path.to_path_buf()));
			},
			Err(err) => return Err(err.into()),
		}
	};
	let data: Value = serde_json::from_str(&content)
		.map_err(|source| HelperError::InvalidProduct { path: path.to_path_buf(), source })?;
	info!("Successfully loaded product data from {}", path.display());
	select_product(data)
}

pub fn template_path(templates_dir: &Path, name: &str) -> PathBuf {
	templates_dir.join(format!("{}.txt", name))
}

pub fn load_template(templates_dir: &Path, name: &str) -> Result<String, HelperError> {
	let path = template_path(templates_dir, name);
	match fs::read_to_string(&path) {
		Ok(content) => {
			info!("Successfully loaded template '{}'", name);
			Ok(content)
		},
		Err(err) if err.kind() == io::ErrorKind::NotFound => {
			Err(HelperError::TemplateNotFound { path, dir: templates_dir.to_path_buf() })
		},
		Err(err) => Err(err.into()),
	}
}

/// Writes generated content to `path`, creating parent directories first.
pub fn save_output(path: &Path, content: &str) -> Result<(), HelperError> {
	if let Some(parent) = path.parent() {
		if !parent.as_os_str().is_empty() {
			fs::create_dir_all(parent)?;
		}
	}
	fs::write(path, content)?;
	Ok(())
}

/// Display name of a product for progress output.
pub fn product_name(product: &Value) -> &str {
	product.get("name").and_then(Value::as_str).unwrap_or("Unknown Product")
}

