//! Placeholder substitution for prompt templates.
//!
//! A placeholder is `{` followed by one or more characters other than `}` and
//! a closing `}`, e.g. `{name}` or `{display.type}`. The text between the
//! braces is a dotted path into the product record. `{}` and an unterminated
//! `{` are kept as literal text. There is no escape syntax, so a literal brace
//! pair in a template (a JSON snippet, say) is read as a placeholder.

use std::ops::Range;

use serde_json::Value;
use tracing::warn;

/// Result of looking up a dotted path in a record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolved<'a> {
	Found(&'a Value),
	NotFound,
}

impl<'a> Resolved<'a> {
	pub fn is_found(&self) -> bool {
		matches!(self, Resolved::Found(_))
	}
}

/// Walks `record` one `.`-separated segment at a time. Every step has to land
/// on a mapping holding the next segment, otherwise the whole path is
/// `NotFound`. Lists are not indexed.
pub fn resolve<'a>(record: &'a Value, path: &str) -> Resolved<'a> {
	let mut current = record;
	for segment in path.split('.') {
		match current.as_object().and_then(|map| map.get(segment)) {
			Some(next) => current = next,
			None => return Resolved::NotFound,
		}
	}
	Resolved::Found(current)
}

/// Renders a lookup result as prompt text. Missing values and `null` render
/// as the empty string.
pub fn format_value(resolved: Resolved<'_>) -> String {
	match resolved {
		Resolved::Found(value) => format_found(value),
		Resolved::NotFound => String::new(),
	}
}

fn format_found(value: &Value) -> String {
	match value {
		Value::Null => String::new(),
		Value::String(s) => s.clone(),
		Value::Number(n) => n.to_string(),
		Value::Bool(b) => b.to_string(),
		Value::Array(items) if items.iter().all(is_plain_scalar) => {
			items.iter().map(format_found).collect::<Vec<_>>().join(", ")
		}
		// compact JSON
		Value::Array(_) | Value::Object(_) => value.to_string(),
	}
}

fn is_plain_scalar(value: &Value) -> bool {
	matches!(value, Value::String(_) | Value::Number(_))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Placeholder<'t> {
	pub path: &'t str,
	/// Byte range of the whole token, braces included.
	pub span: Range<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
	Normal,
	InPath { open: usize },
}

/// Every placeholder in `template`, in order of occurrence. Repeated paths are
/// listed once per occurrence.
pub fn placeholders(template: &str) -> Vec<Placeholder<'_>> {
	let mut found = Vec::new();
	let mut state = State::Normal;

	for (idx, ch) in template.char_indices() {
		match (state, ch) {
			(State::Normal, '{') => {
				state = State::InPath { open: idx };
			}
			(State::InPath { open }, '}') => {
				// `{}` has no path and stays literal
				if idx > open + 1 {
					found.push(Placeholder {
						path: &template[open + 1..idx],
						span: open..idx + 1,
					});
				}
				state = State::Normal;
			}
			_ => {}
		}
	}

	found
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Expansion {
	pub text: String,
	/// Paths that resolved to nothing, each listed once in order of first
	/// occurrence.
	pub unresolved: Vec<String>,
}

impl Expansion {
	pub fn is_complete(&self) -> bool {
		self.unresolved.is_empty()
	}
}

/// Substitutes every placeholder of `template` with its value from `record`.
///
/// Substitution is positional: only the placeholder tokens themselves are
/// rewritten, so text elsewhere that happens to equal a placeholder is left
/// alone. Every occurrence of an unresolved placeholder becomes the empty
/// string, but each missing path is logged and collected in
/// [`Expansion::unresolved`] only once, on its first occurrence.
pub fn expand(template: &str, record: &Value) -> Expansion {
	let mut text = String::with_capacity(template.len());
	let mut unresolved: Vec<String> = Vec::new();
	let mut cursor = 0;

	for placeholder in placeholders(template) {
		text.push_str(&template[cursor..placeholder.span.start]);

		let resolved = resolve(record, placeholder.path);
		text.push_str(&format_value(resolved));

		if !resolved.is_found() && !unresolved.iter().any(|p| p == placeholder.path) {
			warn!(placeholder = placeholder.path, "placeholder not found in product data");
			unresolved.push(placeholder.path.to_string());
		}

		cursor = placeholder.span.end;
	}

	text.push_str(&template[cursor..]);
	Expansion { text, unresolved }
}
