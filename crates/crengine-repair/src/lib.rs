//! Text repair (`spec.md` §4.4): recovering a usable shape from a blob of
//! text that may be wrapped in prose or markdown fences, or mildly
//! malformed JSON, as LLM output tends to be.
//!
//! Two shapes are recovered:
//! - [`recover_json_shape`] — the `{ "target": …, "code": … }` object used
//!   in the *json* phase.
//! - [`recover_markdown_shape`] — a code body that, after fence and prose
//!   stripping, begins with a valid package header, used in the
//!   *integration* phase.
//!
//! Both funnel through [`parse_object`], the four-strategy ordered chain
//! matching `creator.JsonEngine`: strict parse, brace-carving, trailing-
//! comma removal, then an aggressive comma-insertion + quote-normalization
//! pass. The first strategy that yields an object carrying the required
//! `target` key wins; later strategies are never tried once one succeeds.

use crengine_error::{CrError, CrResult};
use crengine_header::detect_kind;
use crengine_types::HeaderKind;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static JSON_BLOCK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").expect("static regex"));
static TRAILING_COMMA_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r",\s*([\}\]])").expect("static regex"));
static MISSING_COMMA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(["\]\}])\s*\n\s*(["\[\{])"#).expect("static regex"));
static FENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```[a-zA-Z0-9]*\n(.*?)```").expect("static regex"));

fn is_target_object(value: &Value) -> bool {
    value.as_object().map(|o| o.contains_key("target")).unwrap_or(false)
}

fn strategy_strict_parse(s: &str) -> Option<Value> {
    serde_json::from_str(s).ok().filter(is_target_object)
}

fn strategy_find_json_block(s: &str) -> Option<Value> {
    let m = JSON_BLOCK_RE.find(s)?;
    strategy_strict_parse(m.as_str())
}

fn strategy_fix_trailing_commas(s: &str) -> Option<Value> {
    let cleaned = TRAILING_COMMA_RE.replace_all(s, "$1");
    if cleaned != s {
        parse_object(&cleaned)
    } else {
        None
    }
}

fn strategy_fix_quotes_and_commas(s: &str) -> Option<Value> {
    let with_commas = MISSING_COMMA_RE.replace_all(s, "$1,\n$2");
    let with_quotes = with_commas.replace('\'', "\"");
    strategy_strict_parse(&with_quotes)
}

/// Runs the four-strategy recovery chain; returns the first object result
/// carrying a `target` key.
pub fn parse_object(blob: &str) -> Option<Value> {
    strategy_strict_parse(blob)
        .or_else(|| strategy_find_json_block(blob))
        .or_else(|| strategy_fix_trailing_commas(blob))
        .or_else(|| strategy_fix_quotes_and_commas(blob))
}

/// The parsed `{ "target": …, "code": … }` JSON-phase shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonShape {
    pub target: String,
    pub code: String,
}

/// Recovers the JSON-phase shape, failing non-fatally with
/// [`CrError::RepairFailed`] if no strategy produces a usable object.
pub fn recover_json_shape(blob: &str) -> CrResult<JsonShape> {
    let value = parse_object(blob).ok_or(CrError::RepairFailed { shape: "json" })?;
    let target = value
        .get("target")
        .and_then(Value::as_str)
        .ok_or(CrError::RepairFailed { shape: "json" })?
        .to_string();
    let code = value.get("code").and_then(Value::as_str).unwrap_or_default().to_string();
    Ok(JsonShape { target, code })
}

fn strip_fence(blob: &str) -> String {
    FENCE_RE
        .captures(blob)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| blob.to_string())
}

fn strip_prose_before_header(text: &str) -> Option<String> {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.iter().position(|line| detect_kind(line) == Some(HeaderKind::Package))?;
    Some(lines[start..].join("\n"))
}

/// Recovers the markdown-phase shape: strips triple-backtick fences and any
/// prose before the first package header, then requires the remainder to
/// actually begin with one. This shape is specific to the *integration*
/// phase, which consumes markdown-fenced code rather than raw JSON.
pub fn recover_markdown_shape(blob: &str) -> CrResult<String> {
    let unfenced = strip_fence(blob);
    strip_prose_before_header(&unfenced).ok_or(CrError::RepairFailed { shape: "markdown" })
}
