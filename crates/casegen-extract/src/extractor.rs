//! Structured-response extractor
//!
//! Turns raw generator text into a [`StructuredValue`]:
//!
//! 1. strip a fenced code block if one is present
//! 2. pick the first top-level balanced array, else the first top-level
//!    balanced object
//! 3. parse strictly; on failure double every backslash that does not start
//!    a legal JSON escape and parse once more
//!
//! Arrays win over objects because generators routinely wrap the list they
//! were asked for in prose that also contains `{}`-shaped schema examples.
//! An array nested inside an object is not top-level, so a rendered object
//! is still extracted whole.

use crate::error::ExtractionError;
use crate::value::StructuredValue;
use once_cell::sync::Lazy;
use regex::Regex;

static FENCED_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```[A-Za-z0-9_+-]*[ \t]*\r?\n(.*?)```")
        .expect("regex to match a fenced code block with optional language tag")
});

static OPEN_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```[A-Za-z0-9_+-]*[ \t]*\r?\n(.*)")
        .expect("regex to match an unterminated fenced code block")
});

/// Characters that may legally follow a backslash in a JSON string
const LEGAL_ESCAPES: &[u8] = b"\"\\/bfnrt";

/// Kind of literal selected as the parse candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    /// `[...]`
    Array,
    /// `{...}`
    Object,
}

/// Stateless extractor
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuredExtractor;

impl StructuredExtractor {
    /// Create new extractor
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Extract a structured value from raw generator text
    ///
    /// # Errors
    /// - `ExtractionError::NoStructureFound` if no balanced literal exists
    /// - `ExtractionError::UnparsableStructure` if the candidate fails to
    ///   parse both before and after escape repair
    pub fn extract(&self, text: &str) -> Result<StructuredValue, ExtractionError> {
        let body = strip_code_fence(text);

        let Some((kind, candidate)) = find_candidate(body) else {
            tracing::debug!(len = text.len(), "no structure found in generator output");
            return Err(ExtractionError::no_structure(text));
        };

        match serde_json::from_str::<serde_json::Value>(candidate) {
            Ok(value) => return to_structured(value, text, candidate, candidate),
            Err(e) => {
                tracing::debug!(?kind, error = %e, "strict parse failed, repairing escapes");
            }
        }

        let repaired = repair_escapes(candidate);
        match serde_json::from_str::<serde_json::Value>(&repaired) {
            Ok(value) => to_structured(value, text, candidate, &repaired),
            Err(e) => {
                tracing::warn!(?kind, error = %e, "parse failed after escape repair");
                Err(ExtractionError::UnparsableStructure {
                    original: text.to_string(),
                    candidate: candidate.to_string(),
                    repaired,
                    message: e.to_string(),
                })
            }
        }
    }
}

/// Extract with the default extractor
///
/// # Errors
/// See [`StructuredExtractor::extract`].
#[inline]
pub fn extract(text: &str) -> Result<StructuredValue, ExtractionError> {
    StructuredExtractor::new().extract(text)
}

fn to_structured(
    value: serde_json::Value,
    original: &str,
    candidate: &str,
    repaired: &str,
) -> Result<StructuredValue, ExtractionError> {
    // Candidates always start with `[` or `{`, so this only trips on a parser bug.
    StructuredValue::from_value(value).ok_or_else(|| ExtractionError::UnparsableStructure {
        original: original.to_string(),
        candidate: candidate.to_string(),
        repaired: repaired.to_string(),
        message: "candidate parsed to a scalar".to_string(),
    })
}

/// Return the body of the first fenced code block, or the whole text.
///
/// An opening fence without a closing one yields everything after the
/// opening marker line.
#[must_use]
pub fn strip_code_fence(text: &str) -> &str {
    if let Some(body) = FENCED_BLOCK.captures(text).and_then(|c| c.get(1)) {
        return body.as_str().trim();
    }
    if let Some(body) = OPEN_FENCE.captures(text).and_then(|c| c.get(1)) {
        return body.as_str().trim();
    }
    text
}

/// Find the parse candidate: the first top-level balanced array, or failing
/// that the first top-level balanced object.
#[must_use]
pub fn find_candidate(text: &str) -> Option<(CandidateKind, &str)> {
    let bytes = text.as_bytes();
    let mut first_object: Option<&str> = None;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if b == b'[' || b == b'{' {
            if let Some(end) = balanced_end(bytes, i) {
                let literal = &text[i..=end];
                if b == b'[' {
                    return Some((CandidateKind::Array, literal));
                }
                if first_object.is_none() {
                    first_object = Some(literal);
                }
                // Skip the object body so arrays nested inside it are not top-level.
                i = end + 1;
                continue;
            }
        }
        i += 1;
    }

    first_object.map(|literal| (CandidateKind::Object, literal))
}

/// Index of the bracket closing the literal opened at `start`.
///
/// Brackets inside string literals are ignored; a mismatched closer means
/// the literal is not balanced.
fn balanced_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut stack: Vec<u8> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }

        match b {
            b'"' => in_string = true,
            b'[' => stack.push(b']'),
            b'{' => stack.push(b'}'),
            b']' | b'}' => {
                if stack.pop() != Some(b) {
                    return None;
                }
                if stack.is_empty() {
                    return Some(start + offset);
                }
            }
            _ => {}
        }
    }

    None
}

/// Double every backslash that does not begin a legal JSON escape.
///
/// Legal escapes (`\"`, `\\`, `\/`, `\b`, `\f`, `\n`, `\r`, `\t`, and `\u`
/// followed by four hex digits) are copied through untouched, so the output
/// differs from the input only by inserted backslashes.
#[must_use]
pub fn repair_escapes(candidate: &str) -> String {
    let bytes = candidate.as_bytes();
    let mut out = String::with_capacity(candidate.len() + 8);
    let mut last = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'\\' {
            i += 1;
            continue;
        }

        let next = bytes.get(i + 1).copied();
        let legal = match next {
            Some(b'u') => bytes
                .get(i + 2..i + 6)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit)),
            Some(c) => LEGAL_ESCAPES.contains(&c),
            None => false,
        };

        if legal {
            i += 2;
        } else {
            out.push_str(&candidate[last..=i]);
            out.push('\\');
            i += 1;
            last = i;
        }
    }

    out.push_str(&candidate[last..]);
    out
}
