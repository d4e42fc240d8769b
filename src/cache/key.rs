//! Cache key generation.

use crate::types::{Mode, OptionsBag, ProcessRequest};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of a request's canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey {
    pub hash: String,
}

impl CacheKey {
    pub fn new(hash: impl Into<String>) -> Self {
        Self { hash: hash.into() }
    }
    pub fn as_str(&self) -> &str {
        &self.hash
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.hash)
    }
}

impl From<&str> for CacheKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
impl From<String> for CacheKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Fingerprints requests.
///
/// Object keys are sorted at every depth before hashing, so two option bags
/// with equal fields hash equally no matter how they were assembled.
/// The key depends on nothing but the request.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheKeyGenerator;

impl CacheKeyGenerator {
    pub fn new() -> Self {
        Self
    }

    pub fn generate(&self, request: &ProcessRequest) -> CacheKey {
        let doc = serde_json::json!({
            "mode": request.mode(),
            "text": request.text(),
            "options": request.options(),
        });
        self.generate_from_json(&doc)
    }

    pub fn generate_parts(&self, mode: Mode, text: &str, options: &OptionsBag) -> CacheKey {
        self.generate(&ProcessRequest::new(mode, text, options.clone()))
    }

    /// Hash an arbitrary JSON document in canonical form.
    pub fn generate_from_json(&self, doc: &Value) -> CacheKey {
        let mut canonical = String::new();
        write_canonical(doc, &mut canonical);
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        let hash: String = hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect();
        CacheKey::new(hash)
    }
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (k, v)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(k.clone()).to_string());
                out.push(':');
                write_canonical(v, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, v) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(v, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ProcessRequest {
        ProcessRequest::new(
            Mode::Summarize,
            "The quick brown fox...",
            OptionsBag::new("8th grade", true, "general"),
        )
    }

    #[test]
    fn key_is_deterministic_hex() {
        let gen = CacheKeyGenerator::new();
        let a = gen.generate(&sample());
        let b = gen.generate(&sample());
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn field_order_does_not_matter() {
        let gen = CacheKeyGenerator::new();
        let forward: Value = serde_json::from_str(
            r#"{"mode":"simplify","text":"hi","options":{"reading_level":"5th grade","bullets":false,"audience":"kids"}}"#,
        )
        .unwrap();
        let reversed: Value = serde_json::from_str(
            r#"{"options":{"audience":"kids","bullets":false,"reading_level":"5th grade"},"text":"hi","mode":"simplify"}"#,
        )
        .unwrap();
        assert_eq!(gen.generate_from_json(&forward), gen.generate_from_json(&reversed));

        let typed = ProcessRequest::new(
            Mode::Simplify,
            "hi",
            OptionsBag::new("5th grade", false, "kids"),
        );
        assert_eq!(gen.generate(&typed), gen.generate_from_json(&forward));
    }

    #[test]
    fn any_semantic_change_changes_key() {
        let gen = CacheKeyGenerator::new();
        let base = gen.generate(&sample());
        let other_mode = gen.generate_parts(Mode::Simplify, "The quick brown fox...", sample().options());
        let other_text = gen.generate_parts(Mode::Summarize, "The quick brown fox", sample().options());
        let other_opts = gen.generate_parts(
            Mode::Summarize,
            "The quick brown fox...",
            &OptionsBag::new("8th grade", false, "general"),
        );
        let with_model = gen.generate_parts(
            Mode::Summarize,
            "The quick brown fox...",
            &OptionsBag::new("8th grade", true, "general").with_summarizer_model("t5-base"),
        );
        for k in [other_mode, other_text, other_opts, with_model] {
            assert_ne!(base, k);
        }
    }
}
