//! Request types sent to the remote processing endpoint.

use crate::settings::Settings;
use crate::{Error, ErrorContext};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Processing mode understood by the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Simplify,
    Summarize,
    Analyze,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Simplify => "simplify",
            Mode::Summarize => "summarize",
            Mode::Analyze => "analyze",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simplify" => Ok(Mode::Simplify),
            "summarize" => Ok(Mode::Summarize),
            "analyze" => Ok(Mode::Analyze),
            other => Err(Error::validation_with_context(
                format!("unsupported mode '{}'", other),
                ErrorContext::new()
                    .with_field_path("mode")
                    .with_details("expected one of simplify, summarize, analyze"),
            )),
        }
    }
}

/// Options forwarded to the remote service alongside the text.
///
/// Model overrides are omitted from the wire form when unset, so a request
/// without overrides fingerprints the same as one built before they existed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionsBag {
    pub reading_level: String,
    pub bullets: bool,
    pub audience: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simplifier_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summarizer_model: Option<String>,
}

impl OptionsBag {
    pub fn new(reading_level: impl Into<String>, bullets: bool, audience: impl Into<String>) -> Self {
        Self {
            reading_level: reading_level.into(),
            bullets,
            audience: audience.into(),
            simplifier_model: None,
            summarizer_model: None,
        }
    }

    pub fn with_simplifier_model(mut self, model: impl Into<String>) -> Self {
        self.simplifier_model = non_blank(Some(model.into()));
        self
    }

    pub fn with_summarizer_model(mut self, model: impl Into<String>) -> Self {
        self.summarizer_model = non_blank(Some(model.into()));
        self
    }
}

impl From<&Settings> for OptionsBag {
    fn from(settings: &Settings) -> Self {
        Self {
            reading_level: settings.reading_level.clone(),
            bullets: settings.bullets,
            audience: settings.audience.clone(),
            simplifier_model: non_blank(settings.simplifier_model.clone()),
            summarizer_model: non_blank(settings.summarizer_model.clone()),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// An immutable `(mode, text, options)` triple.
///
/// Serializes to the exact JSON body posted to `<endpoint>/process`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessRequest {
    mode: Mode,
    text: String,
    options: OptionsBag,
}

impl ProcessRequest {
    pub fn new(mode: Mode, text: impl Into<String>, options: OptionsBag) -> Self {
        Self {
            mode,
            text: text.into(),
            options,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn options(&self) -> &OptionsBag {
        &self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("Summarize".parse::<Mode>().unwrap(), Mode::Summarize);
        assert_eq!(" analyze ".parse::<Mode>().unwrap(), Mode::Analyze);
        assert!("translate".parse::<Mode>().is_err());
    }

    #[test]
    fn request_body_shape() {
        let req = ProcessRequest::new(
            Mode::Summarize,
            "The quick brown fox...",
            OptionsBag::new("8th grade", true, "general"),
        );
        let body = serde_json::to_value(&req).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "mode": "summarize",
                "text": "The quick brown fox...",
                "options": {"reading_level": "8th grade", "bullets": true, "audience": "general"}
            })
        );
    }

    #[test]
    fn blank_model_overrides_are_dropped() {
        let mut settings = Settings::default();
        settings.simplifier_model = Some("  ".into());
        settings.summarizer_model = Some(" facebook/bart-large-cnn ".into());
        let options = OptionsBag::from(&settings);
        assert_eq!(options.simplifier_model, None);
        assert_eq!(options.summarizer_model.as_deref(), Some("facebook/bart-large-cnn"));
        assert_eq!(options.audience, "general");
    }
}
