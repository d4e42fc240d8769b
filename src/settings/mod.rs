//! 设置模块：用户偏好的默认值、合并与持久化。
//!
//! # Settings Module
//!
//! User preferences (reading level, audience, accessibility toggles, model
//! overrides) stored in a persistent key/value bag and merged over hard-coded
//! defaults on every read.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`Settings`] | Fully resolved preferences |
//! | [`PartialSettings`] | Stored bag / save argument, every field optional |
//! | [`resolve`] | Pure merge of a stored bag over defaults |
//! | [`SettingsStore`] | get/set facade with fallback and change notices |
//! | [`SettingsBackend`] | Trait for persistence backends |
//!
//! Persisted keys use camelCase (`readingLevel`, `ttsRate`, ...), matching the
//! bag the extension UI reads and writes.

mod store;

pub use store::{FileSettings, MemorySettings, SettingsBackend, SettingsStore};

use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_TTS_RATE: f64 = 0.95;

/// Color-vision simulation filter applied to the page.
///
/// Unrecognised stored values are kept verbatim so the bag round-trips.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ColorBlindnessMode {
    None,
    Deuteranopia,
    Protanopia,
    Tritanopia,
    Other(String),
}

impl ColorBlindnessMode {
    pub fn as_str(&self) -> &str {
        match self {
            ColorBlindnessMode::None => "none",
            ColorBlindnessMode::Deuteranopia => "deuteranopia",
            ColorBlindnessMode::Protanopia => "protanopia",
            ColorBlindnessMode::Tritanopia => "tritanopia",
            ColorBlindnessMode::Other(s) => s,
        }
    }
}

impl Default for ColorBlindnessMode {
    fn default() -> Self {
        ColorBlindnessMode::None
    }
}

impl From<String> for ColorBlindnessMode {
    fn from(s: String) -> Self {
        match s.as_str() {
            "" | "none" => ColorBlindnessMode::None,
            "deuteranopia" => ColorBlindnessMode::Deuteranopia,
            "protanopia" => ColorBlindnessMode::Protanopia,
            "tritanopia" => ColorBlindnessMode::Tritanopia,
            _ => ColorBlindnessMode::Other(s),
        }
    }
}

impl From<ColorBlindnessMode> for String {
    fn from(mode: ColorBlindnessMode) -> Self {
        mode.as_str().to_string()
    }
}

impl fmt::Display for ColorBlindnessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fully resolved user preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub reading_level: String,
    pub audience: String,
    pub bullets: bool,
    pub dyslexia: bool,
    pub high_contrast: bool,
    pub spacing: bool,
    pub tts_rate: f64,
    pub focus_mask: bool,
    pub distraction_reducer: bool,
    pub color_blindness_mode: ColorBlindnessMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simplifier_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summarizer_model: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            reading_level: "8th grade".to_string(),
            audience: "general".to_string(),
            bullets: true,
            dyslexia: true,
            high_contrast: true,
            spacing: true,
            tts_rate: DEFAULT_TTS_RATE,
            focus_mask: true,
            distraction_reducer: false,
            color_blindness_mode: ColorBlindnessMode::None,
            simplifier_model: None,
            summarizer_model: None,
        }
    }
}

/// The stored settings bag; also the argument to [`SettingsStore::set`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reading_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bullets: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dyslexia: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_contrast: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spacing: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tts_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus_mask: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distraction_reducer: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_blindness_mode: Option<ColorBlindnessMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simplifier_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summarizer_model: Option<String>,
}

impl PartialSettings {
    /// Overlay `other` onto `self`; fields set in `other` win.
    pub fn merge(&mut self, other: PartialSettings) {
        macro_rules! overlay {
            ($($field:ident),* $(,)?) => {
                $(if other.$field.is_some() { self.$field = other.$field; })*
            };
        }
        overlay!(
            reading_level,
            audience,
            bullets,
            dyslexia,
            high_contrast,
            spacing,
            tts_rate,
            focus_mask,
            distraction_reducer,
            color_blindness_mode,
            simplifier_model,
            summarizer_model,
        );
    }

    /// Set one field from its persisted key and a free-form value.
    ///
    /// Booleans accept `true/false/1/0/on/off/yes/no`. `ttsRate` goes through
    /// [`parse_tts_rate`] and is not range-checked.
    pub fn apply_pair(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "readingLevel" => self.reading_level = Some(value.to_string()),
            "audience" => {
                let v = value.trim();
                self.audience = Some(if v.is_empty() { "general" } else { v }.to_string());
            }
            "bullets" => self.bullets = Some(parse_bool(key, value)?),
            "dyslexia" => self.dyslexia = Some(parse_bool(key, value)?),
            "highContrast" => self.high_contrast = Some(parse_bool(key, value)?),
            "spacing" => self.spacing = Some(parse_bool(key, value)?),
            "ttsRate" => self.tts_rate = Some(parse_tts_rate(value)),
            "focusMask" => self.focus_mask = Some(parse_bool(key, value)?),
            "distractionReducer" => self.distraction_reducer = Some(parse_bool(key, value)?),
            "colorBlindnessMode" => {
                self.color_blindness_mode = Some(ColorBlindnessMode::from(value.trim().to_string()))
            }
            "simplifierModel" => self.simplifier_model = Some(value.trim().to_string()),
            "summarizerModel" => self.summarizer_model = Some(value.trim().to_string()),
            other => {
                return Err(Error::validation_with_context(
                    format!("unknown settings key '{}'", other),
                    ErrorContext::new().with_field_path(other).with_source("settings"),
                ))
            }
        }
        Ok(())
    }
}

impl From<Settings> for PartialSettings {
    fn from(s: Settings) -> Self {
        Self {
            reading_level: Some(s.reading_level),
            audience: Some(s.audience),
            bullets: Some(s.bullets),
            dyslexia: Some(s.dyslexia),
            high_contrast: Some(s.high_contrast),
            spacing: Some(s.spacing),
            tts_rate: Some(s.tts_rate),
            focus_mask: Some(s.focus_mask),
            distraction_reducer: Some(s.distraction_reducer),
            color_blindness_mode: Some(s.color_blindness_mode),
            simplifier_model: s.simplifier_model,
            summarizer_model: s.summarizer_model,
        }
    }
}

/// Merge a stored bag over defaults, field by field.
pub fn resolve(stored: &PartialSettings, defaults: &Settings) -> Settings {
    Settings {
        reading_level: stored
            .reading_level
            .clone()
            .unwrap_or_else(|| defaults.reading_level.clone()),
        audience: stored
            .audience
            .clone()
            .unwrap_or_else(|| defaults.audience.clone()),
        bullets: stored.bullets.unwrap_or(defaults.bullets),
        dyslexia: stored.dyslexia.unwrap_or(defaults.dyslexia),
        high_contrast: stored.high_contrast.unwrap_or(defaults.high_contrast),
        spacing: stored.spacing.unwrap_or(defaults.spacing),
        tts_rate: stored.tts_rate.unwrap_or(defaults.tts_rate),
        focus_mask: stored.focus_mask.unwrap_or(defaults.focus_mask),
        distraction_reducer: stored
            .distraction_reducer
            .unwrap_or(defaults.distraction_reducer),
        color_blindness_mode: stored
            .color_blindness_mode
            .clone()
            .unwrap_or_else(|| defaults.color_blindness_mode.clone()),
        simplifier_model: stored
            .simplifier_model
            .clone()
            .or_else(|| defaults.simplifier_model.clone()),
        summarizer_model: stored
            .summarizer_model
            .clone()
            .or_else(|| defaults.summarizer_model.clone()),
    }
}

/// Parse a speech rate typed by the user.
///
/// Blank input means the default rate; anything unparsable becomes `NaN`.
/// Note that `NaN` persists as JSON `null` and so reads back as the default.
pub fn parse_tts_rate(input: &str) -> f64 {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return DEFAULT_TTS_RATE;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Ok(true),
        "false" | "0" | "off" | "no" | "" => Ok(false),
        other => Err(Error::validation_with_context(
            format!("'{}' is not a boolean", other),
            ErrorContext::new().with_field_path(key).with_source("settings"),
        )),
    }
}

/// Page-level effects that must be re-applied when their setting is saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsNotice {
    DistractionReducer { enabled: bool },
    ColorBlindnessMode { mode: ColorBlindnessMode },
}

impl SettingsNotice {
    /// Notices implied by saving `partial`.
    pub fn for_saved(partial: &PartialSettings) -> Vec<SettingsNotice> {
        let mut notices = Vec::new();
        if let Some(enabled) = partial.distraction_reducer {
            notices.push(SettingsNotice::DistractionReducer { enabled });
        }
        if let Some(mode) = &partial.color_blindness_mode {
            notices.push(SettingsNotice::ColorBlindnessMode { mode: mode.clone() });
        }
        notices
    }
}
