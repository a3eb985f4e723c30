//! # Items
//! Analyzed news items as produced by the external analysis pipeline.
//!
//! Records coming off the wire are tolerant: missing or unknown sentiment
//! reads as neutral, a missing credibility score reads as 0.5, and a missing
//! fake flag reads as false. Everything downstream works on the resolved
//! values and never sees an absent field.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Credibility below this score marks an item suspicious (0.6 itself is verified).
pub const SUSPICIOUS_BELOW: f64 = 0.6;
pub const DEFAULT_CREDIBILITY: f64 = 0.5;
pub const DEFAULT_CATEGORY: &str = "general";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    #[default]
    Neutral,
    Negative,
}

impl Sentiment {
    /// Case-insensitive label parse; anything unrecognized is neutral.
    pub fn from_label(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" => Sentiment::Positive,
            "negative" => Sentiment::Negative,
            _ => Sentiment::Neutral,
        }
    }
}

impl<'de> Deserialize<'de> for Sentiment {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        Ok(raw.as_deref().map(Sentiment::from_label).unwrap_or_default())
    }
}

/// Derived credibility bucket, see [`Item::credibility`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Credibility {
    Verified,
    Suspicious,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, rename = "content_summary", alias = "summary")]
    pub summary: String,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub source_domain: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub source_url: Option<String>,
    #[serde(default)]
    pub sentiment: Sentiment,
    #[serde(default = "default_credibility", deserialize_with = "de_credibility")]
    pub credibility_score: f64,
    #[serde(default, deserialize_with = "de_bool_or_null")]
    pub is_fake: bool,
    #[serde(default = "default_category", deserialize_with = "de_category")]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_reasoning: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Item {
    /// Minimal constructor; optional fields take their documented defaults.
    pub fn new(id: impl Into<String>, title: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            summary: String::new(),
            source_domain: None,
            source_url: None,
            sentiment: Sentiment::Neutral,
            credibility_score: DEFAULT_CREDIBILITY,
            is_fake: false,
            category: DEFAULT_CATEGORY.to_string(),
            ai_reasoning: None,
            published_at: None,
            created_at,
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = normalize_category(category);
        self
    }

    pub fn with_sentiment(mut self, sentiment: Sentiment) -> Self {
        self.sentiment = sentiment;
        self
    }

    pub fn with_credibility(mut self, score: f64, is_fake: bool) -> Self {
        self.credibility_score = clamp01(score);
        self.is_fake = is_fake;
        self
    }

    pub fn with_source(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    /// Suspicious iff flagged fake or scored below 0.6.
    pub fn is_suspicious(&self) -> bool {
        self.is_fake || self.credibility_score < SUSPICIOUS_BELOW
    }

    pub fn credibility(&self) -> Credibility {
        if self.is_suspicious() {
            Credibility::Suspicious
        } else {
            Credibility::Verified
        }
    }

    /// Provenance label: explicit domain, else the host of `source_url`, else "unknown".
    pub fn display_domain(&self) -> String {
        if let Some(d) = self.source_domain.as_deref().filter(|d| !d.trim().is_empty()) {
            return d.trim().to_string();
        }
        self.source_url
            .as_deref()
            .and_then(|u| reqwest::Url::parse(u).ok())
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// Case-insensitive substring match on title or summary. `needle_lower`
    /// must already be lowercased; empty matches everything.
    pub(crate) fn matches_query(&self, needle_lower: &str) -> bool {
        needle_lower.is_empty()
            || self.title.to_lowercase().contains(needle_lower)
            || self.summary.to_lowercase().contains(needle_lower)
    }
}

pub(crate) fn normalize_category(s: &str) -> String {
    s.trim().to_lowercase()
}

fn clamp01(x: f64) -> f64 {
    if x.is_nan() {
        DEFAULT_CREDIBILITY
    } else {
        x.clamp(0.0, 1.0)
    }
}

fn default_credibility() -> f64 {
    DEFAULT_CREDIBILITY
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

fn de_id<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    // Upstream stores use either text or integer keys.
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
    }
    Ok(match Raw::deserialize(d)? {
        Raw::Text(s) => s,
        Raw::Int(n) => n.to_string(),
    })
}

fn de_opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let raw: Option<String> = Option::deserialize(d)?;
    Ok(raw.filter(|s| !s.trim().is_empty()))
}

fn de_credibility<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    let raw: Option<f64> = Option::deserialize(d)?;
    Ok(raw.map(clamp01).unwrap_or(DEFAULT_CREDIBILITY))
}

fn de_bool_or_null<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    let raw: Option<bool> = Option::deserialize(d)?;
    Ok(raw.unwrap_or(false))
}

fn de_category<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let raw: Option<String> = Option::deserialize(d)?;
    Ok(raw
        .map(|c| normalize_category(&c))
        .filter(|c| !c.is_empty())
        .unwrap_or_else(default_category))
}
