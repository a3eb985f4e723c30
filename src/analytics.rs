//! # Analytics
//! Sentiment and credibility distributions over a loaded window.
//!
//! Pure reducer: no state, no caching. Callers recompute on every window
//! change; the input is bounded by the pages loaded so far.

use serde::Serialize;

use crate::item::{Credibility, Item, Sentiment};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SentimentCounts {
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
}

impl SentimentCounts {
    pub fn total(&self) -> usize {
        self.positive + self.neutral + self.negative
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CredibilityCounts {
    pub verified: usize,
    pub suspicious: usize,
}

impl CredibilityCounts {
    pub fn total(&self) -> usize {
        self.verified + self.suspicious
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AnalyticsSummary {
    pub sentiment: SentimentCounts,
    pub credibility: CredibilityCounts,
    pub total: usize,
}

impl AnalyticsSummary {
    /// Share of verified items, 0.0 for an empty window.
    pub fn verified_ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.credibility.verified as f64 / self.total as f64
        }
    }
}

/// Every item lands in exactly one sentiment and one credibility bucket.
pub fn summarize(items: &[Item]) -> AnalyticsSummary {
    items.iter().fold(AnalyticsSummary::default(), |mut acc, it| {
        match it.sentiment {
            Sentiment::Positive => acc.sentiment.positive += 1,
            Sentiment::Neutral => acc.sentiment.neutral += 1,
            Sentiment::Negative => acc.sentiment.negative += 1,
        }
        match it.credibility() {
            Credibility::Verified => acc.credibility.verified += 1,
            Credibility::Suspicious => acc.credibility.suspicious += 1,
        }
        acc.total += 1;
        acc
    })
}
