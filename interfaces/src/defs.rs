use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry pulled from a feed, keyed by its canonical URL.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleCandidate {
    pub url: String,
    pub title: String,
    pub summary: String,
    pub published_at: Option<DateTime<Utc>>,
    pub source_tag: String,
}

impl ArticleCandidate {
    pub fn published_iso(&self) -> Option<String> {
        self.published_at.map(|ts| ts.to_rfc3339())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Relevance {
    High,
    Medium,
    Low,
    None,
}

impl Relevance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Relevance::High => "High",
            Relevance::Medium => "Medium",
            Relevance::Low => "Low",
            Relevance::None => "None",
        }
    }
}

impl fmt::Display for Relevance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QualityType {
    #[serde(rename = "In-depth")]
    InDepth,
    Opinion,
    Overview,
    Shallow,
    Promotional,
    #[serde(rename = "Low-Quality")]
    LowQuality,
}

impl QualityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityType::InDepth => "In-depth",
            QualityType::Opinion => "Opinion",
            QualityType::Overview => "Overview",
            QualityType::Shallow => "Shallow",
            QualityType::Promotional => "Promotional",
            QualityType::LowQuality => "Low-Quality",
        }
    }
}

impl fmt::Display for QualityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured classifier judgment. Only produced when both fields are present
/// and well-formed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterVerdict {
    pub relevance: Relevance,
    pub quality_type: QualityType,
}

impl FilterVerdict {
    pub fn new(relevance: Relevance, quality_type: QualityType) -> Self {
        Self { relevance, quality_type }
    }

    /// Accepted iff both fields fall inside the configured sets.
    pub fn is_accepted(&self, relevance: &[Relevance], quality: &[QualityType]) -> bool {
        relevance.contains(&self.relevance) && quality.contains(&self.quality_type)
    }
}

/// Verdicts gathered for one article so far; persisted as `filter_result`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterTrail {
    pub stage1: Option<FilterVerdict>,
    pub stage2: Option<FilterVerdict>,
}

impl FilterTrail {
    pub fn is_empty(&self) -> bool {
        self.stage1.is_none() && self.stage2.is_none()
    }

    /// JSON form for the ledger, `None` while no verdict exists.
    pub fn to_json(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        serde_json::to_string(self).ok()
    }
}
