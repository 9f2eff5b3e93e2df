//! Database models

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// Subscription plan of a user
///
/// Stored as text; unknown names survive a load/store cycle as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum PlanTier {
    BetaFree,
    Plus,
    Pro,
    Other(String),
}

impl PlanTier {
    pub fn as_str(&self) -> &str {
        match self {
            PlanTier::BetaFree => "beta_free",
            PlanTier::Plus => "plus",
            PlanTier::Pro => "pro",
            PlanTier::Other(name) => name,
        }
    }

    pub fn is_free(&self) -> bool {
        matches!(self, PlanTier::BetaFree)
    }
}

impl From<String> for PlanTier {
    fn from(value: String) -> Self {
        match value.as_str() {
            "beta_free" => PlanTier::BetaFree,
            "plus" => PlanTier::Plus,
            "pro" => PlanTier::Pro,
            _ => PlanTier::Other(value),
        }
    }
}

impl From<PlanTier> for String {
    fn from(value: PlanTier) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for PlanTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quota fields of a user row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaState {
    pub plan_tier: PlanTier,
    pub relumination_credits: i64,
    pub relumination_used_this_month: i64,
    pub relumination_month_ref: Option<String>,
}

impl Default for QuotaState {
    fn default() -> Self {
        Self {
            plan_tier: PlanTier::BetaFree,
            relumination_credits: 0,
            relumination_used_this_month: 0,
            relumination_month_ref: None,
        }
    }
}

/// Raw `users` row
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub guid: String,
    pub name: String,
    pub email: String,
    pub plan_tier: String,
    pub relumination_credits: i64,
    pub relumination_used_this_month: i64,
    pub relumination_month_ref: Option<String>,
}

impl UserRow {
    pub fn quota_state(&self) -> QuotaState {
        QuotaState {
            plan_tier: PlanTier::from(self.plan_tier.clone()),
            relumination_credits: self.relumination_credits,
            relumination_used_this_month: self.relumination_used_this_month,
            relumination_month_ref: self.relumination_month_ref.clone(),
        }
    }
}

/// Raw `memories` row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct MemoryRecord {
    pub guid: String,
    pub user_id: String,
    pub main_caption: String,
    pub media_url: Option<String>,
    pub alt_text: Option<String>,
    pub short_description: Option<String>,
    pub long_description: Option<String>,
    pub relumination_url: Option<String>,
    pub relumination_style: Option<i64>,
}

impl MemoryRecord {
    /// Narrative text for the caption: first non-blank of short, long, alt text
    pub fn narrative(&self) -> Option<&str> {
        [
            self.short_description.as_deref(),
            self.long_description.as_deref(),
            self.alt_text.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
    }

    /// Media reference, if present and non-blank
    pub fn media_reference(&self) -> Option<&str> {
        self.media_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}
