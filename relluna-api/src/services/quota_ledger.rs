//! Quota Ledger
//!
//! Decides whether a user may spend one relumination and records the spend.
//! The decision is a pure function of the stored quota state and the current
//! period; persistence goes through a compare-and-swap so that concurrent
//! requests from the same user never spend the same unit twice.
//!
//! Rules, in priority order:
//! 1. A new period resets the monthly counter (always written, even on the
//!    credit path or when the request is then rejected).
//! 2. Paid credits are consumed first.
//! 3. `beta_free` spends the monthly allowance up to the limit.
//! 4. Other plans without credits are not metered.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use relluna_common::db::{PlanTier, QuotaState};
use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::QuotaConfig;
use crate::db::users;

/// Quota Ledger errors
#[derive(Debug, Error)]
pub enum QuotaError {
    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Monthly relumination limit reached ({used}/{limit})")]
    QuotaExceeded { used: i64, limit: i64 },

    /// Every compare-and-swap attempt lost to a concurrent writer
    #[error("Quota update contention after {attempts} attempts")]
    Contention { attempts: u32 },

    #[error(transparent)]
    Store(#[from] relluna_common::Error),
}

/// Persistence collaborator for quota fields
#[async_trait]
pub trait QuotaStore: Send + Sync {
    async fn load_quota(&self, user_id: &str) -> relluna_common::Result<Option<QuotaState>>;

    /// Atomically replace `expected` with `next`; `false` if the row changed meanwhile
    async fn compare_and_swap(
        &self,
        user_id: &str,
        expected: &QuotaState,
        next: &QuotaState,
    ) -> relluna_common::Result<bool>;
}

/// [`QuotaStore`] over the `users` table
#[derive(Clone)]
pub struct SqliteQuotaStore {
    pool: SqlitePool,
}

impl SqliteQuotaStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuotaStore for SqliteQuotaStore {
    async fn load_quota(&self, user_id: &str) -> relluna_common::Result<Option<QuotaState>> {
        Ok(users::load_user(&self.pool, user_id)
            .await?
            .map(|row| row.quota_state()))
    }

    async fn compare_and_swap(
        &self,
        user_id: &str,
        expected: &QuotaState,
        next: &QuotaState,
    ) -> relluna_common::Result<bool> {
        users::compare_and_swap_quota(&self.pool, user_id, expected, next).await
    }
}

/// What a successful consumption spent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsumptionKind {
    PaidCredit,
    MonthlyAllowance,
    /// Paid plan without credits: no rule defined, nothing recorded
    Unmetered,
}

/// Outcome of [`decide`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuotaDecision {
    Consume { next: QuotaState, kind: ConsumptionKind },
    /// `next` carries a pending period reset, if any
    Reject { next: QuotaState, used: i64, limit: i64 },
}

impl QuotaDecision {
    fn next_state(&self) -> &QuotaState {
        match self {
            QuotaDecision::Consume { next, .. } | QuotaDecision::Reject { next, .. } => next,
        }
    }
}

/// Pure decision over a snapshot of the quota fields
pub fn decide(current: &QuotaState, period: &str, monthly_limit: i64) -> QuotaDecision {
    let mut next = current.clone();

    if next.relumination_month_ref.as_deref() != Some(period) {
        next.relumination_used_this_month = 0;
        next.relumination_month_ref = Some(period.to_string());
    }

    if next.relumination_credits > 0 {
        next.relumination_credits -= 1;
        return QuotaDecision::Consume {
            next,
            kind: ConsumptionKind::PaidCredit,
        };
    }

    if next.plan_tier == PlanTier::BetaFree {
        let used = next.relumination_used_this_month;
        if used >= monthly_limit {
            return QuotaDecision::Reject {
                next,
                used,
                limit: monthly_limit,
            };
        }
        next.relumination_used_this_month += 1;
        return QuotaDecision::Consume {
            next,
            kind: ConsumptionKind::MonthlyAllowance,
        };
    }

    QuotaDecision::Consume {
        next,
        kind: ConsumptionKind::Unmetered,
    }
}

/// Successful consumption
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Consumption {
    pub kind: ConsumptionKind,
    /// Quota state as committed
    pub state: QuotaState,
}

/// Read-only view of a user's allowance
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuotaStatus {
    pub plan_tier: String,
    pub period: String,
    pub relumination_credits: i64,
    pub relumination_used_this_month: i64,
    pub monthly_limit: i64,
    /// Free uses left this period; `None` outside the free plan
    pub remaining_free: Option<i64>,
}

/// Quota Ledger
#[derive(Clone)]
pub struct QuotaLedger {
    store: Arc<dyn QuotaStore>,
    config: QuotaConfig,
}

impl QuotaLedger {
    pub fn new(store: Arc<dyn QuotaStore>, config: QuotaConfig) -> Self {
        Self { store, config }
    }

    pub fn monthly_limit(&self) -> i64 {
        self.config.monthly_limit
    }

    /// Decide and commit one relumination for `user_id` as a single step
    pub async fn check_and_consume(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Consumption, QuotaError> {
        let period = relluna_common::time::period_ref(now);
        let attempts = self.config.max_cas_attempts.max(1);

        for attempt in 1..=attempts {
            let current = self
                .store
                .load_quota(user_id)
                .await?
                .ok_or_else(|| QuotaError::UserNotFound(user_id.to_string()))?;

            let decision = decide(&current, &period, self.config.monthly_limit);
            let next = decision.next_state();

            if *next != current && !self.store.compare_and_swap(user_id, &current, next).await? {
                debug!(user_id, attempt, "Quota changed concurrently, re-deciding");
                continue;
            }

            return match decision {
                QuotaDecision::Consume { next, kind } => {
                    if kind == ConsumptionKind::Unmetered {
                        warn!(
                            user_id,
                            plan_tier = %next.plan_tier,
                            "No quota rule for paid plan without credits; relumination not metered"
                        );
                    } else {
                        debug!(
                            user_id,
                            ?kind,
                            credits = next.relumination_credits,
                            used = next.relumination_used_this_month,
                            period = %period,
                            "Relumination quota consumed"
                        );
                    }
                    Ok(Consumption { kind, state: next })
                }
                QuotaDecision::Reject { used, limit, .. } => {
                    info!(user_id, used, limit, period = %period, "Relumination quota exceeded");
                    Err(QuotaError::QuotaExceeded { used, limit })
                }
            };
        }

        warn!(user_id, attempts, "Quota compare-and-swap retries exhausted");
        Err(QuotaError::Contention { attempts })
    }

    /// Current allowance without consuming anything
    pub async fn status(&self, user_id: &str, now: DateTime<Utc>) -> Result<QuotaStatus, QuotaError> {
        let period = relluna_common::time::period_ref(now);
        let state = self
            .store
            .load_quota(user_id)
            .await?
            .ok_or_else(|| QuotaError::UserNotFound(user_id.to_string()))?;

        let used = if state.relumination_month_ref.as_deref() == Some(period.as_str()) {
            state.relumination_used_this_month
        } else {
            0
        };
        let remaining_free = state
            .plan_tier
            .is_free()
            .then(|| (self.config.monthly_limit - used).max(0));

        Ok(QuotaStatus {
            plan_tier: state.plan_tier.to_string(),
            period,
            relumination_credits: state.relumination_credits,
            relumination_used_this_month: used,
            monthly_limit: self.config.monthly_limit,
            remaining_free,
        })
    }
}
