//! Relumination authorization gate
//!
//! Structural rule checked before any quota is spent: a memory that already
//! has a relumination may be rendered again only by users with paid credits
//! or on a paid plan.

use relluna_common::db::{MemoryRecord, QuotaState};

use crate::error::ReluminationError;

/// Reject re-relumination by free users without credits
pub fn authorize(quota: &QuotaState, memory: &MemoryRecord) -> Result<(), ReluminationError> {
    let already_relumed = memory.relumination_url.is_some();
    let restricted = quota.plan_tier.is_free() && quota.relumination_credits == 0;

    if already_relumed && restricted {
        return Err(ReluminationError::AlreadyRelumed);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use relluna_common::db::PlanTier;

    fn memory(relumed: bool) -> MemoryRecord {
        MemoryRecord {
            guid: "m1".into(),
            user_id: "u1".into(),
            main_caption: "Aniversário".into(),
            media_url: Some("/uploads/a.jpg".into()),
            alt_text: None,
            short_description: None,
            long_description: None,
            relumination_url: relumed.then(|| "http://localhost:8000/media/reluminations/x_style1.mp4".into()),
            relumination_style: relumed.then_some(1),
        }
    }

    fn quota(plan: PlanTier, credits: i64) -> QuotaState {
        QuotaState {
            plan_tier: plan,
            relumination_credits: credits,
            ..Default::default()
        }
    }

    #[test]
    fn test_first_relumination_always_allowed() {
        assert!(authorize(&quota(PlanTier::BetaFree, 0), &memory(false)).is_ok());
    }

    #[test]
    fn test_free_user_without_credits_blocked_on_rerender() {
        let result = authorize(&quota(PlanTier::BetaFree, 0), &memory(true));
        assert!(matches!(result, Err(ReluminationError::AlreadyRelumed)));
    }

    #[test]
    fn test_credits_allow_rerender() {
        assert!(authorize(&quota(PlanTier::BetaFree, 1), &memory(true)).is_ok());
    }

    #[test]
    fn test_paid_plan_allows_rerender() {
        assert!(authorize(&quota(PlanTier::Plus, 0), &memory(true)).is_ok());
        assert!(authorize(&quota(PlanTier::Other("family".into()), 0), &memory(true)).is_ok());
    }
}
