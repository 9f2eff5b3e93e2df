//! Relumination services
//!
//! Gate and ledger decide whether a request may proceed; resolver and
//! renderer produce the video; `relumination` sequences them.

pub mod asset_resolver;
pub mod authorization_gate;
pub mod quota_ledger;
pub mod relumination;
pub mod renderer;

pub use asset_resolver::AssetResolver;
pub use quota_ledger::{QuotaLedger, SqliteQuotaStore};
pub use relumination::{ReluminationOutcome, ReluminationPipeline};
pub use renderer::Renderer;
