//! HTTP API handlers for relluna-api

pub mod health;
pub mod identity;
pub mod reluminations;

pub use health::health_routes;
pub use identity::CurrentUser;
pub use reluminations::relumination_routes;
