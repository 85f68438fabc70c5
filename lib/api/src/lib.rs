//! # matchmate API
//!
//! Service layer: the AI service client, the payload adapter, the
//! recommendation façade with local fallback, the refresh scheduler and
//! the REST routes.

pub mod ai_format;
pub mod client;
pub mod config;
pub mod facade;
pub mod payload;
pub mod rest;
pub mod scheduler;

pub use ai_format::AiUserPayload;
pub use client::{HttpRecommendationClient, RecommendationService};
pub use config::{
    ClientConfig, FacadeConfig, FeatureSet, ServiceConfig, DEFAULT_LEDGER_FLUSH_INTERVAL, DEFAULT_REFRESH_CRON,
};
pub use facade::{FacadeStats, RecommendationFacade, RecommendationResponse};
pub use payload::{UpstreamEntry, UpstreamPayload};
pub use rest::{routes, AppState, RestApi};
pub use scheduler::{
    daily_refresh, spawn_ledger_maintenance, DailySchedule, RefreshCallback, RefreshScheduler,
    TokioRefreshScheduler,
};
