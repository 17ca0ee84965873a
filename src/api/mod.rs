//! API layer
//!
//! HTTP handlers for:
//! - Team login and user verification
//! - Questionnaire submission
//! - Miro plugin user reports
//! - Pages (landing, protected placeholder)
//! - Metrics (Prometheus)

mod dto;
pub mod metrics;
mod pages;
mod questionnaire;
mod teams;

pub use dto::*;

pub use metrics::{metrics_router, track_http_metrics};
pub use pages::pages_router;
pub use questionnaire::questionnaire_router;
pub use teams::teams_router;
