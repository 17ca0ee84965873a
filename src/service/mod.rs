//! Service layer
//!
//! Contains business logic separated from HTTP handlers.
//! Services orchestrate database operations.

mod team;

pub use team::{TeamLogin, TeamService};
