//! Core types and utilities shared across the Pactum workspace
//!
//! - Party and account identifiers
//! - Layered settings (defaults, config file, environment)
//! - Tracing subscriber setup

pub mod error;
pub mod ids;
pub mod settings;
pub mod telemetry;

pub use error::CoreError;
pub use ids::{AccountId, PartyId};
pub use settings::Settings;

/// Header carrying the authenticated caller on HTTP requests
pub const CALLER_HEADER: &str = "x-caller-identity";

/// Result type alias for core operations
pub type CoreResult<T> = Result<T, CoreError>;
