//! GeminiCraft core: a cached, rate-limited request gateway in front of the
//! Gemini API, with conversation history persistence.
//!
//! The flow per request: UI/CLI → [`gateway::RequestGateway`] →
//! [`cache::ResponseCache`] (hit? return) → [`limiter::FixedWindowLimiter`]
//! gate → [`providers::ModelProvider`] call → cache write → history write →
//! caller. All components are explicitly constructed and injected; there is
//! no global state.

pub mod cache;
pub mod config;
pub mod error;
pub mod gateway;
pub mod history;
pub mod limiter;
pub mod providers;

pub use error::{CraftError, Result};
