//! Background geotag capture and delivery for address verification.
//!
//! The agent periodically captures the device location over a verification
//! session, reverse-geocodes it, and delivers it to the verification
//! backend. Events that cannot be delivered wait in a durable FIFO cache
//! and are flushed, oldest first, ahead of the next delivery. Expired auth
//! tokens are refreshed and the failed call is retried once.
//!
//! The host application wires the pieces together:
//!
//! - [`credentials`]: durable identity and token storage
//! - [`cache`]: offline event queue and flush
//! - [`remote`]: token-refreshing [`VerificationBackend`](remote::VerificationBackend)
//! - [`planner`]: capture instants from policy and history
//! - [`orchestrator`]: the single-flight session state machine
//! - [`background`]: platform-scheduled resumption
//! - [`providers`]: location, geocoding, connectivity, clock, and wake traits

pub mod background;
pub mod cache;
pub mod config;
pub mod credentials;
pub mod dirs;
pub mod error;
pub mod orchestrator;
mod persist;
pub mod planner;
pub mod providers;
pub mod remote;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use background::{BackgroundTask, ResumptionAdapter};
pub use config::AgentConfig;
pub use error::{AgentError, Result};
pub use orchestrator::{Collaborators, Orchestrator, StartOutcome, TrackingConfig};
