//! Session lifecycle and batch design generation.
//!
//! The crate is organised around five components:
//!
//! - [`session::SessionStore`] holds the persisted credentials for every
//!   provider and serializes all writes to them.
//! - [`handshake::HandshakeBroker`] runs one interactive authentication
//!   window per provider and resolves with the credentials it posts back.
//! - [`refresh::RefreshScheduler`] keeps access tokens fresh in the
//!   background.
//! - [`pattern`] turns an abstract pattern plus design sets into concrete
//!   jobs.
//! - [`batch::BatchRunner`] submits those jobs one at a time and tracks
//!   progress.
//!
//! The remote gateway and the pattern inference service are consumed through
//! the [`gateway::Gateway`] and [`pattern::PatternInference`] traits.

pub mod batch;
pub mod config;
pub mod error;
pub mod gateway;
pub mod guard;
pub mod handshake;
pub mod pattern;
pub mod refresh;
pub mod session;
#[cfg(test)]
mod testing;

pub use batch::{BatchProgress, BatchRun, BatchRunner, JobFailure, JobOutcome, JobResult};
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use gateway::{Gateway, GatewayError, HttpGateway};
pub use guard::{CredentialGuard, GuardOutcome};
pub use handshake::{HandshakeBroker, HandshakeError, MessageHub};
pub use pattern::{AbstractPattern, BatchPlan, DesignSet, ImageRef, Job, Template, ValidationError};
pub use refresh::{RefreshHandle, RefreshReport, RefreshScheduler};
pub use session::{Session, SessionStore};
pub use slidebatch_protocol::{CanvaCredentials, GoogleCredentials, Provider, ProviderCredentials};
