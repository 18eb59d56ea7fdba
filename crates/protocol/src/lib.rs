//! Wire types for slidebatch.
//!
//! This crate contains the serde-serializable types exchanged with the
//! authentication window and with the remote gateway. These types represent
//! the "protocol layer" - the shapes of data as they appear on the wire.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! * Pure data: No behavior beyond serialization/deserialization
//! * 1:1 with the wire: field names match the JSON the gateway speaks
//! * Stable: Changes only when the wire format changes
//!
//! Session handling and batch execution are built on top of these types in
//! the `slidebatch` crate.

pub mod credentials;
pub mod gateway;
pub mod handshake;
pub mod provider;

pub use credentials::*;
pub use gateway::*;
pub use handshake::*;
pub use provider::*;
