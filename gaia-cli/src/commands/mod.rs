//! CLI command implementations

pub mod batch;
pub mod connect;
pub mod delete;
pub mod get;
pub mod list;
pub mod put;
pub mod sign;

use gaia_client::{InMemorySessionStore, Session};

/// Session type used by every storage command.
pub type CliSession = Session<InMemorySessionStore>;
