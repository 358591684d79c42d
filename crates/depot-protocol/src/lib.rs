//! Wire protocol for depot fleet communication.
//!
//! Every message on a depot WebSocket connection is a JSON object with a
//! `type` discriminator. Two connection roles exist:
//!
//! - **dashboards** receive [`DashboardEvent`]s and send [`DashboardCommand`]s
//! - **agents** receive [`AgentCommand`]s and send [`AgentMessage`]s
//!
//! Receivers ignore payloads that fail to deserialize (unknown `type` values
//! included); a bad message never closes the connection and never produces a
//! response.

pub mod commands;
pub mod events;
pub mod types;

pub use commands::{AgentMessage, DashboardCommand};
pub use events::{AgentCommand, DashboardEvent};
pub use types::{AgentDescriptor, InstallPayload, Package};
