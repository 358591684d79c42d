//! Depot backend library.
//!
//! Core components of the depot control plane: the package catalog and its
//! ingest pipeline, the WebSocket gateway with its agent/dashboard
//! registries, and the HTTP API surface.

pub mod api;
pub mod catalog;
pub mod ws;
