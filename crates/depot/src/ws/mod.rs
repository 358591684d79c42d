//! WebSocket gateway, registries, and dispatch core.
//!
//! One endpoint accepts both connection roles. The gateway classifies each
//! connection from its query parameters, authenticates agents against the
//! shared secret, and wires the session into the right registry:
//!
//! ```text
//!                      ┌──────────────────────┐
//!   agent  ──ws──────► │       Gateway        │ ◄──────ws── dashboard
//!                      └──────────┬───────────┘
//!                   register      │      join
//!              ┌──────────────────┴──────────────────┐
//!    ┌─────────▼──────────┐              ┌───────────▼──────────┐
//!    │   AgentRegistry    │              │    DashboardHub      │
//!    │  id → descriptor + │              │  conn → event sender │
//!    │    command sender  │              │  (broadcast fan-out) │
//!    └────────────────────┘              └──────────────────────┘
//! ```
//!
//! Install requests flow dashboard → registry → agent; status reports flow
//! agent → hub → every dashboard. All delivery is best-effort: a closed or
//! saturated peer is skipped, never awaited.

mod handler;
mod hub;
mod registry;

pub use handler::ws_handler;
pub use hub::DashboardHub;
pub use registry::AgentRegistry;
