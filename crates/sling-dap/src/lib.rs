//! sling-dap — Debug Adapter Protocol client for Sling.
//!
//! This crate implements the client side of the Debug Adapter Protocol:
//! message codec and framing, sequence-number request correlation,
//! typed event dispatch, the per-session debug state model, and
//! breakpoint management. The transport is supplied by the host through
//! the [`Transport`] trait and the `handle_*` callbacks on [`DapClient`].

pub mod breakpoint;
pub mod capabilities;
pub mod client;
pub mod codec;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod framing;
pub mod pending;
pub mod protocol;
pub mod session;
pub mod transport;

// Re-export key types for convenience.
pub use breakpoint::{BreakpointConfig, BreakpointManager, BreakpointSpec, BreakpointUpdate};
pub use capabilities::DapCapabilities;
pub use client::{ClientOptions, DapClient, REQUEST_TIMEOUT};
pub use codec::{decode, encode};
pub use error::{DapError, DecodeError};
pub use events::{DapEvent, SessionEvent};
pub use protocol::*;
pub use session::{ConsoleCategory, ConsoleOutputEntry, DebugSession, ExceptionInfo, SessionState};
pub use transport::{ChannelTransport, Transport};
