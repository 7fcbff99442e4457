//! Transport contract and reference transports for the mcplex engine.
//!
//! A transport owns the physical channel and its sessions; the engine
//! never touches raw streams. The contract has three pieces (see
//! [`traits`]) and two properties every implementation must uphold:
//!
//! - **Outbound order**: one session's frames go out in enqueue order,
//!   never interleaved mid-frame.
//! - **Inbound concurrency**: frames may dispatch concurrently; a slow
//!   handler never blocks the next read (no head-of-line blocking).
//!
//! # Available transports
//!
//! | Transport | Use case | Feature flag |
//! |-----------|----------|--------------|
//! | [`StdioServerTransport`] | Subprocess servers (reference impl) | always |
//! | [`MemoryServerTransport`] | Tests, in-process wiring | always |
//! | [`SseServerTransport`] | HTTP POST + SSE event stream | `http` |

#![deny(missing_docs)]

pub mod error;
pub mod memory;
pub mod stdio;
pub mod traits;

#[cfg(feature = "http")]
pub mod sse;

pub use error::TransportError;
pub use memory::{MemoryClient, MemoryServerTransport};
pub use stdio::StdioServerTransport;
pub use traits::{Connection, ConnectionExt, ServerTransport, SessionFactory, SessionHandle};

#[cfg(feature = "http")]
pub use sse::SseServerTransport;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::TransportError;
    pub use crate::memory::{MemoryClient, MemoryServerTransport};
    pub use crate::stdio::StdioServerTransport;
    pub use crate::traits::{
        Connection, ConnectionExt, ServerTransport, SessionFactory, SessionHandle,
    };

    #[cfg(feature = "http")]
    pub use crate::sse::SseServerTransport;
}
