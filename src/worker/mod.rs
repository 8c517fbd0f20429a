//! Worker communication module.
//!
//! geosift never links a database driver. All SQL runs inside a long-lived
//! worker process that owns the connection pool; this module talks to it.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │            geosift (Rust + Tokio)            │
//! │  ┌────────────────────────────────────────┐  │
//! │  │          WorkerClient (Async)          │  │
//! │  │  - spawns the worker as a child        │  │
//! │  │  - NDJSON over stdin/stdout            │  │
//! │  │  - request IDs for concurrent queries  │  │
//! │  └────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────┘
//!                 │ stdin / stdout
//!                 ▼
//! ┌──────────────────────────────────────────────┐
//! │        Database worker (child process)       │
//! └──────────────────────────────────────────────┘
//! ```

mod client;
mod error;
pub mod protocol;

pub use client::WorkerClient;
pub use error::{WorkerError, WorkerResult};
