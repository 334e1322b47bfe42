//! # wharf-core
//!
//! Core abstractions for the wharf content delivery controller.
//!
//! This crate provides the foundational types shared across all wharf
//! components:
//!
//! - **Storage Backend**: Abstract object-storage interface with an
//!   in-memory implementation for testing
//! - **Error Types**: Shared error definitions and result types
//! - **Observability**: Structured logging initialization and span helpers
//!
//! ## Crate Boundary
//!
//! `wharf-core` is the only crate allowed to define shared primitives.
//! Domain crates (such as `wharf-assets`) build on these contracts and
//! never redefine them.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod observability;
pub mod storage;

pub use error::{Error, Result};
pub use observability::{LogFormat, init_logging, reconcile_span};
pub use storage::{MemoryBackend, ObjectMeta, StorageBackend};
