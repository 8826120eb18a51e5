//! Core components for the azblob client.
//!
//! This crate provides the foundational pieces shared by the blob client:
//!
//! - **Context**: a container holding the HTTP transport implementation
//! - **HttpSend**: the trait the transport collaborator implements
//! - **Error**: the structured error type used across the workspace
//! - **SigningRequest**: a decomposed HTTP request used by canonicalization
//!
//! The core never opens sockets itself. Users configure a transport on the
//! [`Context`]; everything else in the workspace routes requests through it.

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

pub mod hash;
pub mod time;
pub mod utils;

mod context;
pub use context::{Context, HttpSend, NoopHttpSend};

mod error;
pub use error::{Error, ErrorKind, Result};

mod request;
pub use request::SigningRequest;
