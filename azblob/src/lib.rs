//! Blob storage client with SharedKey and shared access signature
//! authorization.
//!
//! ## Quick start
//!
//! ```no_run
//! use azblob::{BlobClient, Config, PutOptions};
//! use azblob_core::Context;
//! use bytes::Bytes;
//!
//! # async fn example() -> azblob_core::Result<()> {
//! let ctx = Context::new(); // configure a transport with with_http_send
//! let config = Config::from_connection_string("UseDevelopmentStorage=true")?;
//! let client = BlobClient::from_config(ctx, &config)?;
//!
//! client.create_container("mycontainer", &Default::default()).await?;
//! client
//!     .put_blob(
//!         "mycontainer",
//!         "readme.txt",
//!         Bytes::from_static(b"hello"),
//!         &PutOptions::default(),
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! Blobs above 64 MiB are transparently staged as 4 MiB blocks and
//! committed in one request, see [`transfer`].

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

pub mod constants;
pub mod transfer;

mod client;
pub use client::BlobClient;

mod config;
pub use config::Config;

mod credential;
pub use credential::{Credential, Permission, ResourceKind, SharedKeyCredential};

mod sas;
pub use sas::SharedAccessCredential;

mod model;
pub use model::{
    Blob, Block, BlockListType, BlockLists, Container, Lease, LeaseAction, PageRange, PageWrite,
    PublicAccess, PutOptions, SignedIdentifier,
};

mod sign;
mod xml;
