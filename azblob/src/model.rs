//! Typed records returned by the client.

use std::collections::HashMap;

/// A container and the descriptive state the service reported for it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Container {
    /// Container name.
    pub name: String,
    /// Entity tag.
    pub etag: String,
    /// Last modification time, as reported by the service.
    pub last_modified: String,
    /// User metadata attached to the container.
    pub metadata: HashMap<String, String>,
}

/// A blob and the descriptive state the service reported for it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Blob {
    /// Container the blob lives in.
    pub container: String,
    /// Blob name.
    pub name: String,
    /// Snapshot timestamp when this entry is a snapshot.
    pub snapshot: Option<String>,
    /// Entity tag.
    pub etag: String,
    /// Last modification time, as reported by the service.
    pub last_modified: String,
    /// Full URL of the blob.
    pub url: String,
    /// Content length in bytes.
    pub content_length: u64,
    /// Content type.
    pub content_type: String,
    /// Content encoding.
    pub content_encoding: String,
    /// Content language.
    pub content_language: String,
    /// Cache control directive.
    pub cache_control: String,
    /// Blob type reported by the service (`BlockBlob` or `PageBlob`).
    pub blob_type: String,
    /// Lease status reported by the service.
    pub lease_status: String,
    /// Whether this entry is a virtual directory prefix, not a blob.
    pub is_prefix: bool,
    /// User metadata attached to the blob.
    pub metadata: HashMap<String, String>,
}

/// Outcome of a lease operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lease {
    /// Container the leased blob lives in.
    pub container: String,
    /// Leased blob name.
    pub blob: String,
    /// Lease identifier, present after acquire and renew.
    pub id: Option<String>,
    /// Remaining lease time in seconds, present after a break.
    pub time: Option<u64>,
}

/// A committed page range of a page blob, both bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    /// First byte of the range.
    pub start: u64,
    /// Last byte of the range.
    pub end: u64,
}

/// A stored access policy attached to a container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignedIdentifier {
    /// Policy identifier, referenced by grants through `si`.
    pub id: String,
    /// Validity start, RFC 3339.
    pub start: String,
    /// Validity end, RFC 3339.
    pub expiry: String,
    /// Permission tokens granted by the policy.
    pub permissions: String,
}

/// Anonymous access level of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicAccess {
    /// Blob content is readable anonymously, listing is not.
    Blob,
    /// Blob content and container listing are readable anonymously.
    Container,
}

impl PublicAccess {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            PublicAccess::Blob => "blob",
            PublicAccess::Container => "container",
        }
    }

    pub(crate) fn parse(value: &str) -> Option<Self> {
        match value {
            "blob" => Some(PublicAccess::Blob),
            // Accounts created before 2009-09-19 report the old boolean form.
            "container" | "true" => Some(PublicAccess::Container),
            _ => None,
        }
    }
}

/// Which staged blocks a block list request returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockListType {
    /// Committed and uncommitted blocks.
    All,
    /// Only blocks committed into the blob.
    Committed,
    /// Only staged, not yet committed blocks.
    Uncommitted,
}

impl BlockListType {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            BlockListType::All => "all",
            BlockListType::Committed => "committed",
            BlockListType::Uncommitted => "uncommitted",
        }
    }
}

/// A block as reported by a block list request. The identifier is the
/// transport-encoded name the service stores.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Block {
    /// Base64-encoded block identifier.
    pub id: String,
    /// Block size in bytes.
    pub size: u64,
}

/// Committed and uncommitted blocks of a blob.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockLists {
    /// Blocks committed into the blob.
    pub committed: Vec<Block>,
    /// Blocks staged but not committed.
    pub uncommitted: Vec<Block>,
}

/// Lease operation to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaseAction {
    /// Acquire a new lease.
    Acquire,
    /// Renew an existing lease.
    Renew,
    /// Release a held lease.
    Release,
    /// Break a lease without owning it.
    Break,
}

impl LeaseAction {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            LeaseAction::Acquire => "acquire",
            LeaseAction::Renew => "renew",
            LeaseAction::Release => "release",
            LeaseAction::Break => "break",
        }
    }
}

/// How a page write applies its range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageWrite {
    /// Write the payload into the range.
    Update,
    /// Clear the range, no payload.
    Clear,
}

impl PageWrite {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            PageWrite::Update => "update",
            PageWrite::Clear => "clear",
        }
    }
}

/// Descriptive fields and metadata attached when writing a blob.
///
/// All fields pass through to the service unmodified.
#[derive(Debug, Clone, Default)]
pub struct PutOptions {
    /// Content type to store with the blob.
    pub content_type: Option<String>,
    /// Content encoding to store with the blob.
    pub content_encoding: Option<String>,
    /// Content language to store with the blob.
    pub content_language: Option<String>,
    /// Cache control directive to store with the blob.
    pub cache_control: Option<String>,
    /// User metadata to attach.
    pub metadata: HashMap<String, String>,
    /// Lease under which the write happens.
    pub lease_id: Option<String>,
}
