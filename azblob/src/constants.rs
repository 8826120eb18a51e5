//! Constants of the blob service wire contract.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};

/// Prefix of all storage headers, the ones canonicalization collects.
pub const PREFIX_STORAGE_HEADER: &str = "x-ms-";
/// Prefix of user metadata headers.
pub const PREFIX_METADATA: &str = "x-ms-meta-";
/// Request date header, inserted during canonicalization when absent.
pub const X_MS_DATE: &str = "x-ms-date";
/// Service API version header.
pub const X_MS_VERSION: &str = "x-ms-version";
/// Blob type header (`BlockBlob` or `PageBlob`).
pub const X_MS_BLOB_TYPE: &str = "x-ms-blob-type";
/// Declared size of a page blob at creation.
pub const X_MS_BLOB_CONTENT_LENGTH: &str = "x-ms-blob-content-length";
/// Anonymous access level of a container.
pub const X_MS_BLOB_PUBLIC_ACCESS: &str = "x-ms-blob-public-access";
/// Source path of a server-side copy.
pub const X_MS_COPY_SOURCE: &str = "x-ms-copy-source";
/// Lease under which an operation runs.
pub const X_MS_LEASE_ID: &str = "x-ms-lease-id";
/// Lease operation to perform.
pub const X_MS_LEASE_ACTION: &str = "x-ms-lease-action";
/// Remaining lease time, reported after a break.
pub const X_MS_LEASE_TIME: &str = "x-ms-lease-time";
/// Lease status of a blob.
pub const X_MS_LEASE_STATUS: &str = "x-ms-lease-status";
/// How a page write applies its range.
pub const X_MS_PAGE_WRITE: &str = "x-ms-page-write";
/// Snapshot timestamp returned when snapshotting a blob.
pub const X_MS_SNAPSHOT: &str = "x-ms-snapshot";

/// Service API version sent with every request.
pub const API_VERSION: &str = "2009-09-19";

/// Well-known development storage account name.
pub const DEVSTORE_ACCOUNT: &str = "devstoreaccount1";
/// Well-known development storage account key.
pub const DEVSTORE_KEY: &str =
    "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";
/// Development storage blob endpoint, without the account path.
pub const URL_DEV_BLOB: &str = "http://127.0.0.1:10000";

/// Maximal blob size transferable in a single request (in bytes).
pub const MAX_SINGLE_PUT_SIZE: usize = 64 * 1024 * 1024;

/// Maximal size of one staged block (in bytes).
pub const MAX_BLOCK_SIZE: usize = 4 * 1024 * 1024;

/// Width of a block identifier before transport encoding.
///
/// Fixed so identifiers stay lexically ordered and equally sized no matter
/// how many blocks an object splits into.
pub const BLOCK_ID_WIDTH: usize = 64;

/// Page blobs address fixed 512-byte pages.
pub const PAGE_SIZE: u64 = 512;

/// Characters that travel unescaped in query string values.
pub static QUERY_ENCODE_SET: AsciiSet = NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'/')
    .remove(b'~');
