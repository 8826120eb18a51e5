//! Page blob operations.
//!
//! Page blobs address fixed 512-byte pages, so every range is checked
//! locally before a request goes out: the start must sit on a page boundary
//! and the inclusive end must close one.

use bytes::Bytes;
use http::Method;

use azblob_core::{Error, Result};

use crate::client::{assert_blob_name, assert_container_name, header_string, resource_path, OpRequest};
use crate::constants::{
    MAX_BLOCK_SIZE, PAGE_SIZE, X_MS_BLOB_CONTENT_LENGTH, X_MS_BLOB_TYPE, X_MS_LEASE_ID,
    X_MS_PAGE_WRITE,
};
use crate::credential::{Permission, ResourceKind};
use crate::model::{Blob, PageRange, PageWrite, PutOptions};
use crate::xml;

use super::BlobClient;

impl BlobClient {
    /// Create an empty page blob of `size` bytes.
    pub async fn create_page_blob(
        &self,
        container: &str,
        blob: &str,
        size: u64,
        options: &PutOptions,
    ) -> Result<Blob> {
        assert_container_name(container)?;
        assert_blob_name(container, blob)?;
        if size % PAGE_SIZE != 0 {
            return Err(Error::request_invalid(format!(
                "page blob size {size} is not a multiple of {PAGE_SIZE} bytes"
            )));
        }

        let op = OpRequest::new(
            Method::PUT,
            resource_path(container, blob),
            ResourceKind::Blob,
            Permission::Write,
        )
        .header(X_MS_BLOB_TYPE, "PageBlob")
        .header(X_MS_BLOB_CONTENT_LENGTH, size.to_string())
        .opt_header("content-type", options.content_type.as_deref())
        .opt_header(X_MS_LEASE_ID, options.lease_id.as_deref());

        let resp = self.perform(op).await?;

        Ok(Blob {
            container: container.to_string(),
            name: blob.to_string(),
            etag: header_string(&resp, "etag"),
            last_modified: header_string(&resp, "last-modified"),
            url: format!("{}{}", self.endpoint(), resource_path(container, blob)),
            content_length: size,
            content_type: options.content_type.clone().unwrap_or_default(),
            blob_type: "PageBlob".to_string(),
            metadata: options.metadata.clone(),
            ..Blob::default()
        })
    }

    /// Write or clear a page range, bounds inclusive.
    pub async fn put_page(
        &self,
        container: &str,
        blob: &str,
        start: u64,
        end: u64,
        data: Bytes,
        write: PageWrite,
        lease_id: Option<&str>,
    ) -> Result<()> {
        assert_container_name(container)?;
        assert_blob_name(container, blob)?;

        if start > end {
            return Err(Error::request_invalid(format!(
                "page range start {start} is past range end {end}"
            )));
        }
        if start % PAGE_SIZE != 0 {
            return Err(Error::request_invalid(format!(
                "page range start {start} is not on a {PAGE_SIZE}-byte boundary"
            )));
        }
        if (end + 1) % PAGE_SIZE != 0 {
            return Err(Error::request_invalid(format!(
                "page range end {end} does not close a {PAGE_SIZE}-byte page"
            )));
        }

        let range_len = end - start + 1;
        let body = match write {
            PageWrite::Update => {
                if data.len() as u64 != range_len {
                    return Err(Error::request_invalid(format!(
                        "payload of {} bytes does not fill the {range_len}-byte range",
                        data.len()
                    )));
                }
                if range_len > MAX_BLOCK_SIZE as u64 {
                    return Err(Error::request_invalid(format!(
                        "page range of {range_len} bytes exceeds the maximum of {MAX_BLOCK_SIZE} bytes"
                    )));
                }
                Some(data)
            }
            PageWrite::Clear => None,
        };

        let mut op = OpRequest::new(
            Method::PUT,
            resource_path(container, blob),
            ResourceKind::Blob,
            Permission::Write,
        )
        .query("comp", "page")
        .header("range", format!("bytes={start}-{end}"))
        .header(X_MS_PAGE_WRITE, write.as_str())
        .opt_header(X_MS_LEASE_ID, lease_id);
        if let Some(body) = body {
            op = op.body(body);
        }

        self.perform(op).await?;
        Ok(())
    }

    /// Committed page ranges of a page blob.
    pub async fn get_page_regions(
        &self,
        container: &str,
        blob: &str,
        lease_id: Option<&str>,
    ) -> Result<Vec<PageRange>> {
        assert_container_name(container)?;
        assert_blob_name(container, blob)?;

        let op = OpRequest::new(
            Method::GET,
            resource_path(container, blob),
            ResourceKind::Blob,
            Permission::Read,
        )
        .query("comp", "pagelist")
        .opt_header(X_MS_LEASE_ID, lease_id);

        let resp = self.perform(op).await?;
        xml::parse_page_ranges(resp.body())
    }
}
