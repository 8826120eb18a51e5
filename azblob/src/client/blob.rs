//! Blob operations.

use std::collections::HashMap;

use bytes::Bytes;
use http::Method;
use log::debug;

use azblob_core::hash::base64_encode;
use azblob_core::{Error, Result};

use crate::client::{
    assert_blob_name, assert_container_name, bool_header, header_string, metadata_headers,
    parse_metadata, resource_path, OpRequest,
};
use crate::constants::{
    MAX_BLOCK_SIZE, X_MS_BLOB_TYPE, X_MS_COPY_SOURCE, X_MS_LEASE_ACTION, X_MS_LEASE_ID,
    X_MS_LEASE_STATUS, X_MS_LEASE_TIME, X_MS_SNAPSHOT,
};
use crate::credential::{Credential, Permission, ResourceKind};
use crate::model::{Blob, BlockListType, BlockLists, Lease, LeaseAction, PutOptions};
use crate::transfer::BlockPlan;
use crate::{transfer, xml};

use super::BlobClient;

impl BlobClient {
    /// Store a block blob.
    ///
    /// Payloads up to the single-request ceiling go out in one request;
    /// anything larger is staged as blocks and committed, see
    /// [`transfer::BlockPlan`].
    pub async fn put_blob(
        &self,
        container: &str,
        blob: &str,
        data: Bytes,
        options: &PutOptions,
    ) -> Result<Blob> {
        assert_container_name(container)?;
        assert_blob_name(container, blob)?;

        if transfer::fits_single_request(data.len()) {
            self.put_blob_single(container, blob, data, options).await
        } else {
            self.put_large_blob(container, blob, data, options).await
        }
    }

    async fn put_blob_single(
        &self,
        container: &str,
        blob: &str,
        data: Bytes,
        options: &PutOptions,
    ) -> Result<Blob> {
        let content_length = data.len() as u64;

        let mut op = OpRequest::new(
            Method::PUT,
            resource_path(container, blob),
            ResourceKind::Blob,
            Permission::Write,
        )
        .header(X_MS_BLOB_TYPE, "BlockBlob")
        .body(data);
        op = apply_put_options(op, options, false)?;

        let resp = self.perform(op).await?;

        Ok(Blob {
            container: container.to_string(),
            name: blob.to_string(),
            etag: header_string(&resp, "etag"),
            last_modified: header_string(&resp, "last-modified"),
            url: format!("{}{}", self.endpoint(), resource_path(container, blob)),
            content_length,
            content_type: options.content_type.clone().unwrap_or_default(),
            content_encoding: options.content_encoding.clone().unwrap_or_default(),
            content_language: options.content_language.clone().unwrap_or_default(),
            cache_control: options.cache_control.clone().unwrap_or_default(),
            blob_type: "BlockBlob".to_string(),
            metadata: options.metadata.clone(),
            ..Blob::default()
        })
    }

    async fn put_large_blob(
        &self,
        container: &str,
        blob: &str,
        data: Bytes,
        options: &PutOptions,
    ) -> Result<Blob> {
        let plan = BlockPlan::split(data.len());
        debug!(
            "staging {} as {} blocks of at most {MAX_BLOCK_SIZE} bytes",
            blob,
            plan.blocks.len()
        );

        for block in &plan.blocks {
            self.put_block(
                container,
                blob,
                &block.id,
                data.slice(block.range.clone()),
                options.lease_id.as_deref(),
            )
            .await?;
        }

        self.put_block_list(container, blob, &plan.block_ids(), options)
            .await?;

        self.get_blob_properties(container, blob, None, options.lease_id.as_deref())
            .await
    }

    /// Stage one block of a blob. The identifier is transport-encoded here.
    pub async fn put_block(
        &self,
        container: &str,
        blob: &str,
        block_id: &str,
        data: Bytes,
        lease_id: Option<&str>,
    ) -> Result<()> {
        assert_container_name(container)?;
        assert_blob_name(container, blob)?;
        if block_id.is_empty() {
            return Err(Error::request_invalid("block identifier is not specified"));
        }
        if data.len() > MAX_BLOCK_SIZE {
            return Err(Error::request_invalid(format!(
                "block size {} exceeds the maximum of {MAX_BLOCK_SIZE} bytes",
                data.len()
            )));
        }

        let op = OpRequest::new(
            Method::PUT,
            resource_path(container, blob),
            ResourceKind::Blob,
            Permission::Write,
        )
        .query("comp", "block")
        .query("blockid", base64_encode(block_id.as_bytes()))
        .opt_header(X_MS_LEASE_ID, lease_id)
        .body(data);

        self.perform(op).await?;
        Ok(())
    }

    /// Commit a list of staged blocks, in the given order, as the blob's
    /// content. Committing the same list twice yields the same blob.
    pub async fn put_block_list(
        &self,
        container: &str,
        blob: &str,
        block_ids: &[String],
        options: &PutOptions,
    ) -> Result<()> {
        assert_container_name(container)?;
        assert_blob_name(container, blob)?;

        let mut op = OpRequest::new(
            Method::PUT,
            resource_path(container, blob),
            ResourceKind::Blob,
            Permission::Write,
        )
        .query("comp", "blocklist")
        .body(Bytes::from(xml::serialize_block_list(block_ids)));
        op = apply_put_options(op, options, true)?;

        self.perform(op).await?;
        Ok(())
    }

    /// Committed and staged blocks of a blob.
    pub async fn get_block_list(
        &self,
        container: &str,
        blob: &str,
        snapshot: Option<&str>,
        lease_id: Option<&str>,
        list_type: BlockListType,
    ) -> Result<BlockLists> {
        assert_container_name(container)?;
        assert_blob_name(container, blob)?;

        let mut op = OpRequest::new(
            Method::GET,
            resource_path(container, blob),
            ResourceKind::Blob,
            Permission::Read,
        )
        .query("comp", "blocklist")
        .query("blocklisttype", list_type.as_str())
        .opt_header(X_MS_LEASE_ID, lease_id);
        if let Some(snapshot) = snapshot {
            op = op.query("snapshot", snapshot);
        }

        let resp = self.perform(op).await?;
        xml::parse_block_lists(resp.body())
    }

    /// Download a blob's content.
    pub async fn get_blob(
        &self,
        container: &str,
        blob: &str,
        snapshot: Option<&str>,
        lease_id: Option<&str>,
    ) -> Result<Bytes> {
        assert_container_name(container)?;
        assert_blob_name(container, blob)?;

        let mut op = OpRequest::new(
            Method::GET,
            resource_path(container, blob),
            ResourceKind::Blob,
            Permission::Read,
        )
        .opt_header(X_MS_LEASE_ID, lease_id);
        if let Some(snapshot) = snapshot {
            op = op.query("snapshot", snapshot);
        }

        let resp = self.perform(op).await?;
        Ok(resp.into_body())
    }

    /// Download a byte range of a blob, bounds inclusive.
    ///
    /// With `verify_content` the service sends a Content-MD5 over the range,
    /// which the transport layer can check.
    pub async fn get_blob_range(
        &self,
        container: &str,
        blob: &str,
        start: u64,
        end: u64,
        verify_content: bool,
    ) -> Result<Bytes> {
        assert_container_name(container)?;
        assert_blob_name(container, blob)?;
        if start > end {
            return Err(Error::request_invalid(format!(
                "range start {start} is past range end {end}"
            )));
        }

        let mut op = OpRequest::new(
            Method::GET,
            resource_path(container, blob),
            ResourceKind::Blob,
            Permission::Read,
        )
        .header("range", format!("bytes={start}-{end}"));
        if verify_content {
            op = op.header("x-ms-range-get-content-md5", bool_header(true));
        }

        let resp = self.perform(op).await?;
        Ok(resp.into_body())
    }

    /// Fetch a blob's properties and metadata without its content.
    pub async fn get_blob_properties(
        &self,
        container: &str,
        blob: &str,
        snapshot: Option<&str>,
        lease_id: Option<&str>,
    ) -> Result<Blob> {
        assert_container_name(container)?;
        assert_blob_name(container, blob)?;

        let mut op = OpRequest::new(
            Method::HEAD,
            resource_path(container, blob),
            ResourceKind::Blob,
            Permission::Read,
        )
        .opt_header(X_MS_LEASE_ID, lease_id);
        if let Some(snapshot) = snapshot {
            op = op.query("snapshot", snapshot);
        }

        let resp = self.perform(op).await?;

        Ok(Blob {
            container: container.to_string(),
            name: blob.to_string(),
            snapshot: snapshot.map(str::to_string),
            etag: header_string(&resp, "etag"),
            last_modified: header_string(&resp, "last-modified"),
            url: format!("{}{}", self.endpoint(), resource_path(container, blob)),
            content_length: header_string(&resp, "content-length").parse().unwrap_or(0),
            content_type: header_string(&resp, "content-type"),
            content_encoding: header_string(&resp, "content-encoding"),
            content_language: header_string(&resp, "content-language"),
            cache_control: header_string(&resp, "cache-control"),
            blob_type: header_string(&resp, X_MS_BLOB_TYPE),
            lease_status: header_string(&resp, X_MS_LEASE_STATUS),
            is_prefix: false,
            metadata: parse_metadata(resp.headers()),
        })
    }

    /// Whether a blob exists. Service failures count as absence, local
    /// validation failures still propagate.
    pub async fn blob_exists(&self, container: &str, blob: &str) -> Result<bool> {
        match self.get_blob_properties(container, blob, None, None).await {
            Ok(_) => Ok(true),
            Err(e) if !e.is_validation_error() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Replace a blob's user metadata.
    pub async fn set_blob_metadata(
        &self,
        container: &str,
        blob: &str,
        metadata: &HashMap<String, String>,
        lease_id: Option<&str>,
    ) -> Result<()> {
        assert_container_name(container)?;
        assert_blob_name(container, blob)?;

        let mut op = OpRequest::new(
            Method::PUT,
            resource_path(container, blob),
            ResourceKind::Blob,
            Permission::Write,
        )
        .query("comp", "metadata")
        .opt_header(X_MS_LEASE_ID, lease_id);
        op.headers.extend(metadata_headers(metadata)?);

        self.perform(op).await?;
        Ok(())
    }

    /// Replace a blob's stored descriptive properties.
    pub async fn set_blob_properties(
        &self,
        container: &str,
        blob: &str,
        options: &PutOptions,
    ) -> Result<()> {
        assert_container_name(container)?;
        assert_blob_name(container, blob)?;

        let op = OpRequest::new(
            Method::PUT,
            resource_path(container, blob),
            ResourceKind::Blob,
            Permission::Write,
        )
        .query("comp", "properties")
        .opt_header("x-ms-blob-content-type", options.content_type.as_deref())
        .opt_header("x-ms-blob-content-encoding", options.content_encoding.as_deref())
        .opt_header("x-ms-blob-content-language", options.content_language.as_deref())
        .opt_header("x-ms-blob-cache-control", options.cache_control.as_deref())
        .opt_header(X_MS_LEASE_ID, options.lease_id.as_deref());

        self.perform(op).await?;
        Ok(())
    }

    /// Delete a blob or one of its snapshots.
    pub async fn delete_blob(
        &self,
        container: &str,
        blob: &str,
        snapshot: Option<&str>,
        lease_id: Option<&str>,
    ) -> Result<()> {
        assert_container_name(container)?;
        assert_blob_name(container, blob)?;

        let mut op = OpRequest::new(
            Method::DELETE,
            resource_path(container, blob),
            ResourceKind::Blob,
            Permission::Delete,
        )
        .opt_header(X_MS_LEASE_ID, lease_id);
        if let Some(snapshot) = snapshot {
            op = op.query("snapshot", snapshot);
        }

        self.perform(op).await?;
        Ok(())
    }

    /// Copy a blob within the account, server side.
    pub async fn copy_blob(
        &self,
        source_container: &str,
        source_blob: &str,
        destination_container: &str,
        destination_blob: &str,
        metadata: &HashMap<String, String>,
    ) -> Result<Blob> {
        assert_container_name(source_container)?;
        assert_blob_name(source_container, source_blob)?;
        assert_container_name(destination_container)?;
        assert_blob_name(destination_container, destination_blob)?;

        let mut op = OpRequest::new(
            Method::PUT,
            resource_path(destination_container, destination_blob),
            ResourceKind::Blob,
            Permission::Write,
        )
        .header(
            X_MS_COPY_SOURCE,
            resource_path(source_container, source_blob),
        );
        op.headers.extend(metadata_headers(metadata)?);

        self.perform(op).await?;

        self.get_blob_properties(destination_container, destination_blob, None, None)
            .await
    }

    /// Snapshot a blob, returning the snapshot timestamp.
    pub async fn snapshot_blob(&self, container: &str, blob: &str) -> Result<String> {
        assert_container_name(container)?;
        assert_blob_name(container, blob)?;

        let op = OpRequest::new(
            Method::PUT,
            resource_path(container, blob),
            ResourceKind::Blob,
            Permission::Write,
        )
        .query("comp", "snapshot");

        let resp = self.perform(op).await?;
        Ok(header_string(&resp, X_MS_SNAPSHOT))
    }

    /// Perform a lease operation on a blob.
    pub async fn lease_blob(
        &self,
        container: &str,
        blob: &str,
        action: LeaseAction,
        lease_id: Option<&str>,
    ) -> Result<Lease> {
        assert_container_name(container)?;
        assert_blob_name(container, blob)?;

        let op = OpRequest::new(
            Method::PUT,
            resource_path(container, blob),
            ResourceKind::Blob,
            Permission::Write,
        )
        .query("comp", "lease")
        .header(X_MS_LEASE_ACTION, action.as_str())
        .opt_header(X_MS_LEASE_ID, lease_id);

        let resp = self.perform(op).await?;

        let id = header_string(&resp, X_MS_LEASE_ID);
        let time = header_string(&resp, X_MS_LEASE_TIME);
        Ok(Lease {
            container: container.to_string(),
            blob: blob.to_string(),
            id: (!id.is_empty()).then_some(id),
            time: time.parse().ok(),
        })
    }

    /// List blobs of a container.
    ///
    /// With a delimiter the listing interleaves virtual directory prefixes
    /// (entries with `is_prefix` set) between blobs, in service order.
    /// Pagination follows continuation markers until the listing is
    /// exhausted or `max_results` is reached, then truncates to the cap.
    pub async fn list_blobs(
        &self,
        container: &str,
        prefix: Option<&str>,
        delimiter: Option<&str>,
        max_results: Option<usize>,
        marker: Option<&str>,
        include: Option<&str>,
    ) -> Result<Vec<Blob>> {
        assert_container_name(container)?;

        let mut blobs = Vec::new();
        let mut marker = marker.unwrap_or_default().to_string();

        loop {
            let mut op = OpRequest::new(
                Method::GET,
                format!("/{container}"),
                ResourceKind::Container,
                Permission::List,
            )
            .query("restype", "container")
            .query("comp", "list");

            if let Some(prefix) = prefix {
                op = op.query("prefix", prefix);
            }
            if let Some(delimiter) = delimiter {
                op = op.query("delimiter", delimiter);
            }
            if let Some(max) = max_results {
                op = op.query("maxresults", max.to_string());
            }
            if !marker.is_empty() {
                op = op.query("marker", &marker);
            }
            if let Some(include) = include {
                op = op.query("include", include);
            }

            let resp = self.perform(op).await?;
            let (page, next_marker) = xml::parse_blob_list(resp.body(), container)?;
            blobs.extend(page);
            marker = next_marker;

            let capped = max_results.map(|max| blobs.len() >= max).unwrap_or(false);
            if marker.is_empty() || capped {
                break;
            }
        }

        if let Some(max) = max_results {
            blobs.truncate(max);
        }
        Ok(blobs)
    }

    /// Build a delegated access URL for a blob or container.
    ///
    /// Requires a shared access credential, since the grant is signed with
    /// the account key it carries.
    pub fn shared_access_url(
        &self,
        container: &str,
        blob: &str,
        resource: ResourceKind,
        permissions: &str,
        start: &str,
        expiry: &str,
        identifier: &str,
    ) -> Result<String> {
        assert_container_name(container)?;

        let credential = match self.credential() {
            Credential::SharedAccess(c) => c,
            Credential::SharedKey(_) => {
                return Err(Error::request_invalid(
                    "building a shared access URL requires a shared access credential",
                ))
            }
        };

        let path = if blob.is_empty() {
            format!("/{container}")
        } else {
            resource_path(container, blob)
        };
        let query =
            credential.create_signed_query_string(&path, resource, permissions, start, expiry, identifier);

        Ok(format!("{}{path}?{query}", self.endpoint()))
    }
}

/// Attach descriptive fields, metadata and the lease to a write request.
///
/// A block list commit stores the descriptive fields through `x-ms-blob-`
/// headers; a single-request put sends them as the standard entity headers.
fn apply_put_options(mut op: OpRequest, options: &PutOptions, commit: bool) -> Result<OpRequest> {
    let (content_type, content_encoding, content_language, cache_control) = if commit {
        (
            "x-ms-blob-content-type",
            "x-ms-blob-content-encoding",
            "x-ms-blob-content-language",
            "x-ms-blob-cache-control",
        )
    } else {
        ("content-type", "content-encoding", "content-language", "cache-control")
    };

    op = op
        .opt_header(content_type, options.content_type.as_deref())
        .opt_header(content_encoding, options.content_encoding.as_deref())
        .opt_header(content_language, options.content_language.as_deref())
        .opt_header(cache_control, options.cache_control.as_deref())
        .opt_header(X_MS_LEASE_ID, options.lease_id.as_deref());
    op.headers.extend(metadata_headers(&options.metadata)?);

    Ok(op)
}
