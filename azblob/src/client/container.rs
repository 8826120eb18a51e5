//! Container operations.

use std::collections::HashMap;

use bytes::Bytes;
use http::Method;

use azblob_core::Result;

use crate::client::{
    assert_container_name, header_string, metadata_headers, parse_metadata, OpRequest,
};
use crate::constants::X_MS_BLOB_PUBLIC_ACCESS;
use crate::credential::{Permission, ResourceKind};
use crate::model::{Container, PublicAccess, SignedIdentifier};
use crate::xml;

use super::BlobClient;

impl BlobClient {
    /// Create a container, optionally with user metadata.
    pub async fn create_container(
        &self,
        container: &str,
        metadata: &HashMap<String, String>,
    ) -> Result<Container> {
        assert_container_name(container)?;

        let mut op = OpRequest::new(
            Method::PUT,
            format!("/{container}"),
            ResourceKind::Container,
            Permission::Write,
        )
        .query("restype", "container");
        op.headers.extend(metadata_headers(metadata)?);

        let resp = self.perform(op).await?;

        Ok(Container {
            name: container.to_string(),
            etag: header_string(&resp, "etag"),
            last_modified: header_string(&resp, "last-modified"),
            metadata: metadata.clone(),
        })
    }

    /// Create a container unless one with this name already exists.
    ///
    /// Returns whether the container was created by this call.
    pub async fn create_container_if_not_exists(
        &self,
        container: &str,
        metadata: &HashMap<String, String>,
    ) -> Result<bool> {
        assert_container_name(container)?;

        if self.container_exists(container).await? {
            return Ok(false);
        }

        self.create_container(container, metadata).await?;
        Ok(true)
    }

    /// Fetch a container's properties and metadata.
    pub async fn get_container(&self, container: &str) -> Result<Container> {
        assert_container_name(container)?;

        let op = OpRequest::new(
            Method::GET,
            format!("/{container}"),
            ResourceKind::Container,
            Permission::Read,
        )
        .query("restype", "container");

        let resp = self.perform(op).await?;

        Ok(Container {
            name: container.to_string(),
            etag: header_string(&resp, "etag"),
            last_modified: header_string(&resp, "last-modified"),
            metadata: parse_metadata(resp.headers()),
        })
    }

    /// User metadata attached to a container.
    pub async fn get_container_metadata(
        &self,
        container: &str,
    ) -> Result<HashMap<String, String>> {
        Ok(self.get_container(container).await?.metadata)
    }

    /// Whether a container exists, decided by a prefixed listing.
    pub async fn container_exists(&self, container: &str) -> Result<bool> {
        assert_container_name(container)?;

        let containers = self
            .list_containers(Some(container), Some(1), None, false)
            .await?;

        Ok(containers.iter().any(|c| c.name == container))
    }

    /// Delete a container and everything in it.
    pub async fn delete_container(&self, container: &str) -> Result<()> {
        assert_container_name(container)?;

        let op = OpRequest::new(
            Method::DELETE,
            format!("/{container}"),
            ResourceKind::Container,
            Permission::Delete,
        )
        .query("restype", "container");

        self.perform(op).await?;
        Ok(())
    }

    /// Replace a container's user metadata.
    pub async fn set_container_metadata(
        &self,
        container: &str,
        metadata: &HashMap<String, String>,
    ) -> Result<()> {
        assert_container_name(container)?;

        let mut op = OpRequest::new(
            Method::PUT,
            format!("/{container}"),
            ResourceKind::Container,
            Permission::Write,
        )
        .query("restype", "container")
        .query("comp", "metadata");
        op.headers.extend(metadata_headers(metadata)?);

        self.perform(op).await?;
        Ok(())
    }

    /// Anonymous access level of a container, `None` when private.
    pub async fn get_container_acl(&self, container: &str) -> Result<Option<PublicAccess>> {
        assert_container_name(container)?;

        let op = OpRequest::new(
            Method::GET,
            format!("/{container}"),
            ResourceKind::Container,
            Permission::Read,
        )
        .query("restype", "container")
        .query("comp", "acl");

        let resp = self.perform(op).await?;
        Ok(PublicAccess::parse(&header_string(&resp, X_MS_BLOB_PUBLIC_ACCESS)))
    }

    /// Stored access policies attached to a container.
    pub async fn get_container_signed_identifiers(
        &self,
        container: &str,
    ) -> Result<Vec<SignedIdentifier>> {
        assert_container_name(container)?;

        let op = OpRequest::new(
            Method::GET,
            format!("/{container}"),
            ResourceKind::Container,
            Permission::Read,
        )
        .query("restype", "container")
        .query("comp", "acl");

        let resp = self.perform(op).await?;
        xml::parse_signed_identifiers(resp.body())
    }

    /// Set a container's anonymous access level and stored access policies.
    pub async fn set_container_acl(
        &self,
        container: &str,
        public_access: Option<PublicAccess>,
        identifiers: &[SignedIdentifier],
    ) -> Result<()> {
        assert_container_name(container)?;

        let mut op = OpRequest::new(
            Method::PUT,
            format!("/{container}"),
            ResourceKind::Container,
            Permission::Write,
        )
        .query("restype", "container")
        .query("comp", "acl")
        .body(Bytes::from(xml::serialize_signed_identifiers(identifiers)));

        if let Some(access) = public_access {
            op = op.header(X_MS_BLOB_PUBLIC_ACCESS, access.as_str());
        }

        self.perform(op).await?;
        Ok(())
    }

    /// List containers of the account.
    ///
    /// Follows continuation markers page by page until the listing is
    /// exhausted or `max_results` is reached; the result is truncated to
    /// exactly `max_results` when set.
    pub async fn list_containers(
        &self,
        prefix: Option<&str>,
        max_results: Option<usize>,
        marker: Option<&str>,
        include_metadata: bool,
    ) -> Result<Vec<Container>> {
        let mut containers = Vec::new();
        let mut marker = marker.unwrap_or_default().to_string();

        loop {
            let mut op = OpRequest::new(
                Method::GET,
                "/".to_string(),
                ResourceKind::Container,
                Permission::List,
            )
            .query("comp", "list");

            if let Some(prefix) = prefix {
                op = op.query("prefix", prefix);
            }
            if let Some(max) = max_results {
                op = op.query("maxresults", max.to_string());
            }
            if !marker.is_empty() {
                op = op.query("marker", &marker);
            }
            if include_metadata {
                op = op.query("include", "metadata");
            }

            let resp = self.perform(op).await?;
            let (page, next_marker) = xml::parse_container_list(resp.body())?;
            containers.extend(page);
            marker = next_marker;

            let capped = max_results.map(|max| containers.len() >= max).unwrap_or(false);
            if marker.is_empty() || capped {
                break;
            }
        }

        if let Some(max) = max_results {
            containers.truncate(max);
        }
        Ok(containers)
    }
}
