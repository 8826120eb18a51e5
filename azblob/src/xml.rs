//! Wire format of request and response bodies.
//!
//! Responses deserialize through quick-xml into small wire structs which
//! are converted into the crate's model types right here, so the client
//! modules never see raw XML.

use std::collections::HashMap;

use serde::Deserialize;

use azblob_core::hash::{self, base64_encode};
use azblob_core::{Error, Result};

use crate::model::{Blob, Block, BlockLists, Container, PageRange, SignedIdentifier};

fn parse<'a, T: Deserialize<'a>>(body: &'a str, what: &str) -> Result<T> {
    quick_xml::de::from_str(body)
        .map_err(|e| Error::unexpected(format!("failed to parse {what} response")).with_source(e))
}

/// Failure description returned by the service.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ServiceErrorBody {
    /// Service error code, e.g. `AuthenticationFailed`.
    #[serde(alias = "code")]
    pub code: Option<String>,
    #[serde(alias = "message")]
    pub message: Option<String>,
    /// Only present on authentication failures.
    #[serde(alias = "authenticationerrordetail")]
    pub authentication_error_detail: Option<String>,
}

/// Parse a failure response body. Bodies that are not XML yield an empty
/// description, the caller falls back to the HTTP status line.
pub(crate) fn parse_service_error(body: &[u8]) -> ServiceErrorBody {
    let body = String::from_utf8_lossy(body);
    quick_xml::de::from_str(&body).unwrap_or_default()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ContainerResults {
    containers: Option<ContainerList>,
    next_marker: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContainerList {
    #[serde(rename = "Container", default)]
    entries: Vec<ContainerEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ContainerEntry {
    name: String,
    etag: Option<String>,
    last_modified: Option<String>,
    properties: Option<ContainerProperties>,
    metadata: Option<HashMap<String, String>>,
}

#[derive(Debug, Default, Deserialize)]
struct ContainerProperties {
    #[serde(rename = "Last-Modified")]
    last_modified: Option<String>,
    #[serde(rename = "Etag")]
    etag: Option<String>,
}

/// Parse one page of a container listing into containers plus the
/// continuation marker, empty when this was the last page.
pub(crate) fn parse_container_list(body: &[u8]) -> Result<(Vec<Container>, String)> {
    let body = String::from_utf8_lossy(body);
    let results: ContainerResults = parse(&body, "container listing")?;

    let containers = results
        .containers
        .map(|list| list.entries)
        .unwrap_or_default()
        .into_iter()
        .map(|entry| {
            let properties = entry.properties.unwrap_or_default();
            Container {
                name: entry.name,
                etag: entry.etag.or(properties.etag).unwrap_or_default(),
                last_modified: entry
                    .last_modified
                    .or(properties.last_modified)
                    .unwrap_or_default(),
                metadata: entry.metadata.unwrap_or_default(),
            }
        })
        .collect();

    Ok((containers, results.next_marker.unwrap_or_default()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BlobResults {
    blobs: Option<BlobItems>,
    next_marker: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BlobItems {
    #[serde(rename = "$value", default)]
    items: Vec<BlobItem>,
}

/// Listing pages interleave blobs and virtual directory prefixes; the
/// untagged value keeps them in document order.
#[derive(Debug, Deserialize)]
enum BlobItem {
    Blob(BlobEntry),
    BlobPrefix(PrefixEntry),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BlobEntry {
    name: String,
    snapshot: Option<String>,
    url: Option<String>,
    properties: Option<BlobProperties>,
    metadata: Option<HashMap<String, String>>,
}

#[derive(Debug, Default, Deserialize)]
struct BlobProperties {
    #[serde(rename = "Last-Modified")]
    last_modified: Option<String>,
    #[serde(rename = "Etag")]
    etag: Option<String>,
    #[serde(rename = "Content-Length")]
    content_length: Option<u64>,
    #[serde(rename = "Content-Type")]
    content_type: Option<String>,
    #[serde(rename = "Content-Encoding")]
    content_encoding: Option<String>,
    #[serde(rename = "Content-Language")]
    content_language: Option<String>,
    #[serde(rename = "Cache-Control")]
    cache_control: Option<String>,
    #[serde(rename = "BlobType")]
    blob_type: Option<String>,
    #[serde(rename = "LeaseStatus")]
    lease_status: Option<String>,
}

/// Parse one page of a blob listing into blobs and prefixes, in document
/// order, plus the continuation marker.
pub(crate) fn parse_blob_list(body: &[u8], container: &str) -> Result<(Vec<Blob>, String)> {
    let body = String::from_utf8_lossy(body);
    let results: BlobResults = parse(&body, "blob listing")?;

    let blobs = results
        .blobs
        .map(|items| items.items)
        .unwrap_or_default()
        .into_iter()
        .map(|item| match item {
            BlobItem::Blob(entry) => {
                let properties = entry.properties.unwrap_or_default();
                Blob {
                    container: container.to_string(),
                    name: entry.name,
                    snapshot: entry.snapshot,
                    etag: properties.etag.unwrap_or_default(),
                    last_modified: properties.last_modified.unwrap_or_default(),
                    url: entry.url.unwrap_or_default(),
                    content_length: properties.content_length.unwrap_or_default(),
                    content_type: properties.content_type.unwrap_or_default(),
                    content_encoding: properties.content_encoding.unwrap_or_default(),
                    content_language: properties.content_language.unwrap_or_default(),
                    cache_control: properties.cache_control.unwrap_or_default(),
                    blob_type: properties.blob_type.unwrap_or_default(),
                    lease_status: properties.lease_status.unwrap_or_default(),
                    is_prefix: false,
                    metadata: entry.metadata.unwrap_or_default(),
                }
            }
            BlobItem::BlobPrefix(entry) => Blob {
                container: container.to_string(),
                name: entry.name,
                is_prefix: true,
                ..Blob::default()
            },
        })
        .collect();

    Ok((blobs, results.next_marker.unwrap_or_default()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PrefixEntry {
    name: String,
}

/// Render the commit body for a block list, one `Latest` entry per block
/// in the caller's order. Identifiers are base64-encoded here.
pub fn serialize_block_list(block_ids: &[String]) -> String {
    let mut body = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<BlockList>\n");
    for id in block_ids {
        body.push_str(&format!("  <Latest>{}</Latest>\n", base64_encode(id.as_bytes())));
    }
    body.push_str("</BlockList>");
    body
}

#[derive(Debug, Deserialize)]
struct CommitBody {
    #[serde(rename = "Latest", default)]
    latest: Vec<String>,
}

/// Parse a commit body back into block identifiers, in body order, undoing
/// the base64 transport encoding. The inverse of [`serialize_block_list`].
pub fn parse_block_list(body: &[u8]) -> Result<Vec<String>> {
    let body = String::from_utf8_lossy(body);
    let commit: CommitBody = parse(&body, "block list commit")?;

    commit
        .latest
        .into_iter()
        .map(|id| {
            let decoded = hash::base64_decode(&id)?;
            String::from_utf8(decoded).map_err(|e| {
                Error::unexpected(format!("block identifier `{id}` is not utf-8")).with_source(e)
            })
        })
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BlockListBody {
    committed_blocks: Option<BlockGroup>,
    uncommitted_blocks: Option<BlockGroup>,
}

#[derive(Debug, Default, Deserialize)]
struct BlockGroup {
    #[serde(rename = "Block", default)]
    entries: Vec<BlockEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BlockEntry {
    name: String,
    size: u64,
}

pub(crate) fn parse_block_lists(body: &[u8]) -> Result<BlockLists> {
    let body = String::from_utf8_lossy(body);
    let results: BlockListBody = parse(&body, "block list")?;

    let convert = |group: Option<BlockGroup>| {
        group
            .unwrap_or_default()
            .entries
            .into_iter()
            .map(|entry| Block {
                id: entry.name,
                size: entry.size,
            })
            .collect()
    };

    Ok(BlockLists {
        committed: convert(results.committed_blocks),
        uncommitted: convert(results.uncommitted_blocks),
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PageListBody {
    #[serde(rename = "PageRange", default)]
    ranges: Vec<PageRangeEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PageRangeEntry {
    start: u64,
    end: u64,
}

pub(crate) fn parse_page_ranges(body: &[u8]) -> Result<Vec<PageRange>> {
    let body = String::from_utf8_lossy(body);
    let results: PageListBody = parse(&body, "page range listing")?;

    Ok(results
        .ranges
        .into_iter()
        .map(|entry| PageRange {
            start: entry.start,
            end: entry.end,
        })
        .collect())
}

/// Render the body for setting a container's stored access policies.
pub(crate) fn serialize_signed_identifiers(identifiers: &[SignedIdentifier]) -> String {
    let mut body = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<SignedIdentifiers>\n");
    for identifier in identifiers {
        body.push_str(&format!(
            "  <SignedIdentifier><Id>{}</Id><AccessPolicy><Start>{}</Start><Expiry>{}</Expiry><Permission>{}</Permission></AccessPolicy></SignedIdentifier>\n",
            identifier.id, identifier.start, identifier.expiry, identifier.permissions
        ));
    }
    body.push_str("</SignedIdentifiers>");
    body
}

#[derive(Debug, Deserialize)]
struct SignedIdentifiersBody {
    #[serde(rename = "SignedIdentifier", default)]
    entries: Vec<SignedIdentifierEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SignedIdentifierEntry {
    id: String,
    access_policy: Option<AccessPolicyEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AccessPolicyEntry {
    start: Option<String>,
    expiry: Option<String>,
    permission: Option<String>,
}

pub(crate) fn parse_signed_identifiers(body: &[u8]) -> Result<Vec<SignedIdentifier>> {
    let body = String::from_utf8_lossy(body);
    let results: SignedIdentifiersBody = parse(&body, "signed identifiers")?;

    Ok(results
        .entries
        .into_iter()
        .map(|entry| {
            let policy = entry.access_policy.unwrap_or_default();
            SignedIdentifier {
                id: entry.id,
                start: policy.start.unwrap_or_default(),
                expiry: policy.expiry.unwrap_or_default(),
                permissions: policy.permission.unwrap_or_default(),
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_service_error() {
        let body = br#"<?xml version="1.0" encoding="utf-8"?>
<Error>
  <Code>AuthenticationFailed</Code>
  <Message>Server failed to authenticate the request.</Message>
  <AuthenticationErrorDetail>The MAC signature found in the HTTP request is not the same.</AuthenticationErrorDetail>
</Error>"#;

        let err = parse_service_error(body);
        assert_eq!(err.code.as_deref(), Some("AuthenticationFailed"));
        assert_eq!(
            err.message.as_deref(),
            Some("Server failed to authenticate the request.")
        );
        assert!(err.authentication_error_detail.is_some());
    }

    #[test]
    fn test_parse_service_error_tolerates_garbage() {
        let err = parse_service_error(b"not xml at all");
        assert!(err.message.is_none());
    }

    #[test]
    fn test_parse_container_list() {
        let body = br#"<?xml version="1.0" encoding="utf-8"?>
<EnumerationResults AccountName="https://myaccount.blob.core.windows.net">
  <Containers>
    <Container>
      <Name>audio</Name>
      <Url>https://myaccount.blob.core.windows.net/audio</Url>
      <Properties>
        <Last-Modified>Wed, 01 Jan 2020 00:00:00 GMT</Last-Modified>
        <Etag>0x8CACB9BD7C6B1B2</Etag>
      </Properties>
    </Container>
    <Container>
      <Name>images</Name>
      <Properties>
        <Last-Modified>Wed, 01 Jan 2020 00:00:01 GMT</Last-Modified>
        <Etag>0x8CACB9BD7C1EEEC</Etag>
      </Properties>
      <Metadata>
        <owner>docs</owner>
      </Metadata>
    </Container>
  </Containers>
  <NextMarker>video</NextMarker>
</EnumerationResults>"#;

        let (containers, marker) = parse_container_list(body).unwrap();
        assert_eq!(containers.len(), 2);
        assert_eq!(containers[0].name, "audio");
        assert_eq!(containers[0].etag, "0x8CACB9BD7C6B1B2");
        assert_eq!(containers[1].metadata.get("owner").map(String::as_str), Some("docs"));
        assert_eq!(marker, "video");
    }

    #[test]
    fn test_parse_blob_list_keeps_document_order() {
        let body = br#"<?xml version="1.0" encoding="utf-8"?>
<EnumerationResults ContainerName="https://myaccount.blob.core.windows.net/mycontainer">
  <Blobs>
    <Blob>
      <Name>a/readme.txt</Name>
      <Url>https://myaccount.blob.core.windows.net/mycontainer/a/readme.txt</Url>
      <Properties>
        <Last-Modified>Wed, 01 Jan 2020 00:00:00 GMT</Last-Modified>
        <Etag>0x8CACB9BD7C6B1B2</Etag>
        <Content-Length>1024</Content-Length>
        <Content-Type>text/plain</Content-Type>
        <BlobType>BlockBlob</BlobType>
        <LeaseStatus>unlocked</LeaseStatus>
      </Properties>
    </Blob>
    <BlobPrefix>
      <Name>b/</Name>
    </BlobPrefix>
  </Blobs>
  <NextMarker />
</EnumerationResults>"#;

        let (blobs, marker) = parse_blob_list(body, "mycontainer").unwrap();
        assert_eq!(blobs.len(), 2);
        assert_eq!(blobs[0].name, "a/readme.txt");
        assert_eq!(blobs[0].content_length, 1024);
        assert_eq!(blobs[0].blob_type, "BlockBlob");
        assert!(!blobs[0].is_prefix);
        assert_eq!(blobs[1].name, "b/");
        assert!(blobs[1].is_prefix);
        assert_eq!(marker, "");
    }

    #[test]
    fn test_serialize_block_list_encodes_and_keeps_order() {
        let ids = vec!["block-b".to_string(), "block-a".to_string()];

        assert_eq!(
            serialize_block_list(&ids),
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
             <BlockList>\n\
             \x20\x20<Latest>YmxvY2stYg==</Latest>\n\
             \x20\x20<Latest>YmxvY2stYQ==</Latest>\n\
             </BlockList>"
        );
    }

    #[test]
    fn test_block_list_commit_round_trip() {
        let ids = vec!["0000".to_string(), "0002".to_string(), "0001".to_string()];

        let body = serialize_block_list(&ids);
        assert_eq!(parse_block_list(body.as_bytes()).unwrap(), ids);
    }

    #[test]
    fn test_parse_block_lists() {
        let body = br#"<?xml version="1.0" encoding="utf-8"?>
<BlockList>
  <CommittedBlocks>
    <Block>
      <Name>QmxvY2tJZDAwMQ==</Name>
      <Size>4194304</Size>
    </Block>
  </CommittedBlocks>
  <UncommittedBlocks>
    <Block>
      <Name>QmxvY2tJZDAwMg==</Name>
      <Size>1024</Size>
    </Block>
  </UncommittedBlocks>
</BlockList>"#;

        let lists = parse_block_lists(body).unwrap();
        assert_eq!(lists.committed.len(), 1);
        assert_eq!(lists.committed[0].id, "QmxvY2tJZDAwMQ==");
        assert_eq!(lists.committed[0].size, 4194304);
        assert_eq!(lists.uncommitted.len(), 1);
        assert_eq!(lists.uncommitted[0].size, 1024);
    }

    #[test]
    fn test_parse_page_ranges() {
        let body = br#"<?xml version="1.0" encoding="utf-8"?>
<PageList>
  <PageRange>
    <Start>0</Start>
    <End>511</End>
  </PageRange>
  <PageRange>
    <Start>1024</Start>
    <End>2047</End>
  </PageRange>
</PageList>"#;

        let ranges = parse_page_ranges(body).unwrap();
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[0], PageRange { start: 0, end: 511 });
        assert_eq!(ranges[1], PageRange { start: 1024, end: 2047 });
    }

    #[test]
    fn test_signed_identifiers_round_trip() {
        let identifiers = vec![SignedIdentifier {
            id: "policy-1".to_string(),
            start: "2020-01-01T00:00:00Z".to_string(),
            expiry: "2020-01-02T00:00:00Z".to_string(),
            permissions: "rw".to_string(),
        }];

        let body = serialize_signed_identifiers(&identifiers);
        assert_eq!(parse_signed_identifiers(body.as_bytes()).unwrap(), identifiers);
    }
}
