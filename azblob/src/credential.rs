use std::fmt::{Debug, Formatter};

use azblob_core::hash;
use azblob_core::time::DateTime;
use azblob_core::utils::Redact;
use azblob_core::{Error, Result, SigningRequest};

use crate::sas::SharedAccessCredential;
use crate::sign;

/// Kind of storage resource a request addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// A container.
    Container,
    /// A blob inside a container.
    Blob,
    /// Resource kind could not be determined.
    Unknown,
}

impl ResourceKind {
    /// Single-letter token used on the wire (`sr` query parameter).
    pub fn token(&self) -> &'static str {
        match self {
            ResourceKind::Container => "c",
            ResourceKind::Blob => "b",
            ResourceKind::Unknown => "",
        }
    }

    /// Grant tokens that satisfy a request for this resource kind.
    ///
    /// A grant scoped to a whole container also covers the blobs inside it,
    /// so a blob request accepts both `b` and `c` grants.
    pub(crate) fn accepted_grants(&self) -> &'static str {
        match self {
            ResourceKind::Container => "c",
            ResourceKind::Blob => "bc",
            ResourceKind::Unknown => "",
        }
    }
}

/// Permission required by an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Read resource content and properties.
    Read,
    /// Create or update a resource.
    Write,
    /// Delete a resource.
    Delete,
    /// Enumerate resources.
    List,
}

impl Permission {
    /// Single-letter token used on the wire (`sp` query parameter).
    pub fn token(&self) -> char {
        match self {
            Permission::Read => 'r',
            Permission::Write => 'w',
            Permission::Delete => 'd',
            Permission::List => 'l',
        }
    }
}

/// Account credential for SharedKey request signing.
///
/// The account key is base64-decoded once at construction so every signature
/// afterwards works on raw key bytes.
#[derive(Clone)]
pub struct SharedKeyCredential {
    /// Storage account name.
    pub account_name: String,
    pub(crate) account_key: Vec<u8>,
    /// Whether the account is addressed path-style (`host/account/...`)
    /// instead of host-style (`account.host/...`).
    pub use_path_style_uri: bool,
}

impl SharedKeyCredential {
    /// Create a credential from the account name and its base64-encoded key.
    pub fn new(account_name: impl Into<String>, account_key: &str) -> Result<Self> {
        let account_key = hash::base64_decode(account_key)
            .map_err(|e| Error::config_invalid("account key is not valid base64").with_source(e))?;

        Ok(Self {
            account_name: account_name.into(),
            account_key,
            use_path_style_uri: false,
        })
    }

    /// Address the account path-style, as development storage does.
    pub fn with_path_style_uri(mut self, enable: bool) -> Self {
        self.use_path_style_uri = enable;
        self
    }
}

impl Debug for SharedKeyCredential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let key = hash::base64_encode(&self.account_key);
        f.debug_struct("SharedKeyCredential")
            .field("account_name", &self.account_name)
            .field("account_key", &Redact::from(&key))
            .field("use_path_style_uri", &self.use_path_style_uri)
            .finish()
    }
}

/// Credential used by the client to authorize requests.
#[derive(Clone, Debug)]
pub enum Credential {
    /// Sign request headers with the account key.
    SharedKey(SharedKeyCredential),
    /// Append a matching shared access grant to the request URL.
    SharedAccess(SharedAccessCredential),
}

impl Credential {
    /// Storage account name this credential belongs to.
    pub fn account_name(&self) -> &str {
        match self {
            Credential::SharedKey(c) => &c.account_name,
            Credential::SharedAccess(c) => &c.account_name,
        }
    }

    /// Whether requests address the account path-style.
    pub fn use_path_style_uri(&self) -> bool {
        match self {
            Credential::SharedKey(c) => c.use_path_style_uri,
            Credential::SharedAccess(c) => c.use_path_style_uri,
        }
    }

    /// Rewrite the request URL before it is sent.
    ///
    /// SharedKey leaves the URL unchanged. Shared access credentials append
    /// the query string of the first registered grant that covers the
    /// requested resource and permission, or leave the URL unchanged when no
    /// grant matches.
    pub fn sign_request_url(
        &self,
        ctx: &mut SigningRequest,
        kind: ResourceKind,
        permission: Permission,
    ) -> Result<()> {
        match self {
            Credential::SharedKey(_) => Ok(()),
            Credential::SharedAccess(c) => c.sign_request_url(ctx, kind, permission),
        }
    }

    /// Rewrite the request headers before it is sent.
    ///
    /// SharedKey canonicalizes the request and inserts the `Authorization`
    /// header. Shared access credentials leave the headers unchanged.
    pub fn sign_request_headers(
        &self,
        ctx: &mut SigningRequest,
        for_table_storage: bool,
        body_len: Option<u64>,
        now: DateTime,
    ) -> Result<()> {
        match self {
            Credential::SharedKey(c) => {
                sign::sign_request_headers(c, ctx, for_table_storage, body_len, now)
            }
            Credential::SharedAccess(_) => Ok(()),
        }
    }
}
