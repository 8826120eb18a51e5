//! Shared access signatures.
//!
//! A shared access credential carries an ordered set of grant URLs, each a
//! resource URL with a signed query string attached. Requests are authorized
//! by appending the query string of the first grant that covers the
//! requested resource and permission, instead of signing headers with the
//! account key.

use std::fmt::{Debug, Formatter};

use log::debug;

use azblob_core::hash;
use azblob_core::utils::Redact;
use azblob_core::{Error, Result, SigningRequest};

use crate::credential::{Permission, ResourceKind};

/// Credential for delegated access via shared access signatures.
#[derive(Clone)]
pub struct SharedAccessCredential {
    /// Storage account name.
    pub account_name: String,
    account_key: Vec<u8>,
    /// Whether the account is addressed path-style.
    pub use_path_style_uri: bool,
    /// Ordered grant URLs consulted on every request. The first match wins.
    pub permission_set: Vec<String>,
}

impl SharedAccessCredential {
    /// Create a credential from the account name and its base64-encoded key.
    pub fn new(account_name: impl Into<String>, account_key: &str) -> Result<Self> {
        let account_key = hash::base64_decode(account_key)
            .map_err(|e| Error::config_invalid("account key is not valid base64").with_source(e))?;

        Ok(Self {
            account_name: account_name.into(),
            account_key,
            use_path_style_uri: false,
            permission_set: Vec::new(),
        })
    }

    /// Address the account path-style, as development storage does.
    pub fn with_path_style_uri(mut self, enable: bool) -> Self {
        self.use_path_style_uri = enable;
        self
    }

    /// Replace the grant set consulted when signing request URLs.
    ///
    /// Every grant must address this credential's account.
    pub fn with_permission_set(mut self, permission_set: Vec<String>) -> Result<Self> {
        for grant in &permission_set {
            self.assert_grant_account(grant)?;
        }
        self.permission_set = permission_set;
        Ok(self)
    }

    /// Append a grant URL to the set consulted when signing request URLs.
    pub fn register_grant(&mut self, grant_url: impl Into<String>) -> Result<()> {
        let grant_url = grant_url.into();
        self.assert_grant_account(&grant_url)?;
        self.permission_set.push(grant_url);
        Ok(())
    }

    fn assert_grant_account(&self, grant_url: &str) -> Result<()> {
        if !grant_url.contains(&self.account_name) {
            return Err(Error::config_invalid(format!(
                "grant URL does not address account `{}`",
                self.account_name
            )));
        }
        Ok(())
    }

    /// Compute the base64 signature over the five-line grant description.
    ///
    /// ## Format
    ///
    /// ```text
    /// Permissions + "\n" +
    /// Start + "\n" +
    /// Expiry + "\n" +
    /// CanonicalizedResource + "\n" +
    /// Identifier;
    /// ```
    ///
    /// Start and identifier render as empty lines when absent, they are
    /// never dropped from the string.
    pub fn create_signature(
        &self,
        path: &str,
        permissions: &str,
        start: &str,
        expiry: &str,
        identifier: &str,
    ) -> String {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };

        let string_to_sign =
            format!("{permissions}\n{start}\n{expiry}\n/{}{path}\n{identifier}", self.account_name);
        debug!("string to sign: {}", &string_to_sign);

        hash::base64_hmac_sha256(&self.account_key, string_to_sign.as_bytes())
    }

    /// Render the signed query string for a grant.
    ///
    /// Emits `st`, `se`, `sr`, `sp`, `si` and `sig` in that order, omitting
    /// `st` and `si` entirely when empty. Values that can carry reserved
    /// characters are urlencoded.
    pub fn create_signed_query_string(
        &self,
        path: &str,
        resource: ResourceKind,
        permissions: &str,
        start: &str,
        expiry: &str,
        identifier: &str,
    ) -> String {
        let signature = self.create_signature(path, permissions, start, expiry, identifier);

        let mut parts: Vec<String> = Vec::with_capacity(6);
        if !start.is_empty() {
            parts.push(format!("st={}", urlencode(start)));
        }
        parts.push(format!("se={}", urlencode(expiry)));
        parts.push(format!("sr={}", resource.token()));
        parts.push(format!("sp={permissions}"));
        if !identifier.is_empty() {
            parts.push(format!("si={}", urlencode(identifier)));
        }
        parts.push(format!("sig={}", urlencode(&signature)));

        parts.join("&")
    }

    /// Whether a grant URL covers a request.
    ///
    /// The grant path must be a prefix of the request path, the grant `sr`
    /// must name an accepted resource kind and the grant `sp` must contain
    /// the required permission token. Expiry is not checked locally, the
    /// service is the authority on grant lifetime.
    pub(crate) fn permission_matches_request(
        &self,
        grant_url: &str,
        request_path: &str,
        kind: ResourceKind,
        permission: Permission,
    ) -> bool {
        let grant: http::Uri = match grant_url.parse() {
            Ok(uri) => uri,
            Err(_) => return false,
        };

        if !request_path.starts_with(grant.path()) {
            return false;
        }

        let accepted = kind.accepted_grants();
        let required = permission.token();

        let mut resource_ok = false;
        let mut permission_ok = false;
        if let Some(query) = grant.query() {
            for (k, v) in form_urlencoded::parse(query.as_bytes()) {
                match k.as_ref() {
                    "sr" => resource_ok = v.chars().any(|c| accepted.contains(c)),
                    "sp" => permission_ok = v.contains(required),
                    _ => {}
                }
            }
        }

        resource_ok && permission_ok
    }

    /// Append the query string of the first matching grant to the request.
    ///
    /// The request is left unchanged when no grant matches; the service
    /// then decides whether anonymous access suffices.
    pub fn sign_request_url(
        &self,
        ctx: &mut SigningRequest,
        kind: ResourceKind,
        permission: Permission,
    ) -> Result<()> {
        let grant = self
            .permission_set
            .iter()
            .find(|grant| self.permission_matches_request(grant, &ctx.path, kind, permission));

        let Some(grant) = grant else {
            debug!("no grant covers {} {}", ctx.method, ctx.path);
            return Ok(());
        };

        let uri: http::Uri = grant.parse()?;
        if let Some(query) = uri.query() {
            for (k, v) in form_urlencoded::parse(query.as_bytes()) {
                ctx.query_push(k.into_owned(), v.into_owned());
            }
        }

        Ok(())
    }
}

impl Debug for SharedAccessCredential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let key = hash::base64_encode(&self.account_key);
        f.debug_struct("SharedAccessCredential")
            .field("account_name", &self.account_name)
            .field("account_key", &Redact::from(&key))
            .field("use_path_style_uri", &self.use_path_style_uri)
            .field("permission_set", &self.permission_set)
            .finish()
    }
}

fn urlencode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{DEVSTORE_ACCOUNT, DEVSTORE_KEY};
    use pretty_assertions::assert_eq;

    fn devstore_credential() -> SharedAccessCredential {
        SharedAccessCredential::new(DEVSTORE_ACCOUNT, DEVSTORE_KEY).unwrap()
    }

    #[test]
    fn test_create_signature() {
        let cred = devstore_credential();

        assert_eq!(
            cred.create_signature("/mycontainer/readme.txt", "r", "", "2020-01-01T00:00:00Z", ""),
            "Zw10y+tIdijV+ULcOPLWqkyj+86ajPy0LFyrCJOoh7I="
        );
    }

    #[test]
    fn test_create_signature_with_start_and_identifier() {
        let cred = devstore_credential();

        assert_eq!(
            cred.create_signature(
                "/mycontainer",
                "w",
                "2020-01-01T00:00:00Z",
                "2020-01-02T00:00:00Z",
                "policy-1",
            ),
            "C2kwuboPl4WLip8K3R2f0BdUQUdgR2Dowml8Fban+rA="
        );
    }

    #[test]
    fn test_signed_query_string_omits_empty_fields() {
        let cred = devstore_credential();

        let query = cred.create_signed_query_string(
            "/mycontainer/readme.txt",
            ResourceKind::Blob,
            "r",
            "",
            "2020-01-01T00:00:00Z",
            "",
        );

        assert_eq!(
            query,
            "se=2020-01-01T00%3A00%3A00Z&sr=b&sp=r&sig=Zw10y%2BtIdijV%2BULcOPLWqkyj%2B86ajPy0LFyrCJOoh7I%3D"
        );
    }

    #[test]
    fn test_signed_query_string_with_start_and_identifier() {
        let cred = devstore_credential();

        let query = cred.create_signed_query_string(
            "/mycontainer",
            ResourceKind::Container,
            "w",
            "2020-01-01T00:00:00Z",
            "2020-01-02T00:00:00Z",
            "policy-1",
        );

        assert_eq!(
            query,
            "st=2020-01-01T00%3A00%3A00Z&se=2020-01-02T00%3A00%3A00Z&sr=c&sp=w&si=policy-1&sig=C2kwuboPl4WLip8K3R2f0BdUQUdgR2Dowml8Fban%2BrA%3D"
        );
    }

    fn grant_for(cred: &SharedAccessCredential, path: &str, kind: ResourceKind, sp: &str) -> String {
        let query = cred.create_signed_query_string(path, kind, sp, "", "2020-01-01T00:00:00Z", "");
        format!("http://127.0.0.1:10000/devstoreaccount1{path}?{query}")
    }

    #[test]
    fn test_first_matching_grant_wins() {
        let mut cred = devstore_credential();
        let read = grant_for(&cred, "/mycontainer/readme.txt", ResourceKind::Blob, "r");
        let write = grant_for(&cred, "/mycontainer/readme.txt", ResourceKind::Blob, "w");
        cred.register_grant(read).unwrap();
        cred.register_grant(write).unwrap();

        let mut parts = http::Request::get(
            "http://127.0.0.1:10000/devstoreaccount1/mycontainer/readme.txt",
        )
        .body(())
        .unwrap()
        .into_parts()
        .0;
        let mut ctx = SigningRequest::build(&mut parts).unwrap();
        cred.sign_request_url(&mut ctx, ResourceKind::Blob, Permission::Read)
            .unwrap();

        assert_eq!(
            ctx.query.iter().find(|(k, _)| k == "sp").map(|(_, v)| v.as_str()),
            Some("r")
        );
    }

    #[test]
    fn test_unmatched_request_is_left_unchanged() {
        let mut cred = devstore_credential();
        cred.register_grant(grant_for(
            &cred,
            "/mycontainer/readme.txt",
            ResourceKind::Blob,
            "r",
        ))
        .unwrap();

        let mut parts = http::Request::put(
            "http://127.0.0.1:10000/devstoreaccount1/mycontainer/readme.txt",
        )
        .body(())
        .unwrap()
        .into_parts()
        .0;
        let mut ctx = SigningRequest::build(&mut parts).unwrap();
        cred.sign_request_url(&mut ctx, ResourceKind::Blob, Permission::Write)
            .unwrap();

        assert!(ctx.query.is_empty());
    }

    #[test]
    fn container_grant_subsumes_blob_read() {
        let mut cred = devstore_credential();
        cred.register_grant(grant_for(&cred, "/mycontainer", ResourceKind::Container, "r"))
            .unwrap();

        let mut parts = http::Request::get(
            "http://127.0.0.1:10000/devstoreaccount1/mycontainer/readme.txt",
        )
        .body(())
        .unwrap()
        .into_parts()
        .0;
        let mut ctx = SigningRequest::build(&mut parts).unwrap();
        cred.sign_request_url(&mut ctx, ResourceKind::Blob, Permission::Read)
            .unwrap();

        assert!(ctx.query.iter().any(|(k, _)| k == "sig"));
    }

    #[test]
    fn test_grant_path_must_prefix_request_path() {
        let cred = devstore_credential();
        let grant = grant_for(&cred, "/mycontainer", ResourceKind::Container, "r");

        assert!(cred.permission_matches_request(
            &grant,
            "/devstoreaccount1/mycontainer/readme.txt",
            ResourceKind::Blob,
            Permission::Read,
        ));
        assert!(!cred.permission_matches_request(
            &grant,
            "/devstoreaccount1/othercontainer/readme.txt",
            ResourceKind::Blob,
            Permission::Read,
        ));
    }

    #[test]
    fn test_grant_for_another_account_is_rejected() {
        let mut cred = devstore_credential();

        let err = cred
            .register_grant("http://otherhost:10000/otheraccount/c?sr=c&sp=r&sig=x")
            .unwrap_err();
        assert!(err.is_validation_error());
        assert!(cred.permission_set.is_empty());

        let err = SharedAccessCredential::new(DEVSTORE_ACCOUNT, DEVSTORE_KEY)
            .unwrap()
            .with_permission_set(vec!["http://otherhost:10000/otheraccount/c?sr=c".to_string()])
            .unwrap_err();
        assert!(err.is_validation_error());
    }

    #[test]
    fn test_unknown_resource_kind_never_matches() {
        let cred = devstore_credential();
        let grant = grant_for(&cred, "/mycontainer", ResourceKind::Container, "rwdl");

        assert!(!cred.permission_matches_request(
            &grant,
            "/devstoreaccount1/mycontainer",
            ResourceKind::Unknown,
            Permission::Read,
        ));
    }
}
