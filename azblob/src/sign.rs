//! SharedKey request signing.
//!
//! Canonicalizes a request into the newline-joined string the service
//! expects, signs it with HMAC-SHA256 under the account key, and attaches
//! the resulting `Authorization` header.

use std::fmt::Write;

use http::header;
use log::debug;

use azblob_core::hash::base64_hmac_sha256;
use azblob_core::time::{format_http_date, DateTime};
use azblob_core::{Result, SigningRequest};

use crate::constants::{PREFIX_STORAGE_HEADER, X_MS_DATE};
use crate::credential::SharedKeyCredential;

pub(crate) fn sign_request_headers(
    cred: &SharedKeyCredential,
    ctx: &mut SigningRequest,
    for_table_storage: bool,
    body_len: Option<u64>,
    now: DateTime,
) -> Result<()> {
    let string_to_sign = string_to_sign(ctx, cred, for_table_storage, body_len, now)?;
    let signature = base64_hmac_sha256(&cred.account_key, string_to_sign.as_bytes());

    let mut value: http::HeaderValue =
        format!("SharedKey {}:{signature}", cred.account_name).parse()?;
    value.set_sensitive(true);
    ctx.headers.insert(header::AUTHORIZATION, value);

    Ok(())
}

/// Construct the string to sign.
///
/// ## Format
///
/// ```text
/// VERB + "\n" +
/// Content-Encoding + "\n" +
/// Content-Language + "\n" +
/// Content-Length + "\n" +
/// Content-MD5 + "\n" +
/// Content-Type + "\n" +
/// Date + "\n" +
/// If-Modified-Since + "\n" +
/// If-Match + "\n" +
/// If-None-Match + "\n" +
/// If-Unmodified-Since + "\n" +
/// Range + "\n" +
/// CanonicalizedHeaders +
/// CanonicalizedResource;
/// ```
///
/// The `Date` slot stays empty. The request is dated through the
/// `x-ms-date` header instead, which canonicalization inserts when the
/// caller has not set one.
fn string_to_sign(
    ctx: &mut SigningRequest,
    cred: &SharedKeyCredential,
    for_table_storage: bool,
    body_len: Option<u64>,
    now: DateTime,
) -> Result<String> {
    let mut s = String::new();

    writeln!(&mut s, "{}", ctx.method.as_str())?;
    writeln!(&mut s, "{}", ctx.header_get_or_default(&header::CONTENT_ENCODING)?)?;
    writeln!(&mut s, "{}", ctx.header_get_or_default(&header::CONTENT_LANGUAGE)?)?;
    writeln!(&mut s, "{}", content_length_for(ctx, body_len))?;
    writeln!(&mut s, "{}", ctx.header_get_or_default(&"content-md5".parse()?)?)?;
    writeln!(&mut s, "{}", ctx.header_get_or_default(&header::CONTENT_TYPE)?)?;
    writeln!(&mut s)?;
    writeln!(&mut s, "{}", ctx.header_get_or_default(&header::IF_MODIFIED_SINCE)?)?;
    writeln!(&mut s, "{}", ctx.header_get_or_default(&header::IF_MATCH)?)?;
    writeln!(&mut s, "{}", ctx.header_get_or_default(&header::IF_NONE_MATCH)?)?;
    writeln!(&mut s, "{}", ctx.header_get_or_default(&header::IF_UNMODIFIED_SINCE)?)?;
    writeln!(&mut s, "{}", ctx.header_get_or_default(&header::RANGE)?)?;

    let canonicalized_headers = canonicalize_header(ctx, now)?;
    if !for_table_storage && !canonicalized_headers.is_empty() {
        writeln!(&mut s, "{canonicalized_headers}")?;
    }
    write!(&mut s, "{}", canonicalize_resource(ctx, cred))?;

    debug!("string to sign: {}", &s);
    Ok(s)
}

/// The Content-Length slot.
///
/// Requests without a payload by their verb (GET, DELETE, HEAD) sign an
/// empty slot; every other verb signs the byte length of the body, `0` when
/// there is none.
fn content_length_for(ctx: &SigningRequest, body_len: Option<u64>) -> String {
    match ctx.method {
        http::Method::GET | http::Method::DELETE | http::Method::HEAD => String::new(),
        _ => body_len.unwrap_or(0).to_string(),
    }
}

/// Inserts `x-ms-date` when the caller has not set one, then renders all
/// `x-ms-` headers as sorted lowercase `name:value` lines.
fn canonicalize_header(ctx: &mut SigningRequest, now: DateTime) -> Result<String> {
    if !ctx.headers.contains_key(X_MS_DATE) {
        ctx.headers.insert(X_MS_DATE, format_http_date(now).parse()?);
    }

    Ok(SigningRequest::header_to_string(
        ctx.header_to_vec_with_prefix(PREFIX_STORAGE_HEADER),
        ":",
        "\n",
    ))
}

/// `/{account}{path}` plus one `\n{key}:{value}` line per query parameter,
/// sorted by key, with decoded values.
///
/// Development storage addresses the account path-style, which doubles the
/// account segment: the account name is both the authority and the first
/// path component.
fn canonicalize_resource(ctx: &SigningRequest, cred: &SharedKeyCredential) -> String {
    let mut path = ctx.path.as_str();
    if cred.use_path_style_uri {
        path = match path[1..].find('/') {
            Some(idx) => &path[idx + 1..],
            None => "/",
        };
    }

    let mut s = String::new();

    s.push('/');
    s.push_str(&cred.account_name);
    if cred.use_path_style_uri {
        s.push('/');
        s.push_str(&cred.account_name);
    }
    s.push_str(path);

    let mut query = ctx.query.clone();
    query.sort();
    for (k, v) in query {
        s.push('\n');
        s.push_str(&k.to_lowercase());
        s.push(':');
        s.push_str(&v);
    }

    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{DEVSTORE_ACCOUNT, DEVSTORE_KEY};
    use azblob_core::time::parse_rfc3339;
    use http::Request;
    use pretty_assertions::assert_eq;

    fn devstore_credential() -> SharedKeyCredential {
        SharedKeyCredential::new(DEVSTORE_ACCOUNT, DEVSTORE_KEY).unwrap()
    }

    fn test_time() -> DateTime {
        parse_rfc3339("2020-01-01T00:00:00Z").unwrap()
    }

    fn signing_request(method: http::Method, uri: &str) -> SigningRequest {
        let mut parts = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-ms-version", "2009-09-19")
            .body(())
            .unwrap()
            .into_parts()
            .0;
        SigningRequest::build(&mut parts).unwrap()
    }

    #[test]
    fn test_get_blob_signature() {
        let cred = devstore_credential();
        let mut ctx = signing_request(
            http::Method::GET,
            "https://devstoreaccount1.blob.core.windows.net/mycontainer/readme.txt",
        );

        sign_request_headers(&cred, &mut ctx, false, None, test_time()).unwrap();

        assert_eq!(
            ctx.headers.get(header::AUTHORIZATION).unwrap(),
            "SharedKey devstoreaccount1:a9SHZDjpk9/GvP2egofmBV92505SQbGjgHSer3YvCw4="
        );
        assert_eq!(
            ctx.headers.get(X_MS_DATE).unwrap(),
            "Wed, 01 Jan 2020 00:00:00 GMT"
        );
    }

    #[test]
    fn test_put_block_signature_covers_query() {
        let cred = devstore_credential();
        let mut ctx = signing_request(
            http::Method::PUT,
            "https://devstoreaccount1.blob.core.windows.net/mycontainer/readme.txt?comp=block&blockid=MDAwMA%3D%3D",
        );

        sign_request_headers(&cred, &mut ctx, false, Some(12), test_time()).unwrap();

        assert_eq!(
            ctx.headers.get(header::AUTHORIZATION).unwrap(),
            "SharedKey devstoreaccount1:YAHJRX+Gm3pFJne8j7TQ9DkQkuWydABskrNsfSw7rkM="
        );
    }

    #[test]
    fn test_caller_supplied_date_is_kept() {
        let cred = devstore_credential();
        let mut parts = Request::get("https://devstoreaccount1.blob.core.windows.net/c/b")
            .header("x-ms-date", "Thu, 02 Jan 2020 00:00:00 GMT")
            .body(())
            .unwrap()
            .into_parts()
            .0;
        let mut ctx = SigningRequest::build(&mut parts).unwrap();

        sign_request_headers(&cred, &mut ctx, false, None, test_time()).unwrap();

        assert_eq!(
            ctx.headers.get(X_MS_DATE).unwrap(),
            "Thu, 02 Jan 2020 00:00:00 GMT"
        );
    }

    #[test]
    fn test_content_length_slot_by_verb() {
        let get = signing_request(http::Method::GET, "https://a.example.net/c");
        assert_eq!(content_length_for(&get, None), "");

        let put = signing_request(http::Method::PUT, "https://a.example.net/c");
        assert_eq!(content_length_for(&put, None), "0");
        assert_eq!(content_length_for(&put, Some(42)), "42");
    }

    #[test]
    fn test_path_style_doubles_account() {
        let cred = devstore_credential().with_path_style_uri(true);
        let ctx = signing_request(
            http::Method::GET,
            "http://127.0.0.1:10000/devstoreaccount1/mycontainer?restype=container&comp=list",
        );

        assert_eq!(
            canonicalize_resource(&ctx, &cred),
            "/devstoreaccount1/devstoreaccount1/mycontainer\ncomp:list\nrestype:container"
        );
    }

    #[test]
    fn test_signature_varies_with_input() {
        let cred = devstore_credential();
        let base = "https://devstoreaccount1.blob.core.windows.net/mycontainer/readme.txt";

        let mut signatures = Vec::new();
        for (method, uri, body_len) in [
            (http::Method::GET, base.to_string(), None),
            (http::Method::DELETE, base.to_string(), None),
            (http::Method::GET, format!("{base}2"), None),
            (http::Method::GET, format!("{base}?comp=metadata"), None),
            (http::Method::PUT, base.to_string(), Some(1)),
            (http::Method::PUT, base.to_string(), Some(2)),
        ] {
            let mut ctx = signing_request(method, &uri);
            sign_request_headers(&cred, &mut ctx, false, body_len, test_time()).unwrap();
            let auth = ctx.headers.get(header::AUTHORIZATION).unwrap();
            signatures.push(auth.to_str().unwrap().to_string());
        }

        // A changed canonical header value must change the signature too.
        let mut ctx = signing_request(http::Method::GET, base);
        ctx.headers.insert("x-ms-version", "2011-08-18".parse().unwrap());
        sign_request_headers(&cred, &mut ctx, false, None, test_time()).unwrap();
        let auth = ctx.headers.get(header::AUTHORIZATION).unwrap();
        signatures.push(auth.to_str().unwrap().to_string());

        signatures.sort();
        signatures.dedup();
        assert_eq!(signatures.len(), 7);
    }
}
