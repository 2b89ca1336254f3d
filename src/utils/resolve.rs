//! Candidate URL resolution against a mirror's origin.

use url::Url;

/// Turn a possibly relative PDF link into an absolute URL.
///
/// - `//host/path` gets an `https:` scheme.
/// - `http://` and `https://` links are used as-is.
/// - Anything else is joined onto the mirror's `scheme://host[:port]`,
///   inserting a `/` when the link does not start with one.
///
/// No percent-encoding or other normalization is applied; a malformed result
/// fails when it is fetched.
pub fn resolve_pdf_url(candidate: &str, mirror_base: &str) -> String {
    if candidate.starts_with("//") {
        return format!("https:{}", candidate);
    }

    if candidate.starts_with("http://") || candidate.starts_with("https://") {
        return candidate.to_string();
    }

    let origin = mirror_origin(mirror_base);
    if candidate.starts_with('/') {
        format!("{}{}", origin, candidate)
    } else {
        format!("{}/{}", origin, candidate)
    }
}

/// `scheme://host[:port]` of a mirror base URL.
///
/// Falls back to the raw base without trailing slashes when it cannot be parsed.
fn mirror_origin(mirror_base: &str) -> String {
    match Url::parse(mirror_base) {
        Ok(url) if url.origin().is_tuple() => url.origin().ascii_serialization(),
        _ => mirror_base.trim_end_matches('/').to_string(),
    }
}
