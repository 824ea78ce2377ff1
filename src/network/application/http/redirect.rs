//! Redirect target resolution.
//!
//! A redirect is followed by re-entering the session's request path with the
//! resolved URL. There is no hop limit: a server that keeps redirecting keeps
//! the client recursing.

use super::url::Url;
use alloc::format;
use alloc::string::String;

/// Status codes that, together with a `location` header, trigger a redirect.
pub(crate) fn is_redirect(status: u16) -> bool {
    (300..=399).contains(&status)
}

/// Resolves `location` against the URL of the request that produced it.
///
/// - `http...` is taken verbatim;
/// - `/path` is joined with the origin of `base`;
/// - anything else replaces the last path segment, each leading `../`
///   removing one more segment.
pub fn resolve(base: &Url, location: &str) -> String {
    if location.starts_with("http") {
        return String::from(location);
    }
    if location.starts_with('/') {
        return format!("{}{}", base.origin(), location);
    }

    let mut dir = parent(&base.path);
    let mut target = location;
    while let Some(rest) = target.strip_prefix("../") {
        dir = parent(dir);
        target = rest;
    }
    format!("{}{}/{}", base.origin(), dir, target)
}

fn parent(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(dir, _)| dir)
}
