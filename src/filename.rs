//! Filename derivation for fetched images
//!
//! Maps a source URL to a filesystem-safe filename. Derivation never fails:
//! URLs that cannot be parsed or carry no usable path fall back to a name
//! built from the SHA-256 of the raw URL, so the same input always yields
//! the same name.
//!
//! Image-optimizer URLs (`nextjs.org/_next/image?url=...` and the
//! `vercel-storage.com` equivalent) are unwrapped so the archive entry is
//! named after the original image rather than the proxy endpoint.

use sha2::{Digest, Sha256};
use std::borrow::Cow;
use tracing::debug;
use url::Url;

/// Extensions that may be borrowed from the outer URL path
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Extension used when nothing better is known
pub const DEFAULT_EXTENSION: &str = "jpg";

/// Prefix of hash-based fallback names
pub const HASHED_NAME_PREFIX: &str = "image_";

/// Path marker of the Next.js image optimizer
const NEXT_IMAGE_PATH: &str = "/_next/image";

/// Longest filename produced, in bytes
const MAX_FILENAME_LEN: usize = 200;

/// Derive a safe local filename for `raw_url`
///
/// The result always has an alphanumeric extension and only contains
/// characters from `[A-Za-z0-9._-]`.
///
/// # Examples
///
/// ```
/// use image_dl::filename::derive_filename;
///
/// assert_eq!(derive_filename("https://cdn.example.com/photos/cat.png"), "cat.png");
/// assert_eq!(
///     derive_filename("https://nextjs.org/_next/image?url=https%3A%2F%2Fx.com%2Fpic.png&w=100"),
///     "pic.png"
/// );
/// assert!(derive_filename("https://example.com").starts_with("image_"));
/// ```
#[must_use]
pub fn derive_filename(raw_url: &str) -> String {
    let parsed = match Url::parse(raw_url) {
        Ok(parsed) => parsed,
        Err(e) => {
            debug!(url = raw_url, error = %e, "unparseable URL, using hashed filename");
            return format!("{}.{}", hashed_name(raw_url), DEFAULT_EXTENSION);
        }
    };

    let outer_path = percent_decode_lossy(parsed.path());

    let name = unwrap_proxy(&parsed)
        .or_else(|| basename(&outer_path).map(str::to_string))
        .unwrap_or_else(|| hashed_name(raw_url));

    let name = if extension(&name).is_some() {
        name
    } else {
        let borrowed = outer_path
            .rsplit('/')
            .next()
            .and_then(extension)
            .map(str::to_ascii_lowercase)
            .filter(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()));
        format!(
            "{}.{}",
            name,
            borrowed.as_deref().unwrap_or(DEFAULT_EXTENSION)
        )
    };

    truncate(sanitize(&name))
}

/// Deterministic fallback name: `image_` plus the first 8 bytes of the URL's SHA-256
#[must_use]
pub fn hashed_name(raw_url: &str) -> String {
    let digest = Sha256::digest(raw_url.as_bytes());
    let hex: String = digest[..8].iter().map(|b| format!("{:02x}", b)).collect();
    format!("{}{}", HASHED_NAME_PREFIX, hex)
}

/// Replace every character outside `[A-Za-z0-9.-_]` with `_`
#[must_use]
pub fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Filename carried by an image-optimizer URL, if `url` is one
fn unwrap_proxy(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    let path = url.path();

    let is_proxy = (host == "nextjs.org" && path.starts_with(NEXT_IMAGE_PATH))
        || (host == "vercel-storage.com" && path.contains(NEXT_IMAGE_PATH));
    if !is_proxy {
        return None;
    }

    let (_, raw_inner) = url.query_pairs().find(|(key, _)| key == "url")?;
    if raw_inner.is_empty() {
        return None;
    }

    let inner = match urlencoding::decode(&raw_inner) {
        Ok(inner) => inner.into_owned(),
        Err(e) => {
            debug!(url = %url, error = %e, "proxy url parameter is not valid UTF-8");
            return None;
        }
    };

    // Inner URLs are often site-relative ("/images/pic.png"), which Url cannot parse
    let inner_path = match Url::parse(&inner) {
        Ok(parsed) => percent_decode_lossy(parsed.path()).into_owned(),
        Err(_) => inner
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };

    basename(&inner_path).map(str::to_string)
}

/// Last non-empty path segment, ignoring trailing slashes
fn basename(path: &str) -> Option<&str> {
    let last = path.trim_end_matches('/').rsplit('/').next()?;
    if last.is_empty() || last.chars().all(|c| c == '.') {
        None
    } else {
        Some(last)
    }
}

/// Extension of `name`: a non-empty alphanumeric run after the last dot,
/// preceded by a non-empty stem
fn extension(name: &str) -> Option<&str> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext)
}

fn percent_decode_lossy(s: &str) -> Cow<'_, str> {
    match urlencoding::decode(s) {
        Ok(decoded) => decoded,
        Err(_) => Cow::Borrowed(s),
    }
}

/// Shorten over-long names, keeping the extension
fn truncate(name: String) -> String {
    if name.len() <= MAX_FILENAME_LEN {
        return name;
    }
    match name.rsplit_once('.') {
        Some((stem, ext)) if ext.len() < MAX_FILENAME_LEN / 2 => {
            let keep = MAX_FILENAME_LEN - ext.len() - 1;
            format!("{}.{}", &stem[..keep.min(stem.len())], ext)
        }
        _ => name[..MAX_FILENAME_LEN].to_string(),
    }
}
