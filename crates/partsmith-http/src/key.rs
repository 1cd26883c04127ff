//! Object key naming and `Content-Disposition` rendering.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use rand::Rng;

/// Characters left as-is in the quoted `filename="..."` form.
const TRADITIONAL_ESCAPE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b' ')
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'+')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~')
    .remove(b'-');

/// Characters left as-is in the RFC 5987 `filename*=UTF-8''...` form.
const RFC5987_ESCAPE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~')
    .remove(b'-');

/// Generate a fresh object key: `[prefix/]<32 hex chars>[.ext]`.
///
/// The extension is taken verbatim from `filename` (see [`extension`]).
///
/// # Examples
///
/// ```
/// use partsmith_http::key::generate_key;
///
/// let key = generate_key(Some("cache"), Some("nature.jpg"));
/// assert!(key.starts_with("cache/"));
/// assert!(key.ends_with(".jpg"));
/// assert_eq!(key.len(), "cache/".len() + 32 + ".jpg".len());
/// ```
#[must_use]
pub fn generate_key(prefix: Option<&str>, filename: Option<&str>) -> String {
    let mut token = [0u8; 16];
    rand::rng().fill(&mut token);

    let ext = filename.and_then(extension).unwrap_or_default();
    let name = format!("{}{ext}", hex::encode(token));

    match prefix.map(|p| p.trim_end_matches('/')) {
        Some(p) if !p.is_empty() => format!("{p}/{name}"),
        _ => name,
    }
}

/// The extension of `filename`, dot included.
///
/// Only the final path component counts. Leading dots do not start an
/// extension (`.bashrc` has none) and a trailing dot yields none.
#[must_use]
pub fn extension(filename: &str) -> Option<&str> {
    let base = filename.rsplit('/').next().unwrap_or(filename);
    let stem_start = base.len() - base.trim_start_matches('.').len();
    let rest = &base[stem_start..];
    let dot = rest.rfind('.')?;
    if dot + 1 == rest.len() {
        return None;
    }
    Some(&rest[dot..])
}

/// Render an `inline` `Content-Disposition` value for `filename`.
///
/// Non-ASCII characters become `?` in the quoted form (then escaped), and the
/// exact UTF-8 name is carried by the `filename*` parameter.
///
/// # Examples
///
/// ```
/// use partsmith_http::key::content_disposition;
///
/// assert_eq!(
///     content_disposition("nature.jpg"),
///     "inline; filename=\"nature.jpg\"; filename*=UTF-8''nature.jpg"
/// );
/// ```
#[must_use]
pub fn content_disposition(filename: &str) -> String {
    let ascii: String = filename
        .chars()
        .map(|c| if c.is_ascii() { c } else { '?' })
        .collect();
    format!(
        "inline; filename=\"{}\"; filename*=UTF-8''{}",
        utf8_percent_encode(&ascii, TRADITIONAL_ESCAPE_SET),
        utf8_percent_encode(filename, RFC5987_ESCAPE_SET),
    )
}
