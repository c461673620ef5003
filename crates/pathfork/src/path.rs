//! Path normalization and parameter decoding.

use std::borrow::Cow;

use crate::config::RouterConfig;

/// Normalize a pattern or request path according to `config`: collapse
/// double slashes and strip one trailing slash (keeping root `/`).
///
/// Borrows the input when nothing needs to change.
pub fn normalize_path<'a>(path: &'a str, config: &RouterConfig) -> Cow<'a, str> {
    let mut path = Cow::Borrowed(path);

    if config.ignore_duplicate_slashes && path.contains("//") {
        let mut normalized = String::with_capacity(path.len());
        let mut prev_slash = false;

        for ch in path.chars() {
            if ch == '/' {
                if !prev_slash {
                    normalized.push('/');
                }
                prev_slash = true;
            } else {
                normalized.push(ch);
                prev_slash = false;
            }
        }

        path = Cow::Owned(normalized);
    }

    if config.ignore_trailing_slash && path.len() > 1 && path.ends_with('/') {
        path = match path {
            Cow::Borrowed(p) => Cow::Borrowed(&p[..p.len() - 1]),
            Cow::Owned(mut p) => {
                p.pop();
                Cow::Owned(p)
            }
        };
    }

    path
}

/// Percent-decode a captured parameter value. Values that do not decode to
/// UTF-8 are returned unchanged.
pub fn decode_param(value: &str) -> String {
    if !value.contains('%') {
        return value.to_string();
    }
    urlencoding::decode(value)
        .map(Cow::into_owned)
        .unwrap_or_else(|_| value.to_string())
}
