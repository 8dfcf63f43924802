// SPDX-FileCopyrightText: 2026 Tbmux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Small helpers for reading request parameters the way the upstream API
//! does: URL query and form-urlencoded bodies first, JSON bodies overlaid
//! when the media type says so.

use axum::http::{header::CONTENT_TYPE, HeaderMap};

/// True when the request's media type (parameters stripped) equals
/// `expected`, case-insensitively.
pub(crate) fn content_type_is(headers: &HeaderMap, expected: &str) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| ct.split(';').next())
        .map(|essence| essence.trim().eq_ignore_ascii_case(expected))
        .unwrap_or(false)
}

/// Find the last occurrence of a form field in an urlencoded byte string.
pub(crate) fn form_field(bytes: &[u8], name: &str) -> Option<String> {
    let mut found = None;
    for (k, v) in form_urlencoded::parse(bytes) {
        if k == name {
            found = Some(v.into_owned());
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn content_type_matching_ignores_parameters_and_case() {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("Application/JSON; charset=utf-8"),
        );
        assert!(content_type_is(&headers, "application/json"));
        assert!(!content_type_is(&headers, "application/x-www-form-urlencoded"));
    }

    #[test]
    fn absent_content_type_matches_nothing() {
        let headers = HeaderMap::new();
        assert!(!content_type_is(&headers, "application/json"));
    }

    #[test]
    fn form_field_takes_the_last_value() {
        assert_eq!(
            form_field(b"chat_id=1&text=hi&chat_id=7", "chat_id").as_deref(),
            Some("7")
        );
        assert_eq!(form_field(b"text=hi", "chat_id"), None);
    }

    #[test]
    fn form_field_decodes_escapes() {
        assert_eq!(
            form_field(b"text=hello+world%21", "text").as_deref(),
            Some("hello world!")
        );
    }
}
