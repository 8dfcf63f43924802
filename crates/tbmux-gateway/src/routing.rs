// SPDX-FileCopyrightText: 2026 Tbmux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Segment-wise prefix matching with the auth token embedded in the path.
//!
//! Downstream requests carry the shared token as the suffix of the last
//! prefix segment, mirroring the upstream `/bot<TOKEN>/<method>` layout.
//! Matching distinguishes "this is not our prefix" (404) from "our prefix
//! with the wrong token" (401) so token typos are diagnosable.

use percent_encoding::percent_decode_str;

/// Outcome of matching a request path against a configured prefix.
#[derive(Debug, PartialEq, Eq)]
pub enum PrefixMatch {
    /// The prefix and token matched; carries the still-escaped remainder
    /// (method name or file id, possibly containing `/`).
    Hit(String),
    /// The prefix matched but the token did not.
    Unauthorized,
    /// The path is not under this prefix, or has no remainder.
    Miss,
}

/// Match an escaped request path against prefix segments plus token.
///
/// Non-final prefix segments compare exactly after path-unescaping; the
/// final one must be the configured segment completed with the auth token.
pub fn match_prefix(escaped_path: &str, prefix: &[String], auth_token: &str) -> PrefixMatch {
    let seg_count = prefix.len();
    let parts: Vec<&str> = escaped_path.splitn(seg_count + 1, '/').collect();
    for (i, want) in prefix.iter().enumerate() {
        let Some(part) = parts.get(i) else {
            return PrefixMatch::Miss;
        };
        let Ok(seg) = percent_decode_str(part).decode_utf8() else {
            return PrefixMatch::Miss;
        };
        if i == seg_count - 1 {
            if !seg.starts_with(want.as_str()) {
                return PrefixMatch::Miss;
            }
            let expected = format!("{want}{auth_token}");
            if seg.as_ref() != expected {
                return PrefixMatch::Unauthorized;
            }
        } else if seg.as_ref() != want.as_str() {
            return PrefixMatch::Miss;
        }
    }
    match parts.get(seg_count) {
        Some(suffix) if !suffix.is_empty() => PrefixMatch::Hit((*suffix).to_string()),
        _ => PrefixMatch::Miss,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bot_prefix() -> Vec<String> {
        vec![String::new(), "bot".to_string()]
    }

    #[test]
    fn matching_prefix_yields_suffix() {
        assert_eq!(
            match_prefix("/botSECRET/sendMessage", &bot_prefix(), "SECRET"),
            PrefixMatch::Hit("sendMessage".to_string())
        );
    }

    #[test]
    fn wrong_token_is_unauthorized() {
        assert_eq!(
            match_prefix("/botWRONG/sendMessage", &bot_prefix(), "SECRET"),
            PrefixMatch::Unauthorized
        );
    }

    #[test]
    fn missing_token_is_unauthorized() {
        assert_eq!(
            match_prefix("/bot/sendMessage", &bot_prefix(), "SECRET"),
            PrefixMatch::Unauthorized
        );
    }

    #[test]
    fn foreign_path_is_a_miss() {
        assert_eq!(
            match_prefix("/healthz", &bot_prefix(), "SECRET"),
            PrefixMatch::Miss
        );
    }

    #[test]
    fn missing_suffix_is_a_miss() {
        assert_eq!(
            match_prefix("/botSECRET", &bot_prefix(), "SECRET"),
            PrefixMatch::Miss
        );
        assert_eq!(
            match_prefix("/botSECRET/", &bot_prefix(), "SECRET"),
            PrefixMatch::Miss
        );
    }

    #[test]
    fn suffix_keeps_inner_slashes() {
        let file_prefix = vec![String::new(), "file".to_string(), "bot".to_string()];
        assert_eq!(
            match_prefix(
                "/file/botSECRET/photos/file_0.jpg",
                &file_prefix,
                "SECRET"
            ),
            PrefixMatch::Hit("photos/file_0.jpg".to_string())
        );
    }

    #[test]
    fn escaped_prefix_segments_are_decoded_before_comparing() {
        assert_eq!(
            match_prefix("/%62otSECRET/getMe", &bot_prefix(), "SECRET"),
            PrefixMatch::Hit("getMe".to_string())
        );
    }

    #[test]
    fn nested_prefix_requires_every_segment() {
        let prefix = vec![
            String::new(),
            "proxy".to_string(),
            "v1".to_string(),
            "bot".to_string(),
        ];
        assert_eq!(
            match_prefix("/proxy/v1/botSECRET/getMe", &prefix, "SECRET"),
            PrefixMatch::Hit("getMe".to_string())
        );
        assert_eq!(
            match_prefix("/proxy/v2/botSECRET/getMe", &prefix, "SECRET"),
            PrefixMatch::Miss
        );
    }
}
