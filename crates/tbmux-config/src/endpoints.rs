// SPDX-FileCopyrightText: 2026 Tbmux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runtime endpoints derived from the validated configuration.
//!
//! The upstream prefixes are full URL prefixes (base URL + percent-encoded
//! token); the downstream prefixes are path-unescaped segment lists matched
//! against incoming request paths. Both file prefixes are derived from their
//! API siblings by inserting `file` before the last segment, mirroring the
//! upstream `/file/bot<TOKEN>/...` layout.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

use crate::model::TbmuxConfig;
use crate::validation::ConfigError;

/// Characters percent-encoded when embedding the auth token as a URL path
/// segment. Everything a path segment cannot carry verbatim, including `/`.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Everything the router and the upstream clients need that is derived,
/// rather than read, from the configuration.
#[derive(Debug, Clone)]
pub struct Endpoints {
    /// Upstream API prefix: `api_url` + escaped token.
    pub api_prefix: String,
    /// Upstream file-download prefix: `file_url` + escaped token.
    pub file_prefix: String,
    /// `filter_update_types` as a query-escaped JSON array, ready to embed
    /// in the `allowed_updates` form field.
    pub allowed_updates: String,
    /// Downstream API prefix as unescaped path segments.
    pub api_segments: Vec<String>,
    /// Downstream file prefix as unescaped path segments.
    pub file_segments: Vec<String>,
}

impl Endpoints {
    /// Derive the runtime endpoints from a validated configuration.
    pub fn resolve(config: &TbmuxConfig) -> Result<Self, ConfigError> {
        let token = utf8_percent_encode(&config.upstream.auth_token, PATH_SEGMENT).to_string();
        let api_prefix = format!("{}{token}", config.upstream.api_url);

        let file_url = match &config.upstream.file_url {
            Some(url) if !url.is_empty() => url.clone(),
            _ => derive_file_url(&config.upstream.api_url)?,
        };
        let file_prefix = format!("{file_url}{token}");

        let filter_json = serde_json::to_string(&config.upstream.filter_update_types)
            .map_err(|e| ConfigError::Invalid {
                message: format!("upstream.filter_update_types is invalid: {e}"),
            })?;
        let allowed_updates: String = form_urlencoded::byte_serialize(filter_json.as_bytes())
            .collect();

        let api_segments = split_path(&config.downstream.api_path)?;
        let mut file_segments = api_segments.clone();
        file_segments.insert(file_segments.len() - 1, "file".to_string());

        Ok(Self {
            api_prefix,
            file_prefix,
            allowed_updates,
            api_segments,
            file_segments,
        })
    }
}

/// Insert `file/` before the last path segment of an API base URL:
/// `https://host/bot` becomes `https://host/file/bot`.
fn derive_file_url(api_url: &str) -> Result<String, ConfigError> {
    match api_url.rfind('/') {
        Some(idx) if idx > 0 => Ok(format!("{}/file{}", &api_url[..idx], &api_url[idx..])),
        _ => Err(ConfigError::Invalid {
            message: format!("cannot derive upstream.file_url from api_url `{api_url}`"),
        }),
    }
}

/// Split an escaped URL path into unescaped segments.
fn split_path(path: &str) -> Result<Vec<String>, ConfigError> {
    path.split('/')
        .map(|seg| {
            percent_decode_str(seg)
                .decode_utf8()
                .map(|s| s.into_owned())
                .map_err(|e| ConfigError::Invalid {
                    message: format!("downstream.api_path is invalid: {e}"),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_tokens() -> TbmuxConfig {
        let mut config = TbmuxConfig::default();
        config.upstream.auth_token = "123456:AA/BB CC".to_string();
        config.downstream.listen_addr = "127.0.0.1:8081".to_string();
        config.downstream.auth_token = "secret".to_string();
        config
    }

    #[test]
    fn api_prefix_escapes_token() {
        let endpoints = Endpoints::resolve(&config_with_tokens()).unwrap();
        assert_eq!(
            endpoints.api_prefix,
            "https://api.telegram.org/bot123456:AA%2FBB%20CC"
        );
    }

    #[test]
    fn file_url_derived_from_api_url() {
        let endpoints = Endpoints::resolve(&config_with_tokens()).unwrap();
        assert!(endpoints
            .file_prefix
            .starts_with("https://api.telegram.org/file/bot"));
    }

    #[test]
    fn explicit_file_url_wins() {
        let mut config = config_with_tokens();
        config.upstream.file_url = Some("https://files.example.net/dl/".to_string());
        let endpoints = Endpoints::resolve(&config).unwrap();
        assert!(endpoints
            .file_prefix
            .starts_with("https://files.example.net/dl/"));
    }

    #[test]
    fn downstream_segments_include_file_sibling() {
        let endpoints = Endpoints::resolve(&config_with_tokens()).unwrap();
        assert_eq!(endpoints.api_segments, vec!["", "bot"]);
        assert_eq!(endpoints.file_segments, vec!["", "file", "bot"]);
    }

    #[test]
    fn nested_api_path_keeps_order() {
        let mut config = config_with_tokens();
        config.downstream.api_path = "/proxy/v1/bot".to_string();
        let endpoints = Endpoints::resolve(&config).unwrap();
        assert_eq!(endpoints.api_segments, vec!["", "proxy", "v1", "bot"]);
        assert_eq!(endpoints.file_segments, vec!["", "proxy", "v1", "file", "bot"]);
    }

    #[test]
    fn allowed_updates_is_escaped_json() {
        let mut config = config_with_tokens();
        config.upstream.filter_update_types =
            vec!["message".to_string(), "callback_query".to_string()];
        let endpoints = Endpoints::resolve(&config).unwrap();
        assert_eq!(
            endpoints.allowed_updates,
            "%5B%22message%22%2C%22callback_query%22%5D"
        );
    }

    #[test]
    fn empty_filter_escapes_to_empty_array() {
        let endpoints = Endpoints::resolve(&config_with_tokens()).unwrap();
        assert_eq!(endpoints.allowed_updates, "%5B%5D");
    }
}
