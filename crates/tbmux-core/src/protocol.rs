// SPDX-FileCopyrightText: 2026 Tbmux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bot API wire-protocol tables shared by the poller, forwarder, and gateway.
//!
//! The upstream API wraps every response in `{"ok":true,"result":...}` or
//! `{"ok":false,"error_code":N,"description":S}`; tbmux speaks the same
//! envelope to its downstream clients.

use serde::Serialize;

/// User agent sent on every upstream request, replacing whatever the
/// downstream client supplied.
pub const HTTP_USER_AGENT: &str = concat!("Mozilla/5.0 tbmux/", env!("CARGO_PKG_VERSION"));

/// Cap on request bodies read for parameter extraction (32 MiB).
pub const HTTP_BODY_LIMIT: usize = 32 << 20;

/// Update kinds whose payload is a message object. Updates of these kinds
/// feed the message cache alongside the update log.
pub const MESSAGE_UPDATE_KINDS: [&str; 6] = [
    "message",
    "edited_message",
    "channel_post",
    "edited_channel_post",
    "business_message",
    "edited_business_message",
];

/// Returns true when `kind` carries a message object as its payload.
pub fn is_message_kind(kind: &str) -> bool {
    MESSAGE_UPDATE_KINDS.contains(&kind)
}

/// Maps an API method name to the synthetic update kind emitted from its
/// successful response, or `None` for methods that produce no messages.
///
/// The edit methods may answer with `result: true` instead of a message
/// object (inline-keyboard edits on messages the bot does not own); the
/// caller skips the echo in that case.
pub fn echo_update_kind(method: &str) -> Option<&'static str> {
    match method {
        "sendMessage" | "forwardMessage" | "copyMessage" | "sendPhoto" | "sendAudio"
        | "sendDocument" | "sendVideo" | "sendAnimation" | "sendVoice" | "sendVideoNote"
        | "sendPaidMedia" | "sendMediaGroup" | "sendLocation" | "sendVenue" | "sendContact"
        | "sendPoll" | "sendDice" => Some("message"),
        "editMessageText" | "editMessageCaption" | "editMessageMedia"
        | "editMessageLiveLocation" | "stopMessageLiveLocation" | "editMessageReplyMarkup" => {
            Some("edited_message")
        }
        _ => None,
    }
}

/// The `ok:false` response envelope sent for locally-generated errors.
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub ok: bool,
    pub error_code: u16,
    pub description: String,
}

impl ErrorEnvelope {
    /// Builds an envelope for an HTTP status code with its canonical reason.
    pub fn from_status(code: u16, description: impl Into<String>) -> Self {
        Self {
            ok: false,
            error_code: code,
            description: description.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_kinds_cover_edited_and_business_variants() {
        assert!(is_message_kind("message"));
        assert!(is_message_kind("edited_business_message"));
        assert!(!is_message_kind("callback_query"));
        assert!(!is_message_kind("update_id"));
    }

    #[test]
    fn send_methods_echo_messages() {
        assert_eq!(echo_update_kind("sendMessage"), Some("message"));
        assert_eq!(echo_update_kind("sendMediaGroup"), Some("message"));
        assert_eq!(echo_update_kind("copyMessage"), Some("message"));
    }

    #[test]
    fn edit_methods_echo_edited_messages() {
        assert_eq!(echo_update_kind("editMessageText"), Some("edited_message"));
        assert_eq!(
            echo_update_kind("stopMessageLiveLocation"),
            Some("edited_message")
        );
    }

    #[test]
    fn non_message_methods_echo_nothing() {
        assert_eq!(echo_update_kind("getMe"), None);
        assert_eq!(echo_update_kind("deleteMessage"), None);
        assert_eq!(echo_update_kind("answerCallbackQuery"), None);
    }

    #[test]
    fn error_envelope_serializes_to_api_shape() {
        let body = serde_json::to_string(&ErrorEnvelope::from_status(404, "Not Found")).unwrap();
        assert_eq!(
            body,
            r#"{"ok":false,"error_code":404,"description":"Not Found"}"#
        );
    }
}
