//! Minimal Telegram Bot API client: long-poll `getUpdates`, answer with
//! `sendMessage`. Only the fields the bot reads are modelled.

use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use markbook_core::commands::Commands;
use markbook_core::config::BotConfig;
use markbook_core::Identity;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub error_code: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Failure of a single Bot API call.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Telegram answered `ok: false`.
    #[error("{method} rejected (error_code {code:?}): {description}")]
    Rejected {
        method: &'static str,
        code: Option<i64>,
        description: String,
    },
    /// The request never got an API answer: connect, timeout or undecodable body.
    #[error("{method} transport error: {source}")]
    Transport {
        method: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{method} returned ok without a result")]
    MissingResult { method: &'static str },
}

impl ApiError {
    /// Telegram could not parse the message entities, so the same text may
    /// still go through without a `parse_mode`. Rate limits, auth failures
    /// and transport errors are not this.
    pub fn is_markup_rejection(&self) -> bool {
        match self {
            ApiError::Rejected { code, description, .. } => {
                *code == Some(400) && description.to_ascii_lowercase().contains("parse entities")
            }
            _ => false,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to_message_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'a str>,
}

pub struct TelegramClient {
    http: Client,
    /// `<api_base>/bot<token>`; never logged.
    base: String,
    parse_mode: Option<String>,
    poll_timeout_secs: u64,
}

impl TelegramClient {
    pub fn new(cfg: &BotConfig, token: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.poll_timeout_secs + 10))
            .build()
            .context("build http client")?;
        Ok(Self {
            http,
            base: format!("{}/bot{}", cfg.api_base.trim_end_matches('/'), token),
            parse_mode: (!cfg.parse_mode.is_empty()).then(|| cfg.parse_mode.clone()),
            poll_timeout_secs: cfg.poll_timeout_secs,
        })
    }

    pub fn get_updates(&self, offset: Option<i64>) -> Result<Vec<Update>> {
        let mut query = vec![("timeout", self.poll_timeout_secs.to_string())];
        if let Some(o) = offset {
            query.push(("offset", o.to_string()));
        }
        let transport = |source| ApiError::Transport { method: "getUpdates", source };
        let resp: ApiResponse<Vec<Update>> = self
            .http
            .get(format!("{}/getUpdates", self.base))
            .query(&query)
            .send()
            .map_err(transport)?
            .json()
            .map_err(transport)?;
        Ok(into_result(resp, "getUpdates")?)
    }

    /// Send `text`, falling back to plain text only if Telegram rejects the markup.
    pub fn send_message(&self, chat_id: i64, text: &str, reply_to: Option<i64>) -> Result<(), ApiError> {
        let formatted = self.send_raw(chat_id, text, reply_to, self.parse_mode.as_deref());
        match formatted {
            Err(e) if self.parse_mode.is_some() && e.is_markup_rejection() => {
                tracing::warn!(chat_id, error = %e, "formatted send rejected; retrying as plain text");
                self.send_raw(chat_id, text, reply_to, None)
            }
            other => other,
        }
    }

    fn send_raw(
        &self,
        chat_id: i64,
        text: &str,
        reply_to: Option<i64>,
        parse_mode: Option<&str>,
    ) -> Result<(), ApiError> {
        let body = SendMessage {
            chat_id,
            text,
            reply_to_message_id: reply_to,
            parse_mode,
        };
        let transport = |source| ApiError::Transport { method: "sendMessage", source };
        let resp: ApiResponse<serde_json::Value> = self
            .http
            .post(format!("{}/sendMessage", self.base))
            .json(&body)
            .send()
            .map_err(transport)?
            .json()
            .map_err(transport)?;
        into_result(resp, "sendMessage").map(|_| ())
    }
}

fn into_result<T>(resp: ApiResponse<T>, method: &'static str) -> Result<T, ApiError> {
    if !resp.ok {
        return Err(ApiError::Rejected {
            method,
            code: resp.error_code,
            description: resp.description.unwrap_or_else(|| "no description".into()),
        });
    }
    resp.result.ok_or(ApiError::MissingResult { method })
}

/// Poll forever. Per-message and transport errors are logged, never fatal.
pub fn run_polling(client: &TelegramClient, commands: &Commands) -> Result<()> {
    let mut offset: Option<i64> = None;
    let mut backoff = Duration::from_secs(1);
    tracing::info!("polling for updates");
    loop {
        let updates = match client.get_updates(offset) {
            Ok(u) => {
                backoff = Duration::from_secs(1);
                u
            }
            Err(e) => {
                tracing::warn!(error = %e, backoff_secs = backoff.as_secs(), "getUpdates failed");
                thread::sleep(backoff);
                backoff = (backoff * 2).min(Duration::from_secs(60));
                continue;
            }
        };

        for update in updates {
            offset = Some(update.update_id + 1);
            let Some(msg) = update.message else { continue };
            let Some(text) = msg.text.as_deref() else { continue };

            let identity = Identity::from(msg.chat.id);
            let reply = commands.handle_message(&identity, text);
            if let Err(e) = client.send_message(msg.chat.id, &reply, Some(msg.message_id)) {
                tracing::error!(chat_id = msg.chat.id, error = %e, "failed to send reply");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_text_and_non_text_updates() {
        let body = r#"{
            "ok": true,
            "result": [
                {"update_id": 10, "message": {"message_id": 5, "date": 0,
                    "chat": {"id": -100123, "type": "group"}, "text": "/show"}},
                {"update_id": 11, "message": {"message_id": 6, "date": 0,
                    "chat": {"id": 42, "type": "private"}, "sticker": {}}},
                {"update_id": 12, "edited_message": {}}
            ]
        }"#;
        let resp: ApiResponse<Vec<Update>> = serde_json::from_str(body).unwrap();
        let updates = into_result(resp, "getUpdates").unwrap();
        assert_eq!(updates.len(), 3);

        let first = updates[0].message.as_ref().unwrap();
        assert_eq!(first.chat.id, -100123);
        assert_eq!(first.text.as_deref(), Some("/show"));
        assert!(updates[1].message.as_ref().unwrap().text.is_none());
        assert!(updates[2].message.is_none());
    }

    #[test]
    fn api_error_carries_description() {
        let body = r#"{"ok": false, "error_code": 401, "description": "Unauthorized"}"#;
        let resp: ApiResponse<Vec<Update>> = serde_json::from_str(body).unwrap();
        let err = into_result(resp, "getUpdates").unwrap_err();
        assert!(matches!(err, ApiError::Rejected { code: Some(401), .. }));
        assert!(err.to_string().contains("Unauthorized"));
    }

    fn rejection(body: &str) -> ApiError {
        let resp: ApiResponse<serde_json::Value> = serde_json::from_str(body).unwrap();
        into_result(resp, "sendMessage").unwrap_err()
    }

    #[test]
    fn only_entity_parse_failures_fall_back_to_plain_text() {
        let markup = rejection(
            r#"{"ok": false, "error_code": 400,
                "description": "Bad Request: can't parse entities: Can't find end of the entity starting at byte offset 12"}"#,
        );
        assert!(markup.is_markup_rejection());

        let throttled = rejection(
            r#"{"ok": false, "error_code": 429, "description": "Too Many Requests: retry after 5",
                "parameters": {"retry_after": 5}}"#,
        );
        assert!(!throttled.is_markup_rejection());

        let gone = rejection(r#"{"ok": false, "error_code": 400, "description": "Bad Request: chat not found"}"#);
        assert!(!gone.is_markup_rejection());

        let empty = ApiResponse::<()> {
            ok: true,
            result: None,
            error_code: None,
            description: None,
        };
        let missing = into_result(empty, "sendMessage").unwrap_err();
        assert!(matches!(missing, ApiError::MissingResult { .. }));
        assert!(!missing.is_markup_rejection());
    }

    #[test]
    fn send_message_omits_empty_options() {
        let body = SendMessage {
            chat_id: 7,
            text: "hi",
            reply_to_message_id: None,
            parse_mode: None,
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v, serde_json::json!({"chat_id": 7, "text": "hi"}));
    }
}
