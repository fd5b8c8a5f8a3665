//! Slack Web API client implementing [`ChatPlatform`].

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, instrument};

use checkin_core::{ChannelId, ChatPlatform, MessageHandle, MessageTs, PlatformError, UserId};

/// Connection settings for [`SlackClient`].
#[derive(Clone, Debug)]
pub struct SlackConfig {
    /// Bot token (`xoxb-...`).
    pub bot_token: String,
    /// App-level token (`xapp-...`), only needed for Socket Mode.
    pub app_token: String,
    /// Web API base, normally `https://slack.com/api`.
    pub base_url: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

/// Slack Web API client.
pub struct SlackClient {
    http: reqwest::Client,
    base_url: String,
    bot_token: String,
    app_token: String,
    identity: OnceCell<UserId>,
}

const MEMBERS_PAGE_SIZE: &str = "200";

impl SlackClient {
    /// Build a client. Fails only if the TLS backend cannot initialize.
    pub fn new(config: SlackConfig) -> Result<Self, PlatformError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("checkin/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PlatformError::Network(e.to_string()))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            bot_token: config.bot_token,
            app_token: config.app_token,
            identity: OnceCell::new(),
        })
    }

    /// Ask for a Socket Mode WebSocket URL (`apps.connections.open`).
    #[instrument(skip(self))]
    pub async fn open_connection(&self) -> Result<String, PlatformError> {
        let opened: ConnectionsOpen = self
            .call("apps.connections.open", &self.app_token, &[])
            .await?;
        Ok(opened.url)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &'static str,
        token: &str,
        params: &[(&str, &str)],
    ) -> Result<T, PlatformError> {
        let url = format!("{}/{method}", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .form(params)
            .send()
            .await
            .map_err(|e| PlatformError::Network(format!("{method}: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(PlatformError::RateLimited {
                method,
                retry_after_secs,
            });
        }
        if !status.is_success() {
            return Err(PlatformError::Api {
                method,
                code: format!("http_{}", status.as_u16()),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| PlatformError::Decode(format!("{method}: {e}")))?;
        let body = check_ok(method, body)?;
        serde_json::from_value(body).map_err(|e| PlatformError::Decode(format!("{method}: {e}")))
    }
}

/// Map Slack's `{"ok": false, "error": ...}` envelope to a typed error.
fn check_ok(method: &'static str, body: Value) -> Result<Value, PlatformError> {
    if body.get("ok").and_then(Value::as_bool) == Some(true) {
        return Ok(body);
    }
    let code = body
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown_error")
        .to_string();
    Err(match code.as_str() {
        "message_not_found" => PlatformError::MessageNotFound,
        "ratelimited" => PlatformError::RateLimited {
            method,
            retry_after_secs: None,
        },
        _ => PlatformError::Api { method, code },
    })
}

// ── Response shapes ─────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct AuthTest {
    user_id: String,
}

#[derive(Deserialize)]
struct Members {
    members: Vec<String>,
    #[serde(default)]
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: String,
}

#[derive(Deserialize)]
struct UserInfo {
    user: SlackUser,
}

#[derive(Deserialize)]
struct SlackUser {
    id: String,
    #[serde(default)]
    real_name: Option<String>,
    #[serde(default)]
    profile: Option<Profile>,
}

#[derive(Deserialize)]
struct Profile {
    #[serde(default)]
    real_name: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}

impl SlackUser {
    /// Real name, else profile real name, else display name, else the id.
    fn best_name(self) -> String {
        let profile = self.profile.unwrap_or(Profile {
            real_name: None,
            display_name: None,
        });
        [self.real_name, profile.real_name, profile.display_name]
            .into_iter()
            .flatten()
            .map(|s| s.trim().to_string())
            .find(|s| !s.is_empty())
            .unwrap_or(self.id)
    }
}

#[derive(Deserialize)]
struct Posted {
    channel: String,
    ts: String,
}

#[derive(Deserialize)]
struct ConnectionsOpen {
    url: String,
}

#[async_trait]
impl ChatPlatform for SlackClient {
    async fn identity(&self) -> Result<UserId, PlatformError> {
        self.identity
            .get_or_try_init(|| async {
                let auth: AuthTest = self.call("auth.test", &self.bot_token, &[]).await?;
                debug!(user_id = %auth.user_id, "resolved bot identity");
                Ok::<_, PlatformError>(UserId::from_raw(auth.user_id))
            })
            .await
            .cloned()
    }

    #[instrument(skip(self), fields(channel = %channel))]
    async fn list_channel_members(&self, channel: &ChannelId) -> Result<Vec<UserId>, PlatformError> {
        let mut members = Vec::new();
        let mut cursor = String::new();
        loop {
            let mut params = vec![("channel", channel.as_str()), ("limit", MEMBERS_PAGE_SIZE)];
            if !cursor.is_empty() {
                params.push(("cursor", cursor.as_str()));
            }
            let page: Members = self
                .call("conversations.members", &self.bot_token, &params)
                .await?;
            members.extend(page.members.into_iter().map(UserId::from_raw));

            cursor = page
                .response_metadata
                .map(|m| m.next_cursor)
                .unwrap_or_default();
            if cursor.is_empty() {
                break;
            }
        }
        Ok(members)
    }

    async fn display_name(&self, user: &UserId) -> Result<String, PlatformError> {
        let info: UserInfo = self
            .call("users.info", &self.bot_token, &[("user", user.as_str())])
            .await?;
        Ok(info.user.best_name())
    }

    async fn post_message(&self, channel: &ChannelId, text: &str) -> Result<MessageHandle, PlatformError> {
        let posted: Posted = self
            .call(
                "chat.postMessage",
                &self.bot_token,
                &[("channel", channel.as_str()), ("text", text)],
            )
            .await?;
        Ok(MessageHandle::new(
            ChannelId::from_raw(posted.channel),
            MessageTs::from_raw(posted.ts),
        ))
    }

    async fn update_message(&self, handle: &MessageHandle, text: &str) -> Result<(), PlatformError> {
        let _: Value = self
            .call(
                "chat.update",
                &self.bot_token,
                &[
                    ("channel", handle.channel.as_str()),
                    ("ts", handle.ts.as_str()),
                    ("text", text),
                ],
            )
            .await?;
        Ok(())
    }

    async fn add_reaction(&self, handle: &MessageHandle, reaction: &str) -> Result<(), PlatformError> {
        let result: Result<Value, _> = self
            .call(
                "reactions.add",
                &self.bot_token,
                &[
                    ("channel", handle.channel.as_str()),
                    ("timestamp", handle.ts.as_str()),
                    ("name", reaction),
                ],
            )
            .await;
        match result {
            Ok(_) => Ok(()),
            Err(PlatformError::Api { code, .. }) if code == "already_reacted" => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn post_reply(
        &self,
        channel: &ChannelId,
        thread_ts: &MessageTs,
        text: &str,
    ) -> Result<MessageHandle, PlatformError> {
        let posted: Posted = self
            .call(
                "chat.postMessage",
                &self.bot_token,
                &[
                    ("channel", channel.as_str()),
                    ("thread_ts", thread_ts.as_str()),
                    ("text", text),
                ],
            )
            .await?;
        Ok(MessageHandle::new(
            ChannelId::from_raw(posted.channel),
            MessageTs::from_raw(posted.ts),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> SlackClient {
        SlackClient::new(SlackConfig {
            bot_token: "xoxb-test".into(),
            app_token: "xapp-test".into(),
            base_url: server.uri(),
            request_timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    fn handle() -> MessageHandle {
        MessageHandle::new(ChannelId::from_raw("C1"), MessageTs::from_raw("1726000000.000100"))
    }

    #[tokio::test]
    async fn identity_is_cached() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth.test"))
            .and(header("authorization", "Bearer xoxb-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true, "user_id": "UBOT"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server);
        assert_eq!(client.identity().await.unwrap().as_str(), "UBOT");
        assert_eq!(client.identity().await.unwrap().as_str(), "UBOT");
    }

    #[tokio::test]
    async fn members_follow_cursor() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/conversations.members"))
            .and(body_string_contains("cursor=page2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "members": ["U3"],
                "response_metadata": {"next_cursor": ""}
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/conversations.members"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "members": ["U1", "U2"],
                "response_metadata": {"next_cursor": "page2"}
            })))
            .mount(&server)
            .await;

        let members = client(&server)
            .list_channel_members(&ChannelId::from_raw("C1"))
            .await
            .unwrap();
        let ids: Vec<&str> = members.iter().map(UserId::as_str).collect();
        assert_eq!(ids, ["U1", "U2", "U3"]);
    }

    #[tokio::test]
    async fn display_name_prefers_real_name() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users.info"))
            .and(body_string_contains("user=U1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "user": {"id": "U1", "real_name": "김철수", "profile": {"display_name": "cs"}}
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/users.info"))
            .and(body_string_contains("user=U2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "user": {"id": "U2", "real_name": "", "profile": {"real_name": "", "display_name": "lee"}}
            })))
            .mount(&server)
            .await;

        let client = client(&server);
        assert_eq!(client.display_name(&UserId::from_raw("U1")).await.unwrap(), "김철수");
        assert_eq!(client.display_name(&UserId::from_raw("U2")).await.unwrap(), "lee");
    }

    #[tokio::test]
    async fn update_of_deleted_message_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat.update"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"ok": false, "error": "message_not_found"})),
            )
            .mount(&server)
            .await;

        let err = client(&server).update_message(&handle(), "text").await.unwrap_err();
        assert!(matches!(err, PlatformError::MessageNotFound));
    }

    #[tokio::test]
    async fn other_update_errors_keep_their_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat.update"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"ok": false, "error": "cant_update_message"})),
            )
            .mount(&server)
            .await;

        let err = client(&server).update_message(&handle(), "text").await.unwrap_err();
        assert!(matches!(err, PlatformError::Api { method: "chat.update", ref code } if code == "cant_update_message"));
    }

    #[tokio::test]
    async fn already_reacted_is_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/reactions.add"))
            .and(body_string_contains("name=heart"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"ok": false, "error": "already_reacted"})),
            )
            .mount(&server)
            .await;

        client(&server).add_reaction(&handle(), "heart").await.unwrap();
    }

    #[tokio::test]
    async fn rate_limit_reads_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat.postMessage"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
            .mount(&server)
            .await;

        let err = client(&server)
            .post_message(&ChannelId::from_raw("C1"), "hi")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PlatformError::RateLimited {
                method: "chat.postMessage",
                retry_after_secs: Some(7)
            }
        ));
    }

    #[tokio::test]
    async fn post_reply_sends_thread_ts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat.postMessage"))
            .and(body_string_contains("thread_ts=1726000000.000100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true, "channel": "C1", "ts": "1726000001.000200"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let reply = client(&server)
            .post_reply(&ChannelId::from_raw("C1"), &MessageTs::from_raw("1726000000.000100"), "done")
            .await
            .unwrap();
        assert_eq!(reply.ts.as_str(), "1726000001.000200");
    }

    #[test]
    fn check_ok_unknown_error() {
        let err = check_ok("auth.test", json!({"ok": false})).unwrap_err();
        assert!(matches!(err, PlatformError::Api { ref code, .. } if code == "unknown_error"));
    }
}
