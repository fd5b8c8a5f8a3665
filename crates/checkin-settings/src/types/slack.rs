use serde::{Deserialize, Serialize};

/// Slack connection settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SlackSettings {
    /// Bot token (`xoxb-...`) for Web API calls.
    pub bot_token: String,
    /// App-level token (`xapp-...`) for Socket Mode.
    pub app_token: String,
    /// The one channel the challenge runs in.
    pub channel_id: String,
    /// Web API base URL. Overridden in tests.
    pub api_base_url: String,
    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: u64,
    /// Upper bound for socket reconnect backoff in milliseconds.
    pub max_reconnect_backoff_ms: u64,
}

impl Default for SlackSettings {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            app_token: String::new(),
            channel_id: String::new(),
            api_base_url: "https://slack.com/api".to_string(),
            request_timeout_ms: 10_000,
            max_reconnect_backoff_ms: 30_000,
        }
    }
}
