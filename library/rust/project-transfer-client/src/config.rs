use std::time::Duration;

/// デフォルトのリクエストタイムアウト。
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// `TransferClientConfig` は `HttpTransport` の接続設定。
///
/// `base_url` にはバージョン付き API ルート（例: `https://gitlab.example.com/api/v4`）を指定する。
#[derive(Debug, Clone)]
pub struct TransferClientConfig {
    pub base_url: String,
    pub private_token: Option<String>,
    pub timeout: Duration,
    pub user_agent: String,
}

impl TransferClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            private_token: None,
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("k1s0-project-transfer-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    pub fn with_private_token(mut self, token: impl Into<String>) -> Self {
        self.private_token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}
