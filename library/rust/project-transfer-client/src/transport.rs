use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use tracing::{debug, warn};

use crate::config::TransferClientConfig;
use crate::error::TransferError;
use crate::multipart::EncodedForm;

/// アクセストークンを送るヘッダー名。
pub const PRIVATE_TOKEN_HEADER: &str = "PRIVATE-TOKEN";

/// 管理者トークンで別ユーザーとして実行するときのヘッダー名。
pub const SUDO_HEADER: &str = "Sudo";

/// 1 回の呼び出しだけに適用するリクエストオプション。
///
/// `timeout` はクライアント全体のタイムアウトより優先される。
/// `headers` は同名の既定ヘッダー（`PRIVATE-TOKEN` など）を置き換える。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    pub timeout: Option<Duration>,
    pub headers: Vec<(HeaderName, HeaderValue)>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// ヘッダーを追加する。名前または値が HTTP ヘッダーとして不正なら `Validation` を返す。
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, TransferError> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| TransferError::Validation(format!("ヘッダー名が不正です: {name}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| TransferError::Validation(format!("ヘッダー値が不正です: {name}: {e}")))?;
        self.headers.push((name, value));
        Ok(self)
    }

    /// この呼び出しだけ別のアクセストークンを使う。
    pub fn with_private_token(self, token: &str) -> Result<Self, TransferError> {
        self.with_header(PRIVATE_TOKEN_HEADER, token)
    }

    /// この呼び出しを指定ユーザーとして実行する。
    pub fn with_sudo(self, user: &str) -> Result<Self, TransferError> {
        self.with_header(SUDO_HEADER, user)
    }

    fn header_map(&self) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in &self.headers {
            map.append(name.clone(), value.clone());
        }
        map
    }
}

/// リクエストボディ。
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    Multipart(EncodedForm),
}

/// API ルートからの相対パスで表した 1 回分のリクエスト。
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: RequestBody,
    pub options: RequestOptions,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            body: RequestBody::Empty,
            options: RequestOptions::default(),
        }
    }

    pub fn post(path: impl Into<String>, body: RequestBody) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            body,
            options: RequestOptions::default(),
        }
    }

    pub fn with_options(mut self, options: &RequestOptions) -> Self {
        self.options = options.clone();
        self
    }
}

/// 共有トランスポート。成功レスポンスのボディをそのまま返し、
/// 非成功ステータスは `TransferError::Api` に変換して返す。
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> Result<Vec<u8>, TransferError>;
}

/// reqwest による `Transport` 実装。
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
    private_token: Option<String>,
}

impl HttpTransport {
    /// 新しい `HttpTransport` を生成する。
    ///
    /// `config.base_url` が空、または http(s) の絶対 URL でない場合は
    /// `TransferError::InvalidConfig` を返す。
    pub fn new(config: TransferClientConfig) -> Result<Self, TransferError> {
        let base_url = config.base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(TransferError::InvalidConfig(
                "base_url が設定されていません".into(),
            ));
        }
        let parsed = reqwest::Url::parse(&base_url).map_err(|e| {
            TransferError::InvalidConfig(format!("base_url が不正です: {base_url}: {e}"))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") || !parsed.has_host() {
            return Err(TransferError::InvalidConfig(format!(
                "base_url は http(s) の URL である必要があります: {base_url}"
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .build()
            .map_err(|e| TransferError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            private_token: config.private_token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, TransferError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        let message = api_error_message(&body);
        warn!(status = status.as_u16(), message = %message, "API エラーレスポンス");
        Err(TransferError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

/// エラーレスポンスのボディから `message` / `error` フィールドを取り出す。
/// JSON でない場合はボディ全体をそのまま使う。
fn api_error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.to_string();
    };
    match value.get("message").or_else(|| value.get("error")) {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => body.to_string(),
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: ApiRequest) -> Result<Vec<u8>, TransferError> {
        debug!(method = %request.method, path = %request.path, "API リクエスト送信");

        let mut builder = self.http.request(request.method, self.url(&request.path));
        if let Some(ref token) = self.private_token {
            builder = builder.header(PRIVATE_TOKEN_HEADER, token);
        }
        if !request.options.headers.is_empty() {
            builder = builder.headers(request.options.header_map());
        }
        if let Some(timeout) = request.options.timeout {
            builder = builder.timeout(timeout);
        }
        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Multipart(form) => builder
                .header(CONTENT_TYPE, form.content_type)
                .body(form.body),
        };

        let resp = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransferError::Timeout
            } else {
                TransferError::Connection(e.to_string())
            }
        })?;
        let resp = Self::check_status(resp).await?;
        let bytes = resp.bytes().await.map_err(|e| {
            if e.is_timeout() {
                TransferError::Timeout
            } else {
                TransferError::Connection(e.to_string())
            }
        })?;
        Ok(bytes.to_vec())
    }
}
