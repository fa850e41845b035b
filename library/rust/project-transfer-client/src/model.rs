use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TransferError;

/// 構造体を人間可読なテキスト（compact JSON）へ変換する。
///
/// エンティティの `Display` と multipart の `override_params` フィールドで同じ表現を使う。
pub fn stringify<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(value)
}

/// エクスポートジョブの状態。状態キーを返さないサーバーでは `None` になる。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportStatus {
    #[default]
    None,
    Scheduled,
    Started,
    Finished,
    Failed,
    RegenerationInProgress,
    #[serde(other)]
    Unknown,
}

impl ExportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Scheduled => "scheduled",
            Self::Started => "started",
            Self::Finished => "finished",
            Self::Failed => "failed",
            Self::RegenerationInProgress => "regeneration_in_progress",
            Self::Unknown => "unknown",
        }
    }

    /// `finished` と `failed` だけが終端状態。
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Failed)
    }
}

impl fmt::Display for ExportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// インポートジョブの状態。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    #[default]
    None,
    Scheduled,
    Started,
    Finished,
    Failed,
    #[serde(other)]
    Unknown,
}

impl ImportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Scheduled => "scheduled",
            Self::Started => "started",
            Self::Finished => "finished",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Failed)
    }
}

impl fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 完了したエクスポートのダウンロードリンク。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportLinks {
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub web_url: Option<String>,
}

impl ExportLinks {
    fn is_empty(&self) -> bool {
        self.api_url.as_deref().map_or(true, str::is_empty)
            && self.web_url.as_deref().map_or(true, str::is_empty)
    }
}

/// サーバー側のエクスポート進捗のスナップショット。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportJob {
    pub id: u64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub name_with_namespace: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub path_with_namespace: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub export_status: ExportStatus,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(rename = "_links", default, skip_serializing_if = "Option::is_none")]
    pub links: Option<ExportLinks>,
}

impl ExportJob {
    /// `finished` のときだけリンクを返す。それ以外の状態のリンクは無視する。
    pub fn download_links(&self) -> Option<&ExportLinks> {
        if self.export_status != ExportStatus::Finished {
            return None;
        }
        self.links.as_ref().filter(|links| !links.is_empty())
    }
}

impl fmt::Display for ExportJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = stringify(self).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

/// サーバー側のインポート進捗のスナップショット。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ImportJobWire")]
pub struct ImportJob {
    pub id: u64,
    pub description: Option<String>,
    pub name: String,
    pub name_with_namespace: String,
    pub path: String,
    pub path_with_namespace: String,
    pub created_at: Option<DateTime<Utc>>,
    pub import_status: ImportStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub import_error: Option<String>,
}

/// `ImportJob` の受信形式。
///
/// 古いサーバーは作成日時を `create_at` で返し、両方のキーを返すものもある。
/// 両方ある場合は `created_at` を優先する。
#[derive(Deserialize)]
struct ImportJobWire {
    id: u64,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    name_with_namespace: String,
    #[serde(default)]
    path: String,
    #[serde(default)]
    path_with_namespace: String,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    create_at: Option<DateTime<Utc>>,
    #[serde(default)]
    import_status: ImportStatus,
    #[serde(default)]
    import_error: Option<String>,
}

impl From<ImportJobWire> for ImportJob {
    fn from(wire: ImportJobWire) -> Self {
        Self {
            id: wire.id,
            description: wire.description,
            name: wire.name,
            name_with_namespace: wire.name_with_namespace,
            path: wire.path,
            path_with_namespace: wire.path_with_namespace,
            created_at: wire.created_at.or(wire.create_at),
            import_status: wire.import_status,
            import_error: wire.import_error,
        }
    }
}

impl fmt::Display for ImportJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = stringify(self).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

/// push 型配信で使う HTTP メソッド。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UploadHttpMethod {
    Put,
    Post,
}

/// エクスポート完了時にアーカイブをアップロードする先。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportUpload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_method: Option<UploadHttpMethod>,
}

/// `schedule_export` のオプション。設定したフィールドだけがリクエストに含まれる。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleExportOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload: Option<ExportUpload>,
}

impl ScheduleExportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_upload(mut self, url: impl Into<String>, http_method: UploadHttpMethod) -> Self {
        self.upload = Some(ExportUpload {
            url: Some(url.into()),
            http_method: Some(http_method),
        });
        self
    }
}

/// ファイルからのインポート 1 回分の入力。送信後は破棄される。
#[derive(Debug, Clone, PartialEq)]
pub struct ImportSubmission {
    pub namespace: String,
    pub path: String,
    pub name: Option<String>,
    pub overwrite: Option<bool>,
    pub override_params: Option<serde_json::Value>,
    pub file: PathBuf,
}

impl ImportSubmission {
    pub fn new(
        namespace: impl Into<String>,
        path: impl Into<String>,
        file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            path: path.into(),
            name: None,
            overwrite: None,
            override_params: None,
            file: file.into(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = Some(overwrite);
        self
    }

    /// プロジェクト作成時の上書きパラメータを設定する。
    ///
    /// 任意の `Serialize` 値を受け付け、送信時は `stringify` した文字列として 1 フィールドに入る。
    pub fn with_override_params<T: Serialize>(mut self, params: &T) -> Result<Self, TransferError> {
        let value = serde_json::to_value(params)
            .map_err(|e| TransferError::Validation(format!("override_params が不正です: {e}")))?;
        self.override_params = Some(value);
        Ok(self)
    }

    /// 必須フィールド（namespace, path）を検証する。
    pub fn validate(&self) -> Result<(), TransferError> {
        if self.namespace.trim().is_empty() {
            return Err(TransferError::Validation("namespace が空です".into()));
        }
        if self.path.trim().is_empty() {
            return Err(TransferError::Validation("path が空です".into()));
        }
        Ok(())
    }
}
