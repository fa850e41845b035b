use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::info;

use crate::config::TransferClientConfig;
use crate::error::TransferError;
use crate::model::{ExportJob, ImportJob, ScheduleExportOptions};
use crate::project_ref::ProjectRef;
use crate::transport::{ApiRequest, HttpTransport, RequestBody, RequestOptions, Transport};

/// レスポンスボディを JSON としてデコードする。
pub(crate) fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, TransferError> {
    serde_json::from_slice(body).map_err(|e| TransferError::Deserialize(e.to_string()))
}

/// `ArchiveTransferClient` はプロジェクトのエクスポート予約・状態取得・ダウンロードと、
/// インポート状態の取得を行うクライアント。
///
/// どの操作もジョブの完了を待たない。完了は呼び出し側が `export_status` / `import_status` を
/// ポーリングして確認する。
///
/// 各操作の `request` はその呼び出しだけに適用するタイムアウトやヘッダーで、
/// 不要なら `&RequestOptions::default()` を渡す。
#[derive(Clone)]
pub struct ArchiveTransferClient {
    transport: Arc<dyn Transport>,
}

impl ArchiveTransferClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// 設定から `HttpTransport` を生成してクライアントを作る。
    pub fn from_config(config: TransferClientConfig) -> Result<Self, TransferError> {
        Ok(Self::new(Arc::new(HttpTransport::new(config)?)))
    }

    /// エクスポートを予約する。
    /// POST projects/:id/export
    pub async fn schedule_export(
        &self,
        project: impl Into<ProjectRef>,
        options: Option<&ScheduleExportOptions>,
        request: &RequestOptions,
    ) -> Result<(), TransferError> {
        let project = project.into();
        let url = format!("projects/{}/export", project.to_path_segment()?);
        let body = match options {
            Some(opts) => serde_json::to_value(opts)
                .map_err(|e| TransferError::Validation(format!("オプションが不正です: {e}")))?,
            None => serde_json::json!({}),
        };

        self.transport
            .execute(ApiRequest::post(url, RequestBody::Json(body)).with_options(request))
            .await?;

        info!(project = %project, "エクスポートを予約");
        Ok(())
    }

    /// エクスポートの現在の状態を取得する。
    /// GET projects/:id/export
    pub async fn export_status(
        &self,
        project: impl Into<ProjectRef>,
        request: &RequestOptions,
    ) -> Result<ExportJob, TransferError> {
        let project = project.into();
        let url = format!("projects/{}/export", project.to_path_segment()?);
        let body = self
            .transport
            .execute(ApiRequest::get(url).with_options(request))
            .await?;
        decode(&body)
    }

    /// 完了したエクスポートのアーカイブをダウンロードする。
    /// GET projects/:id/export/download
    ///
    /// 完了前の呼び出しはサーバーが返すエラーをそのまま返す。
    pub async fn export_download(
        &self,
        project: impl Into<ProjectRef>,
        request: &RequestOptions,
    ) -> Result<Vec<u8>, TransferError> {
        let project = project.into();
        let url = format!("projects/{}/export/download", project.to_path_segment()?);
        self.transport
            .execute(ApiRequest::get(url).with_options(request))
            .await
    }

    /// インポートの現在の状態を取得する。
    /// GET projects/:id/import
    pub async fn import_status(
        &self,
        project: impl Into<ProjectRef>,
        request: &RequestOptions,
    ) -> Result<ImportJob, TransferError> {
        let project = project.into();
        let url = format!("projects/{}/import", project.to_path_segment()?);
        let body = self
            .transport
            .execute(ApiRequest::get(url).with_options(request))
            .await?;
        decode(&body)
    }
}
