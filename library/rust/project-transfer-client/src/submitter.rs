use std::sync::Arc;

use tokio::io::AsyncRead;
use tracing::info;

use crate::client::decode;
use crate::config::TransferClientConfig;
use crate::error::TransferError;
use crate::model::{ImportJob, ImportSubmission};
use crate::multipart::MultipartImportEncoder;
use crate::transport::{ApiRequest, HttpTransport, RequestBody, RequestOptions, Transport};

/// ファイルからのインポートを受け付けるエンドポイント。
pub const IMPORT_PATH: &str = "groups/import";

/// `ImportSubmitter` はアーカイブファイルを multipart で送信してインポートを開始する。
///
/// サーバーがアップロードを受理した時点で初期状態の `ImportJob` を返す。
/// 完了は `ArchiveTransferClient::import_status` で確認する。
#[derive(Clone)]
pub struct ImportSubmitter {
    transport: Arc<dyn Transport>,
}

impl ImportSubmitter {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn from_config(config: TransferClientConfig) -> Result<Self, TransferError> {
        Ok(Self::new(Arc::new(HttpTransport::new(config)?)))
    }

    /// `submission.file` を開いてインポートを送信する。
    /// POST groups/import
    pub async fn import_file(
        &self,
        submission: &ImportSubmission,
        request: &RequestOptions,
    ) -> Result<ImportJob, TransferError> {
        submission.validate()?;
        let file = tokio::fs::File::open(&submission.file)
            .await
            .map_err(TransferError::Archive)?;
        self.import_from_reader(submission, file, request).await
    }

    /// 呼び出し側が用意したリーダーからアーカイブを読み込んでインポートを送信する。
    ///
    /// `archive` はエンコード完了時（失敗時を含む）に解放され、送信中は保持しない。
    pub async fn import_from_reader<R>(
        &self,
        submission: &ImportSubmission,
        archive: R,
        request: &RequestOptions,
    ) -> Result<ImportJob, TransferError>
    where
        R: AsyncRead + Unpin,
    {
        let form = MultipartImportEncoder::new()
            .encode(submission, archive)
            .await?;

        let body = self
            .transport
            .execute(
                ApiRequest::post(IMPORT_PATH, RequestBody::Multipart(form)).with_options(request),
            )
            .await?;
        let job: ImportJob = decode(&body)?;

        info!(
            namespace = %submission.namespace,
            path = %submission.path,
            import_id = job.id,
            import_status = %job.import_status,
            "インポートを受付"
        );
        Ok(job)
    }
}
