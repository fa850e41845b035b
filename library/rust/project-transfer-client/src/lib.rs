//! プロジェクトのエクスポート/インポートジョブを扱うクライアント。
//!
//! エクスポートは `ArchiveTransferClient::schedule_export` で予約し、`export_status` をポーリングして
//! `finished` になったら `export_download` でアーカイブを取得する。
//! インポートは `ImportSubmitter::import_file` でアーカイブを送信し、`import_status` をポーリングする。

pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod multipart;
pub mod project_ref;
pub mod submitter;
pub mod transport;

#[cfg(test)]
mod testing;

pub use client::ArchiveTransferClient;
pub use config::TransferClientConfig;
pub use error::TransferError;
pub use model::{
    stringify, ExportJob, ExportLinks, ExportStatus, ExportUpload, ImportJob, ImportStatus,
    ImportSubmission, ScheduleExportOptions, UploadHttpMethod,
};
pub use multipart::{EncodedForm, MultipartImportEncoder};
pub use project_ref::ProjectRef;
pub use submitter::ImportSubmitter;
pub use transport::{ApiRequest, HttpTransport, RequestBody, RequestOptions, Transport};

#[cfg(feature = "mock")]
pub use transport::MockTransport;
