use thiserror::Error;

/// `TransferError` はプロジェクトのエクスポート/インポート操作で発生するエラー型。
///
/// `Validation` / `Archive` / `Encoding` はリクエスト送信前に検出され、
/// `Connection` / `Timeout` / `Api` はトランスポート層から変換せずにそのまま伝播する。
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("入力検証エラー: {0}")]
    Validation(String),
    #[error("アーカイブファイルの読み込みに失敗しました: {0}")]
    Archive(#[source] std::io::Error),
    #[error("multipart エンコードエラー: {0}")]
    Encoding(String),
    #[error("接続エラー: {0}")]
    Connection(String),
    #[error("リクエストがタイムアウトしました")]
    Timeout,
    #[error("API エラー (status {status}): {message}")]
    Api { status: u16, message: String },
    #[error("レスポンスのデシリアライズに失敗しました: {0}")]
    Deserialize(String),
    #[error("設定エラー: {0}")]
    InvalidConfig(String),
}

impl TransferError {
    /// サーバーが返した HTTP ステータスコードを返す。API エラー以外は `None`。
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
