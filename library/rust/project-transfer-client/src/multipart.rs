use rand::Rng;
use tokio::io::AsyncRead;
use tracing::debug;

use crate::error::TransferError;
use crate::model::{stringify, ImportSubmission};

/// アーカイブを載せる multipart フィールド名。
pub const FILE_FIELD: &str = "file";

/// ファイルパートに付けるファイル名。サーバーは `<group>.*.tar.gz` 形式のみを見る。
pub const ARCHIVE_FILENAME: &str = "group.*.tar.gz";

const ARCHIVE_CONTENT_TYPE: &str = "application/octet-stream";

/// RFC 2046 の boundary 上限。
const MAX_BOUNDARY_LEN: usize = 70;

/// エンコード済みの multipart ボディと、同じ boundary を含む Content-Type。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedForm {
    pub content_type: String,
    pub body: Vec<u8>,
}

impl EncodedForm {
    /// Content-Type から boundary を取り出す。
    pub fn boundary(&self) -> Option<&str> {
        self.content_type
            .split(';')
            .map(str::trim)
            .find_map(|param| param.strip_prefix("boundary="))
    }
}

/// `ImportSubmission` を multipart/form-data のボディへ変換するエンコーダ。
///
/// パートの順序は固定で、ファイル、namespace、path、設定されていれば name、overwrite、
/// override_params の順に書き込む。どこかで失敗した場合は途中までのボディを返さない。
#[derive(Debug, Clone)]
pub struct MultipartImportEncoder {
    boundary: String,
}

impl Default for MultipartImportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipartImportEncoder {
    /// ランダムな boundary でエンコーダを生成する。
    pub fn new() -> Self {
        let mut bytes = [0u8; 30];
        rand::thread_rng().fill(&mut bytes[..]);
        let boundary = bytes.iter().map(|b| format!("{b:02x}")).collect();
        Self { boundary }
    }

    /// boundary を固定してエンコーダを生成する。
    pub fn with_boundary(boundary: impl Into<String>) -> Result<Self, TransferError> {
        let boundary = boundary.into();
        if boundary.is_empty() || boundary.len() > MAX_BOUNDARY_LEN {
            return Err(TransferError::Encoding(format!(
                "boundary の長さは 1〜{MAX_BOUNDARY_LEN} 文字である必要があります"
            )));
        }
        if !boundary.bytes().all(is_boundary_char) || boundary.ends_with(' ') {
            return Err(TransferError::Encoding(format!(
                "boundary に使用できない文字が含まれています: {boundary}"
            )));
        }
        Ok(Self { boundary })
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// submission と archive の内容から multipart ボディを組み立てる。
    ///
    /// `archive` は所有権ごと受け取り、成功・失敗のどちらでも関数を抜けるときに 1 度だけ解放される。
    pub async fn encode<R>(
        &self,
        submission: &ImportSubmission,
        mut archive: R,
    ) -> Result<EncodedForm, TransferError>
    where
        R: AsyncRead + Unpin,
    {
        submission.validate()?;

        let mut form = FormBuilder::new(&self.boundary);

        form.begin_file_part(FILE_FIELD, ARCHIVE_FILENAME)?;
        let start = form.body.len();
        let copied = tokio::io::copy(&mut archive, &mut form.body)
            .await
            .map_err(TransferError::Archive)?;
        form.ensure_no_delimiter(start, FILE_FIELD)?;

        form.write_field("namespace", &submission.namespace)?;
        form.write_field("path", &submission.path)?;
        if let Some(ref name) = submission.name {
            form.write_field("name", name)?;
        }
        if let Some(overwrite) = submission.overwrite {
            form.write_field("overwrite", if overwrite { "true" } else { "false" })?;
        }
        if let Some(ref params) = submission.override_params {
            let text = stringify(params).map_err(|e| {
                TransferError::Encoding(format!("override_params の変換に失敗しました: {e}"))
            })?;
            form.write_field("override_params", &text)?;
        }

        let body = form.finish();
        debug!(
            archive_bytes = copied,
            body_bytes = body.len(),
            "multipart ボディを生成"
        );
        Ok(EncodedForm {
            content_type: self.content_type(),
            body,
        })
    }
}

/// RFC 2046 の bchars。
fn is_boundary_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"'()+_,-./:=? ".contains(&b)
}

struct FormBuilder {
    delimiter: Vec<u8>,
    body: Vec<u8>,
    parts: usize,
}

impl FormBuilder {
    fn new(boundary: &str) -> Self {
        Self {
            delimiter: format!("\r\n--{boundary}").into_bytes(),
            body: Vec::new(),
            parts: 0,
        }
    }

    fn begin_part(&mut self, disposition: &str, content_type: Option<&str>) {
        if self.parts == 0 {
            // 先頭の区切りには前置の CRLF を付けない
            self.body.extend_from_slice(&self.delimiter[2..]);
        } else {
            self.body.extend_from_slice(&self.delimiter);
        }
        self.body.extend_from_slice(b"\r\nContent-Disposition: ");
        self.body.extend_from_slice(disposition.as_bytes());
        if let Some(content_type) = content_type {
            self.body.extend_from_slice(b"\r\nContent-Type: ");
            self.body.extend_from_slice(content_type.as_bytes());
        }
        self.body.extend_from_slice(b"\r\n\r\n");
        self.parts += 1;
    }

    fn begin_file_part(&mut self, field: &str, filename: &str) -> Result<(), TransferError> {
        check_header_value(field)?;
        check_header_value(filename)?;
        self.begin_part(
            &format!("form-data; name=\"{field}\"; filename=\"{filename}\""),
            Some(ARCHIVE_CONTENT_TYPE),
        );
        Ok(())
    }

    fn write_field(&mut self, name: &str, value: &str) -> Result<(), TransferError> {
        check_header_value(name)?;
        self.begin_part(&format!("form-data; name=\"{name}\""), None);
        let start = self.body.len();
        self.body.extend_from_slice(value.as_bytes());
        self.ensure_no_delimiter(start, name)
    }

    /// `start` 以降に区切り文字列が現れるとパートが分断されるため拒否する。
    /// ヘッダー末尾の CRLF と内容の先頭がつながって区切りになる場合も含めて検査する。
    fn ensure_no_delimiter(&self, start: usize, field: &str) -> Result<(), TransferError> {
        let content = &self.body[start.saturating_sub(2)..];
        let contains = content.len() >= self.delimiter.len()
            && content
                .windows(self.delimiter.len())
                .any(|w| w == self.delimiter.as_slice());
        if contains {
            return Err(TransferError::Encoding(format!(
                "フィールド {field} の内容に boundary が含まれています"
            )));
        }
        Ok(())
    }

    fn finish(mut self) -> Vec<u8> {
        self.body.extend_from_slice(&self.delimiter);
        self.body.extend_from_slice(b"--\r\n");
        self.body
    }
}

fn check_header_value(value: &str) -> Result<(), TransferError> {
    if value.is_empty() || value.contains(['"', '\r', '\n']) {
        return Err(TransferError::Encoding(format!(
            "パートヘッダーに使用できない値です: {value:?}"
        )));
    }
    Ok(())
}
