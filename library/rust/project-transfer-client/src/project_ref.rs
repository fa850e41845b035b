use std::fmt;

use crate::error::TransferError;

/// `ProjectRef` は API パス上でプロジェクトを特定する参照。
///
/// 数値 ID か `group/subgroup/project` 形式のパスのどちらかを受け付ける。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectRef {
    Id(u64),
    Path(String),
}

impl ProjectRef {
    /// URL パスに埋め込める形式へ変換する。
    ///
    /// パス形式は `/` を含めて 1 セグメントとしてパーセントエンコードする。
    /// ID 0 と空パスは送信前に `TransferError::Validation` として拒否する。
    pub fn to_path_segment(&self) -> Result<String, TransferError> {
        match self {
            Self::Id(0) => Err(TransferError::Validation(
                "プロジェクト ID に 0 は指定できません".into(),
            )),
            Self::Id(id) => Ok(id.to_string()),
            Self::Path(path) => {
                let trimmed = path.trim().trim_matches('/');
                if trimmed.is_empty() {
                    return Err(TransferError::Validation(
                        "プロジェクトパスが空です".into(),
                    ));
                }
                if trimmed.split('/').any(str::is_empty) {
                    return Err(TransferError::Validation(format!(
                        "プロジェクトパスが不正です: {path}"
                    )));
                }
                Ok(urlencoding::encode(trimmed).into_owned())
            }
        }
    }
}

impl fmt::Display for ProjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Path(path) => f.write_str(path),
        }
    }
}

impl From<u64> for ProjectRef {
    fn from(id: u64) -> Self {
        Self::Id(id)
    }
}

impl From<&str> for ProjectRef {
    fn from(path: &str) -> Self {
        Self::Path(path.to_string())
    }
}

impl From<String> for ProjectRef {
    fn from(path: String) -> Self {
        Self::Path(path)
    }
}

impl From<&String> for ProjectRef {
    fn from(path: &String) -> Self {
        Self::Path(path.clone())
    }
}
