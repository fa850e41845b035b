//! テスト用のリーダーと multipart パーサー。

use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, ReadBuf};

/// 読み込み回数と解放回数を数えるカウンタ。
#[derive(Clone, Default)]
pub struct ReaderStats {
    reads: Arc<AtomicUsize>,
    drops: Arc<AtomicUsize>,
}

impl ReaderStats {
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn drops(&self) -> usize {
        self.drops.load(Ordering::SeqCst)
    }
}

/// 内容を返しつつ読み込みと解放を記録するリーダー。
pub struct TrackedReader {
    data: io::Cursor<Vec<u8>>,
    stats: ReaderStats,
}

impl TrackedReader {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data: io::Cursor::new(data),
            stats: ReaderStats::default(),
        }
    }

    pub fn stats(&self) -> ReaderStats {
        self.stats.clone()
    }
}

impl AsyncRead for TrackedReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        self.stats.reads.fetch_add(1, Ordering::SeqCst);
        Pin::new(&mut self.data).poll_read(cx, buf)
    }
}

impl Drop for TrackedReader {
    fn drop(&mut self) {
        self.stats.drops.fetch_add(1, Ordering::SeqCst);
    }
}

/// 常に I/O エラーを返すリーダー。
#[derive(Default)]
pub struct FailingReader {
    stats: ReaderStats,
}

impl FailingReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> ReaderStats {
        self.stats.clone()
    }
}

impl AsyncRead for FailingReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        self.stats.reads.fetch_add(1, Ordering::SeqCst);
        Poll::Ready(Err(io::Error::other("disk failure")))
    }
}

impl Drop for FailingReader {
    fn drop(&mut self) {
        self.stats.drops.fetch_add(1, Ordering::SeqCst);
    }
}

/// multipart ボディの 1 パート。
#[derive(Debug)]
pub struct Part {
    pub headers: String,
    pub content: Vec<u8>,
}

impl Part {
    pub fn name(&self) -> Option<&str> {
        header_param(&self.headers, "name")
    }

    pub fn filename(&self) -> Option<&str> {
        header_param(&self.headers, "filename")
    }
}

fn header_param<'a>(headers: &'a str, key: &str) -> Option<&'a str> {
    let pattern = format!("; {key}=\"");
    let start = headers.find(&pattern)? + pattern.len();
    let end = headers[start..].find('"')? + start;
    Some(&headers[start..end])
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| i + from)
}

/// ボディを boundary で分割してパートの一覧を返す。終端の区切りがなければ panic する。
pub fn split_parts(body: &[u8], boundary: &str) -> Vec<Part> {
    let mut framed = b"\r\n".to_vec();
    framed.extend_from_slice(body);
    let delimiter = format!("\r\n--{boundary}").into_bytes();

    let mut parts = Vec::new();
    let mut pos = find(&framed, &delimiter, 0).expect("先頭の区切りがない");
    assert_eq!(pos, 0, "ボディが区切りで始まっていない");
    loop {
        let segment_start = pos + delimiter.len();
        if framed[segment_start..].starts_with(b"--") {
            assert_eq!(&framed[segment_start..], b"--\r\n", "終端の後に余分なデータがある");
            return parts;
        }
        let next = find(&framed, &delimiter, segment_start).expect("終端の区切りがない");
        let segment = &framed[segment_start..next];
        let segment = segment.strip_prefix(b"\r\n").expect("区切りの後に CRLF がない");
        let header_end = find(segment, b"\r\n\r\n", 0).expect("ヘッダーの終端がない");
        parts.push(Part {
            headers: String::from_utf8(segment[..header_end].to_vec()).expect("ヘッダーが UTF-8 でない"),
            content: segment[header_end + 4..].to_vec(),
        });
        pos = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_failing_reader_default_reports_error_and_drop() {
        let mut reader = FailingReader::default();
        let stats = reader.stats();
        let mut buf = Vec::new();
        let err = reader.read_to_end(&mut buf).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Other);
        assert_eq!(err.to_string(), "disk failure");
        assert_eq!(stats.reads(), 1);
        drop(reader);
        assert_eq!(stats.drops(), 1);
    }
}
