use std::fs;
use std::path::Path;

use encoding_rs::Encoding;
use tracing::{debug, warn};

use super::HtmlError;

/// 以给定编码读取整个文件并解码为 UTF-8 字符串。
///
/// 无法映射的字节替换为 U+FFFD 并记录警告，不中断流程。
pub fn read_html(path: &Path, encoding: &'static Encoding) -> Result<String, HtmlError> {
    let bytes = fs::read(path).map_err(|source| HtmlError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(decode_bytes(&bytes, encoding, path))
}

fn decode_bytes(bytes: &[u8], encoding: &'static Encoding, path: &Path) -> String {
    let (text, used, had_errors) = encoding.decode(bytes);
    if used != encoding {
        debug!("{} 带 BOM，按 {} 解码", path.display(), used.name());
    }
    if had_errors {
        warn!(
            "{} 中存在无法按 {} 解码的字节，已替换",
            path.display(),
            encoding.name()
        );
    }
    text.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn decodes_cp1251() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("page.html");
        // "Фото" in windows-1251
        fs::write(&path, [0xD4, 0xEE, 0xF2, 0xEE]).unwrap();
        let text = read_html(&path, encoding_rs::WINDOWS_1251).unwrap();
        assert_eq!(text, "Фото");
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = read_html(Path::new("/no/such/page.html"), encoding_rs::UTF_8).unwrap_err();
        assert!(matches!(err, HtmlError::Io { .. }));
    }
}
