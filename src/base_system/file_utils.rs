//! 文件名清理与目录工具。

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use url::Url;

/// 去掉 Windows 文件名中不允许的字符 `<>:"/\|?*`，其它字符原样保留。
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .filter(|ch| !matches!(ch, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'))
        .collect()
}

/// 取 URL 路径部分的最后一段作为文件名（已清理）。
///
/// 使用页面里的原始文本，不做百分号编码/解码，`a b.jpg`、`фото.jpg` 原样保留。
pub fn filename_from_url(url: &str) -> String {
    // 只有主机没有路径（`https://host`、`https://host?x`）时没有文件名
    if Url::parse(url).is_ok_and(|parsed| parsed.path() == "/") {
        return String::new();
    }
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let base = path.rsplit('/').next().unwrap_or_default();
    sanitize_filename(base)
}

pub fn has_html_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("html"))
        .unwrap_or(false)
}

/// 列出目录下所有 `.html` 文件（不递归，按文件名排序）。
pub fn list_html_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|e| e.path())
        .filter(|p| has_html_extension(p))
        .collect();
    files.sort();
    Ok(files)
}
