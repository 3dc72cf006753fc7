//! 存档 HTML 页面解析。
//!
//! - `decode` — 按指定编码读取页面（默认 windows-1251）
//! - `images` — 提取 `<img src>` 作为下载目标
//! - `wall`   — 提取评论页中的 wall 标识

pub mod decode;
pub mod images;
pub mod wall;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HtmlError {
    #[error("读取 {path} 失败: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("选择器无效: {0}")]
    Selector(String),
}

pub(crate) fn selector(css: &str) -> Result<scraper::Selector, HtmlError> {
    scraper::Selector::parse(css).map_err(|e| HtmlError::Selector(format!("{css}: {e}")))
}
