use std::path::Path;

use encoding_rs::Encoding;
use scraper::Html;
use tracing::{debug, info};

use super::decode::read_html;
use super::{HtmlError, selector};
use crate::base_system::file_utils::list_html_files;

/// 评论条目容器的 class。
pub const ITEM_CLASS: &str = "item__main";

/// 提取 `.item__main` 内链接中的 wall 标识（链接最后一段路径）。
///
/// 例如 `https://vk.com/wall-1_2?reply=3` → `wall-1_2?reply=3`。
pub fn extract_wall_ids(html: &str) -> Result<Vec<String>, HtmlError> {
    let document = Html::parse_document(html);
    let links = selector(&format!("div.{ITEM_CLASS} a[href]"))?;
    Ok(document
        .select(&links)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| href.contains("wall"))
        .filter_map(|href| href.rsplit('/').next())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect())
}

/// 按文件名顺序读取目录下所有 `.html` 页面并汇总 wall 标识。
pub fn collect_wall_ids(dir: &Path, encoding: &'static Encoding) -> Result<Vec<String>, HtmlError> {
    let files = list_html_files(dir).map_err(|source| HtmlError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut ids = Vec::new();
    for file in &files {
        let html = read_html(file, encoding)?;
        let found = extract_wall_ids(&html)?;
        debug!("{}: {} 条", file.display(), found.len());
        ids.extend(found);
    }
    info!("共解析 {} 个页面，得到 {} 条 wall 标识", files.len(), ids.len());
    Ok(ids)
}
