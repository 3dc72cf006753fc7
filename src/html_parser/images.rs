use scraper::Html;

use super::{HtmlError, selector};

/// 按文档顺序返回所有 `<img>` 的 `src`（缺少 src 或为空的跳过）。
pub fn extract_image_sources(html: &str) -> Result<Vec<String>, HtmlError> {
    let document = Html::parse_document(html);
    let img = selector("img")?;
    Ok(document
        .select(&img)
        .filter_map(|el| el.value().attr("src"))
        .map(str::trim)
        .filter(|src| !src.is_empty())
        .map(str::to_string)
        .collect())
}
