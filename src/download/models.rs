//! 图片下载相关的数据模型定义。
//!
//! 包含下载目标、单项结果、批次报告与进度事件。

use serde::Serialize;
use tracing::warn;

use crate::base_system::file_utils::filename_from_url;

/// 一张待下载的图片：源地址 + 清理后的保存文件名。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadTarget {
    pub url: String,
    pub file_name: String,
}

impl DownloadTarget {
    /// 文件名为空（如 URL 以 `/` 结尾）时返回 `None`。
    pub fn from_url(url: &str) -> Option<Self> {
        let file_name = filename_from_url(url);
        if file_name.is_empty() {
            return None;
        }
        Some(Self {
            url: url.to_string(),
            file_name,
        })
    }
}

/// 把页面中的 `src` 列表转换为下载目标，无法得到文件名的跳过并记录。
pub fn targets_from_sources<I, S>(sources: I) -> Vec<DownloadTarget>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    sources
        .into_iter()
        .filter_map(|src| {
            let src = src.as_ref();
            let target = DownloadTarget::from_url(src);
            if target.is_none() {
                warn!("无法从地址中得到文件名，跳过: {}", src);
            }
            target
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Saved {
        target: DownloadTarget,
        bytes: usize,
        attempts: u32,
    },
    /// 重试用尽后放弃
    Abandoned {
        target: DownloadTarget,
        attempts: u32,
        last_error: Option<String>,
    },
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DownloadReport {
    pub total: usize,
    pub saved: usize,
    pub abandoned: usize,
    /// 成功写入的总字节数
    pub bytes: usize,
    /// 成功但不是第一次就成功的张数
    pub retried: usize,
    pub batches: usize,
}

impl DownloadReport {
    pub(crate) fn record(&mut self, outcome: &FetchOutcome) {
        match outcome {
            FetchOutcome::Saved {
                bytes, attempts, ..
            } => {
                self.saved += 1;
                self.bytes += bytes;
                if *attempts > 1 {
                    self.retried += 1;
                }
            }
            FetchOutcome::Abandoned { .. } => self.abandoned += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    pub batch_done: usize,
    pub batch_total: usize,
    pub items_done: usize,
    pub items_total: usize,
}

#[derive(Debug, Clone)]
pub enum DownloadEvent {
    Started { total: usize, batches: usize },
    ItemFinished(FetchOutcome),
    BatchFinished(ProgressSnapshot),
    Finished(DownloadReport),
}

pub type DownloadCallback = Box<dyn FnMut(DownloadEvent) + Send>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_file_name_is_sanitized_basename() {
        let t = DownloadTarget::from_url("https://sun9-3.userapi.com/c1/a:b*c.jpg?size=1").unwrap();
        assert_eq!(t.file_name, "abc.jpg");
        assert_eq!(t.url, "https://sun9-3.userapi.com/c1/a:b*c.jpg?size=1");
    }

    #[test]
    fn sources_without_file_name_are_dropped() {
        let targets = targets_from_sources([
            "https://example.com/a.png",
            "https://example.com/folder/",
            "https://example.com/b.png",
        ]);
        let names: Vec<_> = targets.iter().map(|t| t.file_name.as_str()).collect();
        assert_eq!(names, vec!["a.png", "b.png"]);
    }

    #[test]
    fn report_counts_bytes_and_retried_items() {
        let target = DownloadTarget::from_url("https://x.test/a.jpg").unwrap();
        let mut report = DownloadReport::default();
        report.record(&FetchOutcome::Saved {
            target: target.clone(),
            bytes: 100,
            attempts: 1,
        });
        report.record(&FetchOutcome::Saved {
            target: target.clone(),
            bytes: 50,
            attempts: 3,
        });
        report.record(&FetchOutcome::Abandoned {
            target,
            attempts: 3,
            last_error: Some("status code: 503".to_string()),
        });
        assert_eq!((report.saved, report.abandoned), (2, 1));
        assert_eq!((report.bytes, report.retried), (150, 1));
    }
}
