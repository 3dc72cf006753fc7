//! 图片批量下载主流程。
//!
//! 目标按 `batch_size` 切成连续的批；批内所有请求同时发出，
//! 全部成功或重试用尽后才进入下一批，因此同时在途的请求不超过 `batch_size`。

use std::path::{Path, PathBuf};

use futures::future::join_all;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::fetcher::{FetchError, ImageFetcher};
use super::models::{DownloadCallback, DownloadReport, DownloadTarget, FetchOutcome};
use super::progress::ProgressReporter;
use crate::base_system::retry::RetryPolicy;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("创建输出目录 {path} 失败: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub output_dir: PathBuf,
    pub batch_size: usize,
    pub retry: RetryPolicy,
}

pub struct ImageDownloader<F> {
    fetcher: F,
    options: DownloadOptions,
}

impl<F: ImageFetcher> ImageDownloader<F> {
    pub fn new(fetcher: F, options: DownloadOptions) -> Self {
        Self { fetcher, options }
    }

    pub async fn run(
        &self,
        targets: &[DownloadTarget],
        progress: Option<DownloadCallback>,
    ) -> Result<DownloadReport, DownloadError> {
        let output_dir = &self.options.output_dir;
        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(|source| DownloadError::CreateDir {
                path: output_dir.clone(),
                source,
            })?;

        let batch_size = self.options.batch_size.max(1);
        let batch_total = targets.len().div_ceil(batch_size);
        let mut reporter = ProgressReporter::new(targets.len(), batch_total, progress);
        let mut report = DownloadReport {
            total: targets.len(),
            ..DownloadReport::default()
        };

        if self.options.retry.max_attempts == 0 && !targets.is_empty() {
            warn!("重试次数为 0，所有图片都不会被下载");
        }

        for (idx, batch) in targets.chunks(batch_size).enumerate() {
            debug!("第 {}/{} 批，共 {} 张", idx + 1, batch_total, batch.len());
            let outcomes = join_all(batch.iter().map(|t| self.download_one(t))).await;
            for outcome in &outcomes {
                report.record(outcome);
                reporter.item(outcome);
            }
            report.batches += 1;
            reporter.batch_done(batch.len());
        }

        info!(
            "图片下载结束：成功 {}，放弃 {}，共 {} 批",
            report.saved, report.abandoned, report.batches
        );
        reporter.finish(report);
        Ok(report)
    }

    async fn download_one(&self, target: &DownloadTarget) -> FetchOutcome {
        let path = self.options.output_dir.join(&target.file_name);
        let result = self
            .options
            .retry
            .run(&target.url, |_| self.fetch_and_write(&target.url, &path))
            .await;

        match result {
            Ok((bytes, attempts)) => FetchOutcome::Saved {
                target: target.clone(),
                bytes,
                attempts,
            },
            Err(exhausted) => {
                warn!("放弃下载 {}（尝试 {} 次）", target.url, exhausted.attempts);
                FetchOutcome::Abandoned {
                    target: target.clone(),
                    attempts: exhausted.attempts,
                    last_error: exhausted.last_error.map(|e| e.to_string()),
                }
            }
        }
    }

    /// 一次尝试 = 请求 + 落盘；写文件失败同样计为失败并参与重试。同名文件后写覆盖。
    async fn fetch_and_write(&self, url: &str, path: &Path) -> Result<usize, FetchError> {
        let bytes = self.fetcher.fetch(url).await?;
        tokio::fs::write(path, &bytes)
            .await
            .map_err(|source| FetchError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(bytes.len())
    }
}
