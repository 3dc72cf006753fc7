use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::base_system::context::Config;
use crate::base_system::retry::RetryPolicy;
use crate::base_system::validate::{
    InputKind, validate_batch_size, validate_encoding, validate_input_path, validate_output_dir,
    validate_retries,
};
use crate::download::downloader::{DownloadOptions, ImageDownloader};
use crate::download::fetcher::HttpFetcher;
use crate::download::models::{DownloadCallback, DownloadEvent, FetchOutcome, targets_from_sources};
use crate::html_parser::decode::read_html;
use crate::html_parser::images::extract_image_sources;

pub(super) fn run(config: &Config) -> Result<()> {
    let input = super::read_line("请输入相册页面 HTML 文件路径：")?;
    let html_path = validate_input_path(&input, InputKind::HtmlFile)?;

    let output_dir = PathBuf::from(super::read_with_default(
        "图片保存目录",
        &config.default_output_dir().display().to_string(),
    )?);
    validate_output_dir(&output_dir)?;
    let batch_size = validate_batch_size(&super::read_with_default(
        "每批下载数量",
        &config.batch_size.to_string(),
    )?)?;
    let encoding = validate_encoding(&super::read_with_default("文件编码", &config.encoding)?)?;
    let max_retries = validate_retries(&super::read_with_default(
        "最大重试次数",
        &config.max_retries.to_string(),
    )?)?;

    let html = read_html(&html_path, encoding)?;
    let targets = targets_from_sources(extract_image_sources(&html)?);
    if targets.is_empty() {
        println!("页面中没有找到图片");
        return Ok(());
    }
    println!("共找到 {} 张图片，开始下载到 {}", targets.len(), output_dir.display());

    let fetcher = HttpFetcher::new(config.request_timeout()).context("初始化 HTTP 客户端失败")?;
    let downloader = ImageDownloader::new(
        fetcher,
        DownloadOptions {
            output_dir: output_dir.clone(),
            batch_size,
            retry: RetryPolicy::new(max_retries, config.retry_delay()),
        },
    );

    let pb = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::hidden());
    let start = Instant::now();
    let rt = super::build_runtime()?;
    let report = rt.block_on(downloader.run(&targets, Some(progress_callback(pb.clone()))))?;

    println!(
        "下载完成：成功 {} 张（{:.1} MB，其中 {} 张经过重试），失败 {} 张，共 {} 批，耗时 {:.1}s",
        report.saved,
        report.bytes as f64 / (1024.0 * 1024.0),
        report.retried,
        report.abandoned,
        report.batches,
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

fn progress_callback(pb: ProgressBar) -> DownloadCallback {
    Box::new(move |event| match event {
        DownloadEvent::Started { total, batches } => {
            if let Ok(style) =
                ProgressStyle::with_template("{prefix} {bar:40.cyan/blue} {pos}/{len} {msg}")
            {
                pb.set_style(style.progress_chars("=>-"));
            }
            pb.set_prefix("下载图片");
            pb.set_length(total as u64);
            pb.set_message(format!("0/{} 批", batches));
            pb.set_draw_target(ProgressDrawTarget::stderr());
        }
        DownloadEvent::ItemFinished(FetchOutcome::Abandoned {
            target,
            attempts,
            last_error,
        }) => {
            pb.println(format!(
                "下载失败 {}（尝试 {} 次）: {}",
                target.url,
                attempts,
                last_error.as_deref().unwrap_or("未尝试")
            ));
        }
        DownloadEvent::ItemFinished(_) => {}
        DownloadEvent::BatchFinished(snap) => {
            pb.set_position(snap.items_done as u64);
            pb.set_message(format!("{}/{} 批", snap.batch_done, snap.batch_total));
        }
        DownloadEvent::Finished(_) => pb.finish_and_clear(),
    })
}
