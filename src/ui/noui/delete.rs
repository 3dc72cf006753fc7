use std::path::PathBuf;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::warn;

use crate::base_system::context::Config;
use crate::base_system::validate::{
    InputKind, parse_exclude_ids, validate_encoding, validate_input_path, validate_sleep_time,
    validate_token,
};
use crate::html_parser::wall::collect_wall_ids;
use crate::wall::api::VkExecuteClient;
use crate::wall::deleter::{CommentDeleter, DeleteOptions};
use crate::wall::dispatcher::{FixedDelayPacer, SequentialDispatcher};
use crate::wall::models::{BatchOutcome, DeleteCallback, DeleteEvent};

const TOKEN_ENV: &str = "VK_ACCESS_TOKEN";

pub(super) fn run(config: &Config) -> Result<()> {
    let input = super::read_line("请输入存档评论页面所在目录：")?;
    let dir = validate_input_path(&input, InputKind::HtmlDir)?;

    let encoding = validate_encoding(&super::read_with_default("文件编码", &config.encoding)?)?;
    let review_file =
        PathBuf::from(super::read_with_default("待删除 ID 输出文件", &config.delete_output_file)?);
    let sleep_time = validate_sleep_time(&super::read_with_default(
        "两次请求间隔（秒）",
        &config.sleep_time.to_string(),
    )?)?;
    let exclude_ids = parse_exclude_ids(&super::read_with_default(
        "排除的用户/社区 ID，逗号分隔",
        &config.exclude_ids.join(","),
    )?);
    let token = read_token()?;

    let ids = collect_wall_ids(&dir, encoding)?;
    if ids.is_empty() {
        println!("目录中没有找到任何 wall 评论链接");
    }

    let client = VkExecuteClient::new(
        &config.api_url,
        &token,
        &config.api_version,
        config.request_timeout(),
    )
    .context("初始化 VK API 客户端失败")?;
    let dispatcher = SequentialDispatcher::new(
        client,
        FixedDelayPacer::new(sleep_time),
        config.trailing_delay,
    );
    let pb = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::hidden());
    let mut deleter = CommentDeleter::new(
        dispatcher,
        DeleteOptions {
            exclude_ids,
            review_file,
        },
    )
    .with_progress(progress_callback(pb));

    let rt = super::build_runtime()?;
    let tally = rt.block_on(deleter.run(&ids, confirm))?;

    match tally {
        Some(t) => println!(
            "全部完成：成功删除 {} 条评论，{} 条删除失败",
            t.deleted, t.failed
        ),
        None => println!("已取消，未发送任何删除请求"),
    }
    Ok(())
}

/// 直接回车时使用环境变量中的 token。
fn read_token() -> Result<String> {
    let input = super::read_line(&format!(
        "请输入 VK access_token（留空则读取环境变量 {}）：",
        TOKEN_ENV
    ))?;
    let token = if input.trim().is_empty() {
        std::env::var(TOKEN_ENV).unwrap_or_default()
    } else {
        input
    };
    Ok(validate_token(&token)?)
}

fn confirm(path: &std::path::Path, count: usize) -> bool {
    println!(
        "已将 {} 条待删除评论 ID 写入 {}，请检查后确认。",
        count,
        path.display()
    );
    match super::read_line("输入 yes 开始删除，其他任意内容取消：") {
        Ok(answer) => answer.trim().eq_ignore_ascii_case("yes"),
        Err(e) => {
            warn!("读取确认输入失败: {}", e);
            false
        }
    }
}

fn progress_callback(pb: ProgressBar) -> DeleteCallback {
    Box::new(move |event| match event {
        DeleteEvent::Extracted { count, review_file } => {
            println!("提取到 {} 条评论 ID（{}）", count, review_file.display());
        }
        DeleteEvent::Aborted => {}
        DeleteEvent::Started { batches } => {
            if let Ok(style) =
                ProgressStyle::with_template("{prefix} {bar:40.cyan/blue} {pos}/{len} {msg}")
            {
                pb.set_style(style.progress_chars("=>-"));
            }
            pb.set_prefix("删除评论");
            pb.set_length(batches as u64);
            pb.set_draw_target(ProgressDrawTarget::stderr());
        }
        DeleteEvent::BatchFinished {
            index,
            size,
            outcome,
        } => {
            match outcome {
                BatchOutcome::Completed { tally, .. } => pb.println(format!(
                    "第 {} 批（{} 条）：成功删除 {} 条，失败 {} 条（可能已删除或位于封闭的社区/主页）",
                    index + 1,
                    size,
                    tally.deleted,
                    tally.failed
                )),
                BatchOutcome::Rejected(reason) => {
                    pb.println(format!("第 {} 批（{} 条）请求失败: {}", index + 1, size, reason))
                }
            }
            pb.inc(1);
        }
        DeleteEvent::Finished(_) => pb.finish_and_clear(),
    })
}
