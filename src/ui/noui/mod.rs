//! 无 UI 交互入口。
//!
//! 使用标准输入输出进行交互：选择模式 → 填写参数 → 运行 → 按回车退出。

use std::io::{self, BufRead, Write};

use anyhow::Result;
use tracing::{error, info};

use crate::base_system::context::Config;

mod delete;
mod download;

pub fn run(config: &Config) -> Result<()> {
    println!(
        "VK 存档工具 v{}\n\
1. 从存档相册页面批量下载图片\n\
2. 根据存档评论页面批量删除墙评论",
        env!("CARGO_PKG_VERSION")
    );

    let choice = read_line("请选择模式 (1/2)：")?;
    let result = match choice.trim() {
        "1" => download::run(config),
        "2" => delete::run(config),
        other => {
            println!("无效的选择: {}", other);
            Ok(())
        }
    };

    if let Err(err) = &result {
        error!("运行失败: {:#}", err);
        println!("错误: {:#}", err);
    } else {
        info!("运行结束");
    }

    read_line("按回车键退出...")?;
    Ok(())
}

pub(super) fn read_line(prompt: &str) -> Result<String> {
    print!("{}", prompt);
    io::stdout().flush().ok();
    let stdin = io::stdin();
    let mut line = String::new();
    stdin.lock().read_line(&mut line)?;
    Ok(line)
}

/// 带默认值的提示；直接回车时返回默认值。
pub(super) fn read_with_default(label: &str, default: &str) -> Result<String> {
    let input = read_line(&format!("{}（默认：{}）：", label, default))?;
    let text = input.trim();
    if text.is_empty() {
        Ok(default.to_string())
    } else {
        Ok(text.to_string())
    }
}

pub(super) fn build_runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?)
}
