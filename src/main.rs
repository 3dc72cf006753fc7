//! VK 存档工具：从 VK 数据存档（导出的 HTML 页面）批量下载相册图片、批量删除墙评论。
//!
//! 代码结构（读代码入口）：
//! - `base_system`：配置/日志/重试/输入校验等基础设施
//! - `html_parser`：按编码读取存档页面，提取图片地址与 wall 标识
//! - `download`：图片分批并发下载
//! - `wall`：评论删除（脚本构建、execute 客户端、限速派发）
//! - `ui`：无 UI 交互（标准输入输出）

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;

mod base_system;
mod download;
mod html_parser;
mod ui;
mod wall;

use base_system::config::load_or_create;
use base_system::context::Config;
use base_system::logging::{LogOptions, LogSystem};
use tracing::info;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Parser)]
#[command(name = "vk-archive-tools")]
#[command(about = "VK archive image downloader and wall comment cleaner")]
struct Cli {
    /// 启用调试日志输出（同时把日志打印到终端）
    #[arg(long, default_value_t = false)]
    debug: bool,

    /// 显示版本信息后退出
    #[arg(long, default_value_t = false)]
    version: bool,

    /// 数据目录路径（用于存放 config.yml 和 logs）
    #[arg(long)]
    data_dir: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("VK Archive Tools v{}", VERSION);
        return Ok(());
    }

    let data_dir = cli.data_dir.as_deref().map(Path::new);
    let _log = init_logging(cli.debug, data_dir)?;
    info!(target: "startup", "当前版本: v{}", VERSION);

    let config = load_or_create::<Config>(data_dir).context("加载配置失败")?;

    ui::noui::run(&config)
}

fn init_logging(debug: bool, base_dir: Option<&Path>) -> Result<LogSystem> {
    let opts = LogOptions {
        debug,
        use_color: true,
        archive_on_exit: true,
        console: debug,
    };
    LogSystem::init_with_base(opts, base_dir).context("初始化日志失败")
}
