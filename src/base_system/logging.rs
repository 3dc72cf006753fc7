//! 日志系统。
//!
//! - 文件：`logs/latest.log`，DEBUG 级别，经 non-blocking 写入
//! - 终端：stderr，INFO（`--debug` 时 DEBUG）；关闭时不挂终端层，避免打乱进度条
//! - 退出 / Ctrl-C / panic 时把 `latest.log` 压缩归档为 `logs/log_<时间戳>.zip`

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::{panic, thread, time::Duration};

use time::OffsetDateTime;
use time::macros::format_description;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::{NonBlockingBuilder, WorkerGuard};
use tracing_appender::rolling;
use tracing_subscriber::Layer;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use zip::CompressionMethod;
use zip::write::FileOptions;

/// 启动时超过该大小的 `latest.log` 先归档。
const ARCHIVE_THRESHOLD: u64 = 10 * 1024 * 1024;
/// 等 non-blocking 写线程把缓冲刷完（Windows 上文件句柄释放较慢）。
const FLUSH_GRACE: Duration = Duration::from_millis(300);
const LATEST_LOG: &str = "latest.log";

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("日志系统已初始化")]
    AlreadyInitialized,
    #[error("注册日志订阅者失败: {0}")]
    SubscriberInit(#[from] tracing_subscriber::util::TryInitError),
    #[error("日志文件读写失败: {0}")]
    Io(#[from] io::Error),
    #[error("日志压缩失败: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("时间格式化失败: {0}")]
    Time(#[from] time::error::Format),
}

#[derive(Clone, Copy, Debug)]
pub struct LogOptions {
    pub debug: bool,
    pub use_color: bool,
    pub archive_on_exit: bool,
    /// 是否输出到终端
    pub console: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            debug: false,
            use_color: true,
            archive_on_exit: true,
            console: false,
        }
    }
}

/// 持有写线程的 guard；drop 时刷盘并归档。
pub struct LogSystem {
    state: Arc<LogState>,
}

impl LogSystem {
    /// `base_dir` 为 `Some` 时日志目录位于其下，与 `config.yml` 放在一起。
    pub fn init_with_base(options: LogOptions, base_dir: Option<&Path>) -> Result<Self, LogError> {
        let archiver = LogArchiver::new(
            base_dir
                .map(|b| b.join("logs"))
                .unwrap_or_else(|| PathBuf::from("logs")),
        );
        fs::create_dir_all(&archiver.logs_dir)?;
        archiver.archive_if_over(ARCHIVE_THRESHOLD)?;

        let (file_writer, guard) = NonBlockingBuilder::default()
            .lossy(false)
            .finish(rolling::never(&archiver.logs_dir, LATEST_LOG));

        let file_layer = fmt::layer()
            .with_target(true)
            .with_thread_names(true)
            .with_ansi(false)
            .with_writer(file_writer)
            .with_filter(LevelFilter::DEBUG);

        let console_layer = options.console.then(|| {
            let level = if options.debug {
                LevelFilter::DEBUG
            } else {
                LevelFilter::INFO
            };
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_ansi(options.use_color)
                .with_writer(io::stderr)
                .with_filter(level)
        });

        tracing_subscriber::registry()
            .with(file_layer)
            .with(console_layer)
            .try_init()
            .map_err(|e| {
                if e.to_string().contains("already") {
                    LogError::AlreadyInitialized
                } else {
                    LogError::SubscriberInit(e)
                }
            })?;

        let state = Arc::new(LogState {
            archiver,
            guard: Mutex::new(Some(guard)),
            closed: AtomicBool::new(false),
            archive_on_exit: options.archive_on_exit,
        });
        state.hook_ctrlc();
        state.hook_panic();

        Ok(Self { state })
    }
}

impl Drop for LogSystem {
    fn drop(&mut self) {
        self.state.close();
    }
}

struct LogState {
    archiver: LogArchiver,
    guard: Mutex<Option<WorkerGuard>>,
    closed: AtomicBool,
    archive_on_exit: bool,
}

impl LogState {
    fn hook_ctrlc(self: &Arc<Self>) {
        let state = Arc::clone(self);
        if let Err(e) = ctrlc::set_handler(move || {
            // 不做断点续传，已保存的图片和已发出的删除请求都保持原样
            warn!("收到中断信号，退出");
            state.close();
            std::process::exit(130);
        }) {
            warn!("注册 Ctrl-C 处理失败: {}", e);
        }
    }

    fn hook_panic(self: &Arc<Self>) {
        let state = Arc::clone(self);
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            match info.location() {
                Some(loc) => error!("panic at {}:{}: {}", loc.file(), loc.line(), info),
                None => error!("panic: {info}"),
            }
            state.close();
            previous(info);
        }));
    }

    /// 只执行一次：先放掉 guard 让写线程刷盘，再归档。
    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Ok(mut guard) = self.guard.lock() {
            guard.take();
        }
        if !self.archive_on_exit {
            return;
        }
        thread::sleep(FLUSH_GRACE);
        if let Err(err) = self.archiver.archive() {
            eprintln!("日志归档失败: {err}");
        }
    }
}

struct LogArchiver {
    logs_dir: PathBuf,
    latest_log: PathBuf,
}

impl LogArchiver {
    fn new(logs_dir: PathBuf) -> Self {
        let latest_log = logs_dir.join(LATEST_LOG);
        Self {
            logs_dir,
            latest_log,
        }
    }

    fn archive_if_over(&self, limit: u64) -> Result<Option<PathBuf>, LogError> {
        match fs::metadata(&self.latest_log) {
            Ok(meta) if meta.len() >= limit => self.archive(),
            _ => Ok(None),
        }
    }

    /// 压缩 `latest.log` 并删除原文件；不存在或为空时只清理，不生成压缩包。
    fn archive(&self) -> Result<Option<PathBuf>, LogError> {
        let len = match fs::metadata(&self.latest_log) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if len == 0 {
            fs::remove_file(&self.latest_log)?;
            return Ok(None);
        }

        let stamp = OffsetDateTime::now_utc().format(format_description!(
            "[year][month][day]_[hour][minute][second]"
        ))?;
        let archive_path = self.logs_dir.join(format!("log_{stamp}.zip"));

        let mut zip = zip::ZipWriter::new(File::create(&archive_path)?);
        zip.start_file(
            format!("{stamp}.log"),
            FileOptions::default().compression_method(CompressionMethod::Deflated),
        )?;
        io::copy(&mut BufReader::new(File::open(&self.latest_log)?), &mut zip)?;
        zip.finish()?;
        fs::remove_file(&self.latest_log)?;

        info!("日志已归档到 {}", archive_path.display());
        Ok(Some(archive_path))
    }
}
