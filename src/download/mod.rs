//! 图片批量下载模块入口。
//!
//! 子模块：
//! - `models`      — 数据模型（DownloadTarget / FetchOutcome / DownloadReport 等）
//! - `fetcher`     — 传输层抽象与 reqwest 实现
//! - `progress`    — 进度事件上报
//! - `downloader`  — 分批并发下载主流程

pub mod downloader;
pub mod fetcher;
pub mod models;
pub(crate) mod progress;
