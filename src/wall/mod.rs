//! 墙评论批量删除模块入口。
//!
//! 子模块：
//! - `models`     — wall 标识解析、逐项结果与统计
//! - `script`     — `execute` 脚本构建与分批（每批 ≤25）
//! - `api`        — VK `execute` 客户端与响应解析
//! - `dispatcher` — 顺序派发与批间等待
//! - `deleter`    — 解析 → 确认 → 删除 主流程

pub mod api;
pub mod deleter;
pub mod dispatcher;
pub mod models;
pub mod script;
