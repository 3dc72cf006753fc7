//! 评论删除相关的数据模型定义。
//!
//! wall 标识解析、逐项结果、批次结果与累计统计。

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

fn re_wall_id() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"^wall(-?\d+)_(\d+)(?:\?(.*))?$").unwrap())
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("不是有效的 wall 标识: {0}")]
    Malformed(String),
    #[error("reply 参数不是数字: {0}")]
    InvalidReply(String),
}

/// 一条待删除的墙评论。
///
/// 原始形式 `wall<owner>_<comment>[?reply=<reply>][&...]`；带 `reply` 参数时
/// 评论 ID 取 reply 的值。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WallCommentRef {
    pub raw: String,
    pub owner_id: String,
    pub comment_id: String,
}

impl WallCommentRef {
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let caps = re_wall_id()
            .captures(raw.trim())
            .ok_or_else(|| ParseError::Malformed(raw.to_string()))?;
        let owner_id = caps[1].to_string();
        let mut comment_id = caps[2].to_string();

        if let Some(query) = caps.get(3) {
            let reply = query
                .as_str()
                .split('&')
                .find_map(|pair| pair.strip_prefix("reply="));
            if let Some(reply) = reply {
                if reply.is_empty() || !reply.chars().all(|c| c.is_ascii_digit()) {
                    return Err(ParseError::InvalidReply(raw.to_string()));
                }
                comment_id = reply.to_string();
            }
        }

        Ok(Self {
            raw: raw.trim().to_string(),
            owner_id,
            comment_id,
        })
    }

    /// owner ID 中包含任一排除 ID（子串）即视为排除。
    pub fn is_excluded_by(&self, exclude_ids: &[String]) -> bool {
        exclude_ids
            .iter()
            .filter(|id| !id.is_empty())
            .any(|id| self.owner_id.contains(id.as_str()))
    }
}

/// 单条删除结果。`wall.deleteComment` 成功返回 1，`execute` 中失败的调用为 false。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ItemOutcome {
    Deleted,
    Failed,
    Unknown,
}

impl ItemOutcome {
    pub fn from_value(v: &Value) -> Self {
        match v {
            Value::Bool(true) => ItemOutcome::Deleted,
            Value::Bool(false) => ItemOutcome::Failed,
            Value::Number(n) if n.as_i64() == Some(1) => ItemOutcome::Deleted,
            Value::Number(n) if n.as_i64() == Some(0) => ItemOutcome::Failed,
            _ => ItemOutcome::Unknown,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeletionTally {
    pub deleted: usize,
    pub failed: usize,
}

impl DeletionTally {
    pub fn record(&mut self, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Deleted => self.deleted += 1,
            ItemOutcome::Failed => self.failed += 1,
            ItemOutcome::Unknown => {}
        }
    }

    pub fn fold<'a>(mut self, outcomes: impl IntoIterator<Item = &'a ItemOutcome>) -> Self {
        for o in outcomes {
            self.record(*o);
        }
        self
    }

    pub fn merge(&mut self, other: DeletionTally) {
        self.deleted += other.deleted;
        self.failed += other.failed;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// 收到 `response` 数组
    Completed {
        tally: DeletionTally,
        items: Vec<ItemOutcome>,
    },
    /// 请求失败或响应格式不对，本批不计入统计
    Rejected(String),
}

#[derive(Debug, Clone)]
pub enum DeleteEvent {
    Extracted {
        count: usize,
        review_file: std::path::PathBuf,
    },
    Aborted,
    Started {
        batches: usize,
    },
    BatchFinished {
        index: usize,
        size: usize,
        outcome: BatchOutcome,
    },
    Finished(DeletionTally),
}

pub type DeleteCallback = Box<dyn FnMut(DeleteEvent) + Send>;
