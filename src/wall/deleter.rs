//! 评论批量删除主流程。
//!
//! 解析 → 排除 → 写出待审文件 → 人工确认 → 按 25 条一批顺序执行 → 汇总。
//! 未确认时不会发出任何请求。

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{error, info, warn};

use super::api::{ExecuteApi, parse_execute_response};
use super::dispatcher::{Pacer, SequentialDispatcher};
use super::models::{
    BatchOutcome, DeleteCallback, DeleteEvent, DeletionTally, WallCommentRef,
};
use super::script::{ExecuteBatch, build_batches};

#[derive(Debug, Error)]
pub enum DeleteError {
    #[error("写入待删除列表 {path} 失败: {source}")]
    Review { path: PathBuf, source: io::Error },
}

#[derive(Debug, Clone, Default)]
pub struct DeleteOptions {
    pub exclude_ids: Vec<String>,
    pub review_file: PathBuf,
}

pub struct CommentDeleter<A, P> {
    dispatcher: SequentialDispatcher<A, P>,
    options: DeleteOptions,
    cb: Option<DeleteCallback>,
}

impl<A: ExecuteApi, P: Pacer> CommentDeleter<A, P> {
    pub fn new(dispatcher: SequentialDispatcher<A, P>, options: DeleteOptions) -> Self {
        Self {
            dispatcher,
            options,
            cb: None,
        }
    }

    pub fn with_progress(mut self, cb: DeleteCallback) -> Self {
        self.cb = Some(cb);
        self
    }

    #[cfg(test)]
    pub fn dispatcher(&self) -> &SequentialDispatcher<A, P> {
        &self.dispatcher
    }

    fn emit(&mut self, event: DeleteEvent) {
        if let Some(cb) = self.cb.as_mut() {
            cb(event);
        }
    }

    /// 解析并排除。排除发生在分批之前。
    pub fn prepare(&self, raw_ids: &[String]) -> Vec<WallCommentRef> {
        filter_refs(raw_ids, &self.options.exclude_ids)
    }

    /// `confirm` 收到待审文件路径与条数，返回 `true` 才继续；
    /// 拒绝时返回 `Ok(None)`，不产生统计。
    pub async fn run<C>(
        &mut self,
        raw_ids: &[String],
        confirm: C,
    ) -> Result<Option<DeletionTally>, DeleteError>
    where
        C: FnOnce(&Path, usize) -> bool,
    {
        let refs = self.prepare(raw_ids);
        let review_file = self.options.review_file.clone();
        write_review_file(&review_file, &refs)?;
        info!("已提取 {} 条 wall ID 到 {}", refs.len(), review_file.display());
        self.emit(DeleteEvent::Extracted {
            count: refs.len(),
            review_file: review_file.clone(),
        });

        if !confirm(&review_file, refs.len()) {
            info!("用户取消了删除");
            self.emit(DeleteEvent::Aborted);
            return Ok(None);
        }

        let batches = build_batches(&refs);
        self.emit(DeleteEvent::Started {
            batches: batches.len(),
        });

        let mut total = DeletionTally::default();
        let last = batches.len().saturating_sub(1);
        for (index, batch) in batches.iter().enumerate() {
            let outcome = self.send_batch(batch, index == last).await;
            if let BatchOutcome::Completed { tally, .. } = &outcome {
                total.merge(*tally);
            }
            self.emit(DeleteEvent::BatchFinished {
                index,
                size: batch.len(),
                outcome,
            });
        }

        info!(
            "删除结束：共 {} 次请求，成功 {} 条，失败 {} 条",
            self.dispatcher.sent(),
            total.deleted,
            total.failed
        );
        self.emit(DeleteEvent::Finished(total));
        Ok(Some(total))
    }

    async fn send_batch(&mut self, batch: &ExecuteBatch, is_last: bool) -> BatchOutcome {
        let value = match self.dispatcher.dispatch(&batch.code, is_last).await {
            Ok(v) => v,
            Err(e) => {
                error!("execute 请求失败: {}", e);
                return BatchOutcome::Rejected(e.to_string());
            }
        };
        match parse_execute_response(&value) {
            Ok(items) => {
                if items.len() != batch.len() {
                    warn!(
                        "响应条数 {} 与本批 {} 条不一致",
                        items.len(),
                        batch.len()
                    );
                }
                let tally = DeletionTally::default().fold(&items);
                info!(
                    "本批成功删除 {} 条；失败 {} 条（可能已删除或位于封闭的社区/主页）",
                    tally.deleted, tally.failed
                );
                BatchOutcome::Completed { tally, items }
            }
            Err(e) => {
                error!("API 响应异常: {}", e);
                BatchOutcome::Rejected(e.to_string())
            }
        }
    }
}

/// 逐条解析，无法解析的记录警告后丢弃，被排除的 owner 直接丢弃。
pub fn filter_refs(raw_ids: &[String], exclude_ids: &[String]) -> Vec<WallCommentRef> {
    raw_ids
        .iter()
        .filter_map(|raw| match WallCommentRef::parse(raw) {
            Ok(c) => Some(c),
            Err(e) => {
                warn!("{}", e);
                None
            }
        })
        .filter(|c| !c.is_excluded_by(exclude_ids))
        .collect()
}

pub fn write_review_file(path: &Path, refs: &[WallCommentRef]) -> Result<(), DeleteError> {
    let to_err = |source| DeleteError::Review {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(to_err)?;
    }
    let mut out = BufWriter::new(File::create(path).map_err(to_err)?);
    for c in refs {
        writeln!(out, "{}", c.raw).map_err(to_err)?;
    }
    out.flush().map_err(to_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wall::api::ExecuteError;
    use crate::wall::dispatcher::NoDelay;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    /// 按顺序返回预设响应，并记录收到的脚本。
    struct ScriptedApi {
        replies: Mutex<VecDeque<Result<Value, ExecuteError>>>,
        codes: Mutex<Vec<String>>,
    }

    impl ScriptedApi {
        fn new(replies: Vec<Result<Value, ExecuteError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                codes: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.codes.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ExecuteApi for ScriptedApi {
        async fn execute(&self, code: &str) -> Result<Value, ExecuteError> {
            self.codes.lock().unwrap().push(code.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(json!({"response": []})))
        }
    }

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("wall-1_{i}")).collect()
    }

    fn deleter(
        api: ScriptedApi,
        dir: &Path,
        exclude: &[&str],
    ) -> CommentDeleter<ScriptedApi, NoDelay> {
        CommentDeleter::new(
            SequentialDispatcher::new(api, NoDelay, true),
            DeleteOptions {
                exclude_ids: exclude.iter().map(|s| s.to_string()).collect(),
                review_file: dir.join("to_delete_comment_ids.txt"),
            },
        )
    }

    #[test]
    fn filter_drops_excluded_and_malformed() {
        let raw = vec![
            "wall1089585_1".to_string(),
            "wall-5_2?reply=3".to_string(),
            "garbage".to_string(),
            "wall77_4".to_string(),
        ];
        let kept = filter_refs(&raw, &["108".to_string()]);
        let owners: Vec<_> = kept.iter().map(|c| c.owner_id.as_str()).collect();
        assert_eq!(owners, vec!["-5", "77"]);
    }

    #[tokio::test]
    async fn thirty_refs_make_two_batches_and_tally() {
        let dir = TempDir::new().unwrap();
        let mut first = vec![json!(1); 20];
        first.extend(vec![json!(false); 5]);
        let second = vec![json!(true), json!(false), json!(true), json!(true), json!(false)];
        let api = ScriptedApi::new(vec![
            Ok(json!({ "response": first })),
            Ok(json!({ "response": second })),
        ]);
        let mut d = deleter(api, dir.path(), &[]);

        let tally = d.run(&ids(30), |_, n| n == 30).await.unwrap().unwrap();

        assert_eq!(tally, DeletionTally { deleted: 23, failed: 7 });
        let api = d.dispatcher().api();
        assert_eq!(api.calls(), 2);
        let codes = api.codes.lock().unwrap();
        assert_eq!(codes[0].matches("deleteComment").count(), 25);
        assert_eq!(codes[1].matches("deleteComment").count(), 5);
    }

    #[tokio::test]
    async fn review_file_lists_filtered_ids() {
        let dir = TempDir::new().unwrap();
        let mut d = deleter(ScriptedApi::new(vec![]), dir.path(), &["-108"]);
        let raw = vec![
            "wall-108958540_1".to_string(),
            "wall182582439_2?reply=3".to_string(),
        ];
        let seen = Arc::new(Mutex::new(None));
        let seen2 = Arc::clone(&seen);

        d.run(&raw, move |path, n| {
            *seen2.lock().unwrap() = Some((path.to_path_buf(), n));
            false
        })
        .await
        .unwrap();

        let review = dir.path().join("to_delete_comment_ids.txt");
        assert_eq!(*seen.lock().unwrap(), Some((review.clone(), 1)));
        assert_eq!(
            std::fs::read_to_string(review).unwrap(),
            "wall182582439_2?reply=3\n"
        );
    }

    #[tokio::test]
    async fn no_ids_still_writes_empty_review_and_asks() {
        let dir = TempDir::new().unwrap();
        let mut d = deleter(ScriptedApi::new(vec![]), dir.path(), &[]);
        let asked = Arc::new(Mutex::new(None));
        let asked2 = Arc::clone(&asked);

        let tally = d
            .run(&[], move |_, n| {
                *asked2.lock().unwrap() = Some(n);
                true
            })
            .await
            .unwrap();

        assert_eq!(*asked.lock().unwrap(), Some(0));
        assert_eq!(tally, Some(DeletionTally::default()));
        assert_eq!(d.dispatcher().api().calls(), 0);
        let review = dir.path().join("to_delete_comment_ids.txt");
        assert_eq!(std::fs::read_to_string(review).unwrap(), "");
    }

    #[tokio::test]
    async fn declining_makes_no_calls_and_no_tally() {
        let dir = TempDir::new().unwrap();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let mut d = deleter(ScriptedApi::new(vec![]), dir.path(), &[])
            .with_progress(Box::new(move |e| sink.lock().unwrap().push(e)));

        let result = d.run(&ids(10), |_, _| false).await.unwrap();

        assert!(result.is_none());
        assert_eq!(d.dispatcher().api().calls(), 0);
        assert_eq!(d.dispatcher().sent(), 0);
        let events = events.lock().unwrap();
        assert!(matches!(events.last(), Some(DeleteEvent::Aborted)));
        assert!(!events.iter().any(|e| matches!(e, DeleteEvent::Finished(_))));
    }

    #[tokio::test]
    async fn bad_batches_are_skipped_not_fatal() {
        let dir = TempDir::new().unwrap();
        let api = ScriptedApi::new(vec![
            Ok(json!({"error": {"error_code": 6, "error_msg": "Too many requests per second"}})),
            Err(ExecuteError::Status(500)),
            Ok(json!({"response": [true, true]})),
        ]);
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let mut d = deleter(api, dir.path(), &[])
            .with_progress(Box::new(move |e| sink.lock().unwrap().push(e)));

        let tally = d.run(&ids(52), |_, _| true).await.unwrap().unwrap();

        assert_eq!(tally, DeletionTally { deleted: 2, failed: 0 });
        assert_eq!(d.dispatcher().api().calls(), 3);
        let rejected = events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| {
                matches!(
                    e,
                    DeleteEvent::BatchFinished {
                        outcome: BatchOutcome::Rejected(_),
                        ..
                    }
                )
            })
            .count();
        assert_eq!(rejected, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn keeps_sequential_delay_between_batches() {
        use crate::wall::dispatcher::FixedDelayPacer;
        use std::time::Duration;

        let dir = TempDir::new().unwrap();
        let mut d = CommentDeleter::new(
            SequentialDispatcher::new(
                ScriptedApi::new(vec![]),
                FixedDelayPacer::new(Duration::from_millis(500)),
                true,
            ),
            DeleteOptions {
                exclude_ids: Vec::new(),
                review_file: dir.path().join("ids.txt"),
            },
        );
        let start = tokio::time::Instant::now();
        d.run(&ids(60), |_, _| true).await.unwrap();
        // 3 批，每批之后（含最后一批）各等 0.5s
        assert!(start.elapsed() >= Duration::from_millis(1500));
    }
}
