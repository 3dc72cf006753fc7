//! 进度上报。
//!
//! 管线只发事件，终端进度条由 UI 层根据事件绘制。

use super::models::{DownloadCallback, DownloadEvent, DownloadReport, FetchOutcome, ProgressSnapshot};

pub(crate) struct ProgressReporter {
    pub(crate) snapshot: ProgressSnapshot,
    cb: Option<DownloadCallback>,
}

impl ProgressReporter {
    pub(crate) fn new(items_total: usize, batch_total: usize, cb: Option<DownloadCallback>) -> Self {
        let mut reporter = Self {
            snapshot: ProgressSnapshot {
                batch_done: 0,
                batch_total,
                items_done: 0,
                items_total,
            },
            cb,
        };
        reporter.emit(DownloadEvent::Started {
            total: items_total,
            batches: batch_total,
        });
        reporter
    }

    fn emit(&mut self, event: DownloadEvent) {
        if let Some(cb) = self.cb.as_mut() {
            cb(event);
        }
    }

    pub(crate) fn item(&mut self, outcome: &FetchOutcome) {
        self.emit(DownloadEvent::ItemFinished(outcome.clone()));
    }

    /// 整批完成后按批大小推进，不做逐项推进。
    pub(crate) fn batch_done(&mut self, batch_len: usize) {
        self.snapshot.batch_done += 1;
        self.snapshot.items_done =
            (self.snapshot.items_done + batch_len).min(self.snapshot.items_total);
        self.emit(DownloadEvent::BatchFinished(self.snapshot));
    }

    pub(crate) fn finish(&mut self, report: DownloadReport) {
        self.emit(DownloadEvent::Finished(report));
    }
}
