//! ラベリングセッション
//!
//! 現在の被験者について質問している間に、次の被験者のビューアを先に起動しておく。
//! 回答が揃ったらビューアを終了させてから結果を1行追記する。
//!
//! ## 変更履歴
//! - 2026-10-18: ワークリスト最終行もラベリング対象に含める

use crate::config::Timing;
use crate::error::Result;
use crate::prompt::AnswerSource;
use crate::questions::{self, Outcome};
use crate::store::ResultsStore;
use crate::viewer::{Viewer, ViewerSession};
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::SeedableRng;
use seglabel_common::{LabelRecord, MethodPair, SlotAssignment, WorklistRow};
use std::time::{Duration, Instant};

const WARMUP_TICK: Duration = Duration::from_millis(100);

/// 実行結果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// 今回記録した件数
    pub labeled: usize,
    /// 起動に失敗して飛ばした件数
    pub skipped: usize,
    /// `stop` / Ctrl-C で中断したか
    pub stopped: bool,
}

type Prepared = (WorklistRow, ViewerSession);

pub struct LabelingSession<V, S> {
    viewer: V,
    input: S,
    store: ResultsStore,
    methods: MethodPair,
    labeler: String,
    timing: Timing,
    rng: StdRng,
    already_labeled: usize,
    total: usize,
}

impl<V: Viewer, S: AnswerSource> LabelingSession<V, S> {
    pub fn new(
        viewer: V,
        input: S,
        store: ResultsStore,
        methods: MethodPair,
        labeler: impl Into<String>,
        timing: Timing,
    ) -> Self {
        Self {
            viewer,
            input,
            store,
            methods,
            labeler: labeler.into(),
            timing,
            rng: StdRng::from_entropy(),
            already_labeled: 0,
            total: 0,
        }
    }

    /// スロット割り当てに使う乱数（テストでは固定シード）
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// 進捗表示の基準（既にラベル済みの件数とワークリスト全体の件数）
    pub fn with_progress(mut self, already_labeled: usize, total: usize) -> Self {
        self.already_labeled = already_labeled;
        self.total = total;
        self
    }

    pub fn viewer(&self) -> &V {
        &self.viewer
    }

    /// 残りの被験者を順にラベリングする
    pub async fn run(&mut self, rows: Vec<WorklistRow>) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        if self.total == 0 {
            self.total = self.already_labeled + rows.len();
        }
        let mut queue = rows.into_iter();

        println!("[INFO] Launching viewers...");
        let mut current = self.launch_next(&mut queue, &mut summary).await;
        let mut next = self.launch_next(&mut queue, &mut summary).await;
        if current.is_some() {
            self.warm_up().await;
        }

        while let Some((row, mut session)) = current.take() {
            self.viewer.reveal(&mut session).await;
            println!("\n[INFO] Subject: {}", row.subject_id);

            let started = Instant::now();
            let input = &mut self.input;
            let outcome = match tokio::task::block_in_place(|| questions::ask(input)) {
                Ok(outcome) => outcome,
                Err(e) => {
                    self.shutdown(session, next.take()).await;
                    return Err(e);
                }
            };
            let elapsed = started.elapsed().as_secs_f64();

            let answers = match outcome {
                Outcome::Answered(answers) => answers,
                Outcome::Stopped => {
                    println!("[INFO] Stopping...");
                    self.shutdown(session, next.take()).await;
                    tokio::time::sleep(self.timing.stop_grace).await;
                    summary.stopped = true;
                    return Ok(summary);
                }
            };

            let slots = session.slots.clone();
            if let Err(e) = self.viewer.terminate(session).await {
                log::warn!("failed to stop viewer for {}: {}", row.subject_id, e);
            }

            let record = LabelRecord::from_answers(&row, &slots, &answers, &self.labeler, elapsed);
            if let Err(e) = self.store.append(&record) {
                if let Some((_, pending)) = next.take() {
                    self.stop_viewer(pending).await;
                }
                return Err(e);
            }
            summary.labeled += 1;
            println!(
                "[INFO] Labeled {}/{}",
                self.already_labeled + summary.labeled,
                self.total
            );

            current = next.take();
            next = self.launch_next(&mut queue, &mut summary).await;
        }

        Ok(summary)
    }

    /// 次に起動できる被験者のビューアを起動する（失敗した被験者は飛ばす）
    async fn launch_next(
        &mut self,
        queue: &mut std::vec::IntoIter<WorklistRow>,
        summary: &mut RunSummary,
    ) -> Option<Prepared> {
        for row in queue.by_ref() {
            let slots = SlotAssignment::shuffled(&self.methods, &mut self.rng);
            match self.viewer.launch(&row, slots).await {
                Ok(session) => {
                    log::debug!("launched {} as {}", row.subject_id, session.id);
                    return Some((row, session));
                }
                Err(e) => {
                    println!("[ERROR] Skipping {}: {}", row.subject_id, e);
                    summary.skipped += 1;
                }
            }
        }
        None
    }

    async fn warm_up(&self) {
        let warmup = self.timing.warmup;
        if warmup.is_zero() {
            return;
        }

        let ticks = (warmup.as_millis() / WARMUP_TICK.as_millis()).max(1) as u64;
        let bar = ProgressBar::new(ticks);
        if let Ok(style) = ProgressStyle::with_template("{msg} [{bar:40.cyan/blue}] {elapsed}") {
            bar.set_style(style.progress_chars("=> "));
        }
        bar.set_message("Waiting for viewer");
        for _ in 0..ticks {
            tokio::time::sleep(WARMUP_TICK).await;
            bar.inc(1);
        }
        bar.finish_and_clear();
    }

    async fn shutdown(&self, session: ViewerSession, next: Option<Prepared>) {
        self.stop_viewer(session).await;
        if let Some((_, pending)) = next {
            self.stop_viewer(pending).await;
        }
    }

    async fn stop_viewer(&self, session: ViewerSession) {
        let subject = session.subject_id.clone();
        if let Err(e) = self.viewer.terminate(session).await {
            log::warn!("failed to stop viewer for {}: {}", subject, e);
        }
    }
}
