//! ラベリングセッションテスト
//!
//! 偽のビューアと決められた回答でセッションループを検証

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;
use seglabel::config::Timing;
use seglabel::error::{Result, SegLabelError};
use seglabel::prompt::ReaderInput;
use seglabel::session::{LabelingSession, RunSummary};
use seglabel::store::ResultsStore;
use seglabel::viewer::{SessionId, Viewer, ViewerSession};
use seglabel_common::{MethodPair, SlotAssignment, Worklist, WorklistRow};
use std::collections::HashSet;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::tempdir;

const WORKLIST: &str = "\
subject_id,image,A,B,x1,y1,z1,num_differences
S1,/data/S1/orig.mgz,/data/S1/a.mgz,/data/S1/b.mgz,10,20,30,5
S2,/data/S2/orig.mgz,/data/S2/a.mgz,/data/S2/b.mgz,11,21,31,0
S3,/data/S3/orig.mgz,/data/S3/a.mgz,/data/S3/b.mgz,12,22,32,2
";

/// 1被験者分の有効な回答
const ANSWER: &str = "1\n3\n2\n0\nlooks fine\n";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Launch(String),
    Reveal(String),
    Terminate(String),
}

#[derive(Default)]
struct State {
    events: Vec<Event>,
    alive: usize,
    max_alive: usize,
    /// 終了時点で既に結果が書かれていた被験者
    written_before_terminate: Vec<String>,
}

struct FakeViewer {
    results: PathBuf,
    failing: HashSet<String>,
    state: Mutex<State>,
}

impl FakeViewer {
    fn new(results: &Path) -> Self {
        Self {
            results: results.to_path_buf(),
            failing: HashSet::new(),
            state: Mutex::new(State::default()),
        }
    }

    fn failing(mut self, subject: &str) -> Self {
        self.failing.insert(subject.to_string());
        self
    }

    fn events(&self) -> Vec<Event> {
        self.state.lock().unwrap().events.clone()
    }

    fn position(&self, event: &Event) -> usize {
        self.events()
            .iter()
            .position(|e| e == event)
            .unwrap_or_else(|| panic!("missing event {:?}", event))
    }
}

#[async_trait]
impl Viewer for FakeViewer {
    async fn launch(&self, row: &WorklistRow, slots: SlotAssignment) -> Result<ViewerSession> {
        if self.failing.contains(&row.subject_id) {
            return Err(SegLabelError::FileNotFound(row.image.clone()));
        }

        let mut state = self.state.lock().unwrap();
        state.events.push(Event::Launch(row.subject_id.clone()));
        state.alive += 1;
        state.max_alive = state.max_alive.max(state.alive);
        Ok(ViewerSession::new(SessionId::generate(), &row.subject_id, slots))
    }

    async fn reveal(&self, session: &mut ViewerSession) {
        let mut state = self.state.lock().unwrap();
        state.events.push(Event::Reveal(session.subject_id.clone()));
    }

    async fn terminate(&self, session: ViewerSession) -> Result<()> {
        let labeled = ResultsStore::new(&self.results).labeled_subjects()?;
        let mut state = self.state.lock().unwrap();
        if labeled.contains(&session.subject_id) {
            state.written_before_terminate.push(session.subject_id.clone());
        }
        state.events.push(Event::Terminate(session.subject_id.clone()));
        state.alive -= 1;
        Ok(())
    }
}

type Session = LabelingSession<FakeViewer, ReaderInput<Cursor<String>>>;

fn session(results: &Path, viewer: FakeViewer, script: String) -> Session {
    LabelingSession::new(
        viewer,
        ReaderInput::new(Cursor::new(script)),
        ResultsStore::new(results),
        MethodPair::new("A", "B").unwrap(),
        "anna",
        Timing::immediate(),
    )
    .with_rng(StdRng::seed_from_u64(7))
}

fn rows() -> Vec<WorklistRow> {
    let methods = MethodPair::new("A", "B").unwrap();
    Worklist::from_csv_str(WORKLIST, &methods).unwrap().into_rows()
}

/// 3被験者すべてにレコードが1行ずつ書かれる
#[tokio::test(flavor = "multi_thread")]
async fn test_three_subjects_labeled() {
    let dir = tempdir().expect("Failed to create temp dir");
    let results = dir.path().join("results.csv");

    let mut session = session(&results, FakeViewer::new(&results), ANSWER.repeat(3));
    let summary = session.run(rows()).await.unwrap();
    assert_eq!(
        summary,
        RunSummary { labeled: 3, skipped: 0, stopped: false }
    );

    let (records, malformed) = ResultsStore::new(&results).read_all().unwrap();
    assert_eq!(malformed, 0);
    let subjects: Vec<_> = records.iter().map(|r| r.subject.as_str()).collect();
    assert_eq!(subjects, vec!["S1", "S2", "S3"]);

    for record in &records {
        let mut slots = [record.slot1.as_str(), record.slot2.as_str()];
        slots.sort();
        assert_eq!(slots, ["A", "B"]);
        assert_eq!(record.best, record.slot1);
        assert_eq!(record.comment, "looks fine");
        assert_eq!(record.labeler, "anna");
    }

    let viewer = session.viewer();
    let state = viewer.state.lock().unwrap();
    assert!(state.written_before_terminate.is_empty());
    assert!(state.max_alive <= 2);
    assert_eq!(state.alive, 0);
}

/// 現在の被験者に回答する前に次の被験者のビューアが起動している
#[tokio::test(flavor = "multi_thread")]
async fn test_next_viewer_prefetched() {
    let dir = tempdir().expect("Failed to create temp dir");
    let results = dir.path().join("results.csv");

    let mut session = session(&results, FakeViewer::new(&results), ANSWER.repeat(3));
    session.run(rows()).await.unwrap();

    let viewer = session.viewer();
    let launch_s2 = viewer.position(&Event::Launch("S2".into()));
    let reveal_s1 = viewer.position(&Event::Reveal("S1".into()));
    let terminate_s1 = viewer.position(&Event::Terminate("S1".into()));
    let launch_s3 = viewer.position(&Event::Launch("S3".into()));
    assert!(launch_s2 < reveal_s1);
    assert!(terminate_s1 < launch_s3);
}

/// どの質問で stop しても、その被験者のレコードは書かれず、両方のビューアが終了する
#[tokio::test(flavor = "multi_thread")]
async fn test_stop_at_each_prompt() {
    let valid: Vec<&str> = ANSWER.lines().collect();

    for k in 1..=5 {
        let dir = tempdir().expect("Failed to create temp dir");
        let results = dir.path().join("results.csv");

        let mut script = ANSWER.to_string();
        for answer in &valid[..k - 1] {
            script.push_str(answer);
            script.push('\n');
        }
        script.push_str("stop\n");

        let mut session = session(&results, FakeViewer::new(&results), script);
        let summary = session.run(rows()).await.unwrap();
        assert!(summary.stopped, "prompt {}", k);
        assert_eq!(summary.labeled, 1);

        let labeled = ResultsStore::new(&results).labeled_subjects().unwrap();
        assert_eq!(labeled.len(), 1);
        assert!(labeled.contains("S1"));

        let viewer = session.viewer();
        let events = viewer.events();
        assert!(events.contains(&Event::Terminate("S2".into())));
        assert!(events.contains(&Event::Terminate("S3".into())));
        assert_eq!(viewer.state.lock().unwrap().alive, 0);
    }
}

/// Ctrl-C（入力の終端）も stop と同じ扱い
#[tokio::test(flavor = "multi_thread")]
async fn test_interrupt_stops_without_record() {
    let dir = tempdir().expect("Failed to create temp dir");
    let results = dir.path().join("results.csv");

    let mut session = session(&results, FakeViewer::new(&results), "2\n1\n".to_string());
    let summary = session.run(rows()).await.unwrap();
    assert_eq!(
        summary,
        RunSummary { labeled: 0, skipped: 0, stopped: true }
    );
    assert!(!results.exists());
}

/// 起動に失敗した被験者は飛ばして続ける
#[tokio::test(flavor = "multi_thread")]
async fn test_launch_failure_skips_subject() {
    let dir = tempdir().expect("Failed to create temp dir");
    let results = dir.path().join("results.csv");

    let viewer = FakeViewer::new(&results).failing("S2");
    let mut session = session(&results, viewer, ANSWER.repeat(2));
    let summary = session.run(rows()).await.unwrap();
    assert_eq!(
        summary,
        RunSummary { labeled: 2, skipped: 1, stopped: false }
    );

    let labeled = ResultsStore::new(&results).labeled_subjects().unwrap();
    assert!(labeled.contains("S1") && labeled.contains("S3"));
    assert!(!labeled.contains("S2"));
}

/// 不正な入力は再入力になり、結果は有効な回答だけで決まる
#[tokio::test(flavor = "multi_thread")]
async fn test_invalid_answers_are_retried() {
    let dir = tempdir().expect("Failed to create temp dir");
    let results = dir.path().join("results.csv");

    let script = "0\n2\nmaybe\n1\n7\n3\n \n3\nboth bad\n".to_string();
    let mut session = session(&results, FakeViewer::new(&results), script);
    let summary = session.run(rows()[..1].to_vec()).await.unwrap();
    assert_eq!(summary.labeled, 1);

    let (records, _) = ResultsStore::new(&results).read_all().unwrap();
    let record = &records[0];
    assert_eq!(record.best, record.slot2);
    assert_eq!(record.confidence.as_str(), "random");
    assert_eq!(record.difference.value(), 3);
    assert_eq!(record.failed, "a+b");
    assert_eq!(record.comment, "both bad");
}

/// 結果ファイルに S1 があれば S2, S3 だけを処理する
#[tokio::test(flavor = "multi_thread")]
async fn test_resume_skips_labeled_subjects() {
    let dir = tempdir().expect("Failed to create temp dir");
    let results = dir.path().join("results.csv");
    std::fs::write(&results, "S1,B,A,A,certain,1,None,,bob,3.5,5\n").unwrap();
    let worklist_path = dir.path().join("worklist.csv");
    std::fs::write(&worklist_path, WORKLIST).unwrap();

    let store = ResultsStore::new(&results);
    let methods = MethodPair::new("A", "B").unwrap();
    let mut worklist = Worklist::from_csv(&worklist_path, &methods).unwrap();
    let excluded = worklist.exclude_labeled(&store.labeled_subjects().unwrap());
    assert_eq!(excluded, 1);
    assert_eq!(worklist.already_labeled(), 1);
    assert_eq!(worklist.total(), 3);

    let mut session = session(&results, FakeViewer::new(&results), ANSWER.repeat(2))
        .with_progress(worklist.already_labeled(), worklist.total());
    let summary = session.run(worklist.into_rows()).await.unwrap();
    assert_eq!(summary.labeled, 2);

    let launched: Vec<_> = session
        .viewer()
        .events()
        .into_iter()
        .filter_map(|e| match e {
            Event::Launch(subject) => Some(subject),
            _ => None,
        })
        .collect();
    assert_eq!(launched, vec!["S2", "S3"]);

    let (records, _) = store.read_all().unwrap();
    let subjects: Vec<_> = records.iter().map(|r| r.subject.as_str()).collect();
    assert_eq!(subjects, vec!["S1", "S2", "S3"]);
    assert_eq!(records[0].labeler, "bob");
}
