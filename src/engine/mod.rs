// Batch process engine
//
// Drives every tool through the same lifecycle:
// pick a root path -> enumerate items -> process each item -> aggregate
// counts -> allow cancellation.
//
// Tools plug in through the BatchTool trait. The engine owns the target
// path, the published JobState and the cancellation token of the running
// job. Jobs run on the Tokio runtime, never on the caller's task. A panic
// inside an item counts as that item's failure.

pub mod state;

use async_trait::async_trait;
use chrono::Utc;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub use state::*;

use crate::error::{JunkyardError, Result};

tokio::task_local! {
    static JOB_WORK: TaskTracker;
}

/// Run filesystem or codec work off the async executor.
///
/// Work started on behalf of a job is tracked by that job, so
/// `JobHandle::wait` also covers threads that outlive a cancelled item.
pub(crate) async fn blocking<F, R>(work: F) -> Result<R>
where
    F: FnOnce() -> Result<R> + Send + 'static,
    R: Send + 'static,
{
    let handle = match JOB_WORK.try_with(TaskTracker::clone) {
        Ok(tracker) => tracker.spawn_blocking(work),
        Err(_) => tokio::task::spawn_blocking(work),
    };
    handle.await?
}

/// Main trait for batch tools
#[async_trait]
pub trait BatchTool: Send + Sync + 'static {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Which kind of target the tool accepts
    fn selection(&self) -> TargetSelection;

    /// Checks run before enumeration; a failure fails the whole job
    async fn prepare(&self) -> Result<()> {
        Ok(())
    }

    /// List the items to process under `root`, in processing order
    async fn enumerate(&self, root: &Path) -> Result<Vec<PathBuf>>;

    /// Transform one item. Errors are counted, never fatal to the batch.
    async fn process_item(&self, item: &Path) -> Result<()>;
}

/// Engine for one tool instance; at most one job runs at a time
pub struct ProcessEngine<T: BatchTool> {
    tool: watch::Sender<Arc<T>>,
    target: watch::Sender<Option<PathBuf>>,
    state: Arc<watch::Sender<JobState>>,
    active: Mutex<Option<CancellationToken>>,
}

impl<T: BatchTool> ProcessEngine<T> {
    pub fn new(tool: T) -> Self {
        Self {
            tool: watch::channel(Arc::new(tool)).0,
            target: watch::channel(None).0,
            state: Arc::new(watch::channel(JobState::default()).0),
            active: Mutex::new(None),
        }
    }

    /// Current tool configuration
    pub fn tool(&self) -> Arc<T> {
        self.tool.borrow().clone()
    }

    /// Observe tool configuration changes
    pub fn subscribe_tool(&self) -> watch::Receiver<Arc<T>> {
        self.tool.subscribe()
    }

    /// Change tool options. A running job keeps the options it started with.
    pub fn configure<F>(&self, update: F)
    where
        T: Clone,
        F: FnOnce(&mut T),
    {
        self.tool.send_modify(|tool| update(Arc::make_mut(tool)));
    }

    /// Record the root path for the next job
    pub fn set_target<P: Into<PathBuf>>(&self, path: P) {
        let path = path.into();
        debug!("{} target set to {}", self.tool.borrow().name(), path.display());
        self.target.send_replace(Some(path));
    }

    pub fn target(&self) -> Option<PathBuf> {
        self.target.borrow().clone()
    }

    pub fn subscribe_target(&self) -> watch::Receiver<Option<PathBuf>> {
        self.target.subscribe()
    }

    /// Snapshot of the current job state
    pub fn state(&self) -> JobState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<JobState> {
        self.state.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.state.borrow().is_running
    }

    /// Accept the first dropped entry matching the tool's selection rules
    pub fn handle_drop<P: AsRef<Path>>(&self, entries: &[P]) -> bool {
        let selection = self.tool.borrow().selection();
        match entries.iter().map(AsRef::as_ref).find(|entry| selection.accepts(entry)) {
            Some(entry) => {
                self.set_target(entry);
                true
            }
            None => false,
        }
    }

    /// Start a job on the current target.
    ///
    /// Returns `Ok(None)` without doing anything when no target is set, and
    /// `JobAlreadyRunning` while another job is active. Must be called from
    /// within a Tokio runtime.
    pub fn start_job(&self) -> Result<Option<JobHandle>> {
        let Some(root) = self.target() else {
            debug!("No target selected, ignoring start request");
            return Ok(None);
        };

        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if self.state.borrow().is_running {
            return Err(JunkyardError::JobAlreadyRunning);
        }

        let job_id = Uuid::new_v4();
        let token = CancellationToken::new();
        let work = TaskTracker::new();
        *active = Some(token.clone());
        self.state.send_replace(JobState::started(job_id));

        let job = Job {
            id: job_id,
            root,
            tool: self.tool(),
            state: Arc::clone(&self.state),
            token: token.clone(),
            work: work.clone(),
        };
        let handle = tokio::spawn(job.run());

        Ok(Some(JobHandle {
            job_id,
            token,
            handle,
            work,
        }))
    }

    /// Request cancellation of the running job, if any.
    ///
    /// The state stops reporting a running job right away. Blocking work of
    /// the interrupted item may still be finishing; `JobHandle::wait` returns
    /// once it has.
    pub fn cancel(&self) {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(token) = active.take() {
            info!("Cancelling {} job", self.tool.borrow().name());
            token.cancel();
        }
        self.state.send_if_modified(|state| {
            let was_running = state.is_running;
            state.is_running = false;
            state.current_item = None;
            was_running
        });
    }
}

/// Handle to a started job
pub struct JobHandle {
    job_id: Uuid,
    token: CancellationToken,
    handle: JoinHandle<Result<JobSummary>>,
    work: TaskTracker,
}

impl JobHandle {
    pub fn id(&self) -> Uuid {
        self.job_id
    }

    /// Token observed by the job between and during items
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Wait for the job to end and for its blocking work to settle.
    /// Whole-job failures surface here.
    pub async fn wait(self) -> Result<JobSummary> {
        let result = self.handle.await;
        self.work.close();
        self.work.wait().await;
        result?
    }
}

struct Job<T: BatchTool> {
    id: Uuid,
    root: PathBuf,
    tool: Arc<T>,
    state: Arc<watch::Sender<JobState>>,
    token: CancellationToken,
    work: TaskTracker,
}

#[derive(Default)]
struct Tally {
    total: usize,
    processed: usize,
    failed: usize,
    cancelled: bool,
}

impl<T: BatchTool> Job<T> {
    async fn run(self) -> Result<JobSummary> {
        let started_at = Utc::now();
        info!("Starting {} job {} on {}", self.tool.name(), self.id, self.root.display());

        let result = match AssertUnwindSafe(self.drive()).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => Err(JunkyardError::Panicked(panic_message(&*payload))),
        };

        self.update(|state| {
            state.is_running = false;
            state.current_item = None;
        });

        match result {
            Ok(tally) => {
                info!(
                    "{} job finished: {} processed, {} failed, {} total{}",
                    self.tool.name(),
                    tally.processed,
                    tally.failed,
                    tally.total,
                    if tally.cancelled { " (cancelled)" } else { "" }
                );
                Ok(JobSummary {
                    job_id: self.id,
                    root: self.root.clone(),
                    total_items: tally.total,
                    processed_count: tally.processed,
                    failed_count: tally.failed,
                    cancelled: tally.cancelled,
                    started_at,
                    finished_at: Utc::now(),
                })
            }
            Err(e) => {
                error!("{} job failed on {}: {}", self.tool.name(), self.root.display(), e);
                Err(e)
            }
        }
    }

    async fn drive(&self) -> Result<Tally> {
        let mut tally = Tally::default();

        let items = tokio::select! {
            biased;
            _ = self.token.cancelled() => {
                tally.cancelled = true;
                return Ok(tally);
            }
            items = JOB_WORK.scope(self.work.clone(), self.collect_items()) => items?,
        };

        tally.total = items.len();
        self.update(|state| state.total_items = tally.total);
        info!("Found {} items to process", tally.total);

        for (index, item) in items.iter().enumerate() {
            if self.token.is_cancelled() {
                tally.cancelled = true;
                break;
            }

            let label = display_label(&self.root, item);
            self.update(|state| {
                state.current_index = index + 1;
                state.current_item = Some(label.clone());
            });

            let work = JOB_WORK.scope(self.work.clone(), self.tool.process_item(item));
            let outcome = tokio::select! {
                biased;
                _ = self.token.cancelled() => {
                    tally.cancelled = true;
                    break;
                }
                outcome = AssertUnwindSafe(work).catch_unwind() => outcome
                    .unwrap_or_else(|payload| Err(JunkyardError::Panicked(panic_message(&*payload)))),
            };

            match outcome {
                Ok(()) => {
                    debug!("Processed {}", label);
                    tally.processed += 1;
                    self.update(|state| state.processed_count += 1);
                }
                Err(e) => {
                    warn!("Failed to process {}: {}", label, e);
                    tally.failed += 1;
                    self.update(|state| state.failed_count += 1);
                }
            }
        }

        Ok(tally)
    }

    async fn collect_items(&self) -> Result<Vec<PathBuf>> {
        self.tool.prepare().await?;
        self.tool.enumerate(&self.root).await
    }

    /// Apply a change only while the published state still belongs to this job
    fn update<F: FnOnce(&mut JobState)>(&self, change: F) {
        self.state.send_if_modified(|state| {
            if state.job_id != Some(self.id) {
                return false;
            }
            change(state);
            true
        });
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| message.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Path shown to observers: relative to the root, or the file name for file targets
fn display_label(root: &Path, item: &Path) -> String {
    let relative = if item == root {
        item.file_name().map(PathBuf::from)
    } else {
        pathdiff::diff_paths(item, root)
    };
    relative.unwrap_or_else(|| item.to_path_buf()).display().to_string()
}
