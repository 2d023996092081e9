//! Background task coordinator
//!
//! A single worker thread runs decode-and-transform jobs in submission
//! order. Nothing the worker produces touches consumer state directly:
//! progress and results travel back over a channel and are applied only
//! when the consumer calls [`AsyncTaskCoordinator::dispatch`].

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::{GenderError, Result};
use crate::features::{FeatureExtractor, FeatureVector};
use crate::visualization::{VisualizationData, VisualizationPipeline};

const CANCELLED_MESSAGE: &str = "Task cancelled: coordinator shut down";

/// Finished tasks whose terminal state stays queryable through `state`.
pub const RETAINED_FINISHED: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Visualization,
    Features,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskHandle {
    id: TaskId,
    kind: TaskKind,
    path: PathBuf,
}

impl TaskHandle {
    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[derive(Debug, Clone)]
pub enum TaskOutput {
    Visualization(Box<VisualizationData>),
    Features(FeatureVector),
}

/// Everything the worker reports. Per task: non-decreasing `Progress`
/// events, then exactly one `Delivered` or `Failed`.
#[derive(Debug, Clone)]
pub enum TaskEvent {
    Progress { id: TaskId, percent: u8 },
    Delivered { id: TaskId, output: TaskOutput },
    Failed { id: TaskId, message: String },
}

impl TaskEvent {
    pub fn id(&self) -> TaskId {
        match self {
            TaskEvent::Progress { id, .. }
            | TaskEvent::Delivered { id, .. }
            | TaskEvent::Failed { id, .. } => *id,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskEvent::Progress { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    Queued,
    Running(u8),
    Delivered,
    Failed(String),
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Delivered | TaskState::Failed(_))
    }
}

/// Work the coordinator knows how to run. Stages report progress through
/// the callback; the coordinator adds the 0 and 100 endpoints itself.
pub trait AnalysisBackend: Send + Sync {
    fn visualize(&self, path: &Path, progress: &mut dyn FnMut(u8)) -> Result<VisualizationData>;

    fn extract(&self, path: &Path, progress: &mut dyn FnMut(u8)) -> Result<FeatureVector>;
}

/// Backend over the real decoders and transforms.
#[derive(Debug, Clone)]
pub struct AudioBackend {
    pipeline: VisualizationPipeline,
    extractor: Arc<FeatureExtractor>,
}

impl AudioBackend {
    pub fn new(pipeline: VisualizationPipeline, extractor: Arc<FeatureExtractor>) -> Self {
        Self { pipeline, extractor }
    }
}

impl AnalysisBackend for AudioBackend {
    fn visualize(&self, path: &Path, progress: &mut dyn FnMut(u8)) -> Result<VisualizationData> {
        self.pipeline.render(path, progress)
    }

    fn extract(&self, path: &Path, progress: &mut dyn FnMut(u8)) -> Result<FeatureVector> {
        progress(10);
        let features = self.extractor.extract(path)?;
        progress(80);
        Ok(features)
    }
}

/// Receives events on the consumer thread during `dispatch`.
pub trait TaskConsumer {
    fn on_event(&mut self, event: TaskEvent);
}

impl<F: FnMut(TaskEvent)> TaskConsumer for F {
    fn on_event(&mut self, event: TaskEvent) {
        self(event)
    }
}

struct Job {
    id: TaskId,
    kind: TaskKind,
    path: PathBuf,
}

pub struct AsyncTaskCoordinator {
    job_tx: Option<Sender<Job>>,
    event_rx: Receiver<TaskEvent>,
    worker: Option<JoinHandle<()>>,
    cancelled: Arc<AtomicBool>,
    states: HashMap<TaskId, TaskState>,
    finished: VecDeque<TaskId>,
    next_id: u64,
}

impl fmt::Debug for AsyncTaskCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncTaskCoordinator")
            .field("running", &self.job_tx.is_some())
            .field("tasks", &self.states.len())
            .finish()
    }
}

impl AsyncTaskCoordinator {
    pub fn new(backend: Arc<dyn AnalysisBackend>) -> Result<Self> {
        let (job_tx, job_rx) = channel::<Job>();
        let (event_tx, event_rx) = channel::<TaskEvent>();
        let cancelled = Arc::new(AtomicBool::new(false));

        let worker_cancelled = Arc::clone(&cancelled);
        let worker = thread::Builder::new()
            .name("analysis-worker".to_string())
            .spawn(move || worker_loop(backend, job_rx, event_tx, worker_cancelled))
            .map_err(|e| GenderError::processing(format!("Failed to spawn worker: {}", e)))?;

        log::debug!("Coordinator started with one background worker");

        Ok(Self {
            job_tx: Some(job_tx),
            event_rx,
            worker: Some(worker),
            cancelled,
            states: HashMap::new(),
            finished: VecDeque::new(),
            next_id: 0,
        })
    }

    /// Queue a visualization of `path`.
    pub fn submit<P: Into<PathBuf>>(&mut self, path: P) -> Result<TaskHandle> {
        self.enqueue(TaskKind::Visualization, path.into())
    }

    /// Queue feature extraction of `path`.
    pub fn submit_extraction<P: Into<PathBuf>>(&mut self, path: P) -> Result<TaskHandle> {
        self.enqueue(TaskKind::Features, path.into())
    }

    fn enqueue(&mut self, kind: TaskKind, path: PathBuf) -> Result<TaskHandle> {
        let job_tx = self.job_tx.as_ref()
            .ok_or_else(|| GenderError::processing("Coordinator is shut down"))?;

        self.next_id += 1;
        let id = TaskId(self.next_id);
        job_tx
            .send(Job { id, kind, path: path.clone() })
            .map_err(|_| GenderError::processing("Background worker is not running"))?;

        self.states.insert(id, TaskState::Queued);
        log::debug!("Queued {:?} task {} for {}", kind, id, path.display());
        Ok(TaskHandle { id, kind, path })
    }

    /// State of a task. Pending tasks are always tracked; terminal states
    /// are kept for the [`RETAINED_FINISHED`] most recently finished tasks
    /// and return `None` once evicted.
    pub fn state(&self, id: TaskId) -> Option<&TaskState> {
        self.states.get(&id)
    }

    /// Number of task states currently held.
    pub fn tracked_tasks(&self) -> usize {
        self.states.len()
    }

    /// Hand every pending event to `consumer` without blocking. Returns the
    /// number of events delivered.
    pub fn dispatch(&mut self, consumer: &mut dyn TaskConsumer) -> usize {
        let mut count = 0;
        loop {
            match self.event_rx.try_recv() {
                Ok(event) => {
                    self.deliver(event, consumer);
                    count += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        count
    }

    /// Like [`dispatch`](Self::dispatch), but waits up to `timeout` for the
    /// first event.
    pub fn dispatch_timeout(&mut self, consumer: &mut dyn TaskConsumer, timeout: Duration) -> usize {
        match self.event_rx.recv_timeout(timeout) {
            Ok(event) => {
                self.deliver(event, consumer);
                1 + self.dispatch(consumer)
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => 0,
        }
    }

    /// Dispatch events until `handle` reaches a terminal state.
    pub fn wait(&mut self, handle: &TaskHandle, consumer: &mut dyn TaskConsumer) -> Result<TaskState> {
        loop {
            match self.states.get(&handle.id) {
                Some(state) if state.is_terminal() => return Ok(state.clone()),
                Some(_) => {}
                None => return Err(GenderError::processing(format!("Unknown task {}", handle.id))),
            }

            let event = self.event_rx.recv()
                .map_err(|_| GenderError::processing("Background worker stopped"))?;
            self.deliver(event, consumer);
        }
    }

    fn deliver(&mut self, event: TaskEvent, consumer: &mut dyn TaskConsumer) {
        let next = match &event {
            TaskEvent::Progress { percent, .. } => TaskState::Running(*percent),
            TaskEvent::Delivered { .. } => TaskState::Delivered,
            TaskEvent::Failed { message, .. } => TaskState::Failed(message.clone()),
        };
        let id = event.id();
        if let Some(state) = self.states.get_mut(&id) {
            if !state.is_terminal() {
                let finished = next.is_terminal();
                *state = next;
                if finished {
                    self.retire(id);
                }
            }
        }
        consumer.on_event(event);
    }

    fn retire(&mut self, id: TaskId) {
        self.finished.push_back(id);
        while self.finished.len() > RETAINED_FINISHED {
            if let Some(old) = self.finished.pop_front() {
                self.states.remove(&old);
            }
        }
    }

    /// Stop accepting work, fail every job that has not started, let the
    /// running job finish and join the worker. Events emitted along the
    /// way stay available to `dispatch`.
    pub fn shutdown(&mut self) {
        let Some(job_tx) = self.job_tx.take() else {
            return;
        };
        self.cancelled.store(true, Ordering::SeqCst);
        drop(job_tx);

        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::warn!("Background worker terminated abnormally");
            }
        }
        log::debug!("Coordinator shut down");
    }

    pub fn is_running(&self) -> bool {
        self.job_tx.is_some()
    }
}

impl Drop for AsyncTaskCoordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(
    backend: Arc<dyn AnalysisBackend>,
    job_rx: Receiver<Job>,
    event_tx: Sender<TaskEvent>,
    cancelled: Arc<AtomicBool>,
) {
    while let Ok(job) = job_rx.recv() {
        if cancelled.load(Ordering::SeqCst) {
            fail(&event_tx, job.id, CANCELLED_MESSAGE.to_string());
            continue;
        }
        run_job(backend.as_ref(), job, &event_tx);
    }
}

fn run_job(backend: &dyn AnalysisBackend, job: Job, event_tx: &Sender<TaskEvent>) {
    let start = Instant::now();
    let id = job.id;
    let mut last = 0u8;
    let _ = event_tx.send(TaskEvent::Progress { id, percent: 0 });

    let mut report = |percent: u8| {
        let percent = percent.min(99);
        if percent > last {
            last = percent;
            let _ = event_tx.send(TaskEvent::Progress { id, percent });
        }
    };

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| match job.kind {
        TaskKind::Visualization => backend
            .visualize(&job.path, &mut report)
            .map(|data| TaskOutput::Visualization(Box::new(data))),
        TaskKind::Features => backend
            .extract(&job.path, &mut report)
            .map(TaskOutput::Features),
    }));

    match outcome {
        Ok(Ok(output)) => {
            let _ = event_tx.send(TaskEvent::Progress { id, percent: 100 });
            let _ = event_tx.send(TaskEvent::Delivered { id, output });
            log::debug!("Task {} finished in {:.2}s", id, start.elapsed().as_secs_f64());
        }
        Ok(Err(e)) => {
            log::warn!("Task {} failed for {}: {}", id, job.path.display(), e);
            fail(event_tx, id, e.to_string());
        }
        Err(payload) => {
            let message = format!("Task panicked: {}", panic_message(payload.as_ref()));
            log::warn!("Task {} for {}: {}", id, job.path.display(), message);
            fail(event_tx, id, message);
        }
    }
}

fn fail(event_tx: &Sender<TaskEvent>, id: TaskId, message: String) {
    let _ = event_tx.send(TaskEvent::Progress { id, percent: 100 });
    let _ = event_tx.send(TaskEvent::Failed { id, message });
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
