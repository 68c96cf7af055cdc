use std::{
    any::Any,
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU8, AtomicUsize, Ordering},
        mpsc,
    },
    thread::{self, JoinHandle},
};

use crate::{
    dispatch::{
        queue::BoundedQueue,
        task::{RenderTask, TaskId},
    },
    foundation::{
        core::FrameTick,
        error::{RenderError, SuiteError, SuiteResult},
    },
    render::{RenderOutput, Renderer},
};

/// Lifecycle of one pool worker.
///
/// `Idle -> Dequeuing -> Rendering -> Idle` per task; `Dequeuing -> Stopping -> Terminated`
/// once the queue is closed and drained.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    Idle = 0,
    Dequeuing = 1,
    Rendering = 2,
    Stopping = 3,
    Terminated = 4,
}

impl WorkerState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Idle,
            1 => Self::Dequeuing,
            2 => Self::Rendering,
            3 => Self::Stopping,
            _ => Self::Terminated,
        }
    }
}

#[derive(Debug)]
pub struct CompletedTask {
    pub id: TaskId,
    pub tick: Option<FrameTick>,
    pub output: RenderOutput,
}

#[derive(Debug)]
pub struct TaskFailure {
    pub id: TaskId,
    pub tick: Option<FrameTick>,
    pub error: RenderError,
}

#[derive(Debug)]
enum TaskReport {
    Completed(CompletedTask),
    Failed(TaskFailure),
}

/// Aggregate outcome of the tasks a pool processed.
#[derive(Debug, Default)]
pub struct PoolReport {
    pub completed: Vec<CompletedTask>,
    pub failures: Vec<TaskFailure>,
}

impl PoolReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn total(&self) -> usize {
        self.completed.len() + self.failures.len()
    }

    /// One line per failure after a count header.
    pub fn summary(&self) -> String {
        let mut s = format!(
            "{} task(s): {} rendered, {} failed",
            self.total(),
            self.completed.len(),
            self.failures.len()
        );
        for f in &self.failures {
            let tick = f.tick.map(|t| t.label()).unwrap_or_else(|| "-".to_owned());
            s.push_str(&format!("\n  {} [{tick}]: {}", f.id, f.error.message));
        }
        s
    }

    /// Order both lists by task id.
    pub fn sort(&mut self) {
        self.completed.sort_by_key(|c| c.id);
        self.failures.sort_by_key(|f| f.id);
    }

    fn absorb(&mut self, report: TaskReport) {
        match report {
            TaskReport::Completed(c) => self.completed.push(c),
            TaskReport::Failed(f) => self.failures.push(f),
        }
    }
}

struct Shared {
    queue: BoundedQueue<RenderTask>,
    renderer: Arc<dyn Renderer>,
    reports: mpsc::Sender<TaskReport>,
}

struct Worker {
    id: usize,
    handle: JoinHandle<()>,
}

/// Fixed set of long-lived render threads fed by a bounded queue.
///
/// A failing or panicking render is reported for its task and the worker moves on; workers exit
/// only through [`stop`](Self::stop). A render that never returns blocks its worker for good.
///
/// Outcomes, including inline pixel buffers, are held until [`take_reports`](Self::take_reports)
/// or [`stop`](Self::stop) collects them. Long runs with inline output should call
/// `take_reports` as they go.
pub struct WorkerPool {
    shared: Arc<Shared>,
    workers: Mutex<Vec<Worker>>,
    /// Held for the whole of `stop`, so concurrent callers return only once the pool is down.
    stopping: Mutex<()>,
    states: Mutex<Vec<Arc<AtomicU8>>>,
    next_worker: AtomicUsize,
    reports: Mutex<mpsc::Receiver<TaskReport>>,
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("capacity", &self.shared.queue.capacity())
            .field("workers", &self.worker_count())
            .field("pending", &self.pending())
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

fn relock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl WorkerPool {
    /// Create the queue and spawn `workers` threads. `workers` may be 0; see
    /// [`add_workers`](Self::add_workers).
    pub fn start(
        renderer: Arc<dyn Renderer>,
        workers: usize,
        capacity: usize,
    ) -> SuiteResult<Self> {
        if capacity == 0 {
            return Err(SuiteError::configuration("queue capacity must be >= 1"));
        }
        let (tx, rx) = mpsc::channel();
        let pool = Self {
            shared: Arc::new(Shared {
                queue: BoundedQueue::new(capacity),
                renderer,
                reports: tx,
            }),
            workers: Mutex::new(Vec::new()),
            stopping: Mutex::new(()),
            states: Mutex::new(Vec::new()),
            next_worker: AtomicUsize::new(0),
            reports: Mutex::new(rx),
        };
        pool.add_workers(workers)?;
        tracing::info!(workers, capacity, "render pool started");
        Ok(pool)
    }

    /// Spawn `n` more workers on the same queue.
    pub fn add_workers(&self, n: usize) -> SuiteResult<()> {
        let mut workers = relock(&self.workers);
        if self.shared.queue.is_closed() {
            return Err(SuiteError::QueueClosed);
        }
        for _ in 0..n {
            let id = self.next_worker.fetch_add(1, Ordering::Relaxed);
            let state = Arc::new(AtomicU8::new(WorkerState::Idle as u8));
            let shared = Arc::clone(&self.shared);
            let worker_state = Arc::clone(&state);
            let handle = thread::Builder::new()
                .name(format!("povsuite-render-{id}"))
                .spawn(move || worker_loop(id, &shared, &worker_state))
                .map_err(|e| {
                    SuiteError::Other(anyhow::Error::new(e).context("failed to spawn render worker"))
                })?;
            workers.push(Worker { id, handle });
            relock(&self.states).push(state);
        }
        Ok(())
    }

    /// Queue `task`, blocking while the queue is at capacity.
    pub fn submit(&self, task: RenderTask) -> SuiteResult<()> {
        let id = task.id();
        self.shared
            .queue
            .push(task)
            .map_err(|_| SuiteError::QueueClosed)?;
        tracing::debug!(task = %id, "queued");
        Ok(())
    }

    pub fn capacity(&self) -> usize {
        self.shared.queue.capacity()
    }

    /// Workers spawned and not yet joined by [`stop`](Self::stop).
    pub fn worker_count(&self) -> usize {
        relock(&self.workers).len()
    }

    /// State of every worker ever spawned, in spawn order. Joined workers stay `Terminated`.
    pub fn worker_states(&self) -> Vec<WorkerState> {
        relock(&self.states)
            .iter()
            .map(|s| WorkerState::from_u8(s.load(Ordering::Acquire)))
            .collect()
    }

    /// Tasks queued but not yet claimed by a worker.
    pub fn pending(&self) -> usize {
        self.shared.queue.pending()
    }

    /// Tasks claimed by a worker and still rendering.
    pub fn in_flight(&self) -> usize {
        self.shared.queue.in_flight()
    }

    pub fn is_stopping(&self) -> bool {
        self.shared.queue.is_closed()
    }

    /// Block until every submitted task has finished. Needs at least one worker when tasks
    /// are pending.
    pub fn wait_idle(&self) {
        self.shared.queue.wait_idle();
    }

    /// Outcomes reported since the last call, without waiting.
    pub fn take_reports(&self) -> PoolReport {
        let mut report = PoolReport::default();
        for r in relock(&self.reports).try_iter() {
            report.absorb(r);
        }
        report
    }

    /// Refuse new tasks, let workers finish everything queued, and join them.
    ///
    /// If no workers exist, the calling thread renders what is left. Returns the outcomes not
    /// yet taken with [`take_reports`](Self::take_reports); later calls return an empty report.
    /// A call made while another `stop` is running waits for it to finish.
    pub fn stop(&self) -> PoolReport {
        let _stopping = relock(&self.stopping);
        self.shared.queue.close();
        let workers = std::mem::take(&mut *relock(&self.workers));

        if workers.is_empty() {
            while let Some(task) = self.shared.queue.pop() {
                let report = render_one(usize::MAX, self.shared.renderer.as_ref(), task);
                let _ = self.shared.reports.send(report);
                self.shared.queue.complete();
            }
        }

        let joined = workers.len();
        for w in workers {
            if w.handle.join().is_err() {
                tracing::error!(worker = w.id, "render worker exited abnormally");
            }
        }

        let mut report = self.take_reports();
        report.sort();
        if joined > 0 || report.total() > 0 {
            tracing::info!(
                workers = joined,
                rendered = report.completed.len(),
                failed = report.failures.len(),
                "render pool stopped"
            );
        }
        report
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(id: usize, shared: &Shared, state: &AtomicU8) {
    let mut phase = WorkerState::Idle;
    let mut claimed: Option<RenderTask> = None;
    loop {
        state.store(phase as u8, Ordering::Release);
        phase = match phase {
            WorkerState::Idle => WorkerState::Dequeuing,
            WorkerState::Dequeuing => match shared.queue.pop() {
                Some(task) => {
                    claimed = Some(task);
                    WorkerState::Rendering
                }
                None => WorkerState::Stopping,
            },
            WorkerState::Rendering => {
                if let Some(task) = claimed.take() {
                    let report = render_one(id, shared.renderer.as_ref(), task);
                    let _ = shared.reports.send(report);
                    shared.queue.complete();
                }
                WorkerState::Idle
            }
            WorkerState::Stopping => WorkerState::Terminated,
            WorkerState::Terminated => break,
        };
    }
    tracing::debug!(worker = id, "render worker terminated");
}

fn render_one(worker: usize, renderer: &dyn Renderer, task: RenderTask) -> TaskReport {
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        renderer.render(task.scene(), task.options())
    }))
    .unwrap_or_else(|payload| {
        tracing::error!(worker, task = %task.id(), "renderer panicked");
        Err(RenderError::new(format!(
            "renderer panicked: {}",
            panic_message(payload.as_ref())
        )))
    });

    match result {
        Ok(output) => {
            tracing::debug!(worker, task = %task.id(), tick = ?task.tick(), "rendered");
            TaskReport::Completed(CompletedTask {
                id: task.id(),
                tick: task.tick(),
                output,
            })
        }
        Err(error) => {
            tracing::warn!(
                worker,
                task = %task.id(),
                tick = ?task.tick(),
                error = %error,
                diagnostics = %error.diagnostics,
                "render failed"
            );
            TaskReport::Failed(TaskFailure {
                id: task.id(),
                tick: task.tick(),
                error,
            })
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
