use std::{
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use crate::{
    dispatch::{
        pool::{PoolReport, WorkerPool},
        task::{RenderTask, TaskId},
    },
    foundation::{
        core::FrameTick,
        error::{SuiteError, SuiteResult},
    },
    render::{
        RenderOutput, Renderer,
        options::{RenderConfig, RenderOverrides},
    },
};

/// Turns scene snapshots into render tasks: merges options, derives output paths, and either
/// queues the task on the worker pool or renders it on the calling thread.
pub struct Dispatcher {
    defaults: RenderConfig,
    renderer: Arc<dyn Renderer>,
    pool: Option<Arc<WorkerPool>>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("defaults", &self.defaults)
            .field("pool", &self.pool)
            .field("next_id", &self.next_id)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn new(defaults: RenderConfig, renderer: Arc<dyn Renderer>) -> SuiteResult<Self> {
        defaults.validate()?;
        Ok(Self {
            defaults,
            renderer,
            pool: None,
            next_id: AtomicU64::new(0),
        })
    }

    pub fn defaults(&self) -> &RenderConfig {
        &self.defaults
    }

    /// Fold `overrides` into the process-wide defaults. Tasks already queued keep the options
    /// they were created with.
    pub fn setup(&mut self, overrides: &RenderOverrides) -> SuiteResult<()> {
        let next = self.defaults.merged(overrides);
        next.validate()?;
        self.defaults = next;
        Ok(())
    }

    /// Start the worker pool. A stopped pool may be replaced; a running one may not.
    ///
    /// A fixed `scene_file` in the defaults needs a single worker.
    pub fn start_pool(&mut self, workers: usize, capacity: usize) -> SuiteResult<Arc<WorkerPool>> {
        if let Some(pool) = &self.pool
            && !pool.is_stopping()
        {
            return Err(SuiteError::configuration("worker pool is already running"));
        }
        check_shared_scene_file(self.defaults.scene_file.as_deref(), workers)?;
        let pool = Arc::new(WorkerPool::start(
            Arc::clone(&self.renderer),
            workers,
            capacity,
        )?);
        self.pool = Some(Arc::clone(&pool));
        Ok(pool)
    }

    pub fn pool(&self) -> Option<&Arc<WorkerPool>> {
        self.pool.as_ref()
    }

    fn resolve_task(
        &self,
        tick: Option<FrameTick>,
        scene: String,
        overrides: &RenderOverrides,
    ) -> SuiteResult<RenderTask> {
        let options = self.defaults.resolve(overrides, tick)?;
        let id = TaskId(self.next_id.fetch_add(1, Ordering::Relaxed));
        Ok(RenderTask::new(id, tick, scene, options))
    }

    /// Queue one render, blocking while the pool's queue is full.
    ///
    /// Without an explicit output in `overrides`, the output path is derived from `tick`.
    pub fn submit(
        &self,
        tick: Option<FrameTick>,
        scene: impl Into<String>,
        overrides: &RenderOverrides,
    ) -> SuiteResult<TaskId> {
        let pool = self.pool.as_ref().ok_or_else(|| {
            SuiteError::not_ready("worker pool has not been started; call start_pool first")
        })?;
        let task = self.resolve_task(tick, scene.into(), overrides)?;
        check_shared_scene_file(task.options().scene_file.as_deref(), pool.worker_count())?;
        let id = task.id();
        pool.submit(task)?;
        Ok(id)
    }

    /// Render on the calling thread and return the result directly.
    pub fn render_now(
        &self,
        tick: Option<FrameTick>,
        scene: &str,
        overrides: &RenderOverrides,
    ) -> SuiteResult<RenderOutput> {
        let task = self.resolve_task(tick, scene.to_owned(), overrides)?;
        tracing::debug!(task = %task.id(), tick = ?tick, "rendering synchronously");
        Ok(self.renderer.render(task.scene(), task.options())?)
    }

    /// Stop the pool, wait for every queued task, and collect the outcomes.
    ///
    /// The stopped pool stays attached, so later submissions fail with
    /// [`SuiteError::QueueClosed`] until a new pool is started.
    pub fn join_pool(&self) -> SuiteResult<PoolReport> {
        let pool = self
            .pool
            .as_ref()
            .ok_or_else(|| SuiteError::not_ready("worker pool has not been started"))?;
        Ok(pool.stop())
    }
}

/// Workers would overwrite each other's copy of one fixed scene file.
fn check_shared_scene_file(scene_file: Option<&Path>, workers: usize) -> SuiteResult<()> {
    match scene_file {
        Some(path) if workers > 1 => Err(SuiteError::configuration(format!(
            "scene file '{}' cannot be shared by {workers} workers; unset it or use one worker",
            path.display()
        ))),
        _ => Ok(()),
    }
}
