use std::fmt;

use crate::{foundation::core::FrameTick, render::options::RenderOptions};

/// Sequence number assigned to each dispatched task, in submission order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// Scene snapshot plus resolved options, queued for one render.
///
/// Fields are private and never written after construction, so a task can move to any worker
/// thread without synchronization.
#[derive(Debug)]
pub struct RenderTask {
    id: TaskId,
    tick: Option<FrameTick>,
    scene: String,
    options: RenderOptions,
}

impl RenderTask {
    pub fn new(
        id: TaskId,
        tick: Option<FrameTick>,
        scene: impl Into<String>,
        options: RenderOptions,
    ) -> Self {
        Self {
            id,
            tick,
            scene: scene.into(),
            options,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Frame this task was cut from; `None` for tasks dispatched outside a sequencer run.
    pub fn tick(&self) -> Option<FrameTick> {
        self.tick
    }

    pub fn scene(&self) -> &str {
        &self.scene
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }
}
