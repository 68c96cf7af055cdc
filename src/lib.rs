//! povsuite drives keyframed animations of POV-Ray scenes and renders the frames on a bounded
//! pool of worker threads.
//!
//! - Author parameters and [`Timeline`]s, played in order by a [`Sequencer`]
//! - Serialize each frame's scene with a [`SceneSource`] such as [`SceneTemplate`]
//! - Queue renders through a [`Dispatcher`] onto a [`WorkerPool`], or drive both with a [`Suite`]
//!
//! Parameters live on the sequencing thread only. Workers receive immutable [`RenderTask`]
//! snapshots, and the queue blocks the sequencer whenever rendering falls behind.
#![forbid(unsafe_code)]

mod foundation;

pub mod animation;
pub mod dispatch;
pub mod project;
pub mod render;
pub mod scene;
pub mod suite;

pub use crate::foundation::core::{Fps, FrameTick};
pub use crate::foundation::error::{RenderError, SuiteError, SuiteResult};

pub use crate::animation::ease::Ease;
pub use crate::animation::param::{Param, ScalarParam, VectorParam};
pub use crate::animation::sequencer::{Play, Sequencer};
pub use crate::animation::timeline::{Action, Endpoints, Timeline};
pub use crate::animation::value::{Lerp, Vector};
pub use crate::dispatch::{
    CompletedTask, Dispatcher, PoolReport, RenderTask, TaskFailure, TaskId, WorkerPool,
    WorkerState,
};
pub use crate::project::{BuiltProject, Project};
pub use crate::render::decode::decode_ppm;
pub use crate::render::options::{OutputTarget, RenderConfig, RenderOptions, RenderOverrides};
pub use crate::render::povray::{PovRay, is_povray_on_path};
pub use crate::render::{RenderOutput, RenderedFrame, Renderer};
pub use crate::scene::{SceneSource, SceneTemplate};
pub use crate::suite::{RunSummary, Suite};
