//! Scene serialization: turning the current parameter state into renderer input.

pub mod template;

pub use template::SceneTemplate;

use crate::foundation::error::SuiteResult;

/// Produces the scene text for the current animation state.
///
/// Called on the sequencing thread once per frame, after the frame is evaluated and before the
/// next one is.
pub trait SceneSource {
    fn scene_text(&self) -> SuiteResult<String>;
}

impl<F> SceneSource for F
where
    F: Fn() -> String,
{
    fn scene_text(&self) -> SuiteResult<String> {
        Ok(self())
    }
}
