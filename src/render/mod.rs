//! The renderer boundary: resolved options in, an image file or pixel buffer out.

pub mod decode;
pub mod options;
pub mod povray;

use std::path::PathBuf;

use crate::foundation::error::RenderError;
use options::RenderOptions;

/// The product of one successful render.
#[derive(Clone, Debug, PartialEq)]
pub enum RenderedFrame {
    /// The renderer wrote an image file at this path.
    File(PathBuf),
    /// Row-major RGB pixels, returned for [`OutputTarget::Inline`](options::OutputTarget::Inline).
    Pixels(image::RgbImage),
}

#[derive(Clone, Debug, PartialEq)]
pub struct RenderOutput {
    pub frame: RenderedFrame,
    /// Whatever the renderer printed while working; may be empty.
    pub diagnostics: String,
}

impl RenderOutput {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            frame: RenderedFrame::File(path.into()),
            diagnostics: String::new(),
        }
    }
}

/// External collaborator that turns scene text into an image.
///
/// Implementations are shared by every pool worker and must be callable concurrently.
pub trait Renderer: Send + Sync {
    fn render(&self, scene: &str, options: &RenderOptions) -> Result<RenderOutput, RenderError>;
}

impl<F> Renderer for F
where
    F: Fn(&str, &RenderOptions) -> Result<RenderOutput, RenderError> + Send + Sync,
{
    fn render(&self, scene: &str, options: &RenderOptions) -> Result<RenderOutput, RenderError> {
        self(scene, options)
    }
}
