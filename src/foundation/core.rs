use std::fmt;

use crate::foundation::error::{SuiteError, SuiteResult};

/// Frames-per-second represented as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds), must be non-zero.
    pub den: u32,
}

impl Fps {
    /// Create a validated FPS value.
    pub fn new(num: u32, den: u32) -> SuiteResult<Self> {
        let fps = Self { num, den };
        fps.validate()?;
        Ok(fps)
    }

    /// Whole frames per second, the common case.
    pub fn whole(num: u32) -> SuiteResult<Self> {
        Self::new(num, 1)
    }

    pub fn validate(self) -> SuiteResult<()> {
        if self.den == 0 {
            return Err(SuiteError::configuration("fps den must be > 0"));
        }
        if self.num == 0 {
            return Err(SuiteError::configuration("fps num must be > 0"));
        }
        Ok(())
    }

    /// Convert to floating-point FPS.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Number of frame intervals spanned by `secs`, i.e. `secs * fps`.
    pub fn intervals(self, secs: f64) -> f64 {
        secs * self.as_f64()
    }
}

impl Default for Fps {
    fn default() -> Self {
        Self { num: 25, den: 1 }
    }
}

/// Identifies one evaluated animation frame: episode first, then frame within the episode.
///
/// The derived ordering matches the lexicographic order of [`FrameTick::label`].
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameTick {
    /// Index of the episode (timeline) within the sequencer.
    pub episode: u32,
    /// Frame index within the episode, starting at 0.
    pub frame: u64,
}

/// Zero-padding width of each half of a [`FrameTick`] label.
pub const TICK_PAD: usize = 6;

impl FrameTick {
    pub fn new(episode: u32, frame: u64) -> Self {
        Self { episode, frame }
    }

    /// `{episode:06}{frame:06}`, used as the stem of output file names.
    pub fn label(self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FrameTick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:0w$}{:0w$}",
            self.episode,
            self.frame,
            w = TICK_PAD
        )
    }
}
