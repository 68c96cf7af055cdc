use std::iter::FusedIterator;

use crate::{
    animation::timeline::Timeline,
    foundation::{
        core::{Fps, FrameTick},
        error::{SuiteError, SuiteResult},
    },
};

/// `duration * fps` products this close to an integer are treated as that integer, so that
/// e.g. `1.1s * 10fps` spans 11 intervals rather than `ceil(11.000000000000002) = 12`.
const INTERVAL_SNAP: f64 = 1e-9;

/// Largest last-frame index an episode may have.
pub const MAX_EPISODE_FRAME: u64 = u32::MAX as u64;

/// Drives episodes frame by frame at a fixed frame rate.
#[derive(Debug, Default)]
pub struct Sequencer {
    fps: Fps,
    episodes: Vec<Timeline>,
}

impl Sequencer {
    pub fn new(fps: Fps) -> Self {
        Self {
            fps,
            episodes: Vec::new(),
        }
    }

    pub fn fps(&self) -> Fps {
        self.fps
    }

    /// Fails, leaving the rate unchanged, if any episode would get too many frames at `fps`.
    pub fn set_fps(&mut self, fps: Fps) -> SuiteResult<()> {
        fps.validate()?;
        for (i, tl) in self.episodes.iter().enumerate() {
            check_frames(i, tl.duration(), fps)?;
        }
        self.fps = fps;
        Ok(())
    }

    pub fn add_episode(&mut self, timeline: Timeline) -> SuiteResult<&mut Timeline> {
        check_frames(self.episodes.len(), timeline.duration(), self.fps)?;
        self.episodes.push(timeline);
        let last = self.episodes.len() - 1;
        Ok(&mut self.episodes[last])
    }

    /// Append an empty episode of `duration` seconds and return it for authoring.
    pub fn make_episode(&mut self, duration: f64) -> SuiteResult<&mut Timeline> {
        self.add_episode(Timeline::new(duration)?)
    }

    pub fn episodes(&self) -> &[Timeline] {
        &self.episodes
    }

    /// Frames produced for episode `episode`, `ceil(duration * fps) + 1`.
    pub fn frames_in(&self, episode: usize) -> Option<u64> {
        self.episodes
            .get(episode)
            .map(|tl| last_frame(tl.duration(), self.fps) + 1)
    }

    /// Total frames a full [`play`](Self::play) yields.
    pub fn frame_count(&self) -> u64 {
        self.episodes
            .iter()
            .map(|tl| last_frame(tl.duration(), self.fps) + 1)
            .sum()
    }

    /// Evaluate exactly one frame, out of sequence, and return its normalized time.
    pub fn advance_to(&self, tick: FrameTick) -> SuiteResult<f64> {
        let tl = self
            .episodes
            .get(tick.episode as usize)
            .ok_or_else(|| {
                SuiteError::configuration(format!(
                    "episode {} does not exist ({} episodes)",
                    tick.episode,
                    self.episodes.len()
                ))
            })?;
        let last = last_frame(tl.duration(), self.fps);
        if tick.frame > last {
            return Err(SuiteError::configuration(format!(
                "frame {} is past the last frame {last} of episode {}",
                tick.frame, tick.episode
            )));
        }
        let t = time_at(tick.frame, tl.duration(), self.fps);
        tl.evaluate(t);
        Ok(t)
    }

    /// Lazily walk every episode in order, evaluating each frame as it is pulled.
    ///
    /// Pulling a tick mutates the bound parameters. Serialize the scene for a tick before
    /// pulling the next one.
    pub fn play(&mut self) -> Play<'_> {
        Play {
            seq: self,
            episode: 0,
            frame: 0,
            current: None,
        }
    }
}

/// Pull-based frame sequence returned by [`Sequencer::play`]. Not restartable.
#[derive(Debug)]
pub struct Play<'a> {
    seq: &'a mut Sequencer,
    episode: usize,
    frame: u64,
    current: Option<FrameTick>,
}

impl Play<'_> {
    /// The most recently yielded tick.
    pub fn current(&self) -> Option<FrameTick> {
        self.current
    }

    /// `episode: [i/n], frame [j/m]` for the most recently yielded tick.
    pub fn status(&self) -> String {
        let Some(tick) = self.current else {
            return String::new();
        };
        let frames = self.seq.frames_in(tick.episode as usize).unwrap_or(0);
        format!(
            "episode: [{}/{}], frame [{}/{}]",
            tick.episode,
            self.seq.episodes.len(),
            tick.frame,
            frames
        )
    }

    fn remaining(&self) -> u64 {
        let fps = self.seq.fps;
        self.seq
            .episodes
            .iter()
            .enumerate()
            .skip(self.episode)
            .map(|(i, tl)| {
                let frames = last_frame(tl.duration(), fps) + 1;
                if i == self.episode {
                    frames.saturating_sub(self.frame)
                } else {
                    frames
                }
            })
            .sum()
    }
}

impl Iterator for Play<'_> {
    type Item = FrameTick;

    fn next(&mut self) -> Option<FrameTick> {
        let fps = self.seq.fps;
        loop {
            let tl = self.seq.episodes.get(self.episode)?;
            if self.frame > last_frame(tl.duration(), fps) {
                self.episode += 1;
                self.frame = 0;
                continue;
            }

            tl.evaluate(time_at(self.frame, tl.duration(), fps));
            let tick = FrameTick::new(self.episode as u32, self.frame);
            self.frame += 1;
            self.current = Some(tick);
            return Some(tick);
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = usize::try_from(self.remaining()).unwrap_or(usize::MAX);
        (n, Some(n))
    }
}

impl FusedIterator for Play<'_> {}

fn intervals(duration: f64, fps: Fps) -> f64 {
    let n = fps.intervals(duration);
    let r = n.round();
    if (n - r).abs() < INTERVAL_SNAP { r } else { n }
}

fn check_frames(episode: usize, duration: f64, fps: Fps) -> SuiteResult<()> {
    let last = intervals(duration, fps).ceil();
    if last > MAX_EPISODE_FRAME as f64 {
        return Err(SuiteError::configuration(format!(
            "episode {episode} of {duration}s at {} fps needs more than {MAX_EPISODE_FRAME} frames",
            fps.as_f64()
        )));
    }
    Ok(())
}

fn last_frame(duration: f64, fps: Fps) -> u64 {
    intervals(duration, fps).ceil() as u64
}

fn time_at(frame: u64, duration: f64, fps: Fps) -> f64 {
    let n = intervals(duration, fps);
    if n == 0.0 {
        return 0.0;
    }
    (frame as f64 / n).min(1.0)
}
