//! The frame loop: pull a tick, serialize the scene, hand it to the dispatcher, repeat.

use std::sync::Arc;

use crate::{
    animation::{sequencer::Sequencer, timeline::Timeline},
    dispatch::{Dispatcher, PoolReport, TaskId, WorkerPool},
    foundation::{
        core::FrameTick,
        error::{SuiteError, SuiteResult},
    },
    render::{
        RenderOutput, Renderer,
        options::{RenderConfig, RenderOverrides},
    },
    scene::SceneSource,
};

/// Tasks queued by one [`Suite::run_in_pool`] pass, in frame order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub submitted: Vec<(TaskId, FrameTick)>,
}

impl RunSummary {
    pub fn len(&self) -> usize {
        self.submitted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.submitted.is_empty()
    }
}

/// An animation ([`Sequencer`]) wired to a renderer ([`Dispatcher`]).
#[derive(Debug)]
pub struct Suite {
    sequencer: Sequencer,
    dispatcher: Dispatcher,
}

impl Suite {
    pub fn new(renderer: Arc<dyn Renderer>) -> SuiteResult<Self> {
        Self::with_config(RenderConfig::default(), renderer)
    }

    /// The sequencer runs at `config.fps`.
    pub fn with_config(config: RenderConfig, renderer: Arc<dyn Renderer>) -> SuiteResult<Self> {
        Self::from_parts(config, Sequencer::default(), renderer)
    }

    /// Wrap an already authored sequencer; its frame rate is replaced by `config.fps`.
    pub fn from_parts(
        config: RenderConfig,
        mut sequencer: Sequencer,
        renderer: Arc<dyn Renderer>,
    ) -> SuiteResult<Self> {
        sequencer.set_fps(config.fps)?;
        Ok(Self {
            sequencer,
            dispatcher: Dispatcher::new(config, renderer)?,
        })
    }

    pub fn make_episode(&mut self, duration: f64) -> SuiteResult<&mut Timeline> {
        self.sequencer.make_episode(duration)
    }

    /// Update the render defaults. A changed `fps` also retimes the sequencer.
    pub fn setup(&mut self, overrides: &RenderOverrides) -> SuiteResult<()> {
        self.dispatcher.setup(overrides)?;
        self.sequencer.set_fps(self.dispatcher.defaults().fps)
    }

    pub fn setup_pool(&mut self, workers: usize, capacity: usize) -> SuiteResult<Arc<WorkerPool>> {
        self.dispatcher.start_pool(workers, capacity)
    }

    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Split borrow for callers driving their own loop over `sequencer.play()`.
    pub fn parts_mut(&mut self) -> (&mut Sequencer, &Dispatcher) {
        (&mut self.sequencer, &self.dispatcher)
    }

    /// Play every episode and queue one render per frame.
    ///
    /// Each frame's scene text is taken before the next frame is evaluated, so every task sees
    /// exactly its own frame's parameter values. Blocks whenever the pool's queue is full; the
    /// renders themselves may still be running when this returns.
    pub fn run_in_pool(
        &mut self,
        scene: &dyn SceneSource,
        overrides: &RenderOverrides,
    ) -> SuiteResult<RunSummary> {
        let (sequencer, dispatcher) = self.parts_mut();
        if dispatcher.pool().is_none() {
            return Err(SuiteError::not_ready(
                "worker pool has not been started; call setup_pool first",
            ));
        }

        let mut summary = RunSummary::default();
        let mut play = sequencer.play();
        while let Some(tick) = play.next() {
            tracing::debug!("{}", play.status());
            let text = scene.scene_text()?;
            let id = dispatcher.submit(Some(tick), text, overrides)?;
            summary.submitted.push((id, tick));
        }
        tracing::info!(frames = summary.len(), "all frames queued");
        Ok(summary)
    }

    /// Stop the pool after every queued frame is rendered.
    pub fn join_pool(&self) -> SuiteResult<PoolReport> {
        self.dispatcher.join_pool()
    }

    /// Evaluate just `tick` and render it on the calling thread.
    pub fn render_frame(
        &mut self,
        tick: FrameTick,
        scene: &dyn SceneSource,
        overrides: &RenderOverrides,
    ) -> SuiteResult<RenderOutput> {
        self.sequencer.advance_to(tick)?;
        let text = scene.scene_text()?;
        self.dispatcher.render_now(Some(tick), &text, overrides)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        animation::{ease::Ease, param::ScalarParam},
        foundation::{core::Fps, error::RenderError},
        render::{
            RenderedFrame,
            options::{OutputTarget, RenderOptions},
        },
        scene::SceneTemplate,
    };
    use std::{
        path::PathBuf,
        sync::{Arc, Mutex},
    };

    type Seen = Arc<Mutex<Vec<(PathBuf, String)>>>;

    fn recording_renderer() -> (Arc<dyn Renderer>, Seen) {
        let seen: Seen = Arc::default();
        let sink = Arc::clone(&seen);
        let renderer = move |scene: &str, opts: &RenderOptions| {
            let OutputTarget::File(path) = &opts.output else {
                return Err(RenderError::new("expected a file target"));
            };
            sink.lock().unwrap().push((path.clone(), scene.to_owned()));
            Ok(RenderOutput::file(path.clone()))
        };
        (Arc::new(renderer), seen)
    }

    fn suite_at_10fps(renderer: Arc<dyn Renderer>) -> Suite {
        let cfg = RenderConfig {
            fps: Fps::whole(10).unwrap(),
            out_dir: Some(PathBuf::from("out")),
            ..RenderConfig::default()
        };
        Suite::with_config(cfg, renderer).unwrap()
    }

    #[test]
    fn each_task_sees_its_own_frame_values() {
        let (renderer, seen) = recording_renderer();
        let mut suite = suite_at_10fps(renderer);
        let x = ScalarParam::new(0.0);
        suite
            .make_episode(1.0)
            .unwrap()
            .add_scalar_action(&x, 10.0, Ease::Linear, 1.0)
            .unwrap();
        let mut tpl = SceneTemplate::parse("x={{x}}").unwrap();
        tpl.bind_scalar("x", &x);

        suite.setup_pool(2, 2).unwrap();
        let summary = suite
            .run_in_pool(&tpl, &RenderOverrides::default())
            .unwrap();
        assert_eq!(summary.len(), 11);
        let report = suite.join_pool().unwrap();
        assert!(report.is_success());
        assert_eq!(report.completed.len(), 11);

        let mut seen = seen.lock().unwrap().clone();
        seen.sort();
        for (i, (path, scene)) in seen.iter().enumerate() {
            assert_eq!(path, &PathBuf::from("out").join(format!("000000{i:06}.png")));
            let value: f64 = scene.trim_start_matches("x=").parse().unwrap();
            assert!((value - i as f64).abs() < 1e-9, "frame {i} rendered {scene}");
        }
    }

    #[test]
    fn run_without_pool_is_not_ready_and_leaves_state_alone() {
        let (renderer, _) = recording_renderer();
        let mut suite = suite_at_10fps(renderer);
        let x = ScalarParam::new(3.0);
        suite
            .make_episode(1.0)
            .unwrap()
            .change_value(&x, 10.0)
            .unwrap();
        let err = suite
            .run_in_pool(&String::new, &RenderOverrides::default())
            .unwrap_err();
        assert!(matches!(err, SuiteError::NotReady(_)));
        assert_eq!(x.read(), 3.0);
    }

    #[test]
    fn render_frame_evaluates_only_that_tick() {
        let (renderer, seen) = recording_renderer();
        let mut suite = suite_at_10fps(renderer);
        let x = ScalarParam::new(0.0);
        suite
            .make_episode(2.0)
            .unwrap()
            .change_value(&x, 20.0)
            .unwrap();
        let scene = {
            let x = x.clone();
            move || format!("x={x}")
        };

        let out = suite
            .render_frame(FrameTick::new(0, 5), &scene, &RenderOverrides::default())
            .unwrap();
        assert_eq!(
            out.frame,
            RenderedFrame::File(PathBuf::from("out").join("000000000005.png"))
        );
        assert_eq!(seen.lock().unwrap()[0].1, "x=5");
        assert!(suite
            .render_frame(FrameTick::new(0, 21), &scene, &RenderOverrides::default())
            .is_err());
    }

    #[test]
    fn setup_retimes_the_sequencer() {
        let (renderer, _) = recording_renderer();
        let mut suite = suite_at_10fps(renderer);
        suite.make_episode(1.0).unwrap();
        assert_eq!(suite.sequencer().frame_count(), 11);
        suite
            .setup(&RenderOverrides {
                fps: Some(Fps::whole(20).unwrap()),
                ..RenderOverrides::default()
            })
            .unwrap();
        assert_eq!(suite.sequencer().frame_count(), 21);
    }
}
