use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use crate::foundation::{
    core::{Fps, FrameTick},
    error::{SuiteError, SuiteResult},
};

/// Highest quality level POV-Ray accepts for `+Q`.
pub const MAX_QUALITY: u8 = 11;

/// Where a rendered frame goes.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputTarget {
    /// Write an image file. Relative paths are placed under the configured `out_dir`.
    File(PathBuf),
    /// Return the pixels to the caller instead of writing a file.
    Inline,
}

/// Process-wide render defaults.
///
/// Every recognized option is listed with its default. Keys this struct does not know are kept
/// in `extra` and handed to the renderer untouched.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub fps: Fps,
    pub out_dir: Option<PathBuf>,
    pub width: u32,
    pub height: u32,
    pub quality: Option<u8>,
    pub antialiasing: Option<f64>,
    pub antialias_depth: Option<f64>,
    pub jitter: bool,
    pub show_window: bool,
    pub output_alpha: bool,
    pub include_dirs: Vec<PathBuf>,
    /// Extension of derived frame file names.
    pub image_ext: String,
    /// Fixed path for the scene file; `None` uses a fresh temp file per render.
    pub scene_file: Option<PathBuf>,
    pub preserve_scene_file: bool,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            fps: Fps::default(),
            out_dir: None,
            width: 320,
            height: 240,
            quality: None,
            antialiasing: None,
            antialias_depth: None,
            jitter: false,
            show_window: false,
            output_alpha: false,
            include_dirs: Vec::new(),
            image_ext: "png".to_owned(),
            scene_file: None,
            preserve_scene_file: false,
            extra: BTreeMap::new(),
        }
    }
}

/// Per-call overrides. `None` keeps the value from [`RenderConfig`].
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RenderOverrides {
    pub fps: Option<Fps>,
    pub out_dir: Option<PathBuf>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub quality: Option<u8>,
    pub antialiasing: Option<f64>,
    pub antialias_depth: Option<f64>,
    pub jitter: Option<bool>,
    pub show_window: Option<bool>,
    pub output_alpha: Option<bool>,
    pub include_dirs: Option<Vec<PathBuf>>,
    pub image_ext: Option<String>,
    pub scene_file: Option<PathBuf>,
    pub preserve_scene_file: Option<bool>,
    /// Explicit output; when unset the path is derived from the frame tick.
    pub output: Option<OutputTarget>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl RenderOverrides {
    pub fn output(target: OutputTarget) -> Self {
        Self {
            output: Some(target),
            ..Self::default()
        }
    }

    pub fn size(width: u32, height: u32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            ..Self::default()
        }
    }
}

/// Fully resolved options for one render, as handed to a [`Renderer`](super::Renderer).
#[derive(Clone, Debug, PartialEq)]
pub struct RenderOptions {
    pub width: u32,
    pub height: u32,
    pub quality: Option<u8>,
    pub antialiasing: Option<f64>,
    pub antialias_depth: Option<f64>,
    pub jitter: bool,
    pub show_window: bool,
    pub output_alpha: bool,
    pub include_dirs: Vec<PathBuf>,
    pub output: OutputTarget,
    pub scene_file: Option<PathBuf>,
    pub preserve_scene_file: bool,
    /// Unrecognized options as `(key, value)` text pairs, in key order.
    pub extra: Vec<(String, String)>,
}

impl RenderConfig {
    pub fn validate(&self) -> SuiteResult<()> {
        self.fps.validate()?;
        if self.width == 0 || self.height == 0 {
            return Err(SuiteError::configuration("render width/height must be > 0"));
        }
        if let Some(q) = self.quality
            && q > MAX_QUALITY
        {
            return Err(SuiteError::configuration(format!(
                "quality must be in 0..={MAX_QUALITY}, got {q}"
            )));
        }
        for (name, v) in [
            ("antialiasing", self.antialiasing),
            ("antialias_depth", self.antialias_depth),
        ] {
            if let Some(v) = v
                && (!v.is_finite() || v < 0.0)
            {
                return Err(SuiteError::configuration(format!(
                    "{name} must be a finite value >= 0, got {v}"
                )));
            }
        }
        if self.image_ext.is_empty() {
            return Err(SuiteError::configuration("image_ext must not be empty"));
        }
        Ok(())
    }

    /// Copy of `self` with every set override applied; `extra` keys are merged key by key.
    pub fn merged(&self, o: &RenderOverrides) -> Self {
        let mut out = self.clone();
        if let Some(v) = o.fps {
            out.fps = v;
        }
        if let Some(v) = &o.out_dir {
            out.out_dir = Some(v.clone());
        }
        if let Some(v) = o.width {
            out.width = v;
        }
        if let Some(v) = o.height {
            out.height = v;
        }
        if o.quality.is_some() {
            out.quality = o.quality;
        }
        if o.antialiasing.is_some() {
            out.antialiasing = o.antialiasing;
        }
        if o.antialias_depth.is_some() {
            out.antialias_depth = o.antialias_depth;
        }
        if let Some(v) = o.jitter {
            out.jitter = v;
        }
        if let Some(v) = o.show_window {
            out.show_window = v;
        }
        if let Some(v) = o.output_alpha {
            out.output_alpha = v;
        }
        if let Some(v) = &o.include_dirs {
            out.include_dirs = v.clone();
        }
        if let Some(v) = &o.image_ext {
            out.image_ext = v.clone();
        }
        if let Some(v) = &o.scene_file {
            out.scene_file = Some(v.clone());
        }
        if let Some(v) = o.preserve_scene_file {
            out.preserve_scene_file = v;
        }
        for (k, v) in &o.extra {
            out.extra.insert(k.clone(), v.clone());
        }
        out
    }

    /// Derived output path for `tick`: `{out_dir}/{episode:06}{frame:06}.{image_ext}`.
    pub fn frame_path(&self, tick: FrameTick) -> PathBuf {
        self.under_out_dir(Path::new(&format!("{}.{}", tick.label(), self.image_ext)))
    }

    fn under_out_dir(&self, path: &Path) -> PathBuf {
        match &self.out_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Merge `overrides`, validate, and pin down the output target.
    pub fn resolve(
        &self,
        overrides: &RenderOverrides,
        tick: Option<FrameTick>,
    ) -> SuiteResult<RenderOptions> {
        let cfg = self.merged(overrides);
        cfg.validate()?;

        let output = match (&overrides.output, tick) {
            (Some(OutputTarget::Inline), _) => OutputTarget::Inline,
            (Some(OutputTarget::File(p)), _) => OutputTarget::File(cfg.under_out_dir(p)),
            (None, Some(tick)) => OutputTarget::File(cfg.frame_path(tick)),
            (None, None) => {
                return Err(SuiteError::configuration(
                    "no frame tick to derive an output path from; set an explicit output",
                ));
            }
        };

        let extra = cfg
            .extra
            .iter()
            .map(|(k, v)| (k.clone(), extra_value_text(v)))
            .collect();

        Ok(RenderOptions {
            width: cfg.width,
            height: cfg.height,
            quality: cfg.quality,
            antialiasing: cfg.antialiasing,
            antialias_depth: cfg.antialias_depth,
            jitter: cfg.jitter,
            show_window: cfg.show_window,
            output_alpha: cfg.output_alpha,
            include_dirs: cfg.include_dirs,
            output,
            scene_file: cfg.scene_file,
            preserve_scene_file: cfg.preserve_scene_file,
            extra,
        })
    }
}

fn extra_value_text(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Bool(true) => "on".to_owned(),
        serde_json::Value::Bool(false) => "off".to_owned(),
        other => other.to_string(),
    }
}
