use std::{
    ffi::OsString,
    io::Write as _,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use crate::{
    foundation::error::RenderError,
    render::{
        RenderOutput, RenderedFrame, Renderer,
        decode::decode_ppm,
        options::{OutputTarget, RenderOptions},
    },
};

/// Environment variable naming the POV-Ray executable.
pub const POVRAY_BINARY_ENV: &str = "POVRAY_BINARY";

const DEFAULT_BINARY: &str = "povray";

/// Renders scenes by running the POV-Ray executable once per frame.
#[derive(Clone, Debug)]
pub struct PovRay {
    program: PathBuf,
    leading_args: Vec<OsString>,
}

impl Default for PovRay {
    fn default() -> Self {
        Self::from_env()
    }
}

impl PovRay {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
        }
    }

    /// `$POVRAY_BINARY`, falling back to `povray` on PATH.
    pub fn from_env() -> Self {
        let program = std::env::var_os(POVRAY_BINARY_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BINARY));
        Self::new(program)
    }

    /// Arguments placed before the scene file, for launchers such as `nice -n 10 povray`.
    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// `true` when the configured program starts and reports a version.
    pub fn is_available(&self) -> bool {
        Command::new(&self.program)
            .args(&self.leading_args)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

/// `true` when `povray` (or `$POVRAY_BINARY`) can be started.
pub fn is_povray_on_path() -> bool {
    PovRay::from_env().is_available()
}

pub fn ensure_parent_dir(path: &Path) -> Result<(), RenderError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| {
            RenderError::new(format!(
                "failed to create output directory '{}': {e}",
                parent.display()
            ))
        })?;
    }
    Ok(())
}

/// Command-line switches for one render, scene file first.
pub fn povray_args(scene_path: &Path, opts: &RenderOptions) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![scene_path.as_os_str().to_owned()];

    args.push(format!("+H{}", opts.height).into());
    args.push(format!("+W{}", opts.width).into());
    if let Some(q) = opts.quality {
        args.push(format!("+Q{q}").into());
    }
    if let Some(a) = opts.antialiasing {
        args.push(format!("+A{a:.6}").into());
    }
    if let Some(r) = opts.antialias_depth {
        args.push(format!("+R{r:.6}").into());
    }
    if opts.jitter {
        args.push("+J".into());
    }
    args.push(if opts.show_window { "+D" } else { "-D" }.into());
    if opts.output_alpha {
        args.push("+UA".into());
    }
    for dir in &opts.include_dirs {
        let mut a = OsString::from("+L");
        a.push(dir);
        args.push(a);
    }
    for (k, v) in &opts.extra {
        args.push(format!("{k}={v}").into());
    }

    match &opts.output {
        OutputTarget::Inline => {
            args.push("Output_File_Type=P".into());
            args.push("+O-".into());
        }
        OutputTarget::File(path) => {
            args.push("Output_File_Type=N".into());
            let mut a = OsString::from("+O");
            a.push(path);
            args.push(a);
        }
    }
    args
}

/// Scene text on disk for the duration of one render.
enum SceneFile {
    Temp(tempfile::TempPath),
    Fixed { path: PathBuf, keep: bool },
}

impl SceneFile {
    fn write(scene: &str, opts: &RenderOptions) -> Result<Self, RenderError> {
        match &opts.scene_file {
            Some(path) => {
                ensure_parent_dir(path)?;
                std::fs::write(path, scene).map_err(|e| {
                    RenderError::new(format!(
                        "failed to write scene file '{}': {e}",
                        path.display()
                    ))
                })?;
                Ok(Self::Fixed {
                    path: path.clone(),
                    keep: opts.preserve_scene_file,
                })
            }
            None => {
                let mut f = tempfile::Builder::new()
                    .prefix("povsuite-")
                    .suffix(".pov")
                    .tempfile()
                    .map_err(|e| RenderError::new(format!("failed to create scene file: {e}")))?;
                f.write_all(scene.as_bytes())
                    .and_then(|()| f.flush())
                    .map_err(|e| RenderError::new(format!("failed to write scene file: {e}")))?;
                let temp = f.into_temp_path();
                if opts.preserve_scene_file {
                    let path = temp.keep().map_err(|e| {
                        RenderError::new(format!("failed to keep scene file: {e}"))
                    })?;
                    tracing::debug!(path = %path.display(), "kept scene file");
                    return Ok(Self::Fixed { path, keep: true });
                }
                Ok(Self::Temp(temp))
            }
        }
    }

    fn path(&self) -> &Path {
        match self {
            Self::Temp(t) => &**t,
            Self::Fixed { path, .. } => path.as_path(),
        }
    }
}

impl Drop for SceneFile {
    fn drop(&mut self) {
        if let Self::Fixed { path, keep: false } = self {
            let _ = std::fs::remove_file(path);
        }
    }
}

impl Renderer for PovRay {
    #[tracing::instrument(skip(self, scene, options), fields(output = ?options.output))]
    fn render(&self, scene: &str, options: &RenderOptions) -> Result<RenderOutput, RenderError> {
        if let OutputTarget::File(path) = &options.output {
            ensure_parent_dir(path)?;
        }
        let scene_file = SceneFile::write(scene, options)?;

        let output = Command::new(&self.program)
            .args(&self.leading_args)
            .args(povray_args(scene_file.path(), options))
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                RenderError::new(format!(
                    "failed to start '{}' (is POV-Ray installed, or {POVRAY_BINARY_ENV} set?): {e}",
                    self.program.display()
                ))
            })?;
        drop(scene_file);

        let diagnostics = String::from_utf8_lossy(&output.stderr).trim().to_owned();
        if !output.status.success() {
            return Err(RenderError::new(format!(
                "'{}' exited with status {}",
                self.program.display(),
                output.status
            ))
            .with_status(output.status.code())
            .with_diagnostics(diagnostics));
        }

        let frame = match &options.output {
            OutputTarget::Inline => RenderedFrame::Pixels(
                decode_ppm(&output.stdout).map_err(|e| e.with_diagnostics(diagnostics.clone()))?,
            ),
            OutputTarget::File(path) => RenderedFrame::File(path.clone()),
        };
        Ok(RenderOutput { frame, diagnostics })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::FrameTick;
    use crate::render::options::{RenderConfig, RenderOverrides};

    fn opts(overrides: RenderOverrides) -> RenderOptions {
        RenderConfig::default()
            .resolve(&overrides, Some(FrameTick::new(0, 3)))
            .unwrap()
    }

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn args_for_file_output() {
        let o = opts(RenderOverrides {
            out_dir: Some("imgs".into()),
            width: Some(160),
            height: Some(120),
            quality: Some(9),
            antialiasing: Some(0.2),
            jitter: Some(true),
            output_alpha: Some(true),
            include_dirs: Some(vec!["inc".into()]),
            ..RenderOverrides::default()
        });
        let args = strings(povray_args(Path::new("scene.pov"), &o));
        let out = PathBuf::from("imgs").join("000000000003.png");
        assert_eq!(
            args,
            vec![
                "scene.pov".to_owned(),
                "+H120".to_owned(),
                "+W160".to_owned(),
                "+Q9".to_owned(),
                "+A0.200000".to_owned(),
                "+J".to_owned(),
                "-D".to_owned(),
                "+UA".to_owned(),
                "+Linc".to_owned(),
                "Output_File_Type=N".to_owned(),
                format!("+O{}", out.display()),
            ]
        );
    }

    #[test]
    fn args_for_inline_output_stream_ppm() {
        let mut overrides = RenderOverrides::output(OutputTarget::Inline);
        overrides.show_window = Some(true);
        overrides
            .extra
            .insert("Display_Gamma".to_owned(), serde_json::json!(2.2));
        let args = strings(povray_args(Path::new("s.pov"), &opts(overrides)));
        assert!(args.contains(&"+D".to_owned()));
        assert!(args.contains(&"Display_Gamma=2.2".to_owned()));
        assert_eq!(&args[args.len() - 2..], ["Output_File_Type=P", "+O-"]);
    }

    #[test]
    fn missing_binary_is_a_render_error_and_cleans_scene_file() {
        let dir = tempfile::tempdir().unwrap();
        let scene_path = dir.path().join("frame.pov");
        let mut overrides = RenderOverrides::output(OutputTarget::Inline);
        overrides.scene_file = Some(scene_path.clone());

        let err = PovRay::new(dir.path().join("no-such-povray"))
            .render("sphere { <0,0,0>, 1 }", &opts(overrides.clone()))
            .unwrap_err();
        assert!(err.message.contains("failed to start"));
        assert!(!scene_path.exists());

        overrides.preserve_scene_file = Some(true);
        let _ = PovRay::new(dir.path().join("no-such-povray"))
            .render("sphere { <0,0,0>, 1 }", &opts(overrides));
        assert_eq!(
            std::fs::read_to_string(&scene_path).unwrap(),
            "sphere { <0,0,0>, 1 }"
        );
    }

    #[cfg(unix)]
    #[test]
    fn inline_output_is_decoded_from_stdout() {
        let fake = PovRay::new("sh").with_leading_args([
            "-c",
            r"printf 'P6\n1 1\n255\n\377\000\000'",
            "povray",
        ]);
        let out = fake
            .render("// empty", &opts(RenderOverrides::output(OutputTarget::Inline)))
            .unwrap();
        let RenderedFrame::Pixels(img) = out.frame else {
            panic!("expected pixels");
        };
        assert_eq!(img.dimensions(), (1, 1));
        assert_eq!(img.get_pixel(0, 0).0, [255, 0, 0]);
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_carries_stderr() {
        let fake = PovRay::new("sh").with_leading_args([
            "-c",
            "echo 'Parse Error: Expected object' >&2; exit 3",
            "povray",
        ]);
        let err = fake
            .render("sphere {", &opts(RenderOverrides::output(OutputTarget::Inline)))
            .unwrap_err();
        assert_eq!(err.status, Some(3));
        assert!(err.diagnostics.contains("Parse Error"));
    }
}
