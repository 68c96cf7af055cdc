use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};

use povsuite::{
    BuiltProject, FrameTick, OutputTarget, PovRay, Project, RenderOverrides, RenderedFrame,
    SceneSource as _,
};

#[derive(Parser, Debug)]
#[command(name = "povsuite", version, about)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every frame and its output path without rendering.
    Plan(PlanArgs),
    /// Render every frame on a pool of POV-Ray workers.
    Render(RenderArgs),
    /// Render a single frame on the calling thread.
    Frame(FrameArgs),
}

#[derive(Args, Debug)]
struct ProjectArgs {
    /// Input project JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output directory, overriding `config.out_dir`.
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct RendererArgs {
    /// POV-Ray executable (defaults to `$POVRAY_BINARY`, then `povray`).
    #[arg(long)]
    povray: Option<PathBuf>,

    /// Keep the generated `.pov` scene files.
    #[arg(long)]
    keep_scenes: bool,
}

#[derive(Parser, Debug)]
struct PlanArgs {
    #[command(flatten)]
    project: ProjectArgs,

    /// Also write each frame's scene text into this directory.
    #[arg(long)]
    scenes: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    #[command(flatten)]
    project: ProjectArgs,

    #[command(flatten)]
    renderer: RendererArgs,

    /// Worker threads (defaults to the available parallelism).
    #[arg(long)]
    workers: Option<usize>,

    /// Queue capacity, counting frames waiting and frames rendering.
    #[arg(long, default_value_t = 8)]
    queue: usize,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    #[command(flatten)]
    project: ProjectArgs,

    #[command(flatten)]
    renderer: RendererArgs,

    /// Episode index (0-based).
    #[arg(long, default_value_t = 0)]
    episode: u32,

    /// Frame index within the episode (0-based).
    #[arg(long)]
    frame: u64,

    /// Output image path, instead of the path derived from the frame.
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Plan(args) => cmd_plan(args),
        Command::Render(args) => cmd_render(args),
        Command::Frame(args) => cmd_frame(args),
    }
}

fn load_project(args: &ProjectArgs) -> anyhow::Result<(BuiltProject, RenderOverrides)> {
    let project = Project::load(&args.in_path)?;
    let base_dir = args.in_path.parent().unwrap_or_else(|| Path::new("."));
    let built = project
        .build(base_dir)
        .with_context(|| format!("build project '{}'", args.in_path.display()))?;
    let overrides = RenderOverrides {
        out_dir: args.out_dir.clone(),
        ..RenderOverrides::default()
    };
    Ok((built, overrides))
}

fn make_renderer(args: &RendererArgs, overrides: &mut RenderOverrides) -> PovRay {
    if args.keep_scenes {
        overrides.preserve_scene_file = Some(true);
    }
    match &args.povray {
        Some(path) => PovRay::new(path),
        None => PovRay::from_env(),
    }
}

fn cmd_plan(args: PlanArgs) -> anyhow::Result<()> {
    let (built, overrides) = load_project(&args.project)?;
    let BuiltProject {
        config,
        mut sequencer,
        scene,
        ..
    } = built;

    if let Some(dir) = &args.scenes {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create scene dir '{}'", dir.display()))?;
    }

    let mut play = sequencer.play();
    while let Some(tick) = play.next() {
        let opts = config.resolve(&overrides, Some(tick))?;
        let target = match &opts.output {
            OutputTarget::File(p) => p.display().to_string(),
            OutputTarget::Inline => "-".to_owned(),
        };
        println!("{tick}\t{target}");
        tracing::debug!("{}", play.status());

        if let Some(dir) = &args.scenes {
            let path = dir.join(format!("{}.pov", tick.label()));
            std::fs::write(&path, scene.scene_text()?)
                .with_context(|| format!("write scene '{}'", path.display()))?;
        }
    }
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let (built, mut overrides) = load_project(&args.project)?;
    let povray = make_renderer(&args.renderer, &mut overrides);
    if !povray.is_available() {
        anyhow::bail!(
            "'{}' did not start; install POV-Ray or pass --povray",
            povray.program().display()
        );
    }

    let workers = args
        .workers
        .unwrap_or_else(|| std::thread::available_parallelism().map_or(1, |n| n.get()));

    let (mut suite, scene) = built.into_suite(std::sync::Arc::new(povray))?;
    suite.setup(&overrides)?;
    suite.setup_pool(workers, args.queue)?;

    let run = suite.run_in_pool(&scene, &RenderOverrides::default());
    let report = suite.join_pool()?;
    let summary = run?;

    eprintln!("{}", report.summary());
    if !report.is_success() {
        anyhow::bail!(
            "{} of {} frame(s) failed",
            report.failures.len(),
            summary.len()
        );
    }
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let (built, mut overrides) = load_project(&args.project)?;
    let povray = make_renderer(&args.renderer, &mut overrides);
    let (mut suite, scene) = built.into_suite(std::sync::Arc::new(povray))?;
    suite.setup(&overrides)?;

    let frame_overrides = RenderOverrides {
        output: args.out.map(OutputTarget::File),
        ..RenderOverrides::default()
    };
    let tick = FrameTick::new(args.episode, args.frame);
    let out = suite.render_frame(tick, &scene, &frame_overrides)?;

    match out.frame {
        RenderedFrame::File(path) => eprintln!("wrote {}", path.display()),
        RenderedFrame::Pixels(img) => eprintln!("rendered {}x{}", img.width(), img.height()),
    }
    Ok(())
}
