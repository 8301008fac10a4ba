use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use winit::event_loop::EventLoop;

use orbit_viewer::{
    parse_requested_count, KeyInputState, LayoutPolicy, ModelSource, SceneOptions, ScenePreset,
    SummaryRenderer, Viewer, ViewerApp, WindowInitError,
};

#[derive(Parser, Debug)]
#[command(
    name = "orbit-viewer",
    version,
    about = "Orbit a model (or a line or grid of its clones) with the keyboard"
)]
struct Cli {
    /// Wavefront OBJ file to display. The built-in cube and sphere are used
    /// when omitted.
    model: Option<PathBuf>,

    /// Scene preset (F1-F4 switch scenes in the window)
    #[arg(long, value_enum, default_value_t = SceneArg::Orbit)]
    scene: SceneArg,

    /// Override the preset's layout policy
    #[arg(long, value_enum)]
    policy: Option<PolicyArg>,

    /// Initial text of the instance-count control, parsed like a number box
    #[arg(long, allow_hyphen_values = true)]
    count: Option<String>,

    /// Key held down for every headless frame (repeatable), e.g. `--hold q`
    #[arg(long = "hold", value_name = "KEY")]
    hold: Vec<String>,

    /// Number of frames to simulate in headless mode
    #[arg(long, default_value_t = 1)]
    frames: u64,

    /// JSON file overriding fields of the scene preset
    #[arg(long)]
    config: Option<PathBuf>,

    /// Skip the window and print a text summary of the simulated frames
    #[arg(long)]
    summary_only: bool,

    /// Enable debug logging (RUST_LOG still takes precedence)
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum SceneArg {
    Simple,
    Orbit,
    Analyser,
    Gallery,
}

impl SceneArg {
    fn to_preset(self) -> ScenePreset {
        match self {
            SceneArg::Simple => ScenePreset::Simple,
            SceneArg::Orbit => ScenePreset::Orbit,
            SceneArg::Analyser => ScenePreset::Analyser,
            SceneArg::Gallery => ScenePreset::Gallery,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum PolicyArg {
    Linear,
    Grid,
}

impl PolicyArg {
    fn to_policy(self) -> LayoutPolicy {
        match self {
            PolicyArg::Linear => LayoutPolicy::Linear,
            PolicyArg::Grid => LayoutPolicy::Grid,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    if let Err(err) = run(cli) {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let options = SceneOptions {
        preset: cli.scene.to_preset(),
        source: cli
            .model
            .clone()
            .map(ModelSource::File)
            .unwrap_or(ModelSource::Primitives),
        policy: cli.policy.map(PolicyArg::to_policy),
        config_path: cli.config.clone(),
        initial_count: cli.count.clone(),
    };

    if cli.summary_only {
        return run_headless(&options, cli.frames, &cli.hold);
    }

    match run_interactive(options.clone()) {
        Ok(()) => Ok(()),
        Err(err) => {
            if err.downcast_ref::<WindowInitError>().is_some() {
                eprintln!(
                    "{err}. Falling back to --summary-only mode (set DISPLAY or install a GPU driver to enable rendering)."
                );
                run_headless(&options, cli.frames, &cli.hold)
            } else {
                Err(err)
            }
        }
    }
}

fn run_headless(options: &SceneOptions, frames: u64, hold: &[String]) -> Result<()> {
    let config = options.viewer_config()?;
    let policy = options.policy_for(&config);
    let requested = match options.initial_count.as_deref() {
        Some(text) => match parse_requested_count(text, config.layout.max_instances) {
            Ok(count) => Some(count),
            Err(err) => {
                eprintln!("Ignoring --count {text:?}: {err}");
                None
            }
        },
        None => None,
    };

    let mut keys = KeyInputState::new();
    for key in hold {
        keys.set_held(key, true);
    }

    let mut viewer = Viewer::new(config);
    viewer.start(options.source.clone(), policy);
    viewer.wait_for_load()?;

    let template = viewer
        .frame_loop()
        .map(|frame_loop| frame_loop.layout().template())
        .context("scene did not start")?;
    println!(
        "Loaded model {} with {} node(s), {} triangles",
        template.name(),
        template.nodes().len(),
        template.triangle_count()
    );
    println!("Scene: {} ({policy:?} layout)", options.preset);

    let mut renderer = SummaryRenderer::new();
    for _ in 0..frames {
        viewer.tick(&keys, requested, &mut renderer)?;
    }

    let frame_loop = viewer.frame_loop().context("scene stopped unexpectedly")?;
    print!("{}", renderer.report(frame_loop.rig().state()));
    viewer.stop();
    Ok(())
}

fn run_interactive(options: SceneOptions) -> Result<()> {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let event_loop = panic::catch_unwind(AssertUnwindSafe(EventLoop::new));
    panic::set_hook(default_hook);
    let event_loop = event_loop
        .map_err(|panic| WindowInitError::from_panic("event loop", panic))?
        .map_err(|err| WindowInitError::from_error("event loop", err))?;

    let mut app = ViewerApp::new(options)?;
    event_loop
        .run_app(&mut app)
        .context("event loop terminated abnormally")?;
    app.finish()
}
