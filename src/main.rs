use clap::Parser;
use omap_player::core::config::{PlayerConfigBuilder, SpeedTest};
use omap_player::core::error::PlayerError;
use omap_player::core::orchestrator;
use omap_player::core::pipeline::FullscreenMode;
use omap_player::core::registry::Registry;
use omap_player::drivers;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Plays back raw video onto a framebuffer-style display, optionally
/// synchronized against a fleet of peers over UDP.
///
/// `RUST_LOG` controls log verbosity (e.g. `RUST_LOG=player_core=debug`);
/// `--log-level` overrides it with a single blanket level.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input media path. Not required when `-t` is given.
    input: Option<String>,

    /// Pool budget in megabytes.
    #[arg(short = 'b', long, default_value_t = 64)]
    budget_mb: usize,

    /// Display driver spec, `name[:params]`.
    #[arg(short = 'd', long)]
    display: Option<String>,

    /// Fullscreen, aspect-preserving scale.
    #[arg(short = 'f', conflicts_with = "distort")]
    fullscreen: bool,

    /// Fullscreen with aspect distortion allowed.
    #[arg(short = 'F', long = "distort", conflicts_with = "fullscreen")]
    distort: bool,

    /// Frame-rate override in frames per second.
    #[arg(long = "fps")]
    frame_rate: Option<f64>,

    /// Memory manager driver spec.
    #[arg(short = 'M', long)]
    memman: Option<String>,

    /// Pixel converter driver spec.
    #[arg(short = 'P', long)]
    pixconv: Option<String>,

    /// Single-buffer display (disable double buffering).
    #[arg(short = 's', long)]
    single_buffer: bool,

    /// Speed test: render N synthetic frames at WxH, bypassing the
    /// codec and display thread.
    #[arg(short = 't', value_name = "WxHxN")]
    speed_test: Option<String>,

    /// Timer driver spec (`system` or `netsync:...`).
    #[arg(short = 'T', long)]
    timer: Option<String>,

    /// Video codec driver spec, `name[:params]`.
    #[arg(short = 'v', long = "codec")]
    codec: Option<String>,

    /// Overrides `RUST_LOG` with a single level (`trace`/`debug`/`info`/
    /// `warn`/`error`) applied to every target.
    #[arg(long = "log-level")]
    log_level: Option<String>,
}

fn install_tracing(log_level: Option<&str>) {
    let filter = match log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn build_drivers() -> orchestrator::Drivers {
    let mut drivers = drivers::register_all();
    register_netsync_timer(&mut drivers.timers);
    drivers
}

#[cfg(feature = "netsync")]
fn register_netsync_timer(timers: &mut Registry<dyn omap_player::core::driver::Timer>) {
    timers.register("netsync", || Box::new(omap_player::netsync::NetsyncTimer::new()));
}

#[cfg(not(feature = "netsync"))]
fn register_netsync_timer(_timers: &mut Registry<dyn omap_player::core::driver::Timer>) {}

fn run(args: Args) -> omap_player::core::Result<()> {
    let fullscreen = match (args.fullscreen, args.distort) {
        (_, true) => FullscreenMode::Distort,
        (true, false) => FullscreenMode::AspectPreserve,
        (false, false) => FullscreenMode::Off,
    };

    let mut builder = PlayerConfigBuilder::new()
        .pool_budget_bytes(args.budget_mb * 1024 * 1024)
        .fullscreen(fullscreen)
        .single_buffer(args.single_buffer);

    if let Some(input) = args.input {
        builder = builder.input(input);
    }
    if let Some(codec) = args.codec {
        builder = builder.codec_spec(codec);
    }
    if let Some(display) = args.display {
        builder = builder.display_spec(display);
    }
    if let Some(fps) = args.frame_rate {
        builder = builder.frame_rate_override(fps);
    }
    if let Some(memman) = args.memman {
        builder = builder.memman_spec(memman);
    }
    if let Some(pixconv) = args.pixconv {
        builder = builder.pixconv_spec(pixconv);
    }
    if let Some(timer) = args.timer {
        builder = builder.timer_spec(timer);
    }
    if let Some(spec) = args.speed_test {
        builder = builder.speed_test(SpeedTest::parse(&spec)?);
    }

    let config = builder.build()?;
    let drivers = build_drivers();

    let stop = Arc::new(AtomicBool::new(false));
    let stop_handler = stop.clone();
    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_handler = interrupted.clone();
    ctrlc::set_handler(move || {
        info!("interrupt received, stopping");
        interrupted_handler.store(true, Ordering::Relaxed);
        stop_handler.store(true, Ordering::Relaxed);
    })
    .expect("failed to install SIGINT handler");

    let stats = orchestrator::run(&drivers, &config, stop)?;
    if interrupted.load(Ordering::Relaxed) {
        info!(frames_shown = stats.frames_shown, "playback stopped by SIGINT");
        return Err(PlayerError::Interrupted);
    }
    info!(frames_shown = stats.frames_shown, "playback finished");
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    install_tracing(args.log_level.as_deref());

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(PlayerError::Interrupted) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
