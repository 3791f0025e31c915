//! Symbol Scanner CLI
//!
//! Command-line interface for scanning barcodes and QR codes from still
//! images or a live camera, and for demonstrating the scan loop without
//! hardware.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use symbol_scanner::{
    capture::{FileConfig, ImageFile, ScriptedSource},
    decode::{DecoderKind, DecoderResolver, Preloaded, ScriptedDecoder, Symbol, SymbolFormat},
    metrics::{MetricsRegistry, MetricsSnapshot},
    session::{
        scan_image, CloseHandle, CycleOutcome, Detection, HandlerResult, ImageOutcome,
        ManualClock, ScanError, ScanSession,
    },
};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "symbol-scanner", version, about = "Scan barcodes and QR codes")]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print Prometheus metrics when the session ends.
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Decode a single still image.
    Image {
        /// Image file (png, jpeg, bmp, gif, webp).
        path: PathBuf,
    },
    /// Scan from a camera until interrupted or the cap is reached.
    Live {
        /// Minimum milliseconds between accepted codes.
        #[arg(long)]
        window_ms: Option<u64>,
        /// Close after this many accepted codes.
        #[arg(long)]
        max: Option<u32>,
        /// Prefer the front camera.
        #[arg(long)]
        front: bool,
    },
    /// Replay a scripted session without camera hardware.
    Demo {
        /// Number of distinct codes shown to the scripted camera.
        #[arg(long, default_value_t = 3)]
        codes: u32,
    },
}

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    info!("Symbol Scanner v{}", symbol_scanner::VERSION);

    let config = match &cli.config {
        Some(path) => match FileConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config {}: {}", path.display(), e);
                return ExitCode::from(2);
            }
        },
        None => FileConfig::default(),
    };

    let result = match cli.command {
        Command::Image { ref path } => run_image(path),
        Command::Live {
            window_ms,
            max,
            front,
        } => {
            let mut config = config;
            if let Some(window_ms) = window_ms {
                config.scanner.suppress_window_ms = window_ms;
            }
            if max.is_some() {
                config.scanner.max_accepted_per_session = max;
            }
            if front {
                config.scanner.preferred_facing = symbol_scanner::capture::Facing::User;
            }
            run_live(config, cli.metrics)
        }
        Command::Demo { codes } => run_demo(config, codes, cli.metrics),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Scan failed: {}", e);
            if e.suggests_manual_entry() {
                eprintln!("Camera scanning is not available; enter the code manually.");
            }
            ExitCode::FAILURE
        }
    }
}

fn print_detection(detection: &Detection) -> HandlerResult {
    println!(
        "{}\t{}\t{}",
        detection.captured_at.format("%H:%M:%S%.3f"),
        detection.format,
        detection.value
    );
    Ok(())
}

fn run_image(path: &Path) -> Result<ExitCode, ScanError> {
    let mut resolver = DecoderResolver::bundled();
    match scan_image(&mut ImageFile::new(path), &mut resolver, print_detection)? {
        ImageOutcome::Found(_) => Ok(ExitCode::SUCCESS),
        ImageOutcome::NoSymbolFound => {
            println!("No barcode or QR code found in {}", path.display());
            Ok(ExitCode::from(1))
        }
    }
}

/// Closes the session on Ctrl-C.
fn install_interrupt(handle: CloseHandle) {
    if let Err(e) = ctrlc::set_handler(move || handle.close()) {
        warn!("Could not install Ctrl-C handler: {}", e);
    }
}

fn report_metrics<S: symbol_scanner::FrameSource>(session: &ScanSession<S>) {
    let registry = match MetricsRegistry::new() {
        Ok(registry) => registry,
        Err(e) => {
            warn!("Metrics unavailable: {}", e);
            return;
        }
    };
    registry.update(&MetricsSnapshot::from_session(session));
    match registry.encode() {
        Ok(text) => print!("{}", text),
        Err(e) => warn!("Failed to encode metrics: {}", e),
    }
}

#[cfg(feature = "camera")]
fn run_live(config: FileConfig, print_metrics: bool) -> Result<ExitCode, ScanError> {
    use symbol_scanner::capture::NativeCamera;
    use symbol_scanner::session::{IntervalPacer, Pacer};

    let mut resolver = DecoderResolver::bundled();
    let mut session = ScanSession::new(NativeCamera::new(), config.scanner.clone())
        .with_source_config(config.source.clone());
    install_interrupt(session.close_handle());
    session.open(&mut resolver)?;

    #[cfg(feature = "metrics")]
    let server_state = (config.output.metrics_port != 0)
        .then(|| spawn_metrics_server(config.output.metrics_port))
        .flatten();

    let mut pacer = IntervalPacer::polling(config.output.cycle_interval_ms);
    let reason = loop {
        if let CycleOutcome::Closed(reason) = session.step(print_detection)? {
            break reason;
        }
        #[cfg(feature = "metrics")]
        if let Some(state) = &server_state {
            state
                .blocking_write()
                .update(&MetricsSnapshot::from_session(&session));
        }
        pacer.wait_next();
    };

    #[cfg(feature = "metrics")]
    if let Some(state) = &server_state {
        state
            .blocking_write()
            .update(&MetricsSnapshot::from_session(&session));
    }

    info!(?reason, accepted = session.stats().accepted, "Live scan finished");
    if print_metrics {
        report_metrics(&session);
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(not(feature = "camera"))]
fn run_live(_config: FileConfig, _print_metrics: bool) -> Result<ExitCode, ScanError> {
    eprintln!("Live scanning requires building with the `camera` feature.");
    Ok(ExitCode::from(2))
}

#[cfg(all(feature = "camera", feature = "metrics"))]
fn spawn_metrics_server(
    port: u16,
) -> Option<symbol_scanner::metrics::SharedMetricsState> {
    use symbol_scanner::metrics::{MetricsServer, MetricsServerConfig};

    let registry = match MetricsRegistry::new() {
        Ok(registry) => registry,
        Err(e) => {
            warn!("Metrics server disabled: {}", e);
            return None;
        }
    };
    let server = MetricsServer::new(MetricsServerConfig::with_port(port), registry);
    let state = server.state();

    std::thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(e) => {
                warn!("Failed to start metrics runtime: {}", e);
                return;
            }
        };
        if let Err(e) = runtime.block_on(server.run()) {
            warn!("Metrics server stopped: {}", e);
        }
    });

    Some(state)
}

/// Simulates a camera held over `codes` items in turn, 100 ms per frame.
fn run_demo(config: FileConfig, codes: u32, print_metrics: bool) -> Result<ExitCode, ScanError> {
    info!("This is a demonstration using scripted camera input");

    const FRAMES_PER_ITEM: u32 = 30;
    const FRAMES_ON_CODE: u32 = 12;

    let mut decoder = ScriptedDecoder::new(DecoderKind::Native);
    for item in 0..codes {
        let value = format!("89350495{:05}", item);
        for frame in 0..FRAMES_PER_ITEM {
            decoder = if frame < FRAMES_ON_CODE {
                decoder.then_symbols([Symbol::new(value.clone(), SymbolFormat::Ean13)])
            } else {
                decoder.then_empty()
            };
        }
    }

    let clock = ManualClock::new();
    let mut resolver = DecoderResolver::bundled().prefer(Preloaded::new(decoder));
    let mut session = ScanSession::new(ScriptedSource::new(), config.scanner.clone())
        .with_source_config(config.source.clone())
        .with_clock(clock.clone());
    install_interrupt(session.close_handle());
    session.open(&mut resolver)?;

    for _ in 0..codes * FRAMES_PER_ITEM {
        if let CycleOutcome::Closed(_) = session.step(print_detection)? {
            break;
        }
        clock.advance(100);
    }
    session.close();

    let stats = session.stats();
    info!(
        "Processed {} frames: {} accepted, {} suppressed, {} empty",
        stats.frames_analyzed, stats.accepted, stats.suppressed, stats.empty_frames
    );
    if print_metrics {
        report_metrics(&session);
    }
    Ok(ExitCode::SUCCESS)
}
