//! `rigfuse` – LIDAR + radar fusion viewer.
//!
//! This binary:
//!
//! 1. Loads `~/.rigfuse/config.toml` (or `$RIGFUSE_CONFIG`); without one it
//!    runs the fully simulated rig.
//! 2. Opens the configured LIDAR capture, radar ingestion and viewer.
//! 3. Runs the fusion loop until the viewer is closed (`q` in the browser),
//!    **Ctrl-C** is pressed, or the capture is exhausted.
//!
//! `rigfuse init` writes the default configuration to disk and exits.

mod config;
mod rig;

use std::process::ExitCode;
use std::sync::atomic::Ordering;

use colored::Colorize;
use rigfuse_runtime::init_tracing;
use rigfuse_types::RigError;
use tracing::warn;

use crate::config::{Config, ViewerKind};

fn main() -> ExitCode {
    let _telemetry = init_tracing("rigfuse");

    print_banner();

    if std::env::args().nth(1).as_deref() == Some("init") {
        return write_default_config();
    }

    // ── Configuration ─────────────────────────────────────────────────────
    let cfg = match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => {
            println!(
                "  No config at {}; using the simulated rig.",
                config::config_path().display().to_string().dimmed()
            );
            config::defaults_with_env()
        }
        Err(e) => {
            eprintln!("{}: {}", "Config error".red(), e);
            return ExitCode::from(2);
        }
    };
    print_rig_summary(&cfg);

    // ── Async workers (radar ingestion, viewer server) ─────────────────────
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("{}: failed to start tokio runtime: {}", "Error".red(), e);
            return ExitCode::FAILURE;
        }
    };

    let mut rig = match rig::assemble(&cfg, runtime.handle()) {
        Ok(rig) => rig,
        Err(e) => return report_startup_failure(&e),
    };

    // ── Ctrl-C handler ────────────────────────────────────────────────────
    let close_flag = rig.close_flag.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – closing the viewer …".yellow().bold());
        close_flag.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "failed to install Ctrl-C handler; close from the viewer instead");
    }

    // ── Fusion ────────────────────────────────────────────────────────────
    match rig.fusion.run() {
        Ok(rendered) => {
            println!("  {} {} frame(s) rendered.", "✓".green().bold(), rendered);
            ExitCode::SUCCESS
        }
        Err(e) => report_startup_failure(&e),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn report_startup_failure(e: &RigError) -> ExitCode {
    match e {
        RigError::CaptureUnavailable { source_id, details } => {
            eprintln!("{} {}", "✗ Cannot open LIDAR capture".red().bold(), source_id.bold());
            eprintln!("  {}", details);
            eprintln!(
                "  Check the sensor connection, or set {} to replay a recording.",
                "RIGFUSE_CAPTURE_FILE".bold()
            );
        }
        other => eprintln!("{}: {}", "Error".red(), other),
    }
    ExitCode::FAILURE
}

fn write_default_config() -> ExitCode {
    match config::save(&Config::default()) {
        Ok(path) => {
            println!(
                "  {} Default config written to {}",
                "✓".green().bold(),
                path.display().to_string().bold()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}: {}", "Error saving config".red(), e);
            ExitCode::FAILURE
        }
    }
}

fn print_rig_summary(cfg: &Config) {
    println!("  capture : {}", cfg.capture.kind.to_string().bold());
    println!("  radar   : {:?} (port {})", cfg.radar.kind, cfg.radar.port);
    match cfg.viewer.kind {
        ViewerKind::Cockpit => println!(
            "  viewer  : {}  (press {} in the page to close)",
            format!("http://localhost:{}", cfg.viewer.port).cyan(),
            "q".bold()
        ),
        ViewerKind::Headless => println!("  viewer  : headless"),
    }
    println!();
}

fn print_banner() {
    println!();
    println!("{}", r#"       _          ____              "#.bold().cyan());
    println!("{}", r#"  ____(_)__ _    / __/_ _____ ___   "#.bold().cyan());
    println!("{}", r#" / __/ / _ `/   / _// // (_-</ -_)  "#.bold().cyan());
    println!("{}", r#"/_/ /_/\_, /   /_/  \_,_/___/\__/   "#.bold().cyan());
    println!("{}", r#"      /___/                         "#.bold().cyan());
    println!();
    println!("  {} {}",
        "rigfuse".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  LIDAR + radar fusion viewer");
    println!();
}
