use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use omni_drive_runtime::autonomous::Side;
use omni_drive_runtime::messages::CompetitionPhase;
use omni_drive_runtime::runtime::{self, RunOptions};

/// Drive runtime: joystick samples in, wheel motor commands out
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Robot config (JSON); built-in defaults when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Autonomous script (JSON)
    #[arg(long)]
    script: Option<PathBuf>,

    /// Field side the robot starts on; left mirrors the script
    #[arg(long, value_enum, default_value_t = Side::Right)]
    side: Side,

    /// Phase to start in before any phase message arrives
    #[arg(long, value_enum, default_value_t = CompetitionPhase::Disabled)]
    phase: CompetitionPhase,
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init(); // installs the subscriber globally

    let args = Args::parse();
    let options = RunOptions {
        config: args.config,
        script: args.script,
        side: args.side,
        phase: args.phase,
    };

    if let Err(e) = runtime::run(options).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
