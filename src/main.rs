use clap::Parser;
use pocverify::cli;
use pocverify::errors::{FailureStage, PocError};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(!cli.no_color)
        .with_writer(std::io::stderr)
        .init();

    if cli.no_color {
        console::set_colors_enabled(false);
    }
    debug!(version = %pocverify::build_info(), "pocverify starting");

    let result = match cli.command {
        cli::Commands::Verify(args) => cli::verify::handle_verify(args, cli.quiet).await.map(|_| ()),
        cli::Commands::Validate(args) => cli::validate::handle_validate(args, cli.quiet).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(exit_code(&e));
    }
}

fn exit_code(e: &PocError) -> i32 {
    match e {
        PocError::Config(_) => 2,
        PocError::InvalidTarget(_) => 5,
        other => match other.classify().stage {
            FailureStage::Definition => 3,
            FailureStage::Binding | FailureStage::Probe => 4,
            FailureStage::Setup => 1,
        },
    }
}
