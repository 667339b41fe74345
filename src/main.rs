use clap::Parser;
use config_env_sync::sync::{ConfigSync, SyncOptions, default_config_path};
use std::{path::PathBuf, process::ExitCode};

#[derive(Parser)]
#[command(
  name = "config-env-sync",
  about = "Sync your local config env file with the repository template",
  version,
  author
)]
struct Cli {
  /// Path to the template file
  #[arg(long, default_value = "config/config.env.example")]
  template: PathBuf,

  /// Path to the config file to update [default: ~/.config/codeman/config.env]
  #[arg(long)]
  config: Option<PathBuf>,

  /// Don't write, just report what would change
  #[arg(long)]
  dry_run: bool,

  /// Print a unified diff to stdout (may include secrets)
  #[arg(long)]
  show_diff: bool,

  /// Never prompt; keep unknown keys (no deletions)
  #[arg(long)]
  non_interactive: bool,

  /// Verbose output (-v for verbose, -vv for very verbose)
  #[arg(short, long, action = clap::ArgAction::Count)]
  verbose: u8,
}

fn setup_tracing(verbose: u8) {
  use tracing_subscriber::fmt;
  use tracing_subscriber::prelude::*;

  let log_level = match verbose {
    1 => "debug",
    2 => "trace",
    _ => "info",
  };

  tracing_subscriber::registry()
    .with(fmt::layer().with_writer(std::io::stderr))
    .with(tracing_subscriber::EnvFilter::new(
      std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
    ))
    .init();
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  setup_tracing(cli.verbose);

  let options = SyncOptions {
    template_file: cli.template,
    config_file: cli.config.unwrap_or_else(default_config_path),
    dry_run: cli.dry_run,
    show_diff: cli.show_diff,
    non_interactive: cli.non_interactive,
  };

  match ConfigSync::sync_with_options(options) {
    Ok(_) => ExitCode::SUCCESS,
    Err(e) => {
      eprintln!("error: {e}");
      ExitCode::FAILURE
    }
  }
}
