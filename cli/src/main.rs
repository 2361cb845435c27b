//! NoteSync CLI entry point.

use clap::Parser;
use notesync::cli::{commands, Cli, Commands};
use notesync::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            if let Some(hint) = e.hint() {
                eprintln!("Error: {e}\n  Hint: {hint}");
            } else {
                eprintln!("Error: {e}");
            }
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    // Honor RUST_LOG if set, otherwise use the verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("notesync=info"),
            _ => EnvFilter::new("notesync=debug"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn run(cli: &Cli) -> Result<u8, Error> {
    let verbose = cli.verbose > 0;
    match &cli.command {
        Commands::Init {
            folder,
            workspace_url,
            root_url,
        } => commands::init::execute(folder.as_deref(), workspace_url.as_deref(), root_url.as_deref()),

        Commands::Clone {
            url,
            folder,
            workspace_url,
        } => commands::clone::execute(
            url.as_deref(),
            folder.as_deref(),
            workspace_url.as_deref(),
            verbose,
        ),

        Commands::Push {
            folder,
            force_all,
            dry_run,
        } => commands::push::execute(folder, *force_all, *dry_run, verbose),

        Commands::Pull {
            folder,
            new_only,
            existing_only,
            force_all,
            dry_run,
        } => commands::pull::execute(
            folder,
            *new_only,
            *existing_only,
            *force_all,
            *dry_run,
            verbose,
        ),

        Commands::Status { folder, fix } => commands::status::execute(folder, *fix),
    }
}
