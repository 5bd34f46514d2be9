//! Taskitem - item host for process isolation boundaries
//!
//! Binary name: `taskitem`

use std::{path::PathBuf, process};

use clap::{Parser, Subcommand};

mod host;
mod setup;

#[derive(Parser)]
#[command(name = "taskitem")]
#[command(version, about = "Builds task items on the far side of an isolation boundary")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve item requests as JSON lines on stdin/stdout
    Host {
        /// Resolve relative identities against this directory
        #[arg(long)]
        working_dir: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Host { working_dir } => setup::load(working_dir).and_then(|config| {
            setup::init_tracing(&config.log.filter)?;
            host::run(&config)
        }),
    };

    if let Err(err) = result {
        #[allow(clippy::print_stderr)]
        {
            eprintln!("Error: {err:#}");
        }

        #[allow(clippy::exit)]
        process::exit(1);
    }
}
