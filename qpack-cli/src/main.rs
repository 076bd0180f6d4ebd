use clap::{Parser, Subcommand};

use qpack_core::builder;
use qpack_core::output::Output;
use qpack_core::watch;

#[derive(Parser)]
#[command(name = "qpack", version, about = "source data pack builder and watcher")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Build the data pack for a project
    Build {
        /// Project file or directory
        project: String,
    },
    /// Watch a project, maintaining its change list; runs until killed
    Watch {
        /// Project file or directory
        project: String,
    },
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    let result = match cli.cmd {
        Cmd::Build { project } => builder::build_project(&output, &project),
        Cmd::Watch { project } => watch::watch_project(&output, &project),
    };

    // Setup failures surface through the sink like every other report.
    if let Err(err) = result {
        output.error(&format!("Error {err:#}\n"));
        std::process::exit(1);
    }
}
