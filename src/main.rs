// cident: report every identifier a C file declares, by kind

use std::io::{self, BufWriter};
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cident::config::{Policy, LOG_ENV};
use cident::error::CidentError;

/// List the identifiers declared at file scope in C sources
#[derive(Parser, Debug)]
#[command(
    version,
    about,
    after_help = "Classes are switched with CIDENT_<class>=0|1; CIDENT_all_files=1 also reports headers."
)]
struct Cli {
    /// Compiler-style arguments: input files plus -I, -D and -U options
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    let policy = Policy::from_env();

    let stdout = io::stdout();
    let out = BufWriter::new(stdout.lock());

    match cident::run(&cli.args, &policy, out) {
        Ok(summary) if summary.errors > 0 => ExitCode::from(1),
        Ok(_) => ExitCode::SUCCESS,
        Err(CidentError::Integrity(fault)) => {
            eprintln!("cident: fatal: {}", fault);
            ExitCode::from(2)
        }
        Err(e) => {
            eprintln!("cident: {}", e);
            ExitCode::from(1)
        }
    }
}
