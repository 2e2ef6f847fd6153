use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use scopus_query::batch::{self, ConvertOptions};

#[derive(Parser)]
#[command(name = "scopus2json")]
#[command(about = "Convert Scopus-style search queries, one per line, into a JSON array of query trees")]
struct Cli {
    /// Text file with one query per line
    input: PathBuf,

    /// Output file [default: INPUT with a .json extension]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write the JSON on a single line
    #[arg(long)]
    compact: bool,

    /// Show which parts of each query were ignored
    #[arg(long)]
    diagnostics: bool,

    /// Log debug output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let output = cli.output.clone().unwrap_or_else(|| batch::output_path_for(&cli.input));
    let options = ConvertOptions { pretty: !cli.compact, diagnostics: cli.diagnostics };

    match batch::convert_file(&cli.input, &output, &options) {
        Ok(result) => {
            println!(
                "Successfully processed {} queries. Output written to: {}",
                result.queries.len(),
                output.display()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr; `RUST_LOG` takes precedence over `--verbose`.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
