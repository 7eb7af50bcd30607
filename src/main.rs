use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::Parser;
use miette::{Report, Result};
use protofront::{ParseOptions, MAX_FILE_LEN};
use tracing::{info, Level};

#[derive(Debug, Parser)]
#[clap(version, about)]
pub struct Args {
    /// The source file(s) to check.
    #[clap(value_name = "PROTO_FILES", required = true, value_parser)]
    files: Vec<PathBuf>,
    /// If set, prints the tokens of each file instead of parsing it.
    #[clap(long)]
    tokens: bool,
    /// If set, prints each file in canonical form after parsing.
    #[clap(long)]
    print: bool,
    /// If set, named field types are not resolved to messages or enums.
    #[clap(long)]
    no_resolve: bool,
    /// The maximum length of a source file, in bytes.
    #[clap(long, value_name = "BYTES", default_value_t = MAX_FILE_LEN)]
    max_file_len: usize,
    /// Increases the logging verbosity. May be repeated.
    #[clap(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

pub fn main() -> ExitCode {
    miette::set_panic_hook();

    let args = Args::parse();
    init_logging(args.verbose);

    let mut failed = false;
    for file in &args.files {
        if let Err(err) = run(&args, file) {
            eprintln!("{:?}", err);
            failed = true;
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn run(args: &Args, path: &Path) -> Result<()> {
    info!(file = %path.display(), "processing file");

    let mut options = ParseOptions::new();
    options
        .resolve_types(!args.no_resolve)
        .max_file_len(args.max_file_len);

    if args.tokens {
        let tokens = options.tokenize_file(path).map_err(Report::new)?;
        for token in tokens {
            println!("{}\t{:?}", token.location, token.kind);
        }
        return Ok(());
    }

    let file = options.open(path).map_err(Report::new)?;

    if args.print {
        print!("{}", file);
    }
    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}
