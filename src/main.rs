use anyhow::Result;
use argh::EarlyExit;
use runparts::cli::{self, Args};
use runparts::io_adapters::Console;
use runparts::{Config, PartRunner, logging};
use std::io;
use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    let argv: Vec<String> = std::env::args_os()
        .map(|a| a.to_string_lossy().into_owned())
        .collect();
    let program = argv
        .first()
        .and_then(|a| Path::new(a).file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "runparts".to_string());

    if let Err(e) = logging::init(&program) {
        eprintln!("{program}: {e}");
    }

    let args = match cli::parse(&argv) {
        Ok(args) => args,
        Err(EarlyExit { output, status }) => {
            return match status {
                Ok(()) => {
                    print!("{output}");
                    ExitCode::SUCCESS
                }
                Err(()) => {
                    eprint!("{output}");
                    ExitCode::FAILURE
                }
            };
        }
    };

    if args.version {
        print_version();
        return ExitCode::SUCCESS;
    }

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    let config = Config::from_args(args)?;
    config.umask.apply();

    let runner = PartRunner::new(config.policy);
    runner.run(
        &config.directory,
        &mut io::stdin().lock(),
        &mut Console::stdio(),
    )?;
    Ok(())
}

fn print_version() {
    println!("runparts program, version {}", env!("CARGO_PKG_VERSION"));
    println!("Copyright (C) 2020-2024 Alessio Treglia <alessio@debian.org>");
}
