//! bindplan CLI entry point.

use std::env;
use std::process::ExitCode;

use bindplan_cli::{CliConfig, CliError, help_text, parse_args, run};

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();

    let config = match parse_args(&args) {
        Ok(config) => config,
        Err(e) => return fail(&e),
    };

    if config.show_help {
        println!("{}", help_text());
        return ExitCode::SUCCESS;
    }
    if config.show_version {
        println!("bindplan {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    init_logging(&config);

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(&e),
    }
}

fn init_logging(config: &CliConfig) {
    let default = if config.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

fn fail(error: &CliError) -> ExitCode {
    for line in error.report() {
        eprintln!("{line}");
    }
    if matches!(error, CliError::Usage(_)) {
        eprintln!("Run 'bindplan --help' for usage.");
    }
    ExitCode::from(error.exit_code())
}
