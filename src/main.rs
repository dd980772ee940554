use clap::Parser;
use replaytrader::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
