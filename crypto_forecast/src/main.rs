use clap::Parser;
use crypto_forecast::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
