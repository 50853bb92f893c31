use std::process::ExitCode;

fn main() -> ExitCode {
    bhojana_cli::run()
}
