use std::process::ExitCode;

fn main() -> ExitCode {
    kudos_cli::run()
}
