use std::process::ExitCode;

fn main() -> ExitCode {
    serqet_cli::run()
}
