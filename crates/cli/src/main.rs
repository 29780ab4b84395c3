use std::process::ExitCode;

fn main() -> ExitCode {
    priceflow_cli::run()
}
