use registry_sync::cli::{Args, Runner};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse_args();

    let runner = match Runner::new(args) {
        Ok(runner) => runner,
        Err(e) => {
            eprintln!("❌ ERROR: {}", e);
            return ExitCode::from(2);
        }
    };

    match runner.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ ERROR: {}", e);
            ExitCode::FAILURE
        }
    }
}
