mod app;

use std::process::ExitCode;

use tracing::error;

use app::{bootstrap, loop_runner};

fn main() -> ExitCode {
    bootstrap::init_tracing();

    let app = match bootstrap::build_app() {
        Ok(app) => app,
        Err(err) => {
            error!(error = %err, "startup_failed");
            return ExitCode::FAILURE;
        }
    };

    loop_runner::run(app)
}
