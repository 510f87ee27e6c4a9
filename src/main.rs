//! Binary entry point: parse flags, initialize collectors, optionally daemonize,
//! then run the scrape server (§4.8, grounded on `original_source/main.c`'s `main`).

use std::process::ExitCode;

fn main() -> ExitCode {
    let argv: Vec<String> = std::env::args().skip(1).collect();

    let (config, collectors) = match nano_exporter::launcher::launch(&argv) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("unknown argument: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Bind before daemonizing: daemonize() closes fds 0/1/2, so a bind failure
    // reported after detaching would never reach the operator (§7).
    let bound = match nano_exporter::server::bind(&config) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    nano_exporter::init_logging(&config.log_level);

    if !config.foreground {
        if let Err(e) = nano_exporter::daemonize::daemonize(config.pidfile.as_deref()) {
            tracing::error!(error = %e, "failed to daemonize");
            return ExitCode::FAILURE;
        }
    }

    if let Err(e) = nano_exporter::server::run(bound, &config, &collectors) {
        tracing::error!(error = %e, "server exited");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
