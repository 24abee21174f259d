mod api_key;
mod app;
mod claude;
mod cli;
mod clipboard;
mod constants;
mod conversation;
mod env_file;
mod gemini;
mod input;
mod logging;
mod openai;
mod output;
mod provider;
#[cfg(test)]
mod stub_server;

use crate::app::run_app;
use crate::cli::Config;
use crate::logging::{init_logging, log_debug, log_error, log_info, log_warn};
use crate::output::print_error;

#[tokio::main]
async fn main() {
    // Keys may live in .env files, so load them before anything reads the environment
    let env_files = env_file::load_env_files();

    init_logging();
    log_info("Starting parley");
    for path in &env_files.loaded {
        log_debug(&format!("Environment loaded from {}", path.display()));
    }
    for e in &env_files.failed {
        log_warn(&format!("{e:#}"));
        print_error(&format!("Warning: {e:#}"));
    }

    let config = Config::from_args();
    log_debug(&format!("Configuration: {:?}", config));

    if let Err(e) = run_app(config).await {
        // Report the root cause (last in the chain)
        let root_cause = e
            .chain()
            .last()
            .map(|cause| cause.to_string())
            .unwrap_or_else(|| e.to_string());

        log_error(&format!("{e:#}"));
        print_error(&format!("Error: {root_cause}"));
        std::process::exit(1);
    }
}
