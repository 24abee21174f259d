use anyhow::Result;
use std::env;
use std::io::Write;

use crate::logging::{log_error, log_info, log_warn};
use crate::provider::ProviderKind;

/// Read the API key for `kind`. Only presence is checked.
pub fn get_api_key(kind: ProviderKind) -> Result<String> {
    let var = kind.api_key_env();
    match env::var(var) {
        Ok(key) if !key.trim().is_empty() => {
            log_info(&format!("Found {var} environment variable"));
            Ok(key.trim().to_string())
        }
        Ok(_) => {
            log_error(&format!("{var} environment variable is empty"));
            handle_api_key_error(kind)
        }
        Err(_) => {
            log_error(&format!("{var} environment variable not found"));
            handle_api_key_error(kind)
        }
    }
}

fn handle_api_key_error(kind: ProviderKind) -> Result<String> {
    let var = kind.api_key_env();
    let url = kind.api_key_url();

    eprintln!();
    eprintln!("🔑 API Key Required");
    eprintln!("===================");
    eprintln!();
    eprintln!("The {kind} API key is missing or empty.");
    eprintln!();
    eprintln!("Create a key at: {url}");
    eprintln!();
    eprintln!("Then either export it:");
    eprintln!("  export {var}=\"your_api_key_here\"");
    eprintln!();
    eprintln!("or add it to a .env file in the current directory or in ~/.parley/.env:");
    eprintln!("  {var}=your_api_key_here");
    eprintln!();

    offer_to_open(url);

    Err(anyhow::anyhow!(
        "{var} environment variable is required. Visit {url} to get your API key."
    ))
}

/// Print guidance after the provider rejected our credentials
pub fn print_auth_error_help(kind: ProviderKind) {
    eprintln!();
    eprintln!("🔐 Authentication Error");
    eprintln!("========================");
    eprintln!();
    eprintln!("The {kind} API rejected the request due to authentication issues.");
    eprintln!();
    eprintln!("Common causes:");
    eprintln!("• Invalid or revoked API key in {}", kind.api_key_env());
    eprintln!("• The key lacks access to the requested model");
    eprintln!("• Billing is not enabled for the account");
    eprintln!();
    eprintln!("Manage your keys at: {}", kind.api_key_url());
    eprintln!();
}

/// Ask on stderr whether to open `url`; EOF or anything but yes declines
fn offer_to_open(url: &str) {
    eprint!("Would you like to open the API key page in your browser? (y/N) ");
    let _ = std::io::stderr().flush();

    let mut input = String::new();
    if std::io::stdin().read_line(&mut input).is_ok() && is_affirmative(&input) {
        open_browser(url);
    } else {
        eprintln!();
    }
}

fn open_browser(url: &str) {
    log_info(&format!("Attempting to open browser to: {url}"));

    match webbrowser::open(url) {
        Ok(_) => {
            log_info("Successfully opened browser");
            eprintln!("✅ Opened {url} in your default browser");
        }
        Err(e) => {
            log_warn(&format!("Failed to open browser: {e}"));
            eprintln!("❌ Could not open browser automatically.");
            eprintln!("Please manually visit: {url}");
        }
    }
}

pub fn is_affirmative(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "y" | "yes")
}
