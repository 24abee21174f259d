/// Sampling defaults
pub const DEFAULT_TEMPERATURE: f64 = 0.5;
pub const DEFAULT_MAX_TOKENS: u32 = 1024;
pub const OPENAI_TOP_P: f64 = 1.0;
/// Upper temperature bounds accepted by the vendor APIs
pub const MAX_TEMPERATURE: f64 = 2.0;
pub const CLAUDE_MAX_TEMPERATURE: f64 = 1.0;

/// Default models per provider
pub const OPENAI_DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const OPENAI_UPGRADED_MODEL: &str = "gpt-4-turbo-preview";
/// Shorthand accepted by `--model` on the OpenAI path
pub const OPENAI_UPGRADE_ALIAS: &str = "4";
pub const CLAUDE_DEFAULT_MODEL: &str = "claude-3-opus-20240229";
pub const GEMINI_DEFAULT_MODEL: &str = "gemini-pro";

/// API key environment variables
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const ANTHROPIC_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Endpoint overrides
pub const OPENAI_BASE_URL_ENV: &str = "PARLEY_OPENAI_BASE_URL";
pub const ANTHROPIC_BASE_URL_ENV: &str = "PARLEY_ANTHROPIC_BASE_URL";
pub const GEMINI_BASE_URL_ENV: &str = "PARLEY_GEMINI_BASE_URL";

pub const OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// URLs for user guidance
pub const OPENAI_API_KEY_URL: &str = "https://platform.openai.com/api-keys";
pub const ANTHROPIC_API_KEY_URL: &str = "https://console.anthropic.com/settings/keys";
pub const GEMINI_API_KEY_URL: &str = "https://makersuite.google.com/app/apikey";

pub const SYSTEM_PROMPT_ENV: &str = "PARLEY_SYSTEM_PROMPT";

/// Logging and local files
pub const LOG_TO_FILE_ENV: &str = "PARLEY_LOG_TO_FILE";
pub const LOG_FILE_NAME: &str = "parley.log";
pub const PARLEY_DIR_NAME: &str = ".parley";
pub const ENV_FILE_NAME: &str = ".env";

/// Get the system prompt from the environment, treating blank values as unset
pub fn get_default_system_prompt() -> Option<String> {
    std::env::var(SYSTEM_PROMPT_ENV)
        .ok()
        .filter(|s| !s.trim().is_empty())
}

/// Get a base URL from its override variable or fall back to the public endpoint
pub fn get_base_url(env_name: &str, default: &str) -> String {
    std::env::var(env_name)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.trim_end_matches('/').to_string())
        .unwrap_or_else(|| default.to_string())
}
