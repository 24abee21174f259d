use crate::constants::{MAX_TEMPERATURE, get_default_system_prompt};
use crate::provider::{InvocationOptions, ProviderKind};
use clap::{Arg, ArgMatches, Command};
use clap_complete::{generate, shells};
use clap_complete_nushell::Nushell;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub provider: ProviderKind,
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub system_prompt: Option<String>,
}

/// Provider used when no subcommand is given
pub const DEFAULT_PROVIDER: ProviderKind = ProviderKind::OpenAi;

impl Config {
    pub fn from_args() -> Self {
        let matches = Self::build_cli().get_matches();

        // Handle completions generation immediately
        if let Some(shell) = matches.get_one::<String>("completions") {
            Self::handle_completions(shell);
            std::process::exit(0);
        }

        let config = Self::from_matches(&matches);
        if let Err(message) = config.validate() {
            Self::build_cli()
                .error(clap::error::ErrorKind::ValueValidation, message)
                .exit();
        }
        config
    }

    /// Checks that depend on the selected provider, which clap cannot see
    /// while parsing a single value
    pub fn validate(&self) -> Result<(), String> {
        if let Some(temperature) = self.temperature {
            let max = self.provider.max_temperature();
            if temperature > max {
                return Err(format!(
                    "invalid value '{temperature}' for '--temp <NUMBER>': {} accepts temperatures between 0 and {max}",
                    self.provider
                ));
            }
        }
        Ok(())
    }

    fn from_matches(matches: &ArgMatches) -> Self {
        let provider = matches
            .subcommand_name()
            .and_then(ProviderKind::from_command_name)
            .unwrap_or(DEFAULT_PROVIDER);

        Self {
            provider,
            model: matches.get_one::<String>("model").cloned(),
            temperature: matches.get_one::<f64>("temp").copied(),
            max_tokens: matches.get_one::<u32>("max-tokens").copied(),
            system_prompt: matches
                .get_one::<String>("system")
                .cloned()
                .or_else(get_default_system_prompt),
        }
    }

    pub fn invocation_options(&self) -> InvocationOptions {
        InvocationOptions::resolve(
            self.provider,
            self.model.as_deref(),
            self.temperature,
            self.max_tokens,
            self.system_prompt.clone(),
        )
    }

    pub fn build_cli() -> Command {
        let mut cmd = Command::new("parley")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Interactive terminal chat with OpenAI, Claude and Gemini (OpenAI by default)")
            .after_help(
                "API keys are read from OPENAI_API_KEY, ANTHROPIC_API_KEY and GEMINI_API_KEY, \
                 also loaded from ./.env or ~/.parley/.env. Submit an empty prompt or press \
                 Ctrl-D to quit.",
            )
            .arg(
                Arg::new("model")
                    .short('m')
                    .long("model")
                    .help("Model to use (provider default if omitted; '4' selects gpt-4-turbo-preview for OpenAI)")
                    .value_name("MODEL")
                    .global(true)
                    .action(clap::ArgAction::Set),
            )
            .arg(
                Arg::new("temp")
                    .short('t')
                    .long("temp")
                    .help("Sampling temperature, 0 to 2 (0 to 1 for Claude; default 0.5; not used by Gemini)")
                    .value_name("NUMBER")
                    .value_parser(parse_temperature)
                    .global(true)
                    .action(clap::ArgAction::Set),
            )
            .arg(
                Arg::new("system")
                    .short('s')
                    .long("system")
                    .help("System prompt sent with every request. Can be set via PARLEY_SYSTEM_PROMPT environment variable.")
                    .value_name("TEXT")
                    .global(true)
                    .action(clap::ArgAction::Set),
            )
            .arg(
                Arg::new("max-tokens")
                    .long("max-tokens")
                    .help("Maximum tokens in each Claude answer (default 1024)")
                    .value_name("N")
                    .value_parser(clap::value_parser!(u32).range(1..))
                    .global(true)
                    .action(clap::ArgAction::Set),
            )
            .arg(
                Arg::new("completions")
                    .long("completions")
                    .help("Generate shell completion script")
                    .value_name("SHELL")
                    .value_parser(["bash", "zsh", "fish", "powershell", "nushell"])
                    .action(clap::ArgAction::Set),
            );

        for kind in ProviderKind::ALL {
            cmd = cmd.subcommand(
                Command::new(kind.command_name()).about(format!("Use {}", kind.display_name())),
            );
        }

        cmd
    }

    fn handle_completions(shell: &str) {
        let mut cmd = Self::build_cli();
        let bin_name = "parley";

        match shell {
            "bash" => generate(shells::Bash, &mut cmd, bin_name, &mut std::io::stdout()),
            "zsh" => generate(shells::Zsh, &mut cmd, bin_name, &mut std::io::stdout()),
            "fish" => generate(shells::Fish, &mut cmd, bin_name, &mut std::io::stdout()),
            "powershell" => generate(
                shells::PowerShell,
                &mut cmd,
                bin_name,
                &mut std::io::stdout(),
            ),
            "nushell" => generate(Nushell, &mut cmd, bin_name, &mut std::io::stdout()),
            _ => eprintln!("Unsupported shell: {}", shell),
        }
    }
}

fn parse_temperature(value: &str) -> Result<f64, String> {
    let temperature: f64 = value
        .parse()
        .map_err(|_| format!("'{value}' is not a number"))?;
    if !(0.0..=MAX_TEMPERATURE).contains(&temperature) {
        return Err(format!(
            "temperature must be between 0 and {MAX_TEMPERATURE}, got {temperature}"
        ));
    }
    Ok(temperature)
}
