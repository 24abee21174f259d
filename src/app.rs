use anyhow::{Context, Result};
use std::io::Write;

use crate::cli::Config;
use crate::clipboard::{ClipboardManager, ClipboardSink};
use crate::conversation::Transcript;
use crate::input::{Prompter, TerminalPrompter};
use crate::logging::{log_debug, log_info, log_warn};
use crate::output::Console;
use crate::provider::{AiProvider, ProviderConfig, ProviderFactory, exchange};

const NO_PROMPT_MESSAGE: &str = "No prompt provided!";
const COPY_QUESTION: &str = "copy?";
const COPIED_MESSAGE: &str = "copied!";

/// Where the loop currently is
#[derive(Debug, Clone, PartialEq, Eq)]
enum ChatState {
    AwaitingInput,
    Dispatching(String),
    AwaitingCopyDecision(String),
    Terminated(EndReason),
}

/// Why a session ended normally
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    Cancelled,
    EmptyPrompt,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub exchanges: usize,
    pub end_reason: EndReason,
}

/// One interactive run: owns the transcript and drives the
/// prompt → answer → copy cycle until the user stops.
pub struct ChatSession<P, C, W> {
    provider: Box<dyn AiProvider>,
    prompter: P,
    clipboard: C,
    console: Console<W>,
    label: String,
    transcript: Transcript,
}

impl<P: Prompter, C: ClipboardSink, W: Write> ChatSession<P, C, W> {
    pub fn new(
        provider: Box<dyn AiProvider>,
        label: String,
        prompter: P,
        clipboard: C,
        console: Console<W>,
    ) -> Self {
        Self {
            provider,
            prompter,
            clipboard,
            console,
            label,
            transcript: Transcript::new(),
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Run until the input is cancelled or empty. Provider failures and Ctrl-C
    /// during a request end the session with an error; clipboard failures are
    /// reported and skipped.
    pub async fn run(&mut self) -> Result<SessionSummary> {
        let mut state = ChatState::AwaitingInput;
        let mut exchanges = 0;

        loop {
            state = match state {
                ChatState::AwaitingInput => self.await_input().await?,
                ChatState::Dispatching(prompt) => {
                    let provider_name = self.provider.provider_name();
                    let response = tokio::select! {
                        result = exchange(self.provider.as_mut(), &mut self.transcript, &prompt) => result?,
                        signal = tokio::signal::ctrl_c() => {
                            signal.context("Failed to listen for Ctrl-C")?;
                            anyhow::bail!("Interrupted while waiting for {provider_name}");
                        }
                    };
                    exchanges += 1;
                    self.console.answer(&response.content)?;
                    log_debug(&format!(
                        "Exchange {} complete, transcript has {} turn(s), usage {}",
                        exchanges,
                        self.transcript.len(),
                        response.usage.format_short()
                    ));
                    ChatState::AwaitingCopyDecision(response.content)
                }
                ChatState::AwaitingCopyDecision(response) => {
                    self.offer_copy(&response).await?;
                    ChatState::AwaitingInput
                }
                ChatState::Terminated(end_reason) => {
                    log_info(&format!(
                        "Chat session ended ({end_reason:?}) after {exchanges} exchange(s)"
                    ));
                    return Ok(SessionSummary {
                        exchanges,
                        end_reason,
                    });
                }
            };
        }
    }

    async fn await_input(&mut self) -> Result<ChatState> {
        match self.prompter.read_prompt(&self.label).await? {
            None => Ok(ChatState::Terminated(EndReason::Cancelled)),
            Some(prompt) if prompt.trim().is_empty() => {
                self.console.warning(NO_PROMPT_MESSAGE)?;
                Ok(ChatState::Terminated(EndReason::EmptyPrompt))
            }
            Some(prompt) => Ok(ChatState::Dispatching(prompt)),
        }
    }

    async fn offer_copy(&mut self, response: &str) -> Result<()> {
        let copy = match self.prompter.confirm(COPY_QUESTION, false).await {
            Ok(Some(answer)) => answer,
            Ok(None) => {
                log_debug("Copy confirmation cancelled");
                false
            }
            Err(e) => {
                log_warn(&format!("Copy confirmation failed: {e:#}"));
                self.console.warning(&format!("Error: {e:#}"))?;
                false
            }
        };

        if !copy {
            return Ok(());
        }

        match self.clipboard.set_text(response) {
            Ok(()) => self.console.success(COPIED_MESSAGE),
            Err(e) => {
                log_warn(&format!("Clipboard write failed: {e:#}"));
                self.console.warning(&format!("Error: {e:#}"))
            }
        }
    }
}

/// Build the selected provider from the environment and run a terminal session
pub async fn run_app(config: Config) -> Result<()> {
    let options = config.invocation_options();
    let api_key = crate::api_key::get_api_key(config.provider)?;
    let label = config.provider.prompt_label(&options.model);

    let provider = ProviderFactory::create_provider(ProviderConfig {
        kind: config.provider,
        options,
        api_key,
    })
    .context("Failed to initialize AI provider")?;

    log_info(&format!(
        "Starting chat with {} using model: {}",
        provider.provider_name(),
        provider.model_name()
    ));

    let mut session = ChatSession::new(
        provider,
        label,
        TerminalPrompter::stdio(),
        ClipboardManager::new(),
        Console::stdout(),
    );

    let summary = session.run().await?;
    if session.transcript().is_empty() {
        log_debug("Session ended before any prompt was sent");
    }
    log_info(&format!(
        "Completed {} exchange(s), {} turn(s) in transcript, ended by {:?}",
        summary.exchanges,
        session.transcript().len(),
        summary.end_reason
    ));
    Ok(())
}
