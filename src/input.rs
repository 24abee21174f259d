use anyhow::{Context, Result};
use async_trait::async_trait;
use crossterm::style::Stylize;
use crossterm::tty::IsTty;
use std::io::{self, BufRead, Write};
use tokio::sync::mpsc;

use crate::api_key::is_affirmative;
use crate::logging::{log_debug, log_trace};

/// Source of user decisions for the chat loop
#[async_trait]
pub trait Prompter: Send {
    /// Show `label` and read one line. `None` means the input was cancelled
    /// (end of input or Ctrl-C).
    async fn read_prompt(&mut self, label: &str) -> Result<Option<String>>;

    /// Ask a yes/no question. `None` means the question was cancelled.
    async fn confirm(&mut self, message: &str, default: bool) -> Result<Option<bool>>;
}

/// Where typed lines come from
#[async_trait]
pub trait LineSource: Send {
    /// Next line without its line ending, `None` once input is closed or cancelled
    async fn next_line(&mut self) -> Result<Option<String>>;
}

fn strip_line_ending(line: &str) -> String {
    line.trim_end_matches(['\n', '\r']).to_string()
}

/// Lines from any buffered reader
pub struct ReaderLines<R>(pub R);

#[async_trait]
impl<R: BufRead + Send> LineSource for ReaderLines<R> {
    async fn next_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        let read = self
            .0
            .read_line(&mut line)
            .context("Failed to read input")?;
        if read == 0 {
            log_debug("Input closed");
            return Ok(None);
        }
        Ok(Some(strip_line_ending(&line)))
    }
}

/// Stdin lines read on a background thread, so a pending read can be
/// abandoned when Ctrl-C arrives.
pub struct StdinLines {
    lines: mpsc::Receiver<io::Result<String>>,
}

impl StdinLines {
    pub fn spawn() -> Self {
        let (sender, receiver) = mpsc::channel(1);

        // Not joined: the thread may still be blocked on stdin when the
        // process exits.
        std::thread::spawn(move || {
            let stdin = io::stdin();
            loop {
                let mut line = String::new();
                let result = match stdin.lock().read_line(&mut line) {
                    Ok(0) => break,
                    Ok(_) => Ok(line),
                    Err(e) => Err(e),
                };
                let failed = result.is_err();
                if sender.blocking_send(result).is_err() || failed {
                    break;
                }
            }
        });

        Self::new(receiver)
    }

    fn new(lines: mpsc::Receiver<io::Result<String>>) -> Self {
        Self { lines }
    }
}

#[async_trait]
impl LineSource for StdinLines {
    async fn next_line(&mut self) -> Result<Option<String>> {
        tokio::select! {
            line = self.lines.recv() => match line {
                Some(Ok(line)) => Ok(Some(strip_line_ending(&line))),
                Some(Err(e)) => Err(e).context("Failed to read from stdin"),
                None => {
                    log_debug("Input closed");
                    Ok(None)
                }
            },
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl-C")?;
                log_debug("Input interrupted");
                Ok(None)
            }
        }
    }
}

/// Line-oriented prompter over a line source and a writer
pub struct LinePrompter<S, W> {
    lines: S,
    writer: W,
    styled: bool,
}

pub type TerminalPrompter = LinePrompter<StdinLines, io::Stdout>;

impl TerminalPrompter {
    pub fn stdio() -> Self {
        let styled = io::stdout().is_tty();
        LinePrompter::new(StdinLines::spawn(), io::stdout(), styled)
    }
}

impl<S: LineSource, W: Write + Send> LinePrompter<S, W> {
    pub fn new(lines: S, writer: W, styled: bool) -> Self {
        Self {
            lines,
            writer,
            styled,
        }
    }

    fn write_question(&mut self, text: &str) -> Result<()> {
        let written = if self.styled {
            write!(self.writer, "{} {} ", "?".green(), text.bold())
        } else {
            write!(self.writer, "? {} ", text)
        };
        written.context("Failed to write prompt")?;
        self.writer.flush().context("Failed to flush prompt")
    }
}

#[async_trait]
impl<S: LineSource, W: Write + Send> Prompter for LinePrompter<S, W> {
    async fn read_prompt(&mut self, label: &str) -> Result<Option<String>> {
        self.write_question(&format!("{label}:"))?;
        let line = self.lines.next_line().await?;
        if let Some(text) = &line {
            log_trace(&format!("Prompt input: {text}"));
        }
        Ok(line)
    }

    async fn confirm(&mut self, message: &str, default: bool) -> Result<Option<bool>> {
        let hint = if default { "(Y/n)" } else { "(y/N)" };
        self.write_question(&format!("{message} {hint}"))?;

        Ok(self.lines.next_line().await?.map(|answer| {
            if answer.trim().is_empty() {
                default
            } else {
                is_affirmative(&answer)
            }
        }))
    }
}
