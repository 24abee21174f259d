use anyhow::{Context, Result};
use crossterm::style::Stylize;
use crossterm::tty::IsTty;
use std::io::{self, Write};

/// Wrap each line on its own so lists and code keep their line structure;
/// continuation lines reuse the line's leading indentation.
fn wrap_text(text: &str, width: usize) -> String {
    text.lines()
        .map(|line| {
            let indent_len = line.len() - line.trim_start().len();
            let indent = &line[..indent_len];
            let options = textwrap::Options::new(width).subsequent_indent(indent);
            textwrap::fill(line, &options)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Colored, width-aware printing for the chat loop
pub struct Console<W> {
    writer: W,
    styled: bool,
    wrap_width: Option<usize>,
}

impl Console<io::Stdout> {
    /// Colors and wrapping are only used when stdout is a terminal
    pub fn stdout() -> Self {
        let stdout = io::stdout();
        let is_tty = stdout.is_tty();
        let wrap_width = if is_tty {
            crossterm::terminal::size()
                .ok()
                .map(|(cols, _)| usize::from(cols))
                .filter(|cols| *cols > 20)
        } else {
            None
        };
        Console::new(stdout, is_tty, wrap_width)
    }
}

impl<W: Write> Console<W> {
    pub fn new(writer: W, styled: bool, wrap_width: Option<usize>) -> Self {
        Self {
            writer,
            styled,
            wrap_width,
        }
    }

    #[cfg(test)]
    pub fn writer(&self) -> &W {
        &self.writer
    }

    /// Model answer, green
    pub fn answer(&mut self, text: &str) -> Result<()> {
        let text = match self.wrap_width {
            Some(width) => wrap_text(text, width),
            None => text.to_string(),
        };
        if self.styled {
            self.line(&text.green().to_string())
        } else {
            self.line(&text)
        }
    }

    /// Confirmation of a completed side effect, green
    pub fn success(&mut self, text: &str) -> Result<()> {
        if self.styled {
            self.line(&text.green().to_string())
        } else {
            self.line(text)
        }
    }

    /// Problems the loop recovers from, red
    pub fn warning(&mut self, text: &str) -> Result<()> {
        if self.styled {
            self.line(&text.red().to_string())
        } else {
            self.line(text)
        }
    }

    fn line(&mut self, text: &str) -> Result<()> {
        writeln!(self.writer, "{text}").context("Failed to write to stdout")?;
        self.writer.flush().context("Failed to flush stdout")
    }
}

/// Print a fatal error on stderr
pub fn print_error(message: &str) {
    if io::stderr().is_tty() {
        eprintln!("{}", message.red());
    } else {
        eprintln!("{message}");
    }
}
