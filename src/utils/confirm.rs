use std::io::{self, BufRead, StdinLock, Stdout, Write};

use log::info;

pub const QUESTION: &str = "¿Seguro que deseas continuar? [S/N] ";

pub trait Confirm {
    /// Show `message` and return whether to go ahead.
    fn confirm(&mut self, message: &str) -> io::Result<bool>;
}

/// Answers yes without asking.
pub struct AutoConfirm;

impl Confirm for AutoConfirm {
    fn confirm(&mut self, message: &str) -> io::Result<bool> {
        info!("{}", message);
        info!("Auto-confirm is on, continuing");
        Ok(true)
    }
}

/// Ask on a terminal (or anything line based) until a valid answer is given.
pub struct Prompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Prompt { input, output }
    }
}

impl Prompt<StdinLock<'static>, Stdout> {
    pub fn stdio() -> Self {
        Prompt::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Confirm for Prompt<R, W> {
    fn confirm(&mut self, message: &str) -> io::Result<bool> {
        writeln!(self.output, "{}", message)?;
        writeln!(self.output)?;
        loop {
            write!(self.output, "{}", QUESTION)?;
            self.output.flush()?;
            let mut line = String::new();
            // closed input, nobody is there to say yes
            if self.input.read_line(&mut line)? == 0 {
                return Ok(false);
            }
            if let Some(answer) = parse_answer(&line) {
                return Ok(answer);
            }
        }
    }
}

/// Only "s" and "n" are accepted, in any case.
pub fn parse_answer(line: &str) -> Option<bool> {
    match line.trim().to_lowercase().as_str() {
        "s" => Some(true),
        "n" => Some(false),
        _ => None,
    }
}
