use std::io::{BufRead, Write};

use anyhow::Result;

use crate::error::RaceError;

pub const PROMPT: &str = "Veuillez entrer le codex FIS de la course :";

/// Returns the trimmed codex, or `CodexRequired` when nothing usable was given.
pub fn validate_codex(value: &str) -> Result<&str, RaceError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(RaceError::CodexRequired);
    }
    Ok(value)
}

/// Asks for a codex until a non-empty answer is read.
///
/// Empty answers print the validation message and ask again. Running out of
/// input before a valid answer is a `CodexRequired` failure.
pub fn prompt_codex<R: BufRead, W: Write>(mut input: R, mut output: W) -> Result<String> {
    loop {
        write!(output, "? {} ", PROMPT)?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            writeln!(output)?;
            return Err(RaceError::CodexRequired.into());
        }

        match validate_codex(&line) {
            Ok(codex) => return Ok(codex.to_string()),
            Err(e) => writeln!(output, ">> {}", e)?,
        }
    }
}

/// Uses the `--codex` value when one was given, otherwise prompts on the terminal.
pub fn resolve_codex(flag: Option<String>) -> Result<String> {
    match flag {
        Some(codex) => Ok(validate_codex(&codex)?.to_string()),
        None => {
            let stdin = std::io::stdin();
            prompt_codex(stdin.lock(), std::io::stdout())
        }
    }
}
