//! Operator confirmation channel

use crate::error::{TransferError, TransferResult};
use crate::transfer::TransferSummary;

use async_trait::async_trait;
use std::io::{self, BufRead, Write};

/// Yes/no gate shown once before the first submission
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Confirmation: Send + Sync {
    async fn confirm(&self, summary: &TransferSummary) -> TransferResult<bool>;
}

/// Prints the summary to stdout and reads the answer from stdin; defaults to no
pub struct StdinConfirmation;

#[async_trait]
impl Confirmation for StdinConfirmation {
    async fn confirm(&self, summary: &TransferSummary) -> TransferResult<bool> {
        let summary = summary.clone();
        tokio::task::spawn_blocking(move || ask(&summary))
            .await
            .map_err(|e| TransferError::Prompt(format!("prompt task failed: {}", e)))?
    }
}

fn ask(summary: &TransferSummary) -> TransferResult<bool> {
    let mut stdout = io::stdout().lock();
    write!(stdout, "\n{}\nConfirm transfer [y/N]: ", summary)
        .and_then(|_| stdout.flush())
        .map_err(|e| TransferError::Prompt(e.to_string()))?;

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .map_err(|e| TransferError::Prompt(e.to_string()))?;

    Ok(parse_answer(&answer))
}

fn parse_answer(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_answer() {
        assert!(parse_answer("y\n"));
        assert!(parse_answer(" Yes "));
        assert!(!parse_answer("\n"));
        assert!(!parse_answer("nope"));
    }
}
