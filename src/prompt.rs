//! Line-oriented yes/no questions for the operator.
//!
//! Only triage asks questions; the engine itself never blocks on input.

use std::io;

use async_trait::async_trait;
use colored::Colorize;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdin, stdin, stdout},
    sync::Mutex,
};

#[async_trait]
pub trait Prompt: Send + Sync {
    /// Asks `question` and waits for the answer. Only `y`/`yes` count as yes.
    async fn ask(&self, question: &str) -> io::Result<bool>;
}

/// Reads answers from standard input.
pub struct StdinPrompt {
    reader: Mutex<BufReader<Stdin>>,
}

impl StdinPrompt {
    pub fn new() -> Self {
        Self {
            reader: Mutex::new(BufReader::new(stdin())),
        }
    }
}

impl Default for StdinPrompt {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Prompt for StdinPrompt {
    async fn ask(&self, question: &str) -> io::Result<bool> {
        let mut out = stdout();
        out.write_all(format!("[{}] {} (y/n): ", "?".cyan().bold(), question).as_bytes())
            .await?;
        out.flush().await?;

        let mut line = String::new();
        let read = self.reader.lock().await.read_line(&mut line).await?;
        if read == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "stdin closed while waiting for an answer",
            ));
        }
        Ok(is_yes(&line))
    }
}

/// Whether an answer line means yes.
pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
