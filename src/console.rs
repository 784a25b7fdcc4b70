//! Console front end
//!
//! Reads one question per line until `exit` (any case) or end of input.

use crate::error::Result;
use crate::execution::QueryResult;
use crate::pipeline::{AskOutcome, Assistant};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::error;

const BANNER: &str = "🎧 Welcome to the Sakila AI Database Assistant (Console Mode)\n";
const PROMPT: &str = "Ask a question (or type 'exit'): ";

pub async fn run_console<R, W>(assistant: &Assistant, input: R, mut output: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    output.write_all(BANNER.as_bytes()).await?;
    let mut lines = input.lines();

    loop {
        output.write_all(PROMPT.as_bytes()).await?;
        output.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.eq_ignore_ascii_case("exit") {
            break;
        }
        if question.is_empty() {
            continue;
        }

        let text = match assistant.ask(question).await {
            Ok(outcome) => render_outcome(&outcome),
            Err(e) => {
                error!(kind = e.kind(), "Question failed: {}", e);
                format!("\n❌ {}\n\n", e)
            }
        };
        output.write_all(text.as_bytes()).await?;
    }

    output.flush().await?;
    Ok(())
}

fn render_outcome(outcome: &AskOutcome) -> String {
    match outcome {
        AskOutcome::NoSqlPossible { message } => format!("\n🤖 {}\n\n", message),
        AskOutcome::Answered { sql, result, answer } => {
            let mut text = format!("\n🔍 SQL Query:\n{}\n\n", sql);
            match result {
                // The answer is the error text itself; print it once.
                QueryResult::Failed(e) => text.push_str(&format!("{}\n\n", e)),
                QueryResult::Table(table) => {
                    text.push_str(&format!("📊 Query Result:\n{}\n", table.to_plain_text()));
                    text.push_str(&format!("\n🤖 AI Answer:\n{}\n\n", answer));
                }
            }
            text
        }
    }
}
