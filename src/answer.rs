//! Answer Composer
//!
//! Second generation call of a request: turns the query result into prose.

use crate::error::Result;
use crate::execution::result::QueryResult;
use crate::llm::{GenerationClient, GenerationRequest};
use crate::prompt::build_answer_prompt;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct AnswerComposer {
    client: Arc<dyn GenerationClient>,
    max_tokens: usize,
    stop: Vec<String>,
}

impl AnswerComposer {
    pub fn new(client: Arc<dyn GenerationClient>, max_tokens: usize, stop: Vec<String>) -> Self {
        Self {
            client,
            max_tokens,
            stop,
        }
    }

    /// Execution failures are returned as the answer without calling the model.
    pub async fn compose_answer(&self, question: &str, result: &QueryResult) -> Result<String> {
        let table = match result {
            QueryResult::Failed(e) => {
                debug!("Skipping answer generation for failed query");
                return Ok(e.message.clone());
            }
            QueryResult::Table(table) => table,
        };

        let request = GenerationRequest::new(
            build_answer_prompt(question, table),
            self.max_tokens,
            &self.stop,
        );
        let answer = self.client.complete(&request).await?.trim().to_string();

        if answer.is_empty() {
            warn!("Model returned an empty answer");
            return Ok(format!("The query returned {} row(s).", table.row_count()));
        }
        Ok(answer)
    }
}
