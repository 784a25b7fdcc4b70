//! Question-to-answer pipeline
//!
//! RECEIVED -> PROMPTED -> GENERATED_SQL -> {SANITIZED | REJECTED}
//!   -> {EXECUTED | EXEC_FAILED} -> ANSWERED
//!
//! A sentinel from the model ends the request right after SANITIZED. The two
//! generation calls are strictly sequential; nothing is shared between
//! requests except the schema and the model gate.

use crate::answer::AnswerComposer;
use crate::config::{AppConfig, ModelConfig, DEFAULT_STOP_SEQUENCE};
use crate::error::{AskError, Result};
use crate::execution::{MySqlExecutor, QueryExecutor, QueryResult};
use crate::inference::InferenceHandle;
use crate::llm::{GenerationClient, GenerationRequest, LlmClient};
use crate::prompt::build_sql_prompt;
use crate::sanitizer::{sanitize, CleanSql, Sanitized, NO_SQL_SENTINEL};
use crate::schema::SchemaDescriptor;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, info_span, trace, warn, Instrument};
use uuid::Uuid;

/// Shown instead of the sentinel when a question has nothing to do with the database.
pub const NO_SQL_MESSAGE: &str =
    "I can only answer questions about the sakila movie-rental database (films, actors, customers, rentals, payments, stores).";

// Same wording MySQL uses for an empty statement; no connection is opened for it.
const EMPTY_QUERY_DIAGNOSTIC: &str = "Query was empty";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStage {
    Received,
    Prompted,
    GeneratedSql,
    Sanitized,
    Rejected,
    NoSqlPossible,
    Executed,
    ExecFailed,
    Answered,
}

impl fmt::Display for RequestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RequestStage::Received => "RECEIVED",
            RequestStage::Prompted => "PROMPTED",
            RequestStage::GeneratedSql => "GENERATED_SQL",
            RequestStage::Sanitized => "SANITIZED",
            RequestStage::Rejected => "REJECTED",
            RequestStage::NoSqlPossible => "NO_SQL_QUERY_POSSIBLE",
            RequestStage::Executed => "EXECUTED",
            RequestStage::ExecFailed => "EXEC_FAILED",
            RequestStage::Answered => "ANSWERED",
        })
    }
}

fn enter(stage: RequestStage) {
    debug!(stage = %stage, "Request stage");
}

#[derive(Debug, Clone, PartialEq)]
pub enum AskOutcome {
    /// The statement ran (or failed in the store) and an answer was produced.
    Answered {
        sql: CleanSql,
        result: QueryResult,
        answer: String,
    },
    /// The question does not map to the schema; nothing was executed.
    NoSqlPossible { message: String },
}

impl AskOutcome {
    pub fn sql(&self) -> &str {
        match self {
            AskOutcome::Answered { sql, .. } => sql.as_str(),
            AskOutcome::NoSqlPossible { .. } => NO_SQL_SENTINEL,
        }
    }

    pub fn answer(&self) -> &str {
        match self {
            AskOutcome::Answered { answer, .. } => answer,
            AskOutcome::NoSqlPossible { message } => message,
        }
    }

    pub fn final_stage(&self) -> RequestStage {
        match self {
            AskOutcome::Answered { .. } => RequestStage::Answered,
            AskOutcome::NoSqlPossible { .. } => RequestStage::NoSqlPossible,
        }
    }
}

/// Token limits and stop sequences for the two completions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationSettings {
    pub sql_max_tokens: usize,
    pub answer_max_tokens: usize,
    pub stop: Vec<String>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            sql_max_tokens: 512,
            answer_max_tokens: 300,
            stop: vec![DEFAULT_STOP_SEQUENCE.to_string()],
        }
    }
}

impl From<&ModelConfig> for GenerationSettings {
    fn from(config: &ModelConfig) -> Self {
        Self {
            sql_max_tokens: config.sql_max_tokens,
            answer_max_tokens: config.answer_max_tokens,
            ..Self::default()
        }
    }
}

pub struct Assistant {
    schema: &'static SchemaDescriptor,
    generator: Arc<dyn GenerationClient>,
    executor: Arc<dyn QueryExecutor>,
    composer: AnswerComposer,
    settings: GenerationSettings,
}

impl Assistant {
    pub fn new(
        generator: Arc<dyn GenerationClient>,
        executor: Arc<dyn QueryExecutor>,
        settings: GenerationSettings,
    ) -> Self {
        let composer = AnswerComposer::new(
            generator.clone(),
            settings.answer_max_tokens,
            settings.stop.clone(),
        );
        Self {
            schema: SchemaDescriptor::sakila(),
            generator,
            executor,
            composer,
            settings,
        }
    }

    /// First generation call plus sanitization.
    pub async fn generate_sql(&self, question: &str) -> Result<Sanitized> {
        let prompt = build_sql_prompt(question, self.schema);
        enter(RequestStage::Prompted);
        trace!(%prompt, "SQL prompt");

        let request = GenerationRequest::new(prompt, self.settings.sql_max_tokens, &self.settings.stop);
        let raw = self.generator.complete(&request).await?;
        enter(RequestStage::GeneratedSql);
        debug!(raw = %raw, "Raw generation output");

        sanitize(&raw)
    }

    /// Run one question through the whole pipeline.
    ///
    /// Only generation failures and validation errors come back as `Err`;
    /// database failures are part of the outcome.
    pub async fn ask(&self, question: &str) -> Result<AskOutcome> {
        let span = info_span!("ask", request_id = %Uuid::new_v4());
        async move {
            enter(RequestStage::Received);
            info!(question, "Question received");

            let sql = match self.generate_sql(question).await {
                Ok(Sanitized::Sql(sql)) => sql,
                Ok(Sanitized::NoSqlPossible) => {
                    enter(RequestStage::Sanitized);
                    enter(RequestStage::NoSqlPossible);
                    info!("Question is unrelated to the schema");
                    return Ok(AskOutcome::NoSqlPossible {
                        message: NO_SQL_MESSAGE.to_string(),
                    });
                }
                Err(e) => {
                    if matches!(e, AskError::Validation(_)) {
                        enter(RequestStage::Rejected);
                        warn!("Generated SQL rejected: {}", e);
                    } else {
                        error!(kind = e.kind(), "SQL generation failed: {}", e);
                    }
                    return Err(e);
                }
            };
            enter(RequestStage::Sanitized);
            info!(sql = %sql, "Generated SQL");
            if self.schema.tables_mentioned(sql.as_str()).is_empty() {
                warn!("Generated SQL references no known table");
            }

            let result = if sql.as_str().is_empty() {
                QueryResult::failed(EMPTY_QUERY_DIAGNOSTIC)
            } else {
                self.executor.execute(sql.as_str()).await
            };
            match &result {
                QueryResult::Table(table) => {
                    enter(RequestStage::Executed);
                    debug!(executor = self.executor.name(), rows = table.row_count(), "Statement executed");
                }
                QueryResult::Failed(e) => {
                    enter(RequestStage::ExecFailed);
                    warn!(executor = self.executor.name(), "{}", e);
                }
            }

            let answer = self.composer.compose_answer(question, &result).await?;
            enter(RequestStage::Answered);

            Ok(AskOutcome::Answered { sql, result, answer })
        }
        .instrument(span)
        .await
    }
}

/// Wire the production components from configuration.
///
/// The returned handle owns the model lifecycle; call `init` to load eagerly
/// and `shutdown` on exit.
pub fn build_assistant(config: &AppConfig) -> Result<(Assistant, Arc<InferenceHandle>)> {
    config.validate()?;
    let client = LlmClient::new(&config.model)?;
    let model = Arc::new(InferenceHandle::new(Arc::new(client), config.model.max_in_flight));
    let executor = Arc::new(MySqlExecutor::from_config(&config.database));
    let assistant = Assistant::new(
        model.clone(),
        executor,
        GenerationSettings::from(&config.model),
    );
    Ok((assistant, model))
}
