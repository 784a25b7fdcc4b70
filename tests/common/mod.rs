#![allow(dead_code)]

use async_trait::async_trait;
use sakila_ask::error::{AskError, Result};
use sakila_ask::execution::{QueryExecutor, QueryResult, ResultTable, Row};
use sakila_ask::llm::{GenerationClient, GenerationRequest};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub fn is_sql_prompt(prompt: &str) -> bool {
    prompt.contains("expert SQL generator")
}

/// Question quoted at the end of the SQL prompt, or the `Question:` line of the answer prompt.
pub fn question_of(prompt: &str) -> String {
    if is_sql_prompt(prompt) {
        let tail = prompt.rsplit("### USER QUESTION:\n\"").next().unwrap_or_default();
        tail.trim_end().trim_end_matches('"').to_string()
    } else {
        prompt
            .lines()
            .find_map(|l| l.strip_prefix("Question: "))
            .unwrap_or_default()
            .to_string()
    }
}

/// Returns a fixed SQL completion and a fixed answer completion.
pub struct ScriptedGenerator {
    sql: std::result::Result<String, String>,
    answer: String,
    pub calls: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(sql: &str, answer: &str) -> Self {
        Self {
            sql: Ok(sql.to_string()),
            answer: answer.to_string(),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            sql: Err(message.to_string()),
            ..Self::new("", "")
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationClient for ScriptedGenerator {
    async fn complete(&self, request: &GenerationRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(request.prompt.clone());
        if is_sql_prompt(&request.prompt) {
            self.sql.clone().map_err(AskError::Generation)
        } else {
            Ok(self.answer.clone())
        }
    }
}

/// Returns a canned result and remembers every statement it was given.
pub struct RecordingExecutor {
    result: QueryResult,
    pub statements: Mutex<Vec<String>>,
}

impl RecordingExecutor {
    pub fn new(result: QueryResult) -> Self {
        Self {
            result,
            statements: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.statements.lock().unwrap().len()
    }

    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryExecutor for RecordingExecutor {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn execute(&self, sql: &str) -> QueryResult {
        self.statements.lock().unwrap().push(sql.to_string());
        self.result.clone()
    }
}

/// Fails if two completions ever overlap. Its output echoes the question so
/// mixed-up responses are detectable.
pub struct SingleFlightGenerator {
    in_flight: AtomicBool,
    pub overlaps: AtomicUsize,
    pub calls: AtomicUsize,
}

impl SingleFlightGenerator {
    pub fn new() -> Self {
        Self {
            in_flight: AtomicBool::new(false),
            overlaps: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl GenerationClient for SingleFlightGenerator {
    async fn complete(&self, request: &GenerationRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.in_flight.swap(true, Ordering::SeqCst) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
            return Err(AskError::Generation("engine busy".to_string()));
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
        let question = question_of(&request.prompt);
        let text = if is_sql_prompt(&request.prompt) {
            format!("SELECT '{}' AS question FROM film", question)
        } else {
            format!("answer to {}", question)
        };
        self.in_flight.store(false, Ordering::SeqCst);
        Ok(text)
    }
}

/// Returns the statement it received as a one-row table.
pub struct EchoExecutor;

#[async_trait]
impl QueryExecutor for EchoExecutor {
    fn name(&self) -> &'static str {
        "echo"
    }

    async fn execute(&self, sql: &str) -> QueryResult {
        let mut row = Row::new();
        row.insert("sql".to_string(), sql.into());
        QueryResult::Table(ResultTable::new(vec!["sql".to_string()], vec![row]))
    }
}

pub fn table(columns: &[&str], rows: Vec<serde_json::Value>) -> ResultTable {
    ResultTable::new(
        columns.iter().map(|c| c.to_string()).collect(),
        rows.into_iter()
            .map(|v| v.as_object().cloned().expect("row must be an object"))
            .collect(),
    )
}
