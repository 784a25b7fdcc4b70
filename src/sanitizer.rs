//! SQL Sanitizer
//!
//! Textual filter between the model and the database. It strips leaked
//! commentary and markdown fences, then rejects output that hedges between
//! several candidate queries. It does not parse SQL: grammar errors surface
//! later as execution errors.

use crate::error::{AskError, Result};
use std::fmt;

/// Literal token the model emits when no query applies to the question.
pub const NO_SQL_SENTINEL: &str = "NO_SQL_QUERY_POSSIBLE";

/// Lines starting with these (trimmed, lowercased) are meta-commentary.
const RESERVED_PREFIXES: [&str; 4] = ["translation", "explanation", "answer", "sql"];

const CODE_FENCE: &str = "```";

// Known hedging markers. A string literal containing "option" is also
// rejected; that false positive is accepted.
const FORBIDDEN_MARKERS: [&str; 2] = ["OR SELECT", "OPTION"];

/// A single statement that passed sanitization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanSql(String);

impl CleanSql {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for CleanSql {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CleanSql {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sanitized {
    /// Statement ready for execution.
    Sql(CleanSql),
    /// The model signalled that the question is unrelated to the schema.
    NoSqlPossible,
}

fn is_commentary(line: &str) -> bool {
    let trimmed = line.trim();
    let folded = trimmed.to_lowercase();
    RESERVED_PREFIXES.iter().any(|p| folded.starts_with(p)) || trimmed.starts_with(CODE_FENCE)
}

/// Turn raw model output into a statement, the no-SQL signal, or a rejection.
///
/// Output that is only commentary yields an empty statement; the store
/// reports that like any other bad query.
///
/// Idempotent: sanitizing the text of a `CleanSql` yields the same `CleanSql`.
pub fn sanitize(raw: &str) -> Result<Sanitized> {
    // A bare carriage return also ends a line.
    let cleaned = raw
        .lines()
        .flat_map(|line| line.split('\r'))
        .filter(|line| !is_commentary(line))
        .collect::<Vec<_>>()
        .join("\n");
    let cleaned = cleaned.trim();

    let folded = cleaned.to_uppercase();
    if FORBIDDEN_MARKERS.iter().any(|m| folded.contains(m)) {
        return Err(AskError::Validation(
            "multiple candidate statements detected".to_string(),
        ));
    }

    if cleaned == NO_SQL_SENTINEL {
        return Ok(Sanitized::NoSqlPossible);
    }

    Ok(Sanitized::Sql(CleanSql(cleaned.to_string())))
}
