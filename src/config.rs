//! Start-up configuration
//!
//! Built once from CLI flags / environment (a `.env` file is honoured by the
//! binaries) and handed to the components that need it.

use crate::error::{AskError, Result};
use clap::Args;
use sqlx::mysql::MySqlConnectOptions;
use std::net::SocketAddr;
use std::time::Duration;

/// Stop sequence shared by both completions (Mistral end-of-sequence token).
pub const DEFAULT_STOP_SEQUENCE: &str = "</s>";

#[derive(Debug, Clone, Args)]
pub struct DatabaseConfig {
    /// MySQL host
    #[arg(long = "db-host", env = "DB_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// MySQL port
    #[arg(long = "db-port", env = "DB_PORT", default_value_t = 3306)]
    pub port: u16,

    /// Database name
    #[arg(long = "db-name", env = "DB_NAME", default_value = "sakila")]
    pub name: String,

    /// Database user
    #[arg(long = "db-user", env = "DB_USER", default_value = "root")]
    pub user: String,

    /// Database password
    #[arg(long = "db-password", env = "DB_PASSWORD", default_value = "", hide_env_values = true)]
    pub password: String,

    /// Upper bound for a single statement, in seconds
    #[arg(long, env = "QUERY_TIMEOUT_SECS", default_value_t = 30)]
    pub query_timeout_secs: u64,
}

impl DatabaseConfig {
    pub fn connect_options(&self) -> MySqlConnectOptions {
        let options = MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .database(&self.name);
        if self.password.is_empty() {
            options
        } else {
            options.password(&self.password)
        }
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

#[derive(Debug, Clone, Args)]
pub struct ModelConfig {
    /// Base URL of an OpenAI-compatible completion server (e.g. llama.cpp)
    #[arg(long = "llm-base-url", env = "LLM_BASE_URL", default_value = "http://127.0.0.1:8080/v1")]
    pub base_url: String,

    /// Model identifier sent with each completion request
    #[arg(long = "llm-model", env = "LLM_MODEL", default_value = "mistral-7b-instruct-v0.2.Q4_K_M.gguf")]
    pub model: String,

    /// Bearer token, if the completion server requires one
    #[arg(long = "llm-api-key", env = "LLM_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Context window of the loaded model, in tokens
    #[arg(long = "llm-context-window", env = "LLM_CONTEXT_WINDOW", default_value_t = 4096)]
    pub context_window: usize,

    /// Completions allowed in flight at once; 1 for a single-threaded engine
    #[arg(long = "llm-max-in-flight", env = "LLM_MAX_IN_FLIGHT", default_value_t = 1)]
    pub max_in_flight: usize,

    /// Upper bound for a single completion, in seconds
    #[arg(long = "llm-timeout-secs", env = "LLM_TIMEOUT_SECS", default_value_t = 120)]
    pub timeout_secs: u64,

    /// Token limit for the SQL generation call
    #[arg(long, env = "SQL_MAX_TOKENS", default_value_t = 512)]
    pub sql_max_tokens: usize,

    /// Token limit for the answer generation call
    #[arg(long, env = "ANSWER_MAX_TOKENS", default_value_t = 300)]
    pub answer_max_tokens: usize,
}

impl ModelConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Args)]
pub struct ServerConfig {
    /// Address the HTTP server binds to
    #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:8000")]
    pub bind_addr: SocketAddr,

    /// Origins allowed by CORS, comma separated
    #[arg(
        long,
        env = "CORS_ORIGINS",
        value_delimiter = ',',
        default_value = "http://localhost:3000,http://127.0.0.1:3000"
    )]
    pub cors_origins: Vec<String>,
}

/// Everything the pipeline needs to start.
#[derive(Debug, Clone, Args)]
pub struct AppConfig {
    #[command(flatten)]
    pub database: DatabaseConfig,

    #[command(flatten)]
    pub model: ModelConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        let model = &self.model;
        if model.max_in_flight == 0 {
            return Err(AskError::Config("llm-max-in-flight must be at least 1".to_string()));
        }
        for (flag, tokens) in [
            ("sql-max-tokens", model.sql_max_tokens),
            ("answer-max-tokens", model.answer_max_tokens),
        ] {
            if tokens == 0 {
                return Err(AskError::Config(format!("{} must be at least 1", flag)));
            }
            if tokens >= model.context_window {
                return Err(AskError::Config(format!(
                    "{} ({}) must be smaller than the context window ({})",
                    flag, tokens, model.context_window
                )));
            }
        }
        if model.base_url.trim().is_empty() {
            return Err(AskError::Config("llm-base-url must not be empty".to_string()));
        }
        Ok(())
    }
}
