mod common;

use common::{
    question_of, table, EchoExecutor, RecordingExecutor, ScriptedGenerator, SingleFlightGenerator,
};
use sakila_ask::error::AskError;
use sakila_ask::execution::QueryResult;
use sakila_ask::inference::InferenceHandle;
use sakila_ask::pipeline::{AskOutcome, Assistant, GenerationSettings, RequestStage, NO_SQL_MESSAGE};
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::Arc;

fn assistant(generator: Arc<ScriptedGenerator>, executor: Arc<RecordingExecutor>) -> Assistant {
    Assistant::new(generator, executor, GenerationSettings::default())
}

fn rated_pg() -> QueryResult {
    QueryResult::Table(table(
        &["title"],
        vec![json!({"title": "ACADEMY DINOSAUR"}), json!({"title": "AGENT TRUMAN"})],
    ))
}

#[tokio::test]
async fn test_answered_question() {
    let sql = "SELECT f.title FROM film AS f WHERE LOWER(f.rating) = LOWER('PG')";
    let generator = Arc::new(ScriptedGenerator::new(sql, "  Two films are rated PG.\n"));
    let executor = Arc::new(RecordingExecutor::new(rated_pg()));

    let outcome = assistant(generator.clone(), executor.clone())
        .ask("Which films are rated PG?")
        .await
        .unwrap();

    assert_eq!(outcome.sql(), sql);
    assert_eq!(outcome.answer(), "Two films are rated PG.");
    assert_eq!(outcome.final_stage(), RequestStage::Answered);
    assert_eq!(executor.statements(), vec![sql.to_string()]);

    let prompts = generator.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[0].contains("\"Which films are rated PG?\""));
    assert!(prompts[1].contains("| ACADEMY DINOSAUR |"));
    assert!(prompts[1].contains("| AGENT TRUMAN |"));
}

#[tokio::test]
async fn test_sentinel_skips_execution_and_answer() {
    let generator = Arc::new(ScriptedGenerator::new("NO_SQL_QUERY_POSSIBLE", "unused"));
    let executor = Arc::new(RecordingExecutor::new(rated_pg()));

    let outcome = assistant(generator.clone(), executor.clone())
        .ask("Hello, how are you?")
        .await
        .unwrap();

    assert_eq!(
        outcome,
        AskOutcome::NoSqlPossible {
            message: NO_SQL_MESSAGE.to_string()
        }
    );
    assert_eq!(outcome.sql(), "NO_SQL_QUERY_POSSIBLE");
    assert_eq!(executor.calls(), 0);
    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn test_or_select_is_rejected_before_execution() {
    let generator = Arc::new(ScriptedGenerator::new(
        "SELECT * FROM film WHERE film_id = 1\nor select * from actor",
        "unused",
    ));
    let executor = Arc::new(RecordingExecutor::new(rated_pg()));

    let err = assistant(generator.clone(), executor.clone())
        .ask("Show me film 1")
        .await
        .unwrap_err();

    assert!(matches!(err, AskError::Validation(_)));
    assert!(err.to_string().contains("multiple candidate statements detected"));
    assert_eq!(executor.calls(), 0);
    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn test_commentary_is_stripped_before_execution() {
    let generator = Arc::new(ScriptedGenerator::new(
        "Explanation: here is the query\nSELECT * FROM actor",
        "There are many actors.",
    ));
    let executor = Arc::new(RecordingExecutor::new(QueryResult::Table(table(
        &["actor_id"],
        vec![json!({"actor_id": 1})],
    ))));

    let outcome = assistant(generator, executor.clone())
        .ask("List all actors")
        .await
        .unwrap();

    assert_eq!(outcome.sql(), "SELECT * FROM actor");
    assert_eq!(executor.statements(), vec!["SELECT * FROM actor".to_string()]);
}

#[tokio::test]
async fn test_execution_error_becomes_the_answer() {
    let generator = Arc::new(ScriptedGenerator::new("SELEC * FROM film", "unused"));
    let diagnostic = "error returned from database: 1064 (42000): You have an error in your SQL syntax";
    let executor = Arc::new(RecordingExecutor::new(QueryResult::failed(diagnostic)));

    let outcome = assistant(generator.clone(), executor.clone())
        .ask("List every film")
        .await
        .unwrap();

    match &outcome {
        AskOutcome::Answered { result, answer, .. } => {
            assert!(result.is_failed());
            assert!(answer.contains(diagnostic));
            assert_eq!(answer, &format!("SQL Error: {}", diagnostic));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(generator.calls(), 1);
    assert_eq!(executor.calls(), 1);
}

#[tokio::test]
async fn test_commentary_only_output_fails_softly_without_touching_the_store() {
    let generator = Arc::new(ScriptedGenerator::new("Explanation: I am not sure\n```", "unused"));
    let executor = Arc::new(RecordingExecutor::new(rated_pg()));

    let outcome = assistant(generator.clone(), executor.clone())
        .ask("Which films are popular?")
        .await
        .unwrap();

    assert_eq!(outcome.sql(), "");
    assert_eq!(outcome.answer(), "SQL Error: Query was empty");
    assert_eq!(outcome.final_stage(), RequestStage::Answered);
    assert_eq!(generator.calls(), 1);
    assert_eq!(executor.calls(), 0);
}

#[tokio::test]
async fn test_zero_rows_still_produce_an_answer() {
    let generator = Arc::new(ScriptedGenerator::new(
        "SELECT f.title FROM film AS f WHERE LOWER(f.rating) = LOWER('XXX')",
        "No films have that rating.",
    ));
    let executor = Arc::new(RecordingExecutor::new(QueryResult::Table(table(&["title"], vec![]))));

    let outcome = assistant(generator.clone(), executor)
        .ask("Which films are rated XXX?")
        .await
        .unwrap();

    assert_eq!(outcome.answer(), "No films have that rating.");
    assert_eq!(generator.calls(), 2);
    let answer_prompt = &generator.prompts()[1];
    assert!(answer_prompt.contains("Data:\n| title |\n| --- |\n\n"));
}

#[tokio::test]
async fn test_blank_answer_falls_back_to_row_count() {
    let generator = Arc::new(ScriptedGenerator::new("SELECT a.first_name FROM actor AS a", "   "));
    let executor = Arc::new(RecordingExecutor::new(QueryResult::Table(table(&["first_name"], vec![]))));

    let outcome = assistant(generator, executor).ask("Actors?").await.unwrap();

    assert_eq!(outcome.answer(), "The query returned 0 row(s).");
}

#[tokio::test]
async fn test_generation_failure_interrupts_the_pipeline() {
    let generator = Arc::new(ScriptedGenerator::failing("model unavailable"));
    let executor = Arc::new(RecordingExecutor::new(rated_pg()));

    let err = assistant(generator, executor.clone())
        .ask("Which films are rated PG?")
        .await
        .unwrap_err();

    assert!(matches!(err, AskError::Generation(ref m) if m == "model unavailable"));
    assert_eq!(executor.calls(), 0);
}

#[tokio::test]
async fn test_concurrent_requests_share_one_engine_without_mixing() {
    let engine = Arc::new(SingleFlightGenerator::new());
    let model = Arc::new(InferenceHandle::new(engine.clone(), 1));
    let assistant = Arc::new(Assistant::new(
        model,
        Arc::new(EchoExecutor),
        GenerationSettings::default(),
    ));

    let questions = ["films starring Penelope", "customers living in Canada"];
    let handles: Vec<_> = questions
        .iter()
        .map(|q| {
            let assistant = assistant.clone();
            let q = q.to_string();
            tokio::spawn(async move { (q.clone(), assistant.ask(&q).await) })
        })
        .collect();

    for handle in handles {
        let (question, outcome) = handle.await.unwrap();
        let outcome = outcome.unwrap();
        assert_eq!(
            outcome.sql(),
            format!("SELECT '{}' AS question FROM film", question)
        );
        assert_eq!(outcome.answer(), format!("answer to {}", question));
    }
    assert_eq!(engine.overlaps.load(Ordering::SeqCst), 0);
    assert_eq!(engine.calls.load(Ordering::SeqCst), 4);
}

#[test]
fn test_question_extraction_helper() {
    let prompt = sakila_ask::prompt::build_sql_prompt("a \"quoted\" question", sakila_ask::schema::SchemaDescriptor::sakila());
    assert_eq!(question_of(&prompt), "a \"quoted\" question");
}
