//! Prompt Builder
//!
//! Both prompts are pure functions of their inputs. The SQL rule list is what
//! keeps the model from answering with several statements or with prose.

use crate::execution::result::ResultTable;
use crate::sanitizer::NO_SQL_SENTINEL;
use crate::schema::SchemaDescriptor;

const SQL_RULES: &[&str] = &[
    "DO NOT include explanations, translations, markdown, or any labels like 'Answer:'.",
    "Use table aliases (e.g., film AS f, category AS c, film_category AS fc, actor AS a, film_actor AS fa).",
    "Use ONLY tables and columns from the schema below.",
    "Do NOT output explanations, markdown, or comments. Only the SQL query.",
    "All string comparisons must be case-insensitive (use LOWER()).",
    "If a column exists in multiple tables, specify the table alias.",
    "If you use category data (like c.name), you MUST JOIN: film -> film_category -> category.",
    "If you use actor data, you MUST JOIN: actor -> film_actor -> film.",
    "For customer addresses, JOIN: customer -> address -> city.",
    "For inventory, JOIN: film -> inventory.",
    "Generate ONE single SQL query that answers the question.",
    "Do NOT generate multiple options or alternatives.",
    "Do NOT use UNION unless explicitly required by the question.",
    "Do NOT output \"OR SELECT\", \"Option 1\", \"Option 2\" or any alternatives.",
];

/// Prompt asking for exactly one SQL statement answering `question`.
pub fn build_sql_prompt(question: &str, schema: &SchemaDescriptor) -> String {
    let rules: String = SQL_RULES.iter().map(|r| format!("- {}\n", r)).collect();

    format!(
        r#"
You are an expert SQL generator for the {database} MySQL database.

### TASK:
Generate ONLY one syntactically correct SQL query for the user's question.

### RULES:
{rules}- If the user's question is unrelated to the {database} database (e.g., greetings, thanks, nonsense), respond with exactly:
{sentinel}

### SCHEMA:

{schema}
### USER QUESTION:
"{question}"
"#,
        database = capitalize(schema.database),
        rules = rules,
        sentinel = NO_SQL_SENTINEL,
        schema = schema.render(),
        question = question,
    )
}

/// Prompt asking for a natural-language answer grounded in `table`.
pub fn build_answer_prompt(question: &str, table: &ResultTable) -> String {
    format!(
        r#"
You are a helpful assistant. Answer the user's question using the following data.
If the data has no rows, say that no matching records were found.

Question: {question}

Data:
{data}

Answer in natural language:
"#,
        question = question,
        data = table.to_markdown(),
    )
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
