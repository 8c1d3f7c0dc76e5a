//! Natural-language questions to SQL.
//!
//! The model is shown the two invoice tables and a handful of examples and
//! asked for one SQLite `SELECT`. Its reply is stripped of code fences and
//! run through [`Store::run_read_only`]; nothing it writes can reach a
//! read-write connection.

use crate::error::InvoiceError;
use crate::pipeline::llm::{GenerationRequest, TextGenerator};
use crate::prompts::nl_to_sql_prompt;
use crate::store::{QueryResult, Store};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

static RE_SQL_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)^```(?:sqlite|sql)?\s*\n?(.*?)\n?```\s*$").unwrap());

/// Remove a surrounding ```sql fence, if any, and trim.
pub fn strip_sql_fences(reply: &str) -> String {
    let trimmed = reply.trim();
    match RE_SQL_FENCE.captures(trimmed) {
        Some(caps) => caps[1].trim().to_string(),
        None => trimmed.to_string(),
    }
}

/// Ask the model for the SQL that answers `question`.
pub async fn generate_sql(
    generator: &dyn TextGenerator,
    question: &str,
) -> Result<String, InvoiceError> {
    if question.trim().is_empty() {
        return Err(InvoiceError::MissingField { field: "question" });
    }

    let reply = generator
        .generate(GenerationRequest {
            system: None,
            prompt: nl_to_sql_prompt(question),
            images: Vec::new(),
        })
        .await?;

    let sql = strip_sql_fences(&reply);
    if sql.is_empty() {
        return Err(InvoiceError::EmptyQuery);
    }
    debug!("Generated SQL: {}", sql);
    Ok(sql)
}

/// Generate SQL for `question` and run it read-only.
///
/// Returns the statement alongside its result so it can be shown to the user.
pub async fn run_nl_query(
    generator: &dyn TextGenerator,
    store: &Store,
    question: &str,
) -> Result<(String, QueryResult), InvoiceError> {
    let sql = generate_sql(generator, question).await?;
    let result = store.run_read_only(&sql)?;
    info!("Query returned {} row(s)", result.rows.len());
    Ok((sql, result))
}
