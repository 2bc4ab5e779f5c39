//! # SQL Validator Plugin
//!
//! Built-in validator plugin that checks SQL statements for gross
//! syntactic problems: the input must be a non-empty string, open with a
//! known statement keyword, and carry balanced quotes and parentheses.
//! No SQL dialect parsing is attempted.

use plugman_core::config::PluginConfig;
use plugman_core::registry::{PluginRegistry, RegistryError};
use plugman_core::traits::{Plugin, PluginContext, PluginError, ValidatorPlugin};
use serde_json::Value;

/// Entry point this plugin registers under; manifests name it in their
/// `entry_point` field.
pub const ENTRY_POINT: &str = "sql_validator.SqlValidatorPlugin";

/// Keywords a statement may legally open with.
const STATEMENT_KEYWORDS: &[&str] = &[
    "SELECT", "INSERT", "UPDATE", "DELETE", "CREATE", "DROP", "ALTER", "TRUNCATE", "WITH",
    "EXPLAIN", "GRANT", "REVOKE", "MERGE", "BEGIN", "COMMIT", "ROLLBACK",
];

/// Validates SQL statement syntax.
#[derive(Debug, Default)]
pub struct SqlValidatorPlugin {
    errors: Vec<String>,
}

impl SqlValidatorPlugin {
    pub fn new() -> Self {
        SqlValidatorPlugin::default()
    }

    fn check_statement(&mut self, sql: &str) -> bool {
        let first_word = sql
            .split_whitespace()
            .next()
            .unwrap_or("")
            .to_ascii_uppercase();
        if !STATEMENT_KEYWORDS.contains(&first_word.as_str()) {
            self.errors
                .push(format!("Statement starts with unknown keyword '{first_word}'"));
            return false;
        }

        // Scan quote-aware so parentheses inside string literals don't
        // count. A doubled quote inside a literal is the literal's own
        // escape and keeps the literal open.
        let mut depth: i64 = 0;
        let mut in_string: Option<char> = None;
        let mut chars = sql.chars().peekable();
        while let Some(ch) = chars.next() {
            match in_string {
                Some(quote) if ch == quote => {
                    if chars.peek() == Some(&quote) {
                        chars.next();
                    } else {
                        in_string = None;
                    }
                }
                Some(_) => {}
                None => match ch {
                    '\'' | '"' => in_string = Some(ch),
                    '(' => depth += 1,
                    ')' => {
                        depth -= 1;
                        if depth < 0 {
                            self.errors.push("Unmatched closing parenthesis".to_string());
                            return false;
                        }
                    }
                    _ => {}
                },
            }
        }

        if let Some(quote) = in_string {
            self.errors.push(format!("Unterminated {quote} quoted string"));
            return false;
        }
        if depth > 0 {
            self.errors.push(format!("{depth} unclosed parenthesis(es)"));
            return false;
        }
        true
    }
}

impl Plugin for SqlValidatorPlugin {
    fn initialize(&mut self, _config: &PluginConfig) -> Result<(), PluginError> {
        log::debug!("SQL validator initialized");
        Ok(())
    }

    fn validate(&self) -> Result<(), PluginError> {
        Ok(())
    }

    fn execute(&mut self, context: &PluginContext) -> Result<Value, PluginError> {
        let sql = context.get("sql").cloned().unwrap_or(Value::Null);
        Ok(Value::Bool(self.validate_input(&sql)))
    }
}

impl ValidatorPlugin for SqlValidatorPlugin {
    fn validate_input(&mut self, input: &Value) -> bool {
        self.errors.clear();

        let Some(sql) = input.as_str() else {
            self.errors.push("Input must be a string".to_string());
            return false;
        };
        if sql.trim().is_empty() {
            self.errors.push("SQL string is empty".to_string());
            return false;
        }

        self.check_statement(sql)
    }

    fn validation_errors(&self) -> &[String] {
        &self.errors
    }
}

/// Registers this plugin's factory under [`ENTRY_POINT`].
pub fn register(registry: &mut PluginRegistry) -> Result<(), RegistryError> {
    registry.register_validator(ENTRY_POINT, |_| Ok(Box::new(SqlValidatorPlugin::new())))
}
