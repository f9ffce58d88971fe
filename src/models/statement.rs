use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::api::middleware::AppError;

static FUNCTION_DDL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^(create|drop)(\s+temporary)?\s+(function|macro).+$")
        .expect("function DDL pattern is valid")
});

static FUNCTION_COMMAND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)^\s*(create|drop)(\s+temporary)?\s+(function|macro)\s+(if\s+(?:not\s+)?exists\s+)?([^\s(;]+)(.*?)[\s;]*$",
    )
    .expect("function command pattern is valid")
});

/// Routing class of a submitted statement
///
/// Derived from the trimmed, lower-cased text only. `set` and `show` are
/// prefix checks, so a statement such as `settle ...` or one whose leading
/// comment starts with those words lands in the wrong branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandClassification {
    FunctionOrMacroDdl,
    SetStatement,
    ShowQuery,
    GenericStatement,
}

impl CommandClassification {
    pub fn classify(statement: &str) -> Self {
        let normalized = statement.to_lowercase();
        let normalized = normalized.trim();

        if FUNCTION_DDL.is_match(normalized) {
            CommandClassification::FunctionOrMacroDdl
        } else if normalized.starts_with("set") {
            CommandClassification::SetStatement
        } else if normalized.starts_with("show") {
            CommandClassification::ShowQuery
        } else {
            CommandClassification::GenericStatement
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CommandClassification::FunctionOrMacroDdl => "function_or_macro_ddl",
            CommandClassification::SetStatement => "set_statement",
            CommandClassification::ShowQuery => "show_query",
            CommandClassification::GenericStatement => "generic_statement",
        }
    }
}

/// Parsed form of a `SET` statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetCommand {
    /// `SET` or `SET -v`
    ListAll,
    /// `SET key`
    Get(String),
    /// `SET key=value`
    Assign { key: String, value: String },
}

impl SetCommand {
    pub fn parse(statement: &str) -> Result<Self, AppError> {
        let trimmed = statement.trim().trim_end_matches(';').trim_end();
        if !is_set_statement(trimmed) {
            return Err(AppError::InvalidSql(format!("Not a SET statement: {}", statement)));
        }

        let rest = trimmed[3..].trim();
        if rest.is_empty() || rest == "-v" {
            return Ok(SetCommand::ListAll);
        }

        match rest.split_once('=') {
            Some((key, value)) => {
                let key = key.trim();
                if key.is_empty() {
                    return Err(AppError::InvalidSql(format!(
                        "SET is missing a key: {}",
                        statement
                    )));
                }
                Ok(SetCommand::Assign {
                    key: key.to_string(),
                    value: unquote(value.trim()).to_string(),
                })
            }
            None => Ok(SetCommand::Get(rest.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RoutineKind {
    Function,
    Macro,
}

impl RoutineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoutineKind::Function => "function",
            RoutineKind::Macro => "macro",
        }
    }
}

/// Parsed form of a function or macro DDL statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FunctionCommand {
    /// `CREATE [TEMPORARY] FUNCTION name AS 'class'` or
    /// `CREATE [TEMPORARY] MACRO name(args) body`
    Create {
        kind: RoutineKind,
        temporary: bool,
        name: String,
        definition: String,
    },
    /// `DROP [TEMPORARY] FUNCTION|MACRO [IF EXISTS] name`
    Drop {
        kind: RoutineKind,
        temporary: bool,
        name: String,
        if_exists: bool,
    },
}

impl FunctionCommand {
    pub fn parse(statement: &str) -> Result<Self, AppError> {
        let invalid = |reason: &str| {
            AppError::InvalidSql(format!("{}: {}", reason, statement.trim()))
        };
        let captures = FUNCTION_COMMAND
            .captures(statement)
            .ok_or_else(|| invalid("Not a function or macro statement"))?;

        let kind = if captures[3].eq_ignore_ascii_case("macro") {
            RoutineKind::Macro
        } else {
            RoutineKind::Function
        };
        let temporary = captures.get(2).is_some();
        let guard = captures.get(4).map(|m| m.as_str().to_lowercase());
        let name = captures[5].to_lowercase();
        let rest = captures[6].trim().to_string();

        if captures[1].eq_ignore_ascii_case("create") {
            if guard.is_some() {
                return Err(invalid("IF [NOT] EXISTS is not supported on CREATE"));
            }
            if rest.is_empty() {
                return Err(invalid("Missing definition"));
            }
            Ok(FunctionCommand::Create {
                kind,
                temporary,
                name,
                definition: rest,
            })
        } else {
            if guard.as_deref().is_some_and(|g| g.contains("not")) {
                return Err(invalid("IF NOT EXISTS is not valid on DROP"));
            }
            if !rest.is_empty() {
                return Err(invalid("Unexpected text after the name"));
            }
            Ok(FunctionCommand::Drop {
                kind,
                temporary,
                name,
                if_exists: guard.is_some(),
            })
        }
    }
}

/// Text rendered for NULL values in result rows
pub const NULL_TEXT: &str = "NULL";

/// Value reported for settings that were never assigned
pub const UNDEFINED_VALUE: &str = "<undefined>";

/// `key=value` row returned for a setting
pub fn setting_row(key: &str, value: Option<&str>) -> String {
    format!("{}={}", key, value.unwrap_or(UNDEFINED_VALUE))
}

/// `SET` keyword followed by whitespace or nothing
pub fn is_set_statement(statement: &str) -> bool {
    let trimmed = statement.trim_start();
    let keyword = trimmed
        .get(..3)
        .map(|head| head.eq_ignore_ascii_case("set"))
        .unwrap_or(false);
    keyword
        && trimmed[3..]
            .chars()
            .next()
            .map_or(true, |c| c.is_whitespace() || c == ';')
}

fn unquote(value: &str) -> &str {
    for quote in ['\'', '"'] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Request body for statement execution
#[derive(Debug, Deserialize)]
pub struct SqlRequest {
    pub statement: String,
}

/// Response body for statement execution
#[derive(Debug, Serialize)]
pub struct SqlResponse {
    pub classification: CommandClassification,
    pub rows: Vec<String>,
    pub row_count: usize,
    pub execution_time_ms: u64,
}

impl SqlResponse {
    pub fn new(classification: CommandClassification, rows: Vec<String>, execution_time_ms: u64) -> Self {
        Self {
            classification,
            row_count: rows.len(),
            rows,
            execution_time_ms,
        }
    }
}
