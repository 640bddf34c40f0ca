//! Database engine selection

use std::fmt;
use std::str::FromStr;

use crate::error::DeadlockError;

/// Target database engine. Decides which executor and schema a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Engine {
    MySql,
    Postgres,
}

impl Engine {
    /// Identifier accepted on the command line
    pub fn as_str(self) -> &'static str {
        match self {
            Engine::MySql => "mysql",
            Engine::Postgres => "postgres",
        }
    }

    /// Whether the driver accepts several `;`-separated statements in one call
    pub fn supports_multi_statement(self) -> bool {
        matches!(self, Engine::Postgres)
    }

    /// Whether a failed worker transaction aborts the whole run. Only the
    /// single-call engine treats it as fatal; split fragments just log.
    pub fn transaction_errors_are_fatal(self) -> bool {
        self.supports_multi_statement()
    }
}

impl FromStr for Engine {
    type Err = DeadlockError;

    // Exact match only: "MySQL" or "pg" are usage errors.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mysql" => Ok(Engine::MySql),
            "postgres" => Ok(Engine::Postgres),
            other => Err(DeadlockError::unknown_engine(other)),
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
