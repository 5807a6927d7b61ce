//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::quote::QuotePolicy;

/// Declarative migration settings, deserializable from any serde format.
///
/// The dialect is named by string so the choice can live in application
/// configuration; [`crate::migratory::migratory_for`] resolves it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrateSettings {
    /// Target dialect name (`mysql`, `postgres`, `sqlite`, `oracle`, `dm`,
    /// `vastbase`; common aliases accepted).
    pub dialect: String,

    /// Change-log table name; defaults to `DBFLY_CHANGE_LOG`.
    #[serde(default)]
    pub change_table: Option<String>,

    /// Identifier quoting policy override; `None` keeps the dialect default.
    #[serde(default)]
    pub quote_policy: Option<QuotePolicy>,
}

impl MigrateSettings {
    /// Settings for a dialect with everything else at defaults.
    pub fn new(dialect: impl Into<String>) -> Self {
        Self {
            dialect: dialect.into(),
            change_table: None,
            quote_policy: None,
        }
    }
}
