//! Dialect SQL generators.
//!
//! The [`Migratory`] trait defines one operation per change node plus the
//! change-log bookkeeping. [`GenericMigratory`] supplies SQL-92-ish behavior
//! driven entirely by a [`DialectConfig`]; each dialect type wraps it (or
//! another dialect) and delegates method-by-method, overriding only the
//! operations whose syntax differs. There is no global dialect registry:
//! a config value is built once per dialect and handed to the constructor.
//!
//! # Adding a dialect
//!
//! 1. Create a module under `migratory/` with a `DialectConfig` constructor.
//! 2. Wrap [`GenericMigratory`] (or an existing dialect) in a new type and
//!    delegate, overriding the differing operations.
//! 3. Register the name in [`migratory_for`].

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::driver::{Driver, Rows, Value};
use crate::error::{MigrateError, Result};
use crate::node::{
    AddColumnNode, AlterColumnNode, AlterTableRemarksNode, ColumnNode, CreateIndexNode,
    CreatePrimaryKeyNode, CreateTableNode, DataType, DropColumnNode, DropIndexNode,
    DropPrimaryKeyNode, DropTableNode, RenameColumnNode, RenameTableNode, ScriptNode,
    ALL_DIALECTS,
};
use crate::quote::{QuotePolicy, Quoter, Reserved};
use crate::sql::{column_type, escape_remarks, split_sql_statements};
use crate::version::ChangeVersion;

pub mod dm;
pub mod mysql;
pub mod oracle;
pub mod postgres;
pub mod sqlite;
pub mod vastbase;

pub use dm::DmMigratory;
pub use mysql::MysqlMigratory;
pub use oracle::OracleMigratory;
pub use postgres::PostgresMigratory;
pub use sqlite::SqliteMigratory;
pub use vastbase::VastbaseMigratory;

/// Default name of the durable change-log table.
pub const DEFAULT_CHANGE_TABLE: &str = "DBFLY_CHANGE_LOG";

pub const COLUMN_ID: &str = "ID";
pub const COLUMN_CHANGE_VERSION: &str = "CHANGE_VERSION";
pub const COLUMN_IS_SUCCESS: &str = "IS_SUCCESS";
pub const COLUMN_CREATED_AT: &str = "CREATED_AT";
pub const COLUMN_UPDATED_AT: &str = "UPDATED_AT";

/// Immutable per-dialect configuration.
#[derive(Debug, Clone)]
pub struct DialectConfig {
    /// Dialect name matched against `columnDialect`/`script` tags.
    pub name: &'static str,
    /// Query listing the table names visible to the current connection.
    pub show_tables_sql: &'static str,
    /// Logical to physical type map.
    pub type_map: HashMap<DataType, &'static str>,
    /// Column type of the auto-increment change-log id.
    pub identity_type: &'static str,
    /// Identifier delimiter pair.
    pub quote_prefix: u8,
    pub quote_suffix: u8,
    /// When identifiers are delimited.
    pub quote_policy: QuotePolicy,
    /// Reserved words (uppercase) consulted under `ReservedOnly`.
    pub reserved_words: HashSet<String>,
}

impl DialectConfig {
    /// Physical type for a logical type; empty when the dialect has no mapping.
    pub fn physical(&self, data_type: DataType) -> &str {
        self.type_map.get(&data_type).copied().unwrap_or("")
    }

    fn quoter(&self) -> Quoter {
        let reserved = match self.quote_policy {
            QuotePolicy::Always => Reserved::Always,
            QuotePolicy::Never => Reserved::Never,
            QuotePolicy::ReservedOnly => Reserved::Words(self.reserved_words.clone()),
        };
        Quoter::new(self.quote_prefix, self.quote_suffix, reserved)
    }
}

/// Build an uppercase reserved-word set from a word list.
pub fn reserved_words(words: &[&str]) -> HashSet<String> {
    words.iter().map(|word| word.to_uppercase()).collect()
}

/// SQL generator for one target dialect.
///
/// Every operation takes the cancellation token, the execution driver and
/// one decoded node, and either issues the dialect's statements or
/// propagates the first failure.
#[async_trait]
pub trait Migratory: Send + Sync {
    /// Dialect name, matched against descriptor dialect tags.
    fn name(&self) -> &str;

    /// Create the change-log table when the dialect's table listing does not
    /// already contain it (compared case-insensitively).
    async fn init_change_log_table(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        change_table: &str,
    ) -> Result<()>;

    /// Highest successfully completed version, if any.
    async fn last_version(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        change_table: &str,
    ) -> Result<Option<ChangeVersion>>;

    /// Insert an in-progress change-log row for a version.
    async fn new_change_log(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        change_table: &str,
        version: &str,
    ) -> Result<()>;

    /// Mark a version's in-progress row as completed. Matches on the version
    /// string and the in-progress flag, so a stale failed row for the same
    /// version is the one updated on retry, never a completed one.
    async fn complete_change_log(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        change_table: &str,
        version: &str,
    ) -> Result<()>;

    async fn create_table(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &CreateTableNode,
    ) -> Result<()>;

    async fn create_index(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &CreateIndexNode,
    ) -> Result<()>;

    async fn create_primary_key(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &CreatePrimaryKeyNode,
    ) -> Result<()>;

    async fn drop_table(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &DropTableNode,
    ) -> Result<()>;

    async fn drop_index(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &DropIndexNode,
    ) -> Result<()>;

    async fn add_column(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &AddColumnNode,
    ) -> Result<()>;

    async fn rename_column(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &RenameColumnNode,
    ) -> Result<()>;

    async fn alter_column(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &AlterColumnNode,
    ) -> Result<()>;

    async fn drop_column(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &DropColumnNode,
    ) -> Result<()>;

    async fn drop_primary_key(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &DropPrimaryKeyNode,
    ) -> Result<()>;

    async fn rename_table(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &RenameTableNode,
    ) -> Result<()>;

    async fn alter_table_remarks(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &AlterTableRemarksNode,
    ) -> Result<()>;

    /// Execute a raw script if its dialect tag matches this generator (or is
    /// the wildcard). The script is divided on statement boundaries and each
    /// statement executed independently; the first failure aborts.
    async fn script(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &ScriptNode,
    ) -> Result<()>;
}

/// Shared SQL-92-ish generator, configured per dialect.
#[derive(Debug, Clone)]
pub struct GenericMigratory {
    config: DialectConfig,
    quoter: Quoter,
}

impl GenericMigratory {
    pub fn new(config: DialectConfig) -> Self {
        let quoter = config.quoter();
        Self { config, quoter }
    }

    /// Rebuild this generator with a different quoting policy.
    ///
    /// The policy is fixed at construction; "changing" it means building a
    /// new value, never mutating shared state.
    pub fn with_quote_policy(self, policy: QuotePolicy) -> Self {
        let mut config = self.config;
        config.quote_policy = policy;
        Self::new(config)
    }

    pub fn config(&self) -> &DialectConfig {
        &self.config
    }

    pub(crate) fn quote(&self, value: &str) -> String {
        self.quoter.quote(value)
    }

    pub(crate) fn quote_to(&self, buf: &mut String, value: &str) {
        self.quoter.quote_to(buf, value);
    }

    pub(crate) fn join_to(&self, buf: &mut String, items: &[String], sep: &str) {
        self.quoter.join_to(buf, items, sep);
    }

    /// Render one column definition into the buffer.
    ///
    /// A `columnDialect` override matching this dialect replaces the logical
    /// type and default entirely. Returns whether the column is declared a
    /// primary key; the caller owns the PRIMARY KEY clause because it also
    /// enforces the single-primary-key rule.
    pub(crate) fn render_column(&self, column: &ColumnNode, buf: &mut String) -> bool {
        let dialect = column
            .dialects
            .iter()
            .find(|d| d.dialect == self.config.name);
        self.quote_to(buf, &column.column_name);
        buf.push(' ');
        let default_value = match dialect {
            Some(dialect) => {
                buf.push_str(&dialect.data_type);
                render_default(&dialect.default_origin_value, &dialect.default_value)
            }
            None => {
                buf.push_str(&column_type(
                    column.data_type,
                    self.config.physical(column.data_type),
                    column.max_length,
                    column.numeric_scale,
                ));
                render_default(&column.default_origin_value, &column.default_value)
            }
        };
        if column.primary_key {
            return true;
        }
        if let Some(default_value) = default_value {
            buf.push_str(" DEFAULT ");
            buf.push_str(&default_value);
        }
        if column.unique {
            buf.push_str(" UNIQUE");
        }
        if !column.nullable {
            buf.push_str(" NOT NULL");
        }
        false
    }

    /// Scan a table listing for a name, case-insensitively.
    pub(crate) async fn exists_table(&self, rows: &mut dyn Rows, table: &str) -> Result<bool> {
        let needle = table.to_lowercase();
        while let Some(row) = rows.next().await? {
            if row.get_str(0)?.to_lowercase() == needle {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub(crate) async fn create_change_table(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        change_table: &str,
    ) -> Result<()> {
        let sql = format!(
            "CREATE TABLE {}({} {} PRIMARY KEY, {} {}(255) NOT NULL, {} {} DEFAULT 0 NOT NULL, {} {}, {} {})",
            self.quote(change_table),
            self.quote(COLUMN_ID),
            self.config.identity_type,
            self.quote(COLUMN_CHANGE_VERSION),
            self.config.physical(DataType::Varchar),
            self.quote(COLUMN_IS_SUCCESS),
            self.config.physical(DataType::Boolean),
            self.quote(COLUMN_CREATED_AT),
            self.config.physical(DataType::Timestamp),
            self.quote(COLUMN_UPDATED_AT),
            self.config.physical(DataType::Timestamp),
        );
        driver.execute(cancel, &sql, &[]).await
    }

    async fn emit_column_remarks(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        table: &str,
        column: &ColumnNode,
    ) -> Result<()> {
        if column.remarks.is_empty() {
            return Ok(());
        }
        let sql = format!(
            "COMMENT ON COLUMN {}.{} IS '{}'",
            self.quote(table),
            self.quote(&column.column_name),
            escape_remarks(&column.remarks)
        );
        driver.execute(cancel, &sql, &[]).await
    }
}

pub(crate) fn render_default(origin_value: &str, literal_value: &str) -> Option<String> {
    if !origin_value.is_empty() {
        Some(origin_value.to_string())
    } else if !literal_value.is_empty() {
        Some(format!("'{}'", literal_value.replace('\'', "''")))
    } else {
        None
    }
}

#[async_trait]
impl Migratory for GenericMigratory {
    fn name(&self) -> &str {
        self.config.name
    }

    async fn init_change_log_table(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        change_table: &str,
    ) -> Result<()> {
        if self.config.show_tables_sql.is_empty() {
            return Err(MigrateError::Config(
                "show-tables query must not be empty".to_string(),
            ));
        }
        let mut rows = driver
            .query(cancel, self.config.show_tables_sql, &[])
            .await?;
        if self.exists_table(rows.as_mut(), change_table).await? {
            return Ok(());
        }
        self.create_change_table(cancel, driver, change_table).await
    }

    async fn last_version(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        change_table: &str,
    ) -> Result<Option<ChangeVersion>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = 1",
            self.quote(COLUMN_CHANGE_VERSION),
            self.quote(change_table),
            self.quote(COLUMN_IS_SUCCESS)
        );
        let mut rows = driver.query(cancel, &sql, &[]).await?;
        let mut last: Option<ChangeVersion> = None;
        while let Some(row) = rows.next().await? {
            let version = ChangeVersion::parse(row.get_str(0)?)?;
            if last.as_ref().map_or(true, |l| version > *l) {
                last = Some(version);
            }
        }
        Ok(last)
    }

    async fn new_change_log(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        change_table: &str,
        version: &str,
    ) -> Result<()> {
        let sql = format!(
            "INSERT INTO {}({}, {}, {}, {}) VALUES(?, 0, ?, ?)",
            self.quote(change_table),
            self.quote(COLUMN_CHANGE_VERSION),
            self.quote(COLUMN_IS_SUCCESS),
            self.quote(COLUMN_CREATED_AT),
            self.quote(COLUMN_UPDATED_AT)
        );
        let now = chrono::Utc::now();
        driver
            .execute(
                cancel,
                &sql,
                &[Value::from(version), Value::from(now), Value::from(now)],
            )
            .await
    }

    async fn complete_change_log(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        change_table: &str,
        version: &str,
    ) -> Result<()> {
        let sql = format!(
            "UPDATE {} SET {} = 1, {} = ? WHERE {} = ? AND {} = 0",
            self.quote(change_table),
            self.quote(COLUMN_IS_SUCCESS),
            self.quote(COLUMN_UPDATED_AT),
            self.quote(COLUMN_CHANGE_VERSION),
            self.quote(COLUMN_IS_SUCCESS)
        );
        driver
            .execute(
                cancel,
                &sql,
                &[Value::from(chrono::Utc::now()), Value::from(version)],
            )
            .await
    }

    async fn create_table(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &CreateTableNode,
    ) -> Result<()> {
        let mut builder = String::from("CREATE TABLE ");
        self.quote_to(&mut builder, &node.table_name);
        builder.push_str("\n(\n");
        let size = node.columns.len();
        let mut pk_column: Option<&ColumnNode> = None;
        for (index, column) in node.columns.iter().enumerate() {
            builder.push_str("  ");
            if self.render_column(column, &mut builder) {
                if pk_column.is_some() {
                    return Err(MigrateError::Validation(
                        "multiple primary key columns are not allowed to be defined".to_string(),
                    ));
                }
                if column.key_name.is_empty() {
                    builder.push_str(" PRIMARY KEY");
                }
                pk_column = Some(column);
            }
            if index < size - 1 {
                builder.push_str(",\n");
            }
        }
        if let Some(pk) = pk_column {
            if !pk.key_name.is_empty() {
                builder.push_str(",\n  CONSTRAINT ");
                self.quote_to(&mut builder, &pk.key_name);
                builder.push_str(" PRIMARY KEY (");
                self.quote_to(&mut builder, &pk.column_name);
                builder.push(')');
            }
        }
        builder.push_str("\n)");
        driver.execute(cancel, &builder, &[]).await?;

        if !node.remarks.is_empty() {
            let sql = format!(
                "COMMENT ON TABLE {} IS '{}'",
                self.quote(&node.table_name),
                escape_remarks(&node.remarks)
            );
            driver.execute(cancel, &sql, &[]).await?;
        }
        for column in &node.columns {
            self.emit_column_remarks(cancel, driver, &node.table_name, column)
                .await?;
        }
        Ok(())
    }

    async fn create_index(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &CreateIndexNode,
    ) -> Result<()> {
        let mut builder = String::from("CREATE");
        if node.unique {
            builder.push_str(" UNIQUE");
        }
        builder.push_str(" INDEX ");
        self.quote_to(&mut builder, &node.index_name);
        builder.push_str(" ON ");
        self.quote_to(&mut builder, &node.table_name);
        builder.push_str(" (");
        let columns: Vec<String> = node
            .columns
            .iter()
            .map(|column| column.column_name.clone())
            .collect();
        self.join_to(&mut builder, &columns, ", ");
        builder.push(')');
        driver.execute(cancel, &builder, &[]).await
    }

    async fn create_primary_key(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &CreatePrimaryKeyNode,
    ) -> Result<()> {
        let mut builder = String::from("ALTER TABLE ");
        self.quote_to(&mut builder, &node.table_name);
        builder.push_str(" ADD CONSTRAINT ");
        self.quote_to(&mut builder, &node.key_name);
        builder.push_str(" PRIMARY KEY (");
        self.quote_to(&mut builder, &node.column.column_name);
        builder.push(')');
        driver.execute(cancel, &builder, &[]).await
    }

    async fn drop_table(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &DropTableNode,
    ) -> Result<()> {
        let sql = format!("DROP TABLE {}", self.quote(&node.table_name));
        driver.execute(cancel, &sql, &[]).await
    }

    async fn drop_index(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &DropIndexNode,
    ) -> Result<()> {
        let sql = format!("DROP INDEX {}", self.quote(&node.index_name));
        driver.execute(cancel, &sql, &[]).await
    }

    async fn add_column(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &AddColumnNode,
    ) -> Result<()> {
        for column in &node.columns {
            let mut builder = String::from("ALTER TABLE ");
            self.quote_to(&mut builder, &node.table_name);
            builder.push_str(" ADD ");
            if self.render_column(column, &mut builder) {
                return Err(MigrateError::Validation(
                    "adding columns is not allowed as a primary key".to_string(),
                ));
            }
            driver.execute(cancel, &builder, &[]).await?;
            self.emit_column_remarks(cancel, driver, &node.table_name, column)
                .await?;
        }
        Ok(())
    }

    async fn rename_column(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &RenameColumnNode,
    ) -> Result<()> {
        let mut builder = String::from("ALTER TABLE ");
        self.quote_to(&mut builder, &node.table_name);
        builder.push_str(" RENAME COLUMN ");
        self.quote_to(&mut builder, &node.column_name);
        builder.push_str(" TO ");
        self.quote_to(&mut builder, &node.new_column_name);
        driver.execute(cancel, &builder, &[]).await
    }

    async fn alter_column(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &AlterColumnNode,
    ) -> Result<()> {
        let mut column = node.column.clone();
        column.column_name = node.column_name.clone();
        let mut builder = String::from("ALTER TABLE ");
        self.quote_to(&mut builder, &node.table_name);
        builder.push_str(" MODIFY ");
        if self.render_column(&column, &mut builder) {
            return Err(MigrateError::Validation(
                "alter columns is not allowed as a primary key".to_string(),
            ));
        }
        driver.execute(cancel, &builder, &[]).await
    }

    async fn drop_column(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &DropColumnNode,
    ) -> Result<()> {
        let sql = format!(
            "ALTER TABLE {} DROP COLUMN {}",
            self.quote(&node.table_name),
            self.quote(&node.column_name)
        );
        driver.execute(cancel, &sql, &[]).await
    }

    async fn drop_primary_key(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &DropPrimaryKeyNode,
    ) -> Result<()> {
        let sql = format!("ALTER TABLE {} DROP PRIMARY KEY", self.quote(&node.table_name));
        driver.execute(cancel, &sql, &[]).await
    }

    async fn rename_table(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &RenameTableNode,
    ) -> Result<()> {
        let sql = format!(
            "ALTER TABLE {} RENAME TO {}",
            self.quote(&node.table_name),
            self.quote(&node.new_table_name)
        );
        driver.execute(cancel, &sql, &[]).await
    }

    async fn alter_table_remarks(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &AlterTableRemarksNode,
    ) -> Result<()> {
        let sql = format!(
            "COMMENT ON TABLE {} IS '{}'",
            self.quote(&node.table_name),
            escape_remarks(&node.remarks)
        );
        driver.execute(cancel, &sql, &[]).await
    }

    async fn script(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &ScriptNode,
    ) -> Result<()> {
        if node.value.is_empty() {
            return Ok(());
        }
        if node.dialect != self.config.name && node.dialect != ALL_DIALECTS {
            debug!(
                dialect = %node.dialect,
                "skipping script tagged for another dialect"
            );
            return Ok(());
        }
        for statement in split_sql_statements(&node.value) {
            driver.execute(cancel, &statement, &[]).await?;
        }
        Ok(())
    }
}

/// Construct the generator for a dialect name.
///
/// Recognizes common aliases (`postgresql`, `pg`, `sqlite3`, `mariadb`,
/// `dameng`). A `quote_policy` of `None` keeps the dialect's default.
pub fn migratory_for(
    dialect: &str,
    quote_policy: Option<QuotePolicy>,
) -> Result<Box<dyn Migratory>> {
    match dialect.to_lowercase().as_str() {
        "mysql" | "mariadb" => Ok(Box::new(apply_policy(MysqlMigratory::new(), quote_policy))),
        "postgres" | "postgresql" | "pg" => Ok(Box::new(apply_policy(
            PostgresMigratory::new(),
            quote_policy,
        ))),
        "sqlite" | "sqlite3" => Ok(Box::new(apply_policy(SqliteMigratory::new(), quote_policy))),
        "oracle" => Ok(Box::new(apply_policy(OracleMigratory::new(), quote_policy))),
        "dm" | "dameng" => Ok(Box::new(apply_policy(DmMigratory::new(), quote_policy))),
        "vastbase" => Ok(Box::new(apply_policy(
            VastbaseMigratory::new(),
            quote_policy,
        ))),
        other => Err(MigrateError::Config(format!(
            "unknown dialect: {:?}. Supported: mysql, postgres, sqlite, oracle, dm, vastbase",
            other
        ))),
    }
}

fn apply_policy<M: QuotePolicyExt>(migratory: M, policy: Option<QuotePolicy>) -> M {
    match policy {
        Some(policy) => migratory.with_quote_policy(policy),
        None => migratory,
    }
}

/// Rebuild-with-policy hook shared by the dialect constructors.
pub trait QuotePolicyExt: Sized {
    fn with_quote_policy(self, policy: QuotePolicy) -> Self;
}

impl QuotePolicyExt for GenericMigratory {
    fn with_quote_policy(self, policy: QuotePolicy) -> Self {
        GenericMigratory::with_quote_policy(self, policy)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::node::{ColumnNode, DataType};

    /// A bare NOT NULL column of the given logical type.
    pub(crate) fn column(name: &str, data_type: DataType) -> ColumnNode {
        ColumnNode {
            column_name: name.to_string(),
            data_type,
            max_length: 0,
            numeric_scale: 0,
            nullable: false,
            unique: false,
            primary_key: false,
            key_name: String::new(),
            default_value: String::new(),
            default_origin_value: String::new(),
            remarks: String::new(),
            dialects: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::column;
    use super::*;
    use crate::driver::DryRunDriver;

    fn ansi() -> GenericMigratory {
        let mut type_map = HashMap::new();
        type_map.insert(DataType::Varchar, "VARCHAR");
        type_map.insert(DataType::Boolean, "BOOLEAN");
        type_map.insert(DataType::Int, "INT");
        type_map.insert(DataType::Decimal, "DECIMAL");
        type_map.insert(DataType::Timestamp, "TIMESTAMP");
        GenericMigratory::new(DialectConfig {
            name: "ansi",
            show_tables_sql: "SELECT table_name FROM information_schema.tables",
            type_map,
            identity_type: "BIGINT",
            quote_prefix: b'"',
            quote_suffix: b'"',
            quote_policy: QuotePolicy::Never,
            reserved_words: reserved_words(&["ORDER"]),
        })
    }

    fn cancel() -> CancellationToken {
        CancellationToken::new()
    }

    #[tokio::test]
    async fn test_create_table_basic() {
        let migratory = ansi();
        let driver = DryRunDriver::new();
        let mut id = column("id", DataType::Int);
        id.primary_key = true;
        let mut name = column("name", DataType::Varchar);
        name.max_length = 64;
        name.nullable = true;
        let node = CreateTableNode {
            table_name: "users".to_string(),
            remarks: String::new(),
            columns: vec![id, name],
            attributes: Vec::new(),
        };
        migratory
            .create_table(&cancel(), &driver, &node)
            .await
            .unwrap();
        assert_eq!(
            driver.executed(),
            vec!["CREATE TABLE users\n(\n  id INT PRIMARY KEY,\n  name VARCHAR(64)\n)"]
        );
    }

    #[tokio::test]
    async fn test_create_table_named_primary_key_constraint() {
        let migratory = ansi();
        let driver = DryRunDriver::new();
        let mut id = column("id", DataType::Int);
        id.primary_key = true;
        id.key_name = "pk_users".to_string();
        let node = CreateTableNode {
            table_name: "users".to_string(),
            remarks: String::new(),
            columns: vec![id],
            attributes: Vec::new(),
        };
        migratory
            .create_table(&cancel(), &driver, &node)
            .await
            .unwrap();
        let sql = &driver.executed()[0];
        assert!(sql.contains("CONSTRAINT pk_users PRIMARY KEY (id)"));
        // Named constraint replaces the inline clause, never both.
        assert!(!sql.contains("id INT PRIMARY KEY"));
    }

    #[tokio::test]
    async fn test_create_table_rejects_two_primary_keys() {
        let migratory = ansi();
        let driver = DryRunDriver::new();
        let mut a = column("a", DataType::Int);
        a.primary_key = true;
        let mut b = column("b", DataType::Int);
        b.primary_key = true;
        let node = CreateTableNode {
            table_name: "t".to_string(),
            remarks: String::new(),
            columns: vec![a, b],
            attributes: Vec::new(),
        };
        let err = migratory
            .create_table(&cancel(), &driver, &node)
            .await
            .unwrap_err();
        assert!(matches!(err, MigrateError::Validation(_)));
        assert!(driver.executed().is_empty());
    }

    #[tokio::test]
    async fn test_create_table_emits_remark_statements() {
        let migratory = ansi();
        let driver = DryRunDriver::new();
        let mut key = column("k", DataType::Varchar);
        key.max_length = 10;
        key.remarks = "it's a key".to_string();
        let node = CreateTableNode {
            table_name: "t".to_string(),
            remarks: "config".to_string(),
            columns: vec![key],
            attributes: Vec::new(),
        };
        migratory
            .create_table(&cancel(), &driver, &node)
            .await
            .unwrap();
        let executed = driver.executed();
        assert_eq!(executed.len(), 3);
        assert_eq!(executed[1], "COMMENT ON TABLE t IS 'config'");
        assert_eq!(executed[2], "COMMENT ON COLUMN t.k IS 'it''s a key'");
    }

    #[tokio::test]
    async fn test_column_defaults_literal_and_raw() {
        let migratory = ansi();
        let driver = DryRunDriver::new();
        let mut status = column("status", DataType::Varchar);
        status.max_length = 10;
        status.default_value = "new".to_string();
        let mut created = column("created_at", DataType::Timestamp);
        created.default_origin_value = "CURRENT_TIMESTAMP".to_string();
        let node = AddColumnNode {
            table_name: "t".to_string(),
            columns: vec![status, created],
        };
        migratory.add_column(&cancel(), &driver, &node).await.unwrap();
        let executed = driver.executed();
        assert_eq!(
            executed[0],
            "ALTER TABLE t ADD status VARCHAR(10) DEFAULT 'new' NOT NULL"
        );
        assert_eq!(
            executed[1],
            "ALTER TABLE t ADD created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP NOT NULL"
        );
    }

    #[tokio::test]
    async fn test_column_dialect_override_wins() {
        let migratory = ansi();
        let driver = DryRunDriver::new();
        let mut payload = column("payload", DataType::Text);
        payload.nullable = true;
        payload.dialects = vec![crate::node::ColumnDialectNode {
            dialect: "ansi".to_string(),
            data_type: "JSONB".to_string(),
            default_value: String::new(),
            default_origin_value: "'{}'::jsonb".to_string(),
        }];
        let node = AddColumnNode {
            table_name: "t".to_string(),
            columns: vec![payload],
        };
        migratory.add_column(&cancel(), &driver, &node).await.unwrap();
        assert_eq!(
            driver.executed(),
            vec!["ALTER TABLE t ADD payload JSONB DEFAULT '{}'::jsonb"]
        );
    }

    #[tokio::test]
    async fn test_add_column_rejects_primary_key() {
        let migratory = ansi();
        let driver = DryRunDriver::new();
        let mut id = column("id", DataType::Int);
        id.primary_key = true;
        let node = AddColumnNode {
            table_name: "t".to_string(),
            columns: vec![id],
        };
        let err = migratory
            .add_column(&cancel(), &driver, &node)
            .await
            .unwrap_err();
        assert!(matches!(err, MigrateError::Validation(_)));
    }

    #[tokio::test]
    async fn test_alter_column_rejects_primary_key() {
        let migratory = ansi();
        let driver = DryRunDriver::new();
        let mut id = column("id", DataType::Int);
        id.primary_key = true;
        let node = AlterColumnNode {
            table_name: "t".to_string(),
            column_name: "id".to_string(),
            column: id,
        };
        let err = migratory
            .alter_column(&cancel(), &driver, &node)
            .await
            .unwrap_err();
        assert!(matches!(err, MigrateError::Validation(_)));
    }

    #[tokio::test]
    async fn test_alter_column_uses_declared_name() {
        let migratory = ansi();
        let driver = DryRunDriver::new();
        let mut definition = column("ignored", DataType::Varchar);
        definition.max_length = 20;
        definition.nullable = true;
        let node = AlterColumnNode {
            table_name: "t".to_string(),
            column_name: "status".to_string(),
            column: definition,
        };
        migratory
            .alter_column(&cancel(), &driver, &node)
            .await
            .unwrap();
        assert_eq!(
            driver.executed(),
            vec!["ALTER TABLE t MODIFY status VARCHAR(20)"]
        );
    }

    #[tokio::test]
    async fn test_single_statement_translations() {
        let migratory = ansi();
        let driver = DryRunDriver::new();
        let c = cancel();
        migratory
            .create_index(
                &c,
                &driver,
                &CreateIndexNode {
                    table_name: "t".to_string(),
                    index_name: "idx_t_a".to_string(),
                    unique: true,
                    columns: vec![
                        crate::node::IndexColumnNode {
                            column_name: "a".to_string(),
                        },
                        crate::node::IndexColumnNode {
                            column_name: "b".to_string(),
                        },
                    ],
                },
            )
            .await
            .unwrap();
        migratory
            .drop_index(
                &c,
                &driver,
                &DropIndexNode {
                    table_name: "t".to_string(),
                    index_name: "idx_t_a".to_string(),
                },
            )
            .await
            .unwrap();
        migratory
            .rename_table(
                &c,
                &driver,
                &RenameTableNode {
                    table_name: "t".to_string(),
                    new_table_name: "t2".to_string(),
                },
            )
            .await
            .unwrap();
        migratory
            .drop_primary_key(
                &c,
                &driver,
                &DropPrimaryKeyNode {
                    table_name: "t2".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(
            driver.executed(),
            vec![
                "CREATE UNIQUE INDEX idx_t_a ON t (a, b)",
                "DROP INDEX idx_t_a",
                "ALTER TABLE t RENAME TO t2",
                "ALTER TABLE t2 DROP PRIMARY KEY",
            ]
        );
    }

    #[tokio::test]
    async fn test_script_dialect_filter() {
        let migratory = ansi();
        let driver = DryRunDriver::new();
        let c = cancel();
        migratory
            .script(
                &c,
                &driver,
                &ScriptNode {
                    dialect: "mysql".to_string(),
                    value: "SELECT 1;".to_string(),
                },
            )
            .await
            .unwrap();
        assert!(driver.executed().is_empty());

        migratory
            .script(
                &c,
                &driver,
                &ScriptNode {
                    dialect: ALL_DIALECTS.to_string(),
                    value: "UPDATE t SET a = 1; DELETE FROM t WHERE a = 2;".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(
            driver.executed(),
            vec!["UPDATE t SET a = 1", "DELETE FROM t WHERE a = 2"]
        );
    }

    #[tokio::test]
    async fn test_change_log_round_trip_sql() {
        let migratory = ansi();
        let driver = DryRunDriver::new();
        let c = cancel();
        migratory
            .init_change_log_table(&c, &driver, DEFAULT_CHANGE_TABLE)
            .await
            .unwrap();
        migratory
            .new_change_log(&c, &driver, DEFAULT_CHANGE_TABLE, "1.0.0")
            .await
            .unwrap();
        migratory
            .complete_change_log(&c, &driver, DEFAULT_CHANGE_TABLE, "1.0.0")
            .await
            .unwrap();
        let executed = driver.executed();
        assert_eq!(
            executed[0],
            "CREATE TABLE DBFLY_CHANGE_LOG(ID BIGINT PRIMARY KEY, CHANGE_VERSION VARCHAR(255) \
             NOT NULL, IS_SUCCESS BOOLEAN DEFAULT 0 NOT NULL, CREATED_AT TIMESTAMP, \
             UPDATED_AT TIMESTAMP)"
        );
        assert_eq!(
            executed[1],
            "INSERT INTO DBFLY_CHANGE_LOG(CHANGE_VERSION, IS_SUCCESS, CREATED_AT, UPDATED_AT) \
             VALUES(?, 0, ?, ?)"
        );
        assert_eq!(
            executed[2],
            "UPDATE DBFLY_CHANGE_LOG SET IS_SUCCESS = 1, UPDATED_AT = ? \
             WHERE CHANGE_VERSION = ? AND IS_SUCCESS = 0"
        );
    }

    #[tokio::test]
    async fn test_quote_policy_rebuild() {
        let migratory = ansi().with_quote_policy(QuotePolicy::ReservedOnly);
        let driver = DryRunDriver::new();
        migratory
            .drop_table(
                &cancel(),
                &driver,
                &DropTableNode {
                    table_name: "order".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(driver.executed(), vec!["DROP TABLE \"order\""]);
    }

    #[test]
    fn test_migratory_for_known_dialects() {
        for name in ["mysql", "postgres", "pg", "sqlite", "oracle", "dm", "vastbase"] {
            assert!(migratory_for(name, None).is_ok(), "dialect {}", name);
        }
        assert_eq!(migratory_for("vastbase", None).unwrap().name(), "postgres");
        assert!(migratory_for("mssql", None).is_err());
    }
}
