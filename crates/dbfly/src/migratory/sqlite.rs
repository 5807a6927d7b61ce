//! SQLite dialect and table-rebuild emulation.
//!
//! SQLite cannot portably alter or drop a column, nor add or remove a
//! primary key on an existing table. These operations are emulated by
//! rebuilding the table: introspect the live columns and index DDL,
//! synthesize a replacement table under a `_dbfly` suffix with the one
//! deliberate change applied, copy the rows across positionally, drop the
//! old table, rename the replacement into place and replay the captured
//! index statements. A failure part-way aborts without cleaning up the
//! replacement table; the next run fails on the leftover until it is
//! removed by hand.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::driver::{Driver, Value};
use crate::error::{MigrateError, Result};
use crate::node::{
    AddColumnNode, AlterColumnNode, AlterTableRemarksNode, ColumnNode, CreateIndexNode,
    CreatePrimaryKeyNode, CreateTableNode, DataType, DropColumnNode, DropIndexNode,
    DropPrimaryKeyNode, DropTableNode, RenameColumnNode, RenameTableNode, ScriptNode,
};
use crate::quote::QuotePolicy;
use crate::version::ChangeVersion;

use super::{DialectConfig, GenericMigratory, Migratory, QuotePolicyExt};

/// Suffix of the temporary replacement table used during a rebuild.
const REBUILD_SUFFIX: &str = "_dbfly";

fn sqlite_config() -> DialectConfig {
    let mut type_map = HashMap::new();
    type_map.insert(DataType::Varchar, "VARCHAR");
    type_map.insert(DataType::Char, "CHARACTER");
    type_map.insert(DataType::Text, "TEXT");
    type_map.insert(DataType::Clob, "CLOB");
    type_map.insert(DataType::Boolean, "TINYINT");
    type_map.insert(DataType::Tinyint, "TINYINT");
    type_map.insert(DataType::Smallint, "SMALLINT");
    type_map.insert(DataType::Int, "INTEGER");
    type_map.insert(DataType::Bigint, "INTEGER");
    type_map.insert(DataType::Decimal, "DECIMAL");
    type_map.insert(DataType::Date, "DATE");
    type_map.insert(DataType::Time, "TIME");
    type_map.insert(DataType::Timestamp, "DATETIME");
    type_map.insert(DataType::Blob, "BLOB");
    DialectConfig {
        name: "sqlite",
        show_tables_sql: "SELECT name FROM sqlite_master WHERE type = 'table'",
        type_map,
        identity_type: "INTEGER",
        quote_prefix: b'"',
        quote_suffix: b'"',
        quote_policy: QuotePolicy::Never,
        reserved_words: Default::default(),
    }
}

/// One column as reported by `PRAGMA table_info`.
#[derive(Debug, Clone)]
struct SqliteColumn {
    name: String,
    decl_type: String,
    not_null: bool,
    default_value: Option<String>,
    primary_key: bool,
}

/// Introspected table shape: live columns plus captured index DDL.
#[derive(Debug)]
struct TableLayout {
    columns: Vec<SqliteColumn>,
    index_sql: Vec<String>,
}

/// SQLite SQL generator.
#[derive(Debug, Clone)]
pub struct SqliteMigratory {
    base: GenericMigratory,
}

impl SqliteMigratory {
    pub fn new() -> Self {
        Self {
            base: GenericMigratory::new(sqlite_config()),
        }
    }

    async fn table_layout(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        table: &str,
    ) -> Result<TableLayout> {
        let columns = self.load_columns(cancel, driver, table).await?;
        if columns.is_empty() {
            return Err(MigrateError::Validation(format!(
                "table {} has no columns to rebuild",
                table
            )));
        }
        let index_sql = self.load_index_sql(cancel, driver, table).await?;
        Ok(TableLayout { columns, index_sql })
    }

    async fn load_columns(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        table: &str,
    ) -> Result<Vec<SqliteColumn>> {
        // PRAGMA arguments cannot be bound, so the name is inlined.
        let sql = format!("PRAGMA table_info('{}')", table.replace('\'', "''"));
        let mut rows = driver.query(cancel, &sql, &[]).await?;
        let mut columns = Vec::new();
        while let Some(row) = rows.next().await? {
            columns.push(SqliteColumn {
                name: row.get_str(1)?.to_string(),
                decl_type: row.get_str(2)?.to_string(),
                not_null: row.get_bool(3)?,
                default_value: row.get_opt_str(4)?.map(str::to_string),
                primary_key: row.get_bool(5)?,
            });
        }
        Ok(columns)
    }

    async fn load_index_sql(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        table: &str,
    ) -> Result<Vec<String>> {
        let sql = "select sql from sqlite_master \
                   where sql is not null and type = 'index' and lower(tbl_name) = ?";
        let mut rows = driver
            .query(cancel, sql, &[Value::from(table.to_lowercase())])
            .await?;
        let mut statements = Vec::new();
        while let Some(row) = rows.next().await? {
            statements.push(row.get_str(0)?.to_string());
        }
        Ok(statements)
    }

    /// Run the copy phase of a rebuild: create the replacement table, copy
    /// every row positionally (applying any old-name to new-name mapping),
    /// swap the tables and replay the captured index statements.
    #[allow(clippy::too_many_arguments)]
    async fn copy_table(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        create_sql: &str,
        column_names: &[String],
        replacement: &str,
        table: &str,
        index_sql: &[String],
        renames: &HashMap<String, String>,
    ) -> Result<()> {
        driver.execute(cancel, create_sql, &[]).await?;
        let target_columns: Vec<String> = column_names
            .iter()
            .map(|name| renames.get(name).cloned().unwrap_or_else(|| name.clone()))
            .collect();
        let copy = format!(
            "INSERT INTO {}({}) SELECT {} FROM {}",
            replacement,
            target_columns.join(", "),
            column_names.join(", "),
            table
        );
        driver.execute(cancel, &copy, &[]).await?;
        driver
            .execute(cancel, &format!("DROP TABLE {}", table), &[])
            .await?;
        driver
            .execute(
                cancel,
                &format!("ALTER TABLE {} RENAME TO {}", replacement, table),
                &[],
            )
            .await?;
        for statement in index_sql {
            driver.execute(cancel, statement, &[]).await?;
        }
        Ok(())
    }

    /// Build the shared CREATE TABLE prologue of a rebuild.
    fn replacement_table(&self, table: &str) -> (String, String) {
        let replacement = format!("{}{}", table, REBUILD_SUFFIX);
        let builder = format!("CREATE TABLE {}\n(\n", replacement);
        (replacement, builder)
    }

    /// Render an introspected column verbatim so the rebuild is
    /// schema-neutral for every untouched column.
    fn write_existing_column(
        builder: &mut String,
        name: &str,
        column: &SqliteColumn,
        include_primary_key: bool,
    ) {
        builder.push_str(name);
        builder.push(' ');
        builder.push_str(&column.decl_type);
        if include_primary_key && column.primary_key {
            builder.push_str(" PRIMARY KEY");
        }
        if let Some(default_value) = &column.default_value {
            if !default_value.is_empty() {
                builder.push_str(" DEFAULT ");
                builder.push_str(default_value);
            }
        }
        if column.not_null {
            builder.push_str(" NOT NULL");
        }
    }

    fn render_create_table(&self, node: &CreateTableNode) -> Result<String> {
        let mut builder = String::from("CREATE TABLE ");
        self.base.quote_to(&mut builder, &node.table_name);
        builder.push_str("\n(\n");
        let size = node.columns.len();
        let mut pk_column: Option<&ColumnNode> = None;
        for (index, column) in node.columns.iter().enumerate() {
            builder.push_str("  ");
            if self.base.render_column(column, &mut builder) {
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
                self.base.quote_to(&mut builder, &pk.key_name);
                builder.push_str(" PRIMARY KEY (");
                self.base.quote_to(&mut builder, &pk.column_name);
                builder.push(')');
            }
        }
        builder.push_str("\n)");
        Ok(builder)
    }
}

impl Default for SqliteMigratory {
    fn default() -> Self {
        Self::new()
    }
}

impl QuotePolicyExt for SqliteMigratory {
    fn with_quote_policy(self, policy: QuotePolicy) -> Self {
        Self {
            base: self.base.with_quote_policy(policy),
        }
    }
}

#[async_trait]
impl Migratory for SqliteMigratory {
    fn name(&self) -> &str {
        self.base.name()
    }

    async fn init_change_log_table(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        change_table: &str,
    ) -> Result<()> {
        self.base
            .init_change_log_table(cancel, driver, change_table)
            .await
    }

    async fn last_version(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        change_table: &str,
    ) -> Result<Option<ChangeVersion>> {
        self.base.last_version(cancel, driver, change_table).await
    }

    async fn new_change_log(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        change_table: &str,
        version: &str,
    ) -> Result<()> {
        self.base
            .new_change_log(cancel, driver, change_table, version)
            .await
    }

    async fn complete_change_log(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        change_table: &str,
        version: &str,
    ) -> Result<()> {
        self.base
            .complete_change_log(cancel, driver, change_table, version)
            .await
    }

    /// Like the generic shape but without remark statements, since SQLite has no
    /// comment syntax.
    async fn create_table(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &CreateTableNode,
    ) -> Result<()> {
        let sql = self.render_create_table(node)?;
        driver.execute(cancel, &sql, &[]).await
    }

    async fn create_index(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &CreateIndexNode,
    ) -> Result<()> {
        self.base.create_index(cancel, driver, node).await
    }

    async fn create_primary_key(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &CreatePrimaryKeyNode,
    ) -> Result<()> {
        let layout = self.table_layout(cancel, driver, &node.table_name).await?;
        let (replacement, mut builder) = self.replacement_table(&node.table_name);
        let mut column_names = Vec::with_capacity(layout.columns.len());
        for column in &layout.columns {
            column_names.push(column.name.clone());
            builder.push_str("  ");
            // Existing primary-key flags are dropped; the named constraint
            // below becomes the only key.
            Self::write_existing_column(&mut builder, &column.name, column, false);
            builder.push_str(",\n");
        }
        builder.push_str("  CONSTRAINT ");
        builder.push_str(&node.key_name);
        builder.push_str(" PRIMARY KEY (");
        builder.push_str(&node.column.column_name);
        builder.push_str(")\n)");
        self.copy_table(
            cancel,
            driver,
            &builder,
            &column_names,
            &replacement,
            &node.table_name,
            &layout.index_sql,
            &HashMap::new(),
        )
        .await
    }

    async fn drop_table(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &DropTableNode,
    ) -> Result<()> {
        self.base.drop_table(cancel, driver, node).await
    }

    async fn drop_index(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &DropIndexNode,
    ) -> Result<()> {
        self.base.drop_index(cancel, driver, node).await
    }

    /// Like the generic shape but without remark statements.
    async fn add_column(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &AddColumnNode,
    ) -> Result<()> {
        for column in &node.columns {
            let mut builder = String::from("ALTER TABLE ");
            self.base.quote_to(&mut builder, &node.table_name);
            builder.push_str(" ADD ");
            if self.base.render_column(column, &mut builder) {
                return Err(MigrateError::Validation(
                    "adding columns is not allowed as a primary key".to_string(),
                ));
            }
            driver.execute(cancel, &builder, &[]).await?;
        }
        Ok(())
    }

    async fn rename_column(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &RenameColumnNode,
    ) -> Result<()> {
        let layout = self.table_layout(cancel, driver, &node.table_name).await?;
        let (replacement, mut builder) = self.replacement_table(&node.table_name);
        let target = node.column_name.to_lowercase();
        let size = layout.columns.len();
        let mut column_names = Vec::with_capacity(size);
        let mut renames = HashMap::new();
        for (index, column) in layout.columns.iter().enumerate() {
            column_names.push(column.name.clone());
            let name = if column.name.to_lowercase() == target {
                renames.insert(column.name.clone(), node.new_column_name.clone());
                node.new_column_name.as_str()
            } else {
                column.name.as_str()
            };
            builder.push_str("  ");
            Self::write_existing_column(&mut builder, name, column, true);
            if index < size - 1 {
                builder.push_str(",\n");
            }
        }
        builder.push_str("\n)");
        self.copy_table(
            cancel,
            driver,
            &builder,
            &column_names,
            &replacement,
            &node.table_name,
            &layout.index_sql,
            &renames,
        )
        .await
    }

    async fn alter_column(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &AlterColumnNode,
    ) -> Result<()> {
        let layout = self.table_layout(cancel, driver, &node.table_name).await?;
        let mut replacement_column = node.column.clone();
        replacement_column.column_name = node.column_name.clone();
        let (replacement, mut builder) = self.replacement_table(&node.table_name);
        let target = node.column_name.to_lowercase();
        let size = layout.columns.len();
        let mut column_names = Vec::with_capacity(size);
        for (index, column) in layout.columns.iter().enumerate() {
            column_names.push(column.name.clone());
            builder.push_str("  ");
            if column.name.to_lowercase() == target {
                if self.base.render_column(&replacement_column, &mut builder) {
                    return Err(MigrateError::Validation(
                        "alter columns is not allowed as a primary key".to_string(),
                    ));
                }
            } else {
                Self::write_existing_column(&mut builder, &column.name, column, true);
            }
            if index < size - 1 {
                builder.push_str(",\n");
            }
        }
        builder.push_str("\n)");
        self.copy_table(
            cancel,
            driver,
            &builder,
            &column_names,
            &replacement,
            &node.table_name,
            &layout.index_sql,
            &HashMap::new(),
        )
        .await
    }

    async fn drop_column(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &DropColumnNode,
    ) -> Result<()> {
        let layout = self.table_layout(cancel, driver, &node.table_name).await?;
        let (replacement, mut builder) = self.replacement_table(&node.table_name);
        let target = node.column_name.to_lowercase();
        let mut column_names = Vec::new();
        let mut first = true;
        for column in &layout.columns {
            if column.name.to_lowercase() == target {
                continue;
            }
            if !first {
                builder.push_str(",\n");
            }
            first = false;
            column_names.push(column.name.clone());
            builder.push_str("  ");
            Self::write_existing_column(&mut builder, &column.name, column, true);
        }
        if column_names.is_empty() {
            return Err(MigrateError::Validation(format!(
                "dropping {} would leave table {} without columns",
                node.column_name, node.table_name
            )));
        }
        builder.push_str("\n)");
        self.copy_table(
            cancel,
            driver,
            &builder,
            &column_names,
            &replacement,
            &node.table_name,
            &layout.index_sql,
            &HashMap::new(),
        )
        .await
    }

    async fn drop_primary_key(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &DropPrimaryKeyNode,
    ) -> Result<()> {
        let layout = self.table_layout(cancel, driver, &node.table_name).await?;
        let (replacement, mut builder) = self.replacement_table(&node.table_name);
        let size = layout.columns.len();
        let mut column_names = Vec::with_capacity(size);
        for (index, column) in layout.columns.iter().enumerate() {
            column_names.push(column.name.clone());
            builder.push_str("  ");
            Self::write_existing_column(&mut builder, &column.name, column, false);
            if index < size - 1 {
                builder.push_str(",\n");
            }
        }
        builder.push_str("\n)");
        self.copy_table(
            cancel,
            driver,
            &builder,
            &column_names,
            &replacement,
            &node.table_name,
            &layout.index_sql,
            &HashMap::new(),
        )
        .await
    }

    async fn rename_table(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &RenameTableNode,
    ) -> Result<()> {
        self.base.rename_table(cancel, driver, node).await
    }

    async fn alter_table_remarks(
        &self,
        _cancel: &CancellationToken,
        _driver: &dyn Driver,
        node: &AlterTableRemarksNode,
    ) -> Result<()> {
        debug!(
            table = %node.table_name,
            "sqlite has no table comment syntax, ignoring remarks"
        );
        Ok(())
    }

    async fn script(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &ScriptNode,
    ) -> Result<()> {
        self.base.script(cancel, driver, node).await
    }
}
