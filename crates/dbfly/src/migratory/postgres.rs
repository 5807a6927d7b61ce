//! PostgreSQL dialect.
//!
//! PostgreSQL has no `MODIFY` clause, so altering a column expands into an
//! `ALTER COLUMN` statement sequence (type, default, nullability), and
//! dropping a primary key first looks up the constraint name in
//! `information_schema` because `DROP PRIMARY KEY` is not PostgreSQL syntax.
//! Identifiers are left unquoted (policy `Never`) and fold to lowercase.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::driver::{Driver, Value};
use crate::error::{MigrateError, Result};
use crate::node::{
    AddColumnNode, AlterColumnNode, AlterTableRemarksNode, CreateIndexNode, CreatePrimaryKeyNode,
    CreateTableNode, DataType, DropColumnNode, DropIndexNode, DropPrimaryKeyNode, DropTableNode,
    RenameColumnNode, RenameTableNode, ScriptNode,
};
use crate::quote::QuotePolicy;
use crate::sql::column_type;
use crate::version::ChangeVersion;

use super::{DialectConfig, GenericMigratory, Migratory, QuotePolicyExt};

fn postgres_config() -> DialectConfig {
    let mut type_map = HashMap::new();
    type_map.insert(DataType::Varchar, "VARCHAR");
    type_map.insert(DataType::Char, "CHAR");
    type_map.insert(DataType::Text, "TEXT");
    type_map.insert(DataType::Clob, "TEXT");
    type_map.insert(DataType::Boolean, "SMALLINT");
    type_map.insert(DataType::Tinyint, "SMALLINT");
    type_map.insert(DataType::Smallint, "SMALLINT");
    type_map.insert(DataType::Int, "INTEGER");
    type_map.insert(DataType::Bigint, "BIGINT");
    type_map.insert(DataType::Decimal, "DECIMAL");
    type_map.insert(DataType::Date, "DATE");
    type_map.insert(DataType::Time, "TIME");
    type_map.insert(DataType::Timestamp, "TIMESTAMP");
    type_map.insert(DataType::Blob, "BYTEA");
    DialectConfig {
        name: "postgres",
        show_tables_sql: "SELECT table_name FROM information_schema.tables \
                          WHERE table_schema = current_schema() AND table_type = 'BASE TABLE'",
        type_map,
        identity_type: "SERIAL",
        quote_prefix: b'"',
        quote_suffix: b'"',
        quote_policy: QuotePolicy::Never,
        reserved_words: Default::default(),
    }
}

/// PostgreSQL SQL generator.
#[derive(Debug, Clone)]
pub struct PostgresMigratory {
    base: GenericMigratory,
}

impl PostgresMigratory {
    pub fn new() -> Self {
        Self {
            base: GenericMigratory::new(postgres_config()),
        }
    }
}

impl Default for PostgresMigratory {
    fn default() -> Self {
        Self::new()
    }
}

impl QuotePolicyExt for PostgresMigratory {
    fn with_quote_policy(self, policy: QuotePolicy) -> Self {
        Self {
            base: self.base.with_quote_policy(policy),
        }
    }
}

#[async_trait]
impl Migratory for PostgresMigratory {
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

    async fn create_table(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &CreateTableNode,
    ) -> Result<()> {
        self.base.create_table(cancel, driver, node).await
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
        self.base.create_primary_key(cancel, driver, node).await
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

    async fn add_column(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &AddColumnNode,
    ) -> Result<()> {
        self.base.add_column(cancel, driver, node).await
    }

    async fn rename_column(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &RenameColumnNode,
    ) -> Result<()> {
        self.base.rename_column(cancel, driver, node).await
    }

    async fn alter_column(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &AlterColumnNode,
    ) -> Result<()> {
        let column = &node.column;
        if column.primary_key {
            return Err(MigrateError::Validation(
                "alter columns is not allowed as a primary key".to_string(),
            ));
        }
        let table = self.base.quote(&node.table_name);
        let name = self.base.quote(&node.column_name);

        let dialect = column
            .dialects
            .iter()
            .find(|d| d.dialect == self.name());
        let (data_type, default_value) = match dialect {
            Some(dialect) => (
                dialect.data_type.clone(),
                super::render_default(&dialect.default_origin_value, &dialect.default_value),
            ),
            None => (
                column_type(
                    column.data_type,
                    self.base.config().physical(column.data_type),
                    column.max_length,
                    column.numeric_scale,
                ),
                super::render_default(&column.default_origin_value, &column.default_value),
            ),
        };

        let mut statements = vec![format!(
            "ALTER TABLE {} ALTER COLUMN {} TYPE {}",
            table, name, data_type
        )];
        match default_value {
            Some(default_value) => statements.push(format!(
                "ALTER TABLE {} ALTER COLUMN {} SET DEFAULT {}",
                table, name, default_value
            )),
            None => statements.push(format!(
                "ALTER TABLE {} ALTER COLUMN {} DROP DEFAULT",
                table, name
            )),
        }
        if column.nullable {
            statements.push(format!(
                "ALTER TABLE {} ALTER COLUMN {} DROP NOT NULL",
                table, name
            ));
        } else {
            statements.push(format!(
                "ALTER TABLE {} ALTER COLUMN {} SET NOT NULL",
                table, name
            ));
        }
        if column.unique {
            statements.push(format!("ALTER TABLE {} ADD UNIQUE ({})", table, name));
        }
        for statement in statements {
            driver.execute(cancel, &statement, &[]).await?;
        }
        Ok(())
    }

    async fn drop_column(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &DropColumnNode,
    ) -> Result<()> {
        self.base.drop_column(cancel, driver, node).await
    }

    async fn drop_primary_key(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &DropPrimaryKeyNode,
    ) -> Result<()> {
        let sql = "SELECT constraint_name FROM information_schema.table_constraints \
                   WHERE lower(table_name) = lower(?) AND constraint_type = 'PRIMARY KEY'";
        let mut rows = driver
            .query(cancel, sql, &[Value::from(node.table_name.as_str())])
            .await?;
        let constraint = match rows.next().await? {
            Some(row) => row.get_str(0)?.to_string(),
            None => {
                return Err(MigrateError::Validation(format!(
                    "table {} has no primary key constraint",
                    node.table_name
                )))
            }
        };
        let sql = format!(
            "ALTER TABLE {} DROP CONSTRAINT {}",
            self.base.quote(&node.table_name),
            self.base.quote(&constraint)
        );
        driver.execute(cancel, &sql, &[]).await
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
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &AlterTableRemarksNode,
    ) -> Result<()> {
        self.base.alter_table_remarks(cancel, driver, node).await
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
