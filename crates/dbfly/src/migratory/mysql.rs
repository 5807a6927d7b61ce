//! MySQL dialect.
//!
//! Differs from the generic generator in remark handling (inline `COMMENT`
//! clauses instead of `COMMENT ON` statements), `DROP INDEX … ON <table>`,
//! `RENAME TABLE` and dialect-tagged table attributes (`ENGINE`, `CHARSET`,
//! …) appended to `CREATE TABLE`.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::driver::Driver;
use crate::error::{MigrateError, Result};
use crate::node::{
    AddColumnNode, AlterColumnNode, AlterTableRemarksNode, ColumnNode, CreateIndexNode,
    CreatePrimaryKeyNode, CreateTableNode, DataType, DropColumnNode, DropIndexNode,
    DropPrimaryKeyNode, DropTableNode, RenameColumnNode, RenameTableNode, ScriptNode,
};
use crate::quote::QuotePolicy;
use crate::sql::escape_remarks;
use crate::version::ChangeVersion;

use super::{
    reserved_words, DialectConfig, GenericMigratory, Migratory, QuotePolicyExt,
};

/// Words MySQL requires quoting for under the `ReservedOnly` policy.
const RESERVED_WORDS: &[&str] = &[
    "ADD", "ALL", "ALTER", "ANALYZE", "AND", "AS", "ASC", "ASENSITIVE", "BEFORE", "BETWEEN",
    "BIGINT", "BINARY", "BLOB", "BOTH", "BY", "CALL", "CASCADE", "CASE", "CHAIN", "CHANGE",
    "CHAR", "CHARACTER", "CHECK", "COLLATE", "COLUMN", "CONDITION", "CONNECTION", "CONSTRAINT",
    "CONTINUE", "CONVERT", "CREATE", "CROSS", "CURRENT_DATE", "CURRENT_TIME",
    "CURRENT_TIMESTAMP", "CURRENT_USER", "CURSOR", "DATABASE", "DATABASES", "DAY_HOUR",
    "DAY_MICROSECOND", "DAY_MINUTE", "DAY_SECOND", "DEC", "DECIMAL", "DECLARE", "DEFAULT",
    "DELAYED", "DELETE", "DESC", "DESCRIBE", "DETERMINISTIC", "DISTINCT", "DISTINCTROW", "DIV",
    "DOUBLE", "DROP", "DUAL", "EACH", "ELSE", "ELSEIF", "ENCLOSED", "ESCAPED", "EXISTS", "EXIT",
    "EXPLAIN", "FALSE", "FETCH", "FLOAT", "FLOAT4", "FLOAT8", "FOR", "FORCE", "FOREIGN", "FROM",
    "FULLTEXT", "GOTO", "GRANT", "GROUP", "HAVING", "HIGH_PRIORITY", "HOUR_MICROSECOND",
    "HOUR_MINUTE", "HOUR_SECOND", "IF", "IGNORE", "IN", "INDEX", "INFILE", "INNER", "INOUT",
    "INSENSITIVE", "INSERT", "INT", "INT1", "INT2", "INT3", "INT4", "INT8", "INTEGER",
    "INTERVAL", "INTO", "IS", "ITERATE", "JOIN", "KEY", "KEYS", "KILL", "LABEL", "LEADING",
    "LEAVE", "LEFT", "LIKE", "LIMIT", "LINEAR", "LINES", "LOAD", "LOCALTIME", "LOCALTIMESTAMP",
    "LOCK", "LONG", "LONGBLOB", "LONGTEXT", "LOOP", "LOW_PRIORITY", "MATCH", "MEDIUMBLOB",
    "MEDIUMINT", "MEDIUMTEXT", "MIDDLEINT", "MINUTE_MICROSECOND", "MINUTE_SECOND", "MOD",
    "MODIFIES", "NATURAL", "NOT", "NO_WRITE_TO_BINLOG", "NULL", "NUMERIC", "ON", "OPTIMIZE",
    "OPTION", "OPTIONALLY", "OR", "ORDER", "OUT", "OUTER", "OUTFILE", "PRECISION", "PRIMARY",
    "PROCEDURE", "PURGE", "RAID0", "RANGE", "RANK", "READ", "READS", "REAL", "REFERENCES",
    "REGEXP", "RELEASE", "RENAME", "REPEAT", "REPLACE", "REQUIRE", "RESTRICT", "RETURN",
    "REVOKE", "RIGHT", "RLIKE", "SCHEMA", "SCHEMAS", "SECOND_MICROSECOND", "SELECT",
    "SENSITIVE", "SEPARATOR", "SET", "SHOW", "SMALLINT", "SPATIAL", "SPECIFIC", "SQL",
    "SQLEXCEPTION", "SQLSTATE", "SQLWARNING", "SQL_BIG_RESULT", "SQL_CALC_FOUND_ROWS",
    "SQL_SMALL_RESULT", "SSL", "STARTING", "STRAIGHT_JOIN", "TABLE", "TERMINATED", "THEN",
    "TINYBLOB", "TINYINT", "TINYTEXT", "TO", "TRAILING", "TRIGGER", "TRUE", "UNDO", "UNION",
    "UNIQUE", "UNLOCK", "UNSIGNED", "UPDATE", "USAGE", "USE", "USING", "UTC_DATE", "UTC_TIME",
    "UTC_TIMESTAMP", "VALUES", "VARBINARY", "VARCHAR", "VARCHARACTER", "VARYING", "WHEN",
    "WHERE", "WHILE", "WITH", "WRITE", "X509", "XOR", "YEAR_MONTH", "ZEROFILL",
];

fn mysql_config() -> DialectConfig {
    let mut type_map = HashMap::new();
    type_map.insert(DataType::Varchar, "VARCHAR");
    type_map.insert(DataType::Char, "CHAR");
    type_map.insert(DataType::Text, "MEDIUMTEXT");
    type_map.insert(DataType::Clob, "LONGTEXT");
    type_map.insert(DataType::Boolean, "TINYINT");
    type_map.insert(DataType::Tinyint, "TINYINT");
    type_map.insert(DataType::Smallint, "SMALLINT");
    type_map.insert(DataType::Int, "INT");
    type_map.insert(DataType::Bigint, "BIGINT");
    type_map.insert(DataType::Decimal, "DECIMAL");
    type_map.insert(DataType::Date, "DATE");
    type_map.insert(DataType::Time, "TIME");
    type_map.insert(DataType::Timestamp, "DATETIME");
    type_map.insert(DataType::Blob, "BLOB");
    DialectConfig {
        name: "mysql",
        show_tables_sql:
            "SELECT table_name FROM information_schema.tables WHERE table_schema = DATABASE()",
        type_map,
        identity_type: "BIGINT AUTO_INCREMENT",
        quote_prefix: b'`',
        quote_suffix: b'`',
        quote_policy: QuotePolicy::Always,
        reserved_words: reserved_words(RESERVED_WORDS),
    }
}

/// MySQL SQL generator.
#[derive(Debug, Clone)]
pub struct MysqlMigratory {
    base: GenericMigratory,
}

impl MysqlMigratory {
    pub fn new() -> Self {
        Self {
            base: GenericMigratory::new(mysql_config()),
        }
    }

    /// Render a column definition with its inline `COMMENT` clause.
    fn render_column(&self, column: &ColumnNode, buf: &mut String) -> bool {
        let pk = self.base.render_column(column, buf);
        if !column.remarks.is_empty() {
            buf.push_str(" COMMENT '");
            buf.push_str(&escape_remarks(&column.remarks));
            buf.push('\'');
        }
        pk
    }
}

impl Default for MysqlMigratory {
    fn default() -> Self {
        Self::new()
    }
}

impl QuotePolicyExt for MysqlMigratory {
    fn with_quote_policy(self, policy: QuotePolicy) -> Self {
        Self {
            base: self.base.with_quote_policy(policy),
        }
    }
}

#[async_trait]
impl Migratory for MysqlMigratory {
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
        let mut builder = String::from("CREATE TABLE ");
        self.base.quote_to(&mut builder, &node.table_name);
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
                self.base.quote_to(&mut builder, &pk.key_name);
                builder.push_str(" PRIMARY KEY (");
                self.base.quote_to(&mut builder, &pk.column_name);
                builder.push(')');
            }
        }
        builder.push_str("\n)");
        for attribute in &node.attributes {
            if attribute.dialect != self.name() {
                continue;
            }
            builder.push(' ');
            builder.push_str(&attribute.name);
            builder.push_str(" = ");
            builder.push_str(&attribute.value);
        }
        if !node.remarks.is_empty() {
            builder.push_str(" COMMENT '");
            builder.push_str(&escape_remarks(&node.remarks));
            builder.push('\'');
        }
        driver.execute(cancel, &builder, &[]).await
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
        let sql = format!(
            "DROP INDEX {} ON {}",
            self.base.quote(&node.index_name),
            self.base.quote(&node.table_name)
        );
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
            self.base.quote_to(&mut builder, &node.table_name);
            builder.push_str(" ADD ");
            if self.render_column(column, &mut builder) {
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
        self.base.rename_column(cancel, driver, node).await
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
        self.base.quote_to(&mut builder, &node.table_name);
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
        self.base.drop_column(cancel, driver, node).await
    }

    async fn drop_primary_key(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &DropPrimaryKeyNode,
    ) -> Result<()> {
        self.base.drop_primary_key(cancel, driver, node).await
    }

    async fn rename_table(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &RenameTableNode,
    ) -> Result<()> {
        let sql = format!(
            "RENAME TABLE {} TO {}",
            self.base.quote(&node.table_name),
            self.base.quote(&node.new_table_name)
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
            "ALTER TABLE {} COMMENT '{}'",
            self.base.quote(&node.table_name),
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
        self.base.script(cancel, driver, node).await
    }
}
