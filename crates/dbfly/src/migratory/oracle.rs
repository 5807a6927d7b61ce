//! Oracle dialect.
//!
//! Configuration-only: Oracle takes the generic SQL shapes as-is and only
//! differs in its type map (`NUMBER`-based integers, `VARCHAR2`), its
//! table-listing query and its identity column DDL.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::driver::Driver;
use crate::error::Result;
use crate::node::{
    AddColumnNode, AlterColumnNode, AlterTableRemarksNode, CreateIndexNode, CreatePrimaryKeyNode,
    CreateTableNode, DataType, DropColumnNode, DropIndexNode, DropPrimaryKeyNode, DropTableNode,
    RenameColumnNode, RenameTableNode, ScriptNode,
};
use crate::quote::QuotePolicy;
use crate::version::ChangeVersion;

use super::{DialectConfig, GenericMigratory, Migratory, QuotePolicyExt};

fn oracle_config() -> DialectConfig {
    let mut type_map = HashMap::new();
    type_map.insert(DataType::Varchar, "VARCHAR2");
    type_map.insert(DataType::Char, "CHAR");
    type_map.insert(DataType::Text, "CLOB");
    type_map.insert(DataType::Clob, "CLOB");
    type_map.insert(DataType::Boolean, "NUMBER(1)");
    type_map.insert(DataType::Tinyint, "NUMBER(3)");
    type_map.insert(DataType::Smallint, "NUMBER(5)");
    type_map.insert(DataType::Int, "NUMBER(10)");
    type_map.insert(DataType::Bigint, "NUMBER(19)");
    type_map.insert(DataType::Decimal, "NUMBER");
    type_map.insert(DataType::Date, "DATE");
    type_map.insert(DataType::Time, "TIMESTAMP");
    type_map.insert(DataType::Timestamp, "TIMESTAMP");
    type_map.insert(DataType::Blob, "BLOB");
    DialectConfig {
        name: "oracle",
        show_tables_sql: "SELECT TABLE_NAME FROM user_tables",
        type_map,
        identity_type: "NUMBER(19) GENERATED BY DEFAULT AS IDENTITY",
        quote_prefix: b'"',
        quote_suffix: b'"',
        quote_policy: QuotePolicy::Always,
        reserved_words: Default::default(),
    }
}

/// Oracle SQL generator.
#[derive(Debug, Clone)]
pub struct OracleMigratory {
    base: GenericMigratory,
}

impl OracleMigratory {
    pub fn new() -> Self {
        Self {
            base: GenericMigratory::new(oracle_config()),
        }
    }
}

impl Default for OracleMigratory {
    fn default() -> Self {
        Self::new()
    }
}

impl QuotePolicyExt for OracleMigratory {
    fn with_quote_policy(self, policy: QuotePolicy) -> Self {
        Self {
            base: self.base.with_quote_policy(policy),
        }
    }
}

#[async_trait]
impl Migratory for OracleMigratory {
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
        self.base.alter_column(cancel, driver, node).await
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::DryRunDriver;
    use crate::migratory::test_support::column;

    #[tokio::test]
    async fn test_number_based_type_map() {
        let migratory = OracleMigratory::new();
        let driver = DryRunDriver::new();
        let mut amount = column("amount", DataType::Decimal);
        amount.max_length = 10;
        amount.numeric_scale = 2;
        let mut flag = column("flag", DataType::Boolean);
        flag.nullable = true;
        let node = AddColumnNode {
            table_name: "t".to_string(),
            columns: vec![amount, flag],
        };
        migratory
            .add_column(&CancellationToken::new(), &driver, &node)
            .await
            .unwrap();
        assert_eq!(
            driver.executed(),
            vec![
                "ALTER TABLE \"t\" ADD \"amount\" NUMBER(10, 2) NOT NULL",
                "ALTER TABLE \"t\" ADD \"flag\" NUMBER(1)",
            ]
        );
    }

    #[tokio::test]
    async fn test_change_log_uses_identity() {
        let migratory = OracleMigratory::new();
        let driver = DryRunDriver::new();
        migratory
            .init_change_log_table(&CancellationToken::new(), &driver, "DBFLY_CHANGE_LOG")
            .await
            .unwrap();
        let executed = driver.executed();
        assert!(executed[0].contains("\"ID\" NUMBER(19) GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY"));
        assert!(executed[0].contains("\"CHANGE_VERSION\" VARCHAR2(255) NOT NULL"));
    }
}
