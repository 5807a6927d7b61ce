//! DM (Dameng) dialect.
//!
//! Configuration-only: DM accepts the generic SQL shapes with a
//! near-standard type map, the Oracle-style `user_tables` listing and an
//! `IDENTITY` change-log id.

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

fn dm_config() -> DialectConfig {
    let mut type_map = HashMap::new();
    type_map.insert(DataType::Varchar, "VARCHAR");
    type_map.insert(DataType::Char, "CHAR");
    type_map.insert(DataType::Text, "TEXT");
    type_map.insert(DataType::Clob, "CLOB");
    type_map.insert(DataType::Boolean, "BOOLEAN");
    type_map.insert(DataType::Tinyint, "TINYINT");
    type_map.insert(DataType::Smallint, "SMALLINT");
    type_map.insert(DataType::Int, "INT");
    type_map.insert(DataType::Bigint, "BIGINT");
    type_map.insert(DataType::Decimal, "DECIMAL");
    type_map.insert(DataType::Date, "DATE");
    type_map.insert(DataType::Time, "TIME");
    type_map.insert(DataType::Timestamp, "TIMESTAMP");
    type_map.insert(DataType::Blob, "BLOB");
    DialectConfig {
        name: "dm",
        show_tables_sql: "SELECT TABLE_NAME FROM user_tables",
        type_map,
        identity_type: "BIGINT IDENTITY(1, 1)",
        quote_prefix: b'"',
        quote_suffix: b'"',
        quote_policy: QuotePolicy::Always,
        reserved_words: Default::default(),
    }
}

/// DM SQL generator.
#[derive(Debug, Clone)]
pub struct DmMigratory {
    base: GenericMigratory,
}

impl DmMigratory {
    pub fn new() -> Self {
        Self {
            base: GenericMigratory::new(dm_config()),
        }
    }
}

impl Default for DmMigratory {
    fn default() -> Self {
        Self::new()
    }
}

impl QuotePolicyExt for DmMigratory {
    fn with_quote_policy(self, policy: QuotePolicy) -> Self {
        Self {
            base: self.base.with_quote_policy(policy),
        }
    }
}

#[async_trait]
impl Migratory for DmMigratory {
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
    use crate::node::ScriptNode;

    #[tokio::test]
    async fn test_script_matches_dm_tag() {
        let migratory = DmMigratory::new();
        let driver = DryRunDriver::new();
        migratory
            .script(
                &CancellationToken::new(),
                &driver,
                &ScriptNode {
                    dialect: "dm".to_string(),
                    value: "SELECT 1;".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(driver.executed(), vec!["SELECT 1"]);
    }

    #[tokio::test]
    async fn test_change_log_uses_identity() {
        let migratory = DmMigratory::new();
        let driver = DryRunDriver::new();
        migratory
            .init_change_log_table(&CancellationToken::new(), &driver, "DBFLY_CHANGE_LOG")
            .await
            .unwrap();
        assert!(driver.executed()[0].contains("\"ID\" BIGINT IDENTITY(1, 1) PRIMARY KEY"));
    }
}
