//! VastBase dialect.
//!
//! VastBase is wire- and syntax-compatible with PostgreSQL, so this
//! generator delegates wholesale to [`PostgresMigratory`], including the
//! reported name, so `columnDialect` overrides and `script` nodes tagged
//! `postgres` apply under VastBase too.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::driver::Driver;
use crate::error::Result;
use crate::node::{
    AddColumnNode, AlterColumnNode, AlterTableRemarksNode, CreateIndexNode, CreatePrimaryKeyNode,
    CreateTableNode, DropColumnNode, DropIndexNode, DropPrimaryKeyNode, DropTableNode,
    RenameColumnNode, RenameTableNode, ScriptNode,
};
use crate::quote::QuotePolicy;
use crate::version::ChangeVersion;

use super::{Migratory, PostgresMigratory, QuotePolicyExt};

/// VastBase SQL generator.
#[derive(Debug, Clone)]
pub struct VastbaseMigratory {
    inner: PostgresMigratory,
}

impl VastbaseMigratory {
    pub fn new() -> Self {
        Self {
            inner: PostgresMigratory::new(),
        }
    }
}

impl Default for VastbaseMigratory {
    fn default() -> Self {
        Self::new()
    }
}

impl QuotePolicyExt for VastbaseMigratory {
    fn with_quote_policy(self, policy: QuotePolicy) -> Self {
        Self {
            inner: self.inner.with_quote_policy(policy),
        }
    }
}

#[async_trait]
impl Migratory for VastbaseMigratory {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn init_change_log_table(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        change_table: &str,
    ) -> Result<()> {
        self.inner
            .init_change_log_table(cancel, driver, change_table)
            .await
    }

    async fn last_version(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        change_table: &str,
    ) -> Result<Option<ChangeVersion>> {
        self.inner.last_version(cancel, driver, change_table).await
    }

    async fn new_change_log(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        change_table: &str,
        version: &str,
    ) -> Result<()> {
        self.inner
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
        self.inner
            .complete_change_log(cancel, driver, change_table, version)
            .await
    }

    async fn create_table(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &CreateTableNode,
    ) -> Result<()> {
        self.inner.create_table(cancel, driver, node).await
    }

    async fn create_index(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &CreateIndexNode,
    ) -> Result<()> {
        self.inner.create_index(cancel, driver, node).await
    }

    async fn create_primary_key(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &CreatePrimaryKeyNode,
    ) -> Result<()> {
        self.inner.create_primary_key(cancel, driver, node).await
    }

    async fn drop_table(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &DropTableNode,
    ) -> Result<()> {
        self.inner.drop_table(cancel, driver, node).await
    }

    async fn drop_index(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &DropIndexNode,
    ) -> Result<()> {
        self.inner.drop_index(cancel, driver, node).await
    }

    async fn add_column(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &AddColumnNode,
    ) -> Result<()> {
        self.inner.add_column(cancel, driver, node).await
    }

    async fn rename_column(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &RenameColumnNode,
    ) -> Result<()> {
        self.inner.rename_column(cancel, driver, node).await
    }

    async fn alter_column(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &AlterColumnNode,
    ) -> Result<()> {
        self.inner.alter_column(cancel, driver, node).await
    }

    async fn drop_column(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &DropColumnNode,
    ) -> Result<()> {
        self.inner.drop_column(cancel, driver, node).await
    }

    async fn drop_primary_key(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &DropPrimaryKeyNode,
    ) -> Result<()> {
        self.inner.drop_primary_key(cancel, driver, node).await
    }

    async fn rename_table(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &RenameTableNode,
    ) -> Result<()> {
        self.inner.rename_table(cancel, driver, node).await
    }

    async fn alter_table_remarks(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &AlterTableRemarksNode,
    ) -> Result<()> {
        self.inner.alter_table_remarks(cancel, driver, node).await
    }

    async fn script(
        &self,
        cancel: &CancellationToken,
        driver: &dyn Driver,
        node: &ScriptNode,
    ) -> Result<()> {
        self.inner.script(cancel, driver, node).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::DryRunDriver;

    #[test]
    fn test_reports_postgres_name() {
        assert_eq!(VastbaseMigratory::new().name(), "postgres");
    }

    #[tokio::test]
    async fn test_postgres_tagged_script_applies() {
        let migratory = VastbaseMigratory::new();
        let driver = DryRunDriver::new();
        migratory
            .script(
                &CancellationToken::new(),
                &driver,
                &ScriptNode {
                    dialect: "postgres".to_string(),
                    value: "SELECT 1;".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(driver.executed(), vec!["SELECT 1"]);
    }
}
