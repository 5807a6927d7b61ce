//! Migration orchestrator - main workflow coordinator.
//!
//! One run per call: discover the available change descriptors, order them
//! by version, make sure the change-log table exists, then apply every
//! version newer than the last completed one. Each version gets an
//! in-progress change-log row before its nodes run and a completion update
//! after they all succeed. Execution is strictly sequential; the first
//! error aborts the run and leaves the failing version's row in-progress.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::MigrateSettings;
use crate::driver::Driver;
use crate::error::{MigrateError, Result};
use crate::migratory::{migratory_for, Migratory, DEFAULT_CHANGE_TABLE};
use crate::node::{decode_changes, Node, ScriptNode, ALL_DIALECTS};
use crate::source::{ChangeDescriptor, Source};

/// Schema migration engine.
pub struct Migrator {
    migratory: Box<dyn Migratory>,
    driver: Box<dyn Driver>,
    source: Box<dyn Source>,
    change_table: String,
}

impl Migrator {
    /// Create a migrator from its three collaborators.
    pub fn new(
        migratory: Box<dyn Migratory>,
        driver: Box<dyn Driver>,
        source: Box<dyn Source>,
    ) -> Self {
        Self {
            migratory,
            driver,
            source,
            change_table: DEFAULT_CHANGE_TABLE.to_string(),
        }
    }

    /// Create a migrator by resolving the dialect from settings.
    pub fn from_settings(
        settings: &MigrateSettings,
        driver: Box<dyn Driver>,
        source: Box<dyn Source>,
    ) -> Result<Self> {
        let migratory = migratory_for(&settings.dialect, settings.quote_policy)?;
        let mut migrator = Self::new(migratory, driver, source);
        if let Some(change_table) = &settings.change_table {
            migrator.change_table = change_table.clone();
        }
        Ok(migrator)
    }

    /// Override the change-log table name.
    pub fn with_change_table(mut self, name: impl Into<String>) -> Self {
        self.change_table = name.into();
        self
    }

    /// Run all pending migrations.
    pub async fn migrate(&self) -> Result<()> {
        self.migrate_with_cancel(CancellationToken::new()).await
    }

    /// Run all pending migrations under a cancellation token.
    ///
    /// The token is checked by the driver before every statement; a
    /// statement already issued is not rolled back on cancellation.
    pub async fn migrate_with_cancel(&self, cancel: CancellationToken) -> Result<()> {
        let mut descriptors = self.source.scan()?;
        if descriptors.is_empty() {
            info!("no change descriptors found, nothing to migrate");
            return Ok(());
        }
        descriptors.sort_by(|a, b| a.version.cmp(&b.version));

        self.migratory
            .init_change_log_table(&cancel, self.driver.as_ref(), &self.change_table)
            .await?;
        let last_version = self
            .migratory
            .last_version(&cancel, self.driver.as_ref(), &self.change_table)
            .await?;
        if let Some(last) = &last_version {
            debug!(version = %last, "last completed version");
        }

        for descriptor in &descriptors {
            if let Some(last) = &last_version {
                if descriptor.version <= *last {
                    debug!(version = %descriptor.version, "already applied, skipping");
                    continue;
                }
            }
            self.apply_version(&cancel, descriptor).await?;
        }
        Ok(())
    }

    async fn apply_version(
        &self,
        cancel: &CancellationToken,
        descriptor: &ChangeDescriptor,
    ) -> Result<()> {
        let nodes = self.load_nodes(descriptor)?;
        info!(
            version = %descriptor.version,
            nodes = nodes.len(),
            "applying migration version"
        );
        let driver = self.driver.as_ref();
        self.migratory
            .new_change_log(
                cancel,
                driver,
                &self.change_table,
                descriptor.version.original(),
            )
            .await?;
        for node in &nodes {
            self.dispatch(cancel, node).await?;
        }
        self.migratory
            .complete_change_log(
                cancel,
                driver,
                &self.change_table,
                descriptor.version.original(),
            )
            .await
    }

    fn load_nodes(&self, descriptor: &ChangeDescriptor) -> Result<Vec<Node>> {
        let content = self.source.read(&descriptor.uid)?;
        if descriptor.raw_script {
            let value = String::from_utf8(content).map_err(|_| {
                MigrateError::Source(format!("script {} is not valid UTF-8", descriptor.uid))
            })?;
            return Ok(vec![Node::Script(ScriptNode {
                dialect: ALL_DIALECTS.to_string(),
                value,
            })]);
        }
        decode_changes(&content)
    }

    async fn dispatch(&self, cancel: &CancellationToken, node: &Node) -> Result<()> {
        let driver = self.driver.as_ref();
        match node {
            Node::CreateTable(node) => self.migratory.create_table(cancel, driver, node).await,
            Node::CreateIndex(node) => self.migratory.create_index(cancel, driver, node).await,
            Node::CreatePrimaryKey(node) => {
                self.migratory.create_primary_key(cancel, driver, node).await
            }
            Node::DropTable(node) => self.migratory.drop_table(cancel, driver, node).await,
            Node::DropIndex(node) => self.migratory.drop_index(cancel, driver, node).await,
            Node::AddColumn(node) => self.migratory.add_column(cancel, driver, node).await,
            Node::RenameColumn(node) => self.migratory.rename_column(cancel, driver, node).await,
            Node::AlterColumn(node) => self.migratory.alter_column(cancel, driver, node).await,
            Node::DropColumn(node) => self.migratory.drop_column(cancel, driver, node).await,
            Node::DropPrimaryKey(node) => {
                self.migratory.drop_primary_key(cancel, driver, node).await
            }
            Node::RenameTable(node) => self.migratory.rename_table(cancel, driver, node).await,
            Node::AlterTableRemarks(node) => {
                self.migratory.alter_table_remarks(cancel, driver, node).await
            }
            Node::Script(node) => self.migratory.script(cancel, driver, node).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::DryRunDriver;
    use crate::migratory::SqliteMigratory;
    use crate::source::MemorySource;

    #[tokio::test]
    async fn test_empty_source_touches_nothing() {
        let driver = std::sync::Arc::new(DryRunDriver::new());
        let migrator = Migrator::new(
            Box::new(SqliteMigratory::new()),
            Box::new(driver.clone()),
            Box::new(MemorySource::new()),
        );
        migrator.migrate().await.unwrap();
        // No change-log interaction at all when there is nothing to do.
        assert!(driver.calls().is_empty());
    }

    #[tokio::test]
    async fn test_from_settings_unknown_dialect() {
        let settings = MigrateSettings::new("mssql");
        let result = Migrator::from_settings(
            &settings,
            Box::new(DryRunDriver::new()),
            Box::new(MemorySource::new()),
        );
        assert!(matches!(result, Err(MigrateError::Config(_))));
    }

    #[tokio::test]
    async fn test_cancelled_token_stops_before_first_statement() {
        let source = MemorySource::new().with_script("1.0.0", "SELECT 1;");
        let migrator = Migrator::new(
            Box::new(SqliteMigratory::new()),
            Box::new(DryRunDriver::new()),
            Box::new(source),
        );
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = migrator.migrate_with_cancel(cancel).await.unwrap_err();
        assert!(matches!(err, MigrateError::Cancelled));
    }
}
