//! Shared test utilities for creating test environments.
//!
//! This module is only compiled when running tests (`#[cfg(test)]`).

use crate::tenant::TenantId;
use crate::Config;
use tempfile::TempDir;
use uuid::Uuid;

/// Test environment that sets up an expense-ledger home directory with the default vocabulary and
/// a provisioned ledger for a randomly named user.
/// Holds TempDir to keep the directory alive for the duration of the test.
pub struct TestEnv {
    _temp_dir: TempDir,
    config: Config,
    user: TenantId,
}

impl TestEnv {
    /// Creates a test environment with Config and an initialized ledger for `user()`.
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("expense-ledger");
        let rand = Uuid::new_v4().simple().to_string();
        let user = TenantId::new(format!("user-{}", &rand[..12])).unwrap();
        let config = Config::create(&root, user.as_str()).await.unwrap();
        config.ledger(&user).await.unwrap();

        Self {
            _temp_dir: temp_dir,
            config,
            user,
        }
    }

    /// Returns a clone of the Config.
    pub fn config(&self) -> Config {
        self.config.clone()
    }

    pub fn config_ref(&self) -> &Config {
        &self.config
    }

    /// The user the environment was created with. It is also the configured default user.
    pub fn user(&self) -> &TenantId {
        &self.user
    }
}
