use crate::commands::Out;
use crate::{Config, Result};
use std::path::Path;

/// Creates the home directory and:
/// - writes an initial `config.json` naming `default_user`
/// - writes the default `categories.json` and `saving_sources.json` unless they already exist
/// - creates the `data` directory that holds one SQLite database per user
///
/// # Arguments
/// - `home` - The directory that will be the root of the data, e.g. `$HOME/expense-ledger`
/// - `default_user` - The user that MCP sessions start out with.
///
/// # Errors
/// - Returns a `Validation` error if `default_user` is not a valid user id.
/// - Returns a `Config` error if any file operation fails.
pub async fn init(home: &Path, default_user: &str) -> Result<Out<()>> {
    let config = Config::create(home, default_user).await?;
    Ok(format!(
        "Successfully created the expense-ledger home at {}",
        config.root().display()
    )
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorType;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_then_load() {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("ledger");
        init(&home, "alice").await.unwrap();
        let config = Config::load(&home).await.unwrap();
        assert_eq!(config.default_user().as_str(), "alice");
        assert!(config.data_dir().is_dir());
    }

    #[tokio::test]
    async fn test_init_rejects_bad_user() {
        let dir = TempDir::new().unwrap();
        let err = init(dir.path(), "../escape").await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Validation);
    }
}
