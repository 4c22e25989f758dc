//! User (tenant) command handlers.

use crate::commands::Out;
use crate::tenant::{CurrentUser, TenantId};
use crate::{Config, Result};
use serde::Serialize;
use std::path::PathBuf;

/// Identifies a user and the SQLite file that holds their ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserInfo {
    pub user_id: TenantId,
    pub db_path: PathBuf,
}

/// Provisions the ledger for `tenant`. Calling it for a user that already exists is harmless and
/// leaves their data untouched.
pub async fn initialize_user(config: &Config, tenant: &TenantId) -> Result<Out<UserInfo>> {
    let ledger = config.ledger(tenant).await?;
    let info = UserInfo {
        user_id: ledger.tenant().clone(),
        db_path: config.ledger_path(tenant),
    };
    Ok(Out::new(format!("Initialized user '{tenant}'"), info))
}

/// Provisions the ledger for `tenant` and makes it the user for requests that do not name one.
pub async fn set_current_user(
    config: &Config,
    current: &CurrentUser,
    tenant: &TenantId,
) -> Result<Out<UserInfo>> {
    let out = initialize_user(config, tenant).await?;
    let previous = current.set(tenant.clone()).await;
    Ok(match out.data() {
        Some(info) => Out::new(
            format!("Switched the current user from '{previous}' to '{tenant}'"),
            info.clone(),
        ),
        None => out,
    })
}

pub async fn get_current_user(config: &Config, current: &CurrentUser) -> Result<Out<UserInfo>> {
    let tenant = current.get().await;
    let info = UserInfo {
        db_path: config.ledger_path(&tenant),
        user_id: tenant,
    };
    Ok(Out::new(format!("The current user is '{}'", info.user_id), info))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::AddExpenseArgs;
    use crate::commands::{add_expense, list_expenses};
    use crate::args::DateRangeArgs;
    use crate::test::TestEnv;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn test_initialize_user_is_idempotent() {
        let env = TestEnv::new().await;
        let bob = TenantId::new("bob").unwrap();
        let first = initialize_user(env.config_ref(), &bob).await.unwrap();
        let info = first.data().unwrap();
        assert_eq!(info.user_id, bob);
        assert!(info.db_path.is_file());
        assert!(info.db_path.starts_with(env.config_ref().data_dir()));

        add_expense(
            env.config_ref(),
            &bob,
            AddExpenseArgs {
                date: "2024-01-01".to_string(),
                amount: Decimal::from(3),
                category: "food".to_string(),
                subcategory: String::new(),
                note: String::new(),
            },
        )
        .await
        .unwrap();
        initialize_user(env.config_ref(), &bob).await.unwrap();
        let out = list_expenses(env.config_ref(), &bob, DateRangeArgs::default())
            .await
            .unwrap();
        assert_eq!(out.data().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_set_and_get_current_user() {
        let env = TestEnv::new().await;
        let current = CurrentUser::new(env.user().clone());
        let out = get_current_user(env.config_ref(), &current).await.unwrap();
        assert_eq!(&out.data().unwrap().user_id, env.user());

        let carol = TenantId::new("carol").unwrap();
        let out = set_current_user(env.config_ref(), &current, &carol)
            .await
            .unwrap();
        assert!(out.data().unwrap().db_path.is_file());
        assert_eq!(current.get().await, carol);

        let out = get_current_user(env.config_ref(), &current).await.unwrap();
        assert_eq!(out.data().unwrap().user_id, carol);
    }
}
