use thiserror::Error;
use tracing::{error, info, warn};

use crate::access::AccessList;
use crate::auth::{AuthError, AuthProvider};

/// Where the access list lives. A trait so the saga can run against an
/// in-memory list in tests.
pub trait AccessStore {
    async fn load(&self) -> anyhow::Result<AccessList>;
    async fn save(&self, list: &AccessList) -> anyhow::Result<()>;
}

#[derive(Debug, Clone)]
pub struct ProvisionRequest {
    pub email: String,
    pub password: String,
    pub masked: bool,
}

#[derive(Debug, Clone)]
pub struct AdminCredentials {
    pub email: String,
    pub password: String,
}

/// Which step of the sequence failed, so the operator knows exactly what
/// state the system was left in.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("invalid request: {0}")]
    Invalid(String),
    #[error("step 1/3 (save access list) failed: {0}")]
    SaveAccessList(#[source] anyhow::Error),
    #[error("step 2/3 (create account) failed: {0}")]
    CreateAccount(#[source] AuthError),
    #[error("step 3/3 (re-authenticate admin) failed: {0}")]
    ReauthenticateAdmin(#[source] AuthError),
}

/// Provisions a masked-view user: append to the access list, create the
/// login, then verify the admin credentials still sign in (account creation
/// switches the active session on the original backend). There is no
/// atomicity across the steps; a failure after step 1 triggers a
/// compensating write restoring the previous list, itself best-effort.
pub async fn provision_user<S, A>(
    store: &S,
    auth: &A,
    admin: &AdminCredentials,
    request: &ProvisionRequest,
) -> Result<(), ProvisionError>
where
    S: AccessStore,
    A: AuthProvider,
{
    let email = request.email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(ProvisionError::Invalid(format!(
            "'{email}' is not a valid email address"
        )));
    }
    if request.password.len() < 6 {
        return Err(ProvisionError::Invalid(
            "password must be at least 6 characters".to_string(),
        ));
    }

    let previous = store.load().await.map_err(ProvisionError::SaveAccessList)?;
    if previous.find(&email).is_some() {
        return Err(ProvisionError::Invalid(format!(
            "{email} is already in the access list"
        )));
    }

    let mut next = previous.clone();
    next.add(&email, request.masked)
        .map_err(|e| ProvisionError::Invalid(e.to_string()))?;

    info!(email = %email, "provision step 1/3: saving access list");
    store
        .save(&next)
        .await
        .map_err(ProvisionError::SaveAccessList)?;

    info!(email = %email, "provision step 2/3: creating account");
    if let Err(e) = auth.create_account(&email, &request.password).await {
        rollback(store, &previous, &email).await;
        return Err(ProvisionError::CreateAccount(e));
    }

    info!(admin = %admin.email, "provision step 3/3: re-authenticating admin");
    if let Err(e) = auth.sign_in(&admin.email, &admin.password).await {
        rollback(store, &previous, &email).await;
        return Err(ProvisionError::ReauthenticateAdmin(e));
    }

    info!(email = %email, masked = request.masked, "user provisioned");
    Ok(())
}

async fn rollback<S: AccessStore>(store: &S, previous: &AccessList, email: &str) {
    warn!(email = %email, "provision failed, restoring previous access list");
    if let Err(e) = store.save(previous).await {
        // The roster and the account backend may now disagree; surface it
        // instead of hiding it.
        error!(
            email = %email,
            error = %e,
            "rollback failed: access list may still contain the new entry"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryStore {
        list: Mutex<AccessList>,
        fail_saves_after: Mutex<Option<usize>>,
        saves: Mutex<usize>,
    }

    impl AccessStore for MemoryStore {
        async fn load(&self) -> anyhow::Result<AccessList> {
            Ok(self.list.lock().unwrap().clone())
        }

        async fn save(&self, list: &AccessList) -> anyhow::Result<()> {
            let mut saves = self.saves.lock().unwrap();
            *saves += 1;
            if let Some(limit) = *self.fail_saves_after.lock().unwrap() {
                if *saves > limit {
                    anyhow::bail!("settings write refused");
                }
            }
            *self.list.lock().unwrap() = list.clone();
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeAuth {
        accounts: Mutex<Vec<(String, String)>>,
        refuse_creates: bool,
    }

    impl AuthProvider for FakeAuth {
        async fn sign_in(&self, email: &str, password: &str) -> Result<(), AuthError> {
            let accounts = self.accounts.lock().unwrap();
            if accounts
                .iter()
                .any(|(e, p)| e == &email.to_lowercase() && p == password)
            {
                Ok(())
            } else {
                Err(AuthError::InvalidCredentials)
            }
        }

        async fn create_account(&self, email: &str, password: &str) -> Result<(), AuthError> {
            if self.refuse_creates {
                return Err(AuthError::EmailAlreadyInUse);
            }
            self.accounts
                .lock()
                .unwrap()
                .push((email.to_lowercase(), password.to_string()));
            Ok(())
        }

        async fn reset_password(&self, email: &str) -> Result<String, AuthError> {
            Err(AuthError::AccountNotFound(email.to_string()))
        }
    }

    fn admin() -> AdminCredentials {
        AdminCredentials {
            email: "admin@x.com".to_string(),
            password: "admin-pass".to_string(),
        }
    }

    fn request() -> ProvisionRequest {
        ProvisionRequest {
            email: "New@X.com".to_string(),
            password: "secret1".to_string(),
            masked: true,
        }
    }

    fn auth_with_admin() -> FakeAuth {
        let auth = FakeAuth::default();
        auth.accounts
            .lock()
            .unwrap()
            .push(("admin@x.com".to_string(), "admin-pass".to_string()));
        auth
    }

    #[tokio::test]
    async fn happy_path_saves_list_and_creates_account() {
        let store = MemoryStore::default();
        let auth = auth_with_admin();

        provision_user(&store, &auth, &admin(), &request())
            .await
            .unwrap();

        let list = store.load().await.unwrap();
        assert!(list.should_mask("new@x.com"));
        assert!(auth.sign_in("new@x.com", "secret1").await.is_ok());
    }

    #[tokio::test]
    async fn create_failure_rolls_the_list_back() {
        let store = MemoryStore::default();
        let auth = FakeAuth {
            refuse_creates: true,
            ..auth_with_admin()
        };

        let err = provision_user(&store, &auth, &admin(), &request())
            .await
            .unwrap_err();
        assert!(matches!(err, ProvisionError::CreateAccount(_)));

        let list = store.load().await.unwrap();
        assert!(list.find("new@x.com").is_none());
    }

    #[tokio::test]
    async fn bad_admin_password_rolls_back_and_names_the_step() {
        let store = MemoryStore::default();
        let auth = auth_with_admin();
        let bad_admin = AdminCredentials {
            email: "admin@x.com".to_string(),
            password: "wrong".to_string(),
        };

        let err = provision_user(&store, &auth, &bad_admin, &request())
            .await
            .unwrap_err();
        assert!(matches!(err, ProvisionError::ReauthenticateAdmin(_)));
        assert!(store.load().await.unwrap().find("new@x.com").is_none());
    }

    #[tokio::test]
    async fn failed_rollback_leaves_the_entry_but_reports_the_step() {
        let store = MemoryStore::default();
        // First save (the append) succeeds, the compensating save fails.
        *store.fail_saves_after.lock().unwrap() = Some(1);
        let auth = FakeAuth {
            refuse_creates: true,
            ..auth_with_admin()
        };

        let err = provision_user(&store, &auth, &admin(), &request())
            .await
            .unwrap_err();
        assert!(matches!(err, ProvisionError::CreateAccount(_)));
        // Known inconsistency: roster still lists a user with no account.
        assert!(store.load().await.unwrap().find("new@x.com").is_some());
    }

    #[tokio::test]
    async fn validation_rejects_short_passwords_and_duplicates() {
        let store = MemoryStore::default();
        let auth = auth_with_admin();

        let short = ProvisionRequest {
            password: "tiny".to_string(),
            ..request()
        };
        let err = provision_user(&store, &auth, &admin(), &short)
            .await
            .unwrap_err();
        assert!(matches!(err, ProvisionError::Invalid(_)));

        provision_user(&store, &auth, &admin(), &request())
            .await
            .unwrap();
        let err = provision_user(&store, &auth, &admin(), &request())
            .await
            .unwrap_err();
        assert!(matches!(err, ProvisionError::Invalid(_)));
    }
}
