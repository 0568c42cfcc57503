use crate::db::Database;
use crate::trip::User;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const USER_STORAGE_KEY: &str = "user-storage";
pub const COOKIE_STORAGE_KEY: &str = "auth-cookies";

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedState {
    state: UserState,
    version: u32,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct UserState {
    user: Option<User>,
}

/// The signed-in user, persisted across runs.
///
/// One `Session` owns reads and writes of the identity; callers pass it to
/// whatever needs to know who is signed in.
pub struct Session<'db> {
    database: &'db Database,
    user: Option<User>,
}

impl<'db> Session<'db> {
    pub fn load(database: &'db Database) -> Result<Self> {
        let user = match database.kv_get(USER_STORAGE_KEY)? {
            Some(raw) => {
                serde_json::from_str::<PersistedState>(&raw)
                    .context("Failed to parse stored user session")?
                    .state
                    .user
            }
            None => None,
        };

        Ok(Self { database, user })
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn set_user(&mut self, user: User) -> Result<()> {
        debug!(user_id = user.id, "storing signed-in user");
        self.user = Some(user);
        self.persist()
    }

    /// Forgets the user and any saved credentials.
    pub fn logout(&mut self) -> Result<()> {
        self.user = None;
        self.persist()?;
        self.database.kv_delete(COOKIE_STORAGE_KEY)
    }

    pub fn cookies(&self) -> Result<Option<String>> {
        self.database.kv_get(COOKIE_STORAGE_KEY)
    }

    /// Replaces the saved cookie jar; `None` forgets it.
    pub fn store_cookies(&self, saved: Option<&str>) -> Result<()> {
        match saved.filter(|value| !value.trim().is_empty()) {
            Some(value) => self.database.kv_put(COOKIE_STORAGE_KEY, value),
            None => self.database.kv_delete(COOKIE_STORAGE_KEY),
        }
    }

    fn persist(&self) -> Result<()> {
        let state = PersistedState {
            state: UserState {
                user: self.user.clone(),
            },
            version: 0,
        };
        let raw = serde_json::to_string(&state).context("Failed to serialize user session")?;
        self.database.kv_put(USER_STORAGE_KEY, &raw)
    }
}

#[cfg(test)]
mod tests {
    use super::Session;
    use crate::db::Database;
    use crate::trip::User;

    fn user() -> User {
        User {
            id: 1,
            name: "Test User".to_string(),
            email: "test@example.com".to_string(),
            avatar: Some("https://github.com/shadcn.png".to_string()),
        }
    }

    #[test]
    fn user_survives_reload_and_clears_on_logout() {
        let dir = tempfile::tempdir().unwrap();
        let database = Database::open(&dir.path().join("wanderlog.db")).unwrap();

        let mut session = Session::load(&database).unwrap();
        assert!(session.user().is_none());
        session.set_user(user()).unwrap();
        session.store_cookies(Some("session=abc")).unwrap();

        let mut reloaded = Session::load(&database).unwrap();
        assert_eq!(reloaded.user(), Some(&user()));
        assert_eq!(reloaded.cookies().unwrap().as_deref(), Some("session=abc"));

        reloaded.logout().unwrap();
        let after_logout = Session::load(&database).unwrap();
        assert!(after_logout.user().is_none());
        assert!(after_logout.cookies().unwrap().is_none());
    }
}
