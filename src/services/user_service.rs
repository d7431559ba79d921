use std::sync::Arc;

use crate::error::{Error, Result};
use crate::models::user::{Caller, Role, User};
use crate::store::Store;

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn Store>,
}

impl UserService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Upserts the caller's profile. The role comes from the token and may
    /// not differ from one already on record.
    pub async fn sync(
        &self,
        caller: &Caller,
        name: String,
        email: String,
        image: Option<String>,
    ) -> Result<User> {
        if let Some(existing) = self.store.get_user(&caller.id).await? {
            if existing.role != caller.role {
                return Err(Error::BadRequest(format!(
                    "User {} is registered as {} and cannot become {}",
                    caller.id, existing.role, caller.role
                )));
            }
        }

        let user = self
            .store
            .upsert_user(&User {
                id: caller.id.clone(),
                name,
                email,
                image,
                role: caller.role,
            })
            .await?;
        tracing::debug!(user_id = %user.id, role = %user.role, "User synced");
        Ok(user)
    }

    pub async fn get(&self, id: &str) -> Result<User> {
        self.store
            .get_user(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("User {} not found", id)))
    }

    pub async fn list(&self, role: Option<Role>) -> Result<Vec<User>> {
        self.store.list_users(role).await
    }
}
