use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::database::models::User;
use crate::database::repository::{Repository, StoreError};
use crate::database::store::{EdgeKind, GraphStore};
use crate::services::menu::{MenuNode, MenuResolver};

/// Effective permissions of one user: the union of authorities over all of
/// their roles plus the menu tree those authorities unlock. This is what the
/// credential service embeds into issued tokens.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionGrant {
    pub user_id: i64,
    pub uuid: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role_ids: Vec<i64>,
    /// Sorted, without duplicates
    pub authorities: Vec<String>,
    pub authority_ids: Vec<i64>,
    pub menus: Vec<MenuNode>,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("User {0} is not active")]
    Inactive(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct SessionService {
    store: Arc<dyn GraphStore>,
}

impl SessionService {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    pub async fn grant_for_email(&self, email: &str) -> Result<SessionGrant, SessionError> {
        let user = self
            .store
            .find_user_by_email(email)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("User {} not found", email)))?;
        self.grant_for(user).await
    }

    pub async fn grant_for_uuid(&self, uuid: Uuid) -> Result<SessionGrant, SessionError> {
        let user: User = Repository::<User>::find(self.store.as_ref(), uuid).await?;
        self.grant_for(user).await
    }

    pub async fn grant_for(&self, user: User) -> Result<SessionGrant, SessionError> {
        if !user.active {
            return Err(SessionError::Inactive(user.email));
        }

        let roles = self.store.roles_of_user(user.id).await?;
        let role_ids: Vec<i64> = roles.iter().map(|r| r.id).collect();
        let authorities = self
            .store
            .authorities_of(EdgeKind::RoleAuthorities, &role_ids)
            .await?;

        let names: BTreeSet<String> = authorities.iter().map(|a| a.name.clone()).collect();
        let ids: BTreeSet<i64> = authorities.iter().map(|a| a.id).collect();
        let authority_ids: Vec<i64> = ids.into_iter().collect();

        let menus = MenuResolver::new(self.store.clone()).resolve(&authority_ids).await?;

        Ok(SessionGrant {
            user_id: user.id,
            uuid: user.external_id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            role_ids,
            authorities: names.into_iter().collect(),
            authority_ids,
            menus,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::RequiredAuthority;
    use crate::database::memory::MemoryStore;
    use crate::database::models::{Authority, Role};
    use axum::http::Method;

    async fn authority(store: &MemoryStore, component: &str, action: &str) -> Authority {
        let required = RequiredAuthority::derive(component, action, "Resource", &[Method::POST]);
        store
            .insert(Authority::from_requirement(&required, "auth"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn grant_is_union_over_roles_without_duplicates() {
        let store = Arc::new(MemoryStore::new());
        let create = authority(&store, "RoleResource", "create").await;
        let delete = authority(&store, "RoleResource", "delete").await;

        let clerk: Role = store.insert(Role::new("Clerk", "CLERK")).await.unwrap();
        let auditor: Role = store.insert(Role::new("Auditor", "AUDITOR")).await.unwrap();
        store
            .replace_edges(EdgeKind::RoleAuthorities, clerk.external_id, &[create.external_id], None)
            .await
            .unwrap();
        store
            .replace_edges(
                EdgeKind::RoleAuthorities,
                auditor.external_id,
                &[create.external_id, delete.external_id],
                None,
            )
            .await
            .unwrap();

        let user: User = store.insert(User::new("jo@example.com", "Jo", "Doe")).await.unwrap();
        store
            .replace_edges(
                EdgeKind::UserRoles,
                user.external_id,
                &[clerk.external_id, auditor.external_id],
                None,
            )
            .await
            .unwrap();

        let grant = SessionService::new(store.clone())
            .grant_for_email("JO@example.com")
            .await
            .unwrap();

        assert_eq!(grant.authorities, vec!["ROLE_CREATE".to_string(), "ROLE_DELETE".to_string()]);
        assert_eq!(grant.role_ids.len(), 2);
        assert_eq!(grant.authority_ids.len(), 2);
        assert!(grant.menus.is_empty());
    }

    #[tokio::test]
    async fn inactive_user_gets_no_grant() {
        let store = Arc::new(MemoryStore::new());
        let mut user = User::new("off@example.com", "Off", "Line");
        user.active = false;
        let user: User = store.insert(user).await.unwrap();

        let result = SessionService::new(store).grant_for_uuid(user.external_id).await;
        assert!(matches!(result, Err(SessionError::Inactive(_))));
    }
}
