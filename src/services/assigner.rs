use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::database::models::{Authority, MenuItem, Role, User};
use crate::database::repository::{Repository, StoreResult};
use crate::database::store::{EdgeKind, GraphStore};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleAuthorities {
    #[serde(flatten)]
    pub role: Role,
    pub authorities: Vec<Authority>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItemAuthorities {
    #[serde(flatten)]
    pub menu_item: MenuItem,
    pub authorities: Vec<Authority>,
}

/// Replaces edge sets of the permission graph. Every call replaces rather
/// than merges: ids missing from the request are revoked.
pub struct AuthorizationAssigner {
    store: Arc<dyn GraphStore>,
}

impl AuthorizationAssigner {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    pub async fn assign_role_authorities(
        &self,
        role: Uuid,
        authorities: &[Uuid],
        expected_version: Option<i32>,
    ) -> StoreResult<RoleAuthorities> {
        let ids = collapse(authorities);
        let replaced = self
            .store
            .replace_edges(EdgeKind::RoleAuthorities, role, &ids, expected_version)
            .await?;
        info!("Role {} now holds {} authorities", role, replaced.target_ids.len());
        self.role_authorities(role).await
    }

    pub async fn assign_menu_item_authorities(
        &self,
        menu_item: Uuid,
        authorities: &[Uuid],
        expected_version: Option<i32>,
    ) -> StoreResult<MenuItemAuthorities> {
        let ids = collapse(authorities);
        let replaced = self
            .store
            .replace_edges(EdgeKind::MenuItemAuthorities, menu_item, &ids, expected_version)
            .await?;
        info!("Menu item {} now holds {} authorities", menu_item, replaced.target_ids.len());
        self.menu_item_authorities(menu_item).await
    }

    /// Writes the user and replaces their roles in one commit. Returns the
    /// stored user and the roles they hold afterwards.
    pub async fn assign_user_roles(&self, user: User, roles: &[Uuid]) -> StoreResult<(User, Vec<Role>)> {
        let ids = collapse(roles);
        let (user, held) = self.store.save_user_with_roles(user, &ids).await?;
        info!("User {} now holds {} roles", user.email, held.len());
        Ok((user, held))
    }

    pub async fn role_authorities(&self, role: Uuid) -> StoreResult<RoleAuthorities> {
        let role: Role = Repository::<Role>::find(self.store.as_ref(), role).await?;
        let authorities = self
            .store
            .authorities_of(EdgeKind::RoleAuthorities, &[role.id])
            .await?;
        Ok(RoleAuthorities { role, authorities })
    }

    pub async fn menu_item_authorities(&self, menu_item: Uuid) -> StoreResult<MenuItemAuthorities> {
        let menu_item: MenuItem = Repository::<MenuItem>::find(self.store.as_ref(), menu_item).await?;
        let authorities = self
            .store
            .authorities_of(EdgeKind::MenuItemAuthorities, &[menu_item.id])
            .await?;
        Ok(MenuItemAuthorities { menu_item, authorities })
    }

    pub async fn user_roles(&self, user: &User) -> StoreResult<Vec<Role>> {
        self.store.roles_of_user(user.id).await
    }
}

/// Drops repeated ids, keeping first occurrences in order
fn collapse(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapse_removes_duplicates() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(collapse(&[a, a, b, a]), vec![a, b]);
        assert!(collapse(&[]).is_empty());
    }
}
