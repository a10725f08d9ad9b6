//! In-memory implementation of the graph store.
//!
//! All state lives behind a single `tokio::sync::RwLock`. Every mutation takes
//! the write lock for its whole duration, which is what makes multi-row
//! operations (edge replacement, registrar batches, cascading deletes) atomic.
//! Nothing is durable; this backend serves tests and local development when no
//! `DATABASE_URL` is configured.
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::models::{Authority, Entity, MenuGroup, MenuItem, Reference, Role, User};
use crate::database::repository::{Repository, StoreError, StoreResult};
use crate::database::store::{EdgeKind, EdgeReplacement, GraphStore};
use crate::filter::{Page, PageRequest, Specification};

#[derive(Debug, Default)]
pub struct GraphState {
    next_id: i64,
    users: BTreeMap<i64, User>,
    roles: BTreeMap<i64, Role>,
    authorities: BTreeMap<i64, Authority>,
    menu_groups: BTreeMap<i64, MenuGroup>,
    menu_items: BTreeMap<i64, MenuItem>,
    /// (owner id, target id) per edge set
    edges: HashMap<EdgeKind, BTreeSet<(i64, i64)>>,
}

impl GraphState {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn edge_set(&self, edge: EdgeKind) -> impl Iterator<Item = &(i64, i64)> {
        self.edges.get(&edge).into_iter().flatten()
    }

    fn count_references(&self, reference: &Reference, id: i64) -> usize {
        if let Some(edge) = edge_for_table(reference.table) {
            let by_owner = reference.column == edge.owner_column();
            return self
                .edge_set(edge)
                .filter(|(owner, target)| if by_owner { *owner == id } else { *target == id })
                .count();
        }
        match (reference.table, reference.column) {
            ("menu_items", "menu_group_id") => self
                .menu_items
                .values()
                .filter(|item| item.menu_group_id == Some(id))
                .count(),
            _ => 0,
        }
    }

    fn remove_references(&mut self, reference: &Reference, id: i64) {
        if let Some(edge) = edge_for_table(reference.table) {
            let by_owner = reference.column == edge.owner_column();
            if let Some(set) = self.edges.get_mut(&edge) {
                set.retain(|(owner, target)| if by_owner { *owner != id } else { *target != id });
            }
        }
    }

    /// (id, version) of an edge owner
    fn owner(&self, edge: EdgeKind, external_id: Uuid) -> Option<(i64, Option<i32>)> {
        match edge {
            EdgeKind::RoleAuthorities => self
                .roles
                .values()
                .find(|r| r.external_id == external_id)
                .map(|r| (r.id, Some(r.version))),
            EdgeKind::MenuItemAuthorities => self
                .menu_items
                .values()
                .find(|i| i.external_id == external_id)
                .map(|i| (i.id, Some(i.version))),
            EdgeKind::UserRoles => self
                .users
                .values()
                .find(|u| u.external_id == external_id)
                .map(|u| (u.id, None)),
        }
    }

    fn target_id(&self, edge: EdgeKind, external_id: Uuid) -> Option<i64> {
        match edge {
            EdgeKind::RoleAuthorities | EdgeKind::MenuItemAuthorities => self
                .authorities
                .values()
                .find(|a| a.external_id == external_id)
                .map(|a| a.id),
            EdgeKind::UserRoles => self
                .roles
                .values()
                .find(|r| r.external_id == external_id)
                .map(|r| r.id),
        }
    }

    fn bump_version(&mut self, edge: EdgeKind, owner_id: i64) -> Option<i32> {
        let now = Utc::now();
        match edge {
            EdgeKind::RoleAuthorities => self.roles.get_mut(&owner_id).map(|r| {
                r.version += 1;
                r.updated_at = now;
                r.version
            }),
            EdgeKind::MenuItemAuthorities => self.menu_items.get_mut(&owner_id).map(|i| {
                i.version += 1;
                i.updated_at = now;
                i.version
            }),
            EdgeKind::UserRoles => None,
        }
    }

    fn insert_row<T: MemoryEntity>(&mut self, mut record: T) -> StoreResult<T> {
        record.set_id(0);
        check_unique(self, &record)?;
        let id = self.allocate_id();
        record.set_id(id);
        record.touch(Utc::now(), true);
        T::table_mut(self).insert(id, record.clone());
        Ok(record)
    }

    fn update_row<T: MemoryEntity>(&mut self, mut record: T) -> StoreResult<T> {
        let stored = T::table(self)
            .get(&record.id())
            .cloned()
            .ok_or_else(|| StoreError::not_found::<T>(record.external_id()))?;
        check_unique(self, &record)?;
        record.preserve(&stored);
        record.touch(Utc::now(), false);
        T::table_mut(self).insert(record.id(), record.clone());
        Ok(record)
    }

    /// Storage ids of `targets`; NotFound lists every id that does not resolve
    fn resolve_targets(&self, edge: EdgeKind, targets: &[Uuid]) -> StoreResult<BTreeSet<i64>> {
        let mut target_ids = BTreeSet::new();
        let mut unresolved = Vec::new();
        for external_id in targets {
            match self.target_id(edge, *external_id) {
                Some(id) => {
                    target_ids.insert(id);
                }
                None => unresolved.push(external_id.to_string()),
            }
        }
        if !unresolved.is_empty() {
            return Err(StoreError::NotFound(format!(
                "{} not found: {}",
                edge.target_label(),
                unresolved.join(", ")
            )));
        }
        Ok(target_ids)
    }

    fn set_edges(&mut self, edge: EdgeKind, owner_id: i64, target_ids: &BTreeSet<i64>) {
        let set = self.edges.entry(edge).or_default();
        set.retain(|(o, _)| *o != owner_id);
        set.extend(target_ids.iter().map(|t| (owner_id, *t)));
    }

    fn roles_of(&self, user_id: i64) -> Vec<Role> {
        let ids: BTreeSet<i64> = self
            .edge_set(EdgeKind::UserRoles)
            .filter(|(owner, _)| *owner == user_id)
            .map(|(_, target)| *target)
            .collect();
        ids.into_iter().filter_map(|id| self.roles.get(&id).cloned()).collect()
    }
}

fn edge_for_table(table: &str) -> Option<EdgeKind> {
    [EdgeKind::RoleAuthorities, EdgeKind::MenuItemAuthorities, EdgeKind::UserRoles]
        .into_iter()
        .find(|edge| edge.table() == table)
}

/// Maps an entity type to its table inside `GraphState`
pub trait MemoryEntity: Entity {
    fn table(state: &GraphState) -> &BTreeMap<i64, Self>;
    fn table_mut(state: &mut GraphState) -> &mut BTreeMap<i64, Self>;
}

macro_rules! memory_table {
    ($entity:ty, $field:ident) => {
        impl MemoryEntity for $entity {
            fn table(state: &GraphState) -> &BTreeMap<i64, Self> {
                &state.$field
            }

            fn table_mut(state: &mut GraphState) -> &mut BTreeMap<i64, Self> {
                &mut state.$field
            }
        }
    };
}

memory_table!(User, users);
memory_table!(Role, roles);
memory_table!(Authority, authorities);
memory_table!(MenuGroup, menu_groups);
memory_table!(MenuItem, menu_items);

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<GraphState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn check_unique<T: MemoryEntity>(state: &GraphState, record: &T) -> StoreResult<()> {
    for (column, value) in record.unique_keys() {
        let taken = T::table(state).values().any(|other| {
            other.id() != record.id()
                && other.unique_keys().iter().any(|(c, v)| *c == column && *v == value)
        });
        if taken {
            return Err(StoreError::Conflict(format!(
                "{} with {} '{}' already exists",
                T::LABEL,
                column,
                value
            )));
        }
    }
    Ok(())
}

#[async_trait]
impl<T: MemoryEntity> Repository<T> for MemoryStore {
    async fn find(&self, external_id: Uuid) -> StoreResult<T> {
        let state = self.state.read().await;
        T::table(&state)
            .values()
            .find(|r| r.external_id() == external_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found::<T>(external_id))
    }

    async fn find_all(&self, spec: &Specification, page: PageRequest) -> StoreResult<Page<T>> {
        let state = self.state.read().await;
        let matching: Vec<&T> = T::table(&state).values().filter(|r| spec.matches(*r)).collect();
        let total = matching.len() as i64;
        let content = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .cloned()
            .collect();
        Ok(Page::new(content, total, page))
    }

    async fn insert(&self, record: T) -> StoreResult<T> {
        self.state.write().await.insert_row(record)
    }

    async fn update(&self, record: T) -> StoreResult<T> {
        self.state.write().await.update_row(record)
    }

    async fn delete(&self, external_id: Uuid) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let id = T::table(&state)
            .values()
            .find(|r| r.external_id() == external_id)
            .map(|r| r.id())
            .ok_or_else(|| StoreError::not_found::<T>(external_id))?;

        for reference in T::REFERENCED_BY {
            if state.count_references(reference, id) > 0 {
                return Err(StoreError::Conflict(format!(
                    "{} {} is still referenced by a {}",
                    T::LABEL,
                    external_id,
                    reference.label
                )));
            }
        }
        for reference in T::OWNS {
            state.remove_references(reference, id);
        }
        T::table_mut(&mut state).remove(&id);
        Ok(())
    }
}

#[async_trait]
impl GraphStore for MemoryStore {
    async fn authority_keys(&self) -> StoreResult<HashSet<(String, String)>> {
        let state = self.state.read().await;
        Ok(state.authorities.values().map(Authority::key).collect())
    }

    async fn insert_authorities(&self, batch: Vec<Authority>) -> StoreResult<usize> {
        let mut state = self.state.write().await;
        let mut keys: HashSet<(String, String)> = state.authorities.values().map(Authority::key).collect();
        let mut names: HashSet<String> = state.authorities.values().map(|a| a.name.clone()).collect();
        let now = Utc::now();
        let mut inserted = 0;

        for mut authority in batch {
            if keys.contains(&authority.key()) || names.contains(&authority.name) {
                continue;
            }
            keys.insert(authority.key());
            names.insert(authority.name.clone());
            let id = state.allocate_id();
            authority.set_id(id);
            authority.touch(now, true);
            state.authorities.insert(id, authority);
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn authorities_for_service(&self, service: &str) -> StoreResult<Vec<Authority>> {
        let state = self.state.read().await;
        Ok(state
            .authorities
            .values()
            .filter(|a| a.service == service)
            .cloned()
            .collect())
    }

    async fn find_authority_by_name(&self, name: &str) -> StoreResult<Option<Authority>> {
        let state = self.state.read().await;
        Ok(state.authorities.values().find(|a| a.name == name).cloned())
    }

    async fn find_role_by_code(&self, code: &str) -> StoreResult<Option<Role>> {
        let state = self.state.read().await;
        Ok(state.roles.values().find(|r| r.code == code).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn count_menu_groups(&self) -> StoreResult<i64> {
        let state = self.state.read().await;
        Ok(state.menu_groups.len() as i64)
    }

    async fn replace_edges(
        &self,
        edge: EdgeKind,
        owner: Uuid,
        targets: &[Uuid],
        expected_version: Option<i32>,
    ) -> StoreResult<EdgeReplacement> {
        let mut state = self.state.write().await;

        let (owner_id, version) = state
            .owner(edge, owner)
            .ok_or_else(|| StoreError::NotFound(format!("{} {} not found", edge.owner_label(), owner)))?;

        if let (Some(expected), Some(current)) = (expected_version, version) {
            if expected != current {
                return Err(StoreError::Conflict(format!(
                    "{} {} was modified concurrently (expected version {}, found {})",
                    edge.owner_label(),
                    owner,
                    expected,
                    current
                )));
            }
        }

        let target_ids = state.resolve_targets(edge, targets)?;
        state.set_edges(edge, owner_id, &target_ids);
        let version = state.bump_version(edge, owner_id);

        Ok(EdgeReplacement {
            owner_id,
            version,
            target_ids: target_ids.into_iter().collect(),
        })
    }

    async fn save_user_with_roles(&self, user: User, roles: &[Uuid]) -> StoreResult<(User, Vec<Role>)> {
        let mut state = self.state.write().await;
        let role_ids = state.resolve_targets(EdgeKind::UserRoles, roles)?;
        let user = if user.id == 0 {
            state.insert_row(user)?
        } else {
            state.update_row(user)?
        };
        state.set_edges(EdgeKind::UserRoles, user.id, &role_ids);
        let roles = state.roles_of(user.id);
        Ok((user, roles))
    }

    async fn insert_role_with_authorities(&self, role: Role, authorities: &[Uuid]) -> StoreResult<Role> {
        let mut state = self.state.write().await;
        let authority_ids = state.resolve_targets(EdgeKind::RoleAuthorities, authorities)?;
        let role = state.insert_row(role)?;
        state.set_edges(EdgeKind::RoleAuthorities, role.id, &authority_ids);
        Ok(role)
    }

    async fn insert_menu_group_with_items(
        &self,
        group: MenuGroup,
        items: Vec<(MenuItem, Vec<Uuid>)>,
    ) -> StoreResult<(MenuGroup, Vec<MenuItem>)> {
        let mut state = self.state.write().await;

        // Resolve and check everything before the first write
        let mut resolved = Vec::with_capacity(items.len());
        for (item, authorities) in items {
            check_unique(&state, &item)?;
            let ids = state.resolve_targets(EdgeKind::MenuItemAuthorities, &authorities)?;
            resolved.push((item, ids));
        }
        check_unique(&state, &group)?;

        let group = state.insert_row(group)?;
        let mut stored = Vec::with_capacity(resolved.len());
        for (mut item, ids) in resolved {
            item.menu_group_id = Some(group.id);
            let item = state.insert_row(item)?;
            state.set_edges(EdgeKind::MenuItemAuthorities, item.id, &ids);
            stored.push(item);
        }
        Ok((group, stored))
    }

    async fn authorities_of(&self, edge: EdgeKind, owner_ids: &[i64]) -> StoreResult<Vec<Authority>> {
        let state = self.state.read().await;
        if edge.target_table() != "authorities" {
            return Ok(vec![]);
        }
        let ids: BTreeSet<i64> = state
            .edge_set(edge)
            .filter(|(owner, _)| owner_ids.contains(owner))
            .map(|(_, target)| *target)
            .collect();
        Ok(ids
            .into_iter()
            .filter_map(|id| state.authorities.get(&id).cloned())
            .collect())
    }

    async fn roles_of_user(&self, user_id: i64) -> StoreResult<Vec<Role>> {
        Ok(self.state.read().await.roles_of(user_id))
    }

    async fn menu_items_for_authorities(
        &self,
        authority_ids: &[i64],
        grouped: bool,
    ) -> StoreResult<Vec<MenuItem>> {
        let state = self.state.read().await;
        let held: HashSet<i64> = authority_ids.iter().copied().collect();
        let item_ids: BTreeSet<i64> = state
            .edge_set(EdgeKind::MenuItemAuthorities)
            .filter(|(_, authority)| held.contains(authority))
            .map(|(item, _)| *item)
            .collect();

        let mut items: Vec<MenuItem> = item_ids
            .into_iter()
            .filter_map(|id| state.menu_items.get(&id))
            .filter(|item| item.menu_group_id.is_some() == grouped)
            .cloned()
            .collect();
        items.sort_by_key(|item| (item.sort_order.unwrap_or(0), item.id));
        Ok(items)
    }

    async fn menu_groups_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<MenuGroup>> {
        let state = self.state.read().await;
        let wanted: BTreeSet<i64> = ids.iter().copied().collect();
        let mut groups: Vec<MenuGroup> = wanted
            .into_iter()
            .filter_map(|id| state.menu_groups.get(&id).cloned())
            .collect();
        groups.sort_by_key(|group| (group.sort_order.unwrap_or(0), group.id));
        Ok(groups)
    }

    async fn find_menu_group_by_id(&self, id: i64) -> StoreResult<Option<MenuGroup>> {
        let state = self.state.read().await;
        Ok(state.menu_groups.get(&id).cloned())
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delete_refuses_referenced_authority_and_cascades_owned_edges() {
        let store = MemoryStore::new();
        let role = Repository::<Role>::insert(&store, Role::new("Clerk", "CLERK")).await.unwrap();
        let authority = Authority::from_requirement(
            &crate::catalog::RequiredAuthority::derive("RoleResource", "create", "Resource", &[axum::http::Method::POST]),
            "auth",
        );
        store.insert_authorities(vec![authority.clone()]).await.unwrap();

        store
            .replace_edges(EdgeKind::RoleAuthorities, role.external_id, &[authority.external_id], None)
            .await
            .unwrap();

        let err = Repository::<Authority>::delete(&store, authority.external_id).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        Repository::<Role>::delete(&store, role.external_id).await.unwrap();
        Repository::<Authority>::delete(&store, authority.external_id).await.unwrap();
    }

    #[tokio::test]
    async fn unique_keys_are_enforced_on_insert_and_update() {
        let store = MemoryStore::new();
        Repository::<Role>::insert(&store, Role::new("Clerk", "CLERK")).await.unwrap();
        let mut other = Repository::<Role>::insert(&store, Role::new("Auditor", "AUDITOR")).await.unwrap();

        let err = Repository::<Role>::insert(&store, Role::new("Clerk", "CLERK_2")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        other.code = "CLERK".to_string();
        let err = Repository::<Role>::update(&store, other).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn registrar_batch_skips_existing_pairs() {
        let store = MemoryStore::new();
        let required = crate::catalog::RequiredAuthority::derive(
            "RoleResource",
            "delete",
            "Resource",
            &[axum::http::Method::DELETE],
        );
        let first = Authority::from_requirement(&required, "auth");
        let second = Authority::from_requirement(&required, "auth");
        assert_eq!(store.insert_authorities(vec![first, second]).await.unwrap(), 1);
        assert_eq!(store.authority_keys().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn user_with_unknown_role_is_not_written() {
        let store = MemoryStore::new();
        let clerk = Repository::<Role>::insert(&store, Role::new("Clerk", "CLERK")).await.unwrap();
        let missing = Uuid::new_v4();

        let err = store
            .save_user_with_roles(User::new("jo@example.com", "Jo", "Doe"), &[clerk.external_id, missing])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(ref m) if m.contains(&missing.to_string())));
        assert!(store.find_user_by_email("jo@example.com").await.unwrap().is_none());

        let (user, roles) = store
            .save_user_with_roles(User::new("jo@example.com", "Jo", "Doe"), &[clerk.external_id])
            .await
            .unwrap();
        assert_eq!(roles[0].id, clerk.id);

        let mut renamed = user.clone();
        renamed.email = "joanne@example.com".to_string();
        store.save_user_with_roles(renamed, &[missing]).await.unwrap_err();

        let stored = store.find_user_by_email("jo@example.com").await.unwrap().unwrap();
        assert_eq!(stored.id, user.id);
        let held: Vec<i64> = store.roles_of_user(user.id).await.unwrap().iter().map(|r| r.id).collect();
        assert_eq!(held, vec![clerk.id]);
    }

    #[tokio::test]
    async fn role_with_unknown_authority_is_not_written() {
        let store = MemoryStore::new();
        let err = store
            .insert_role_with_authorities(Role::new("Clerk", "CLERK"), &[Uuid::new_v4()])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert!(store.find_role_by_code("CLERK").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn menu_group_and_items_are_written_together() {
        let store = MemoryStore::new();
        let items = vec![
            (MenuItem::new("Roles", None, "/main/config/role", Some(1), None), vec![]),
            (MenuItem::new("Users", None, "/main/config/user", Some(2), None), vec![Uuid::new_v4()]),
        ];
        let err = store
            .insert_menu_group_with_items(MenuGroup::new("System", None, None), items)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert_eq!(store.count_menu_groups().await.unwrap(), 0);
        assert!(store.state.read().await.menu_items.is_empty());

        let items = vec![(MenuItem::new("Roles", None, "/main/config/role", Some(1), None), vec![])];
        let (group, items) = store
            .insert_menu_group_with_items(MenuGroup::new("System", None, None), items)
            .await
            .unwrap();
        assert_eq!(items[0].menu_group_id, Some(group.id));
    }
}
