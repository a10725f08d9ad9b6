//! Memory store with injectable registrar faults, for startup tests.
use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::database::memory::{MemoryEntity, MemoryStore};
use crate::database::models::{Authority, MenuGroup, MenuItem, Role, User};
use crate::database::repository::{Repository, StoreError, StoreResult};
use crate::database::store::{EdgeKind, EdgeReplacement, GraphStore};
use crate::filter::{Page, PageRequest, Specification};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    None,
    /// `authority_keys` never returns
    Hang,
    /// `insert_authorities` fails
    FailInsert,
}

pub struct FaultyStore {
    inner: MemoryStore,
    fault: Fault,
}

impl FaultyStore {
    pub fn new(fault: Fault) -> Self {
        Self { inner: MemoryStore::new(), fault }
    }
}

#[async_trait]
impl<T: MemoryEntity> Repository<T> for FaultyStore {
    async fn find(&self, external_id: Uuid) -> StoreResult<T> {
        Repository::<T>::find(&self.inner, external_id).await
    }

    async fn find_all(&self, spec: &Specification, page: PageRequest) -> StoreResult<Page<T>> {
        Repository::<T>::find_all(&self.inner, spec, page).await
    }

    async fn insert(&self, record: T) -> StoreResult<T> {
        Repository::<T>::insert(&self.inner, record).await
    }

    async fn update(&self, record: T) -> StoreResult<T> {
        Repository::<T>::update(&self.inner, record).await
    }

    async fn delete(&self, external_id: Uuid) -> StoreResult<()> {
        Repository::<T>::delete(&self.inner, external_id).await
    }
}

#[async_trait]
impl GraphStore for FaultyStore {
    async fn authority_keys(&self) -> StoreResult<HashSet<(String, String)>> {
        if self.fault == Fault::Hang {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        self.inner.authority_keys().await
    }

    async fn insert_authorities(&self, batch: Vec<Authority>) -> StoreResult<usize> {
        if self.fault == Fault::FailInsert {
            return Err(StoreError::Unexpected(anyhow::anyhow!("connection reset")));
        }
        self.inner.insert_authorities(batch).await
    }

    async fn authorities_for_service(&self, service: &str) -> StoreResult<Vec<Authority>> {
        self.inner.authorities_for_service(service).await
    }

    async fn find_authority_by_name(&self, name: &str) -> StoreResult<Option<Authority>> {
        self.inner.find_authority_by_name(name).await
    }

    async fn find_role_by_code(&self, code: &str) -> StoreResult<Option<Role>> {
        self.inner.find_role_by_code(code).await
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.inner.find_user_by_email(email).await
    }

    async fn count_menu_groups(&self) -> StoreResult<i64> {
        self.inner.count_menu_groups().await
    }

    async fn replace_edges(
        &self,
        edge: EdgeKind,
        owner: Uuid,
        targets: &[Uuid],
        expected_version: Option<i32>,
    ) -> StoreResult<EdgeReplacement> {
        self.inner.replace_edges(edge, owner, targets, expected_version).await
    }

    async fn save_user_with_roles(&self, user: User, roles: &[Uuid]) -> StoreResult<(User, Vec<Role>)> {
        self.inner.save_user_with_roles(user, roles).await
    }

    async fn insert_role_with_authorities(&self, role: Role, authorities: &[Uuid]) -> StoreResult<Role> {
        self.inner.insert_role_with_authorities(role, authorities).await
    }

    async fn insert_menu_group_with_items(
        &self,
        group: MenuGroup,
        items: Vec<(MenuItem, Vec<Uuid>)>,
    ) -> StoreResult<(MenuGroup, Vec<MenuItem>)> {
        self.inner.insert_menu_group_with_items(group, items).await
    }

    async fn authorities_of(&self, edge: EdgeKind, owner_ids: &[i64]) -> StoreResult<Vec<Authority>> {
        self.inner.authorities_of(edge, owner_ids).await
    }

    async fn roles_of_user(&self, user_id: i64) -> StoreResult<Vec<Role>> {
        self.inner.roles_of_user(user_id).await
    }

    async fn menu_items_for_authorities(
        &self,
        authority_ids: &[i64],
        grouped: bool,
    ) -> StoreResult<Vec<MenuItem>> {
        self.inner.menu_items_for_authorities(authority_ids, grouped).await
    }

    async fn menu_groups_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<MenuGroup>> {
        self.inner.menu_groups_by_ids(ids).await
    }

    async fn find_menu_group_by_id(&self, id: i64) -> StoreResult<Option<MenuGroup>> {
        self.inner.find_menu_group_by_id(id).await
    }

    async fn health_check(&self) -> StoreResult<()> {
        self.inner.health_check().await
    }

    fn backend_name(&self) -> &'static str {
        "faulty"
    }
}
