use std::collections::HashSet;

use async_trait::async_trait;
use uuid::Uuid;

use crate::database::models::{Authority, MenuGroup, MenuItem, Role, User};
use crate::database::repository::{Repository, StoreResult};

/// Many-to-many edge sets of the permission graph, named by owning side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    RoleAuthorities,
    MenuItemAuthorities,
    UserRoles,
}

impl EdgeKind {
    pub fn table(&self) -> &'static str {
        match self {
            EdgeKind::RoleAuthorities => "role_authorities",
            EdgeKind::MenuItemAuthorities => "menu_item_authorities",
            EdgeKind::UserRoles => "user_roles",
        }
    }

    pub fn owner_table(&self) -> &'static str {
        match self {
            EdgeKind::RoleAuthorities => "roles",
            EdgeKind::MenuItemAuthorities => "menu_items",
            EdgeKind::UserRoles => "users",
        }
    }

    pub fn owner_column(&self) -> &'static str {
        match self {
            EdgeKind::RoleAuthorities => "role_id",
            EdgeKind::MenuItemAuthorities => "menu_item_id",
            EdgeKind::UserRoles => "user_id",
        }
    }

    pub fn target_table(&self) -> &'static str {
        match self {
            EdgeKind::RoleAuthorities | EdgeKind::MenuItemAuthorities => "authorities",
            EdgeKind::UserRoles => "roles",
        }
    }

    pub fn target_column(&self) -> &'static str {
        match self {
            EdgeKind::RoleAuthorities | EdgeKind::MenuItemAuthorities => "authority_id",
            EdgeKind::UserRoles => "role_id",
        }
    }

    pub fn owner_label(&self) -> &'static str {
        match self {
            EdgeKind::RoleAuthorities => "Role",
            EdgeKind::MenuItemAuthorities => "MenuItem",
            EdgeKind::UserRoles => "User",
        }
    }

    pub fn target_label(&self) -> &'static str {
        match self {
            EdgeKind::RoleAuthorities | EdgeKind::MenuItemAuthorities => "Authority",
            EdgeKind::UserRoles => "Role",
        }
    }

    /// Owners carrying a `version` column for compare-and-swap
    pub fn is_versioned(&self) -> bool {
        !matches!(self, EdgeKind::UserRoles)
    }
}

/// Outcome of a committed edge replacement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeReplacement {
    pub owner_id: i64,
    /// New owner version; `None` for unversioned owners
    pub version: Option<i32>,
    pub target_ids: Vec<i64>,
}

/// Persistence collaborator of the permission engine. Every mutating method
/// commits all of its rows or none of them.
#[async_trait]
pub trait GraphStore:
    Repository<User>
    + Repository<Role>
    + Repository<Authority>
    + Repository<MenuGroup>
    + Repository<MenuItem>
    + Send
    + Sync
{
    /// (resource, action) of every stored authority
    async fn authority_keys(&self) -> StoreResult<HashSet<(String, String)>>;

    /// Inserts the batch in one transaction, skipping rows whose
    /// (resource, action) or name already exists. Returns rows inserted.
    async fn insert_authorities(&self, batch: Vec<Authority>) -> StoreResult<usize>;

    async fn authorities_for_service(&self, service: &str) -> StoreResult<Vec<Authority>>;
    async fn find_authority_by_name(&self, name: &str) -> StoreResult<Option<Authority>>;
    async fn find_role_by_code(&self, code: &str) -> StoreResult<Option<Role>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn count_menu_groups(&self) -> StoreResult<i64>;

    /// Replaces the owner's whole edge set with `targets`.
    ///
    /// Fails with NotFound (listing the unresolved ids) before touching any
    /// edge if a target does not exist, and with Conflict if
    /// `expected_version` is given and differs from the owner's version.
    async fn replace_edges(
        &self,
        edge: EdgeKind,
        owner: Uuid,
        targets: &[Uuid],
        expected_version: Option<i32>,
    ) -> StoreResult<EdgeReplacement>;

    /// Writes the user row and replaces its roles in one commit. The row is
    /// inserted when `user.id` is 0 and updated otherwise. Unresolved role ids
    /// fail with NotFound before anything is written. Returns the stored user
    /// and the roles they now hold.
    async fn save_user_with_roles(&self, user: User, roles: &[Uuid]) -> StoreResult<(User, Vec<Role>)>;

    /// Inserts a role already holding `authorities`, in one commit
    async fn insert_role_with_authorities(&self, role: Role, authorities: &[Uuid]) -> StoreResult<Role>;

    /// Inserts a group and its items, each item with its authorities, in one
    /// commit. Each item's group is set to the new group.
    async fn insert_menu_group_with_items(
        &self,
        group: MenuGroup,
        items: Vec<(MenuItem, Vec<Uuid>)>,
    ) -> StoreResult<(MenuGroup, Vec<MenuItem>)>;

    /// Authorities reached from the given owners through an authority edge set
    async fn authorities_of(&self, edge: EdgeKind, owner_ids: &[i64]) -> StoreResult<Vec<Authority>>;

    async fn roles_of_user(&self, user_id: i64) -> StoreResult<Vec<Role>>;

    /// Menu items holding any of `authority_ids`, either with a group
    /// (`grouped`) or without one, ordered by sort order (null as 0) then id
    async fn menu_items_for_authorities(
        &self,
        authority_ids: &[i64],
        grouped: bool,
    ) -> StoreResult<Vec<MenuItem>>;

    /// Groups with the given ids ordered by sort order (null as 0) then id
    async fn menu_groups_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<MenuGroup>>;

    async fn find_menu_group_by_id(&self, id: i64) -> StoreResult<Option<MenuGroup>>;

    async fn health_check(&self) -> StoreResult<()>;
    fn backend_name(&self) -> &'static str;
}
