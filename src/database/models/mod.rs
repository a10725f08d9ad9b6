use std::fmt::Debug;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::filter::Filterable;

pub mod authority;
pub mod menu_group;
pub mod menu_item;
pub mod role;
pub mod user;

pub use authority::Authority;
pub use menu_group::MenuGroup;
pub use menu_item::MenuItem;
pub use role::Role;
pub use user::User;

/// Writable column and the Postgres type its bound value is cast to
#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub sql_type: &'static str,
}

impl Column {
    pub const fn new(name: &'static str, sql_type: &'static str) -> Self {
        Self { name, sql_type }
    }
}

/// A column in another table that points at an entity's `id`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference {
    pub table: &'static str,
    pub column: &'static str,
    pub label: &'static str,
}

pub const USER_ROLES_USER: Reference = Reference { table: "user_roles", column: "user_id", label: "user" };
pub const USER_ROLES_ROLE: Reference = Reference { table: "user_roles", column: "role_id", label: "user" };
pub const ROLE_AUTHORITIES_ROLE: Reference =
    Reference { table: "role_authorities", column: "role_id", label: "role" };
pub const ROLE_AUTHORITIES_AUTHORITY: Reference =
    Reference { table: "role_authorities", column: "authority_id", label: "role" };
pub const MENU_ITEM_AUTHORITIES_ITEM: Reference =
    Reference { table: "menu_item_authorities", column: "menu_item_id", label: "menu item" };
pub const MENU_ITEM_AUTHORITIES_AUTHORITY: Reference =
    Reference { table: "menu_item_authorities", column: "authority_id", label: "menu item" };
pub const MENU_ITEMS_GROUP: Reference =
    Reference { table: "menu_items", column: "menu_group_id", label: "menu item" };

/// A node of the permission graph as the stores see it.
///
/// `COLUMNS` and `values()` must line up one to one. `OWNS` lists edge rows
/// removed together with the entity; any row in `REFERENCED_BY` blocks its
/// deletion.
pub trait Entity: Filterable + Serialize + Clone + Debug + Send + Sync + Unpin + 'static {
    const TABLE: &'static str;
    const LABEL: &'static str;
    const COLUMNS: &'static [Column];
    const OWNS: &'static [Reference] = &[];
    const REFERENCED_BY: &'static [Reference] = &[];

    fn id(&self) -> i64;
    fn set_id(&mut self, id: i64);
    fn external_id(&self) -> Uuid;
    fn values(&self) -> Vec<Value>;
    fn unique_keys(&self) -> Vec<(&'static str, String)>;
    /// Carry over fields an update must not change (creation time, version)
    fn preserve(&mut self, stored: &Self);
    fn touch(&mut self, now: DateTime<Utc>, inserted: bool);
}

pub(crate) fn opt_text(value: &Option<String>) -> Value {
    value.clone().map(Value::String).unwrap_or(Value::Null)
}

pub(crate) fn opt_int<T: Into<i64> + Copy>(value: Option<T>) -> Value {
    value.map(|v| Value::from(v.into())).unwrap_or(Value::Null)
}
