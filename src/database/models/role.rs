use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use super::{Column, Entity, ROLE_AUTHORITIES_ROLE, USER_ROLES_ROLE};
use crate::filter::{FieldDescriptor, FieldKind, FieldValue, Filterable};

pub const SUPER_ADMINISTRATOR_CODE: &str = "SUPER_ADMINISTRATOR";
pub const SUPER_ADMINISTRATOR_NAME: &str = "SUPER ADMINISTRATOR";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: i64,
    #[serde(rename = "uuid")]
    pub external_id: Uuid,
    pub name: String,
    pub code: String,
    /// Bumped on every authority edge replacement
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            external_id: Uuid::new_v4(),
            name: name.into(),
            code: code.into(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Filterable for Role {
    const FIELDS: &'static [FieldDescriptor] = &[
        FieldDescriptor::new("id", "id", FieldKind::Id),
        FieldDescriptor::new("name", "name", FieldKind::Text),
        FieldDescriptor::new("code", "code", FieldKind::Text),
    ];

    fn field_value(&self, name: &str) -> Option<FieldValue> {
        match name {
            "id" => Some(FieldValue::Id(self.id)),
            "name" => Some(FieldValue::Text(self.name.clone())),
            "code" => Some(FieldValue::Text(self.code.clone())),
            _ => None,
        }
    }
}

impl Entity for Role {
    const TABLE: &'static str = "roles";
    const LABEL: &'static str = "Role";
    const COLUMNS: &'static [Column] = &[
        Column::new("external_id", "uuid"),
        Column::new("name", "text"),
        Column::new("code", "text"),
    ];
    const OWNS: &'static [super::Reference] = &[ROLE_AUTHORITIES_ROLE];
    const REFERENCED_BY: &'static [super::Reference] = &[USER_ROLES_ROLE];

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn external_id(&self) -> Uuid {
        self.external_id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::String(self.external_id.to_string()),
            Value::String(self.name.clone()),
            Value::String(self.code.clone()),
        ]
    }

    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        vec![("name", self.name.clone()), ("code", self.code.clone())]
    }

    fn preserve(&mut self, stored: &Self) {
        self.created_at = stored.created_at;
        self.version = stored.version;
    }

    fn touch(&mut self, now: DateTime<Utc>, inserted: bool) {
        if inserted {
            self.created_at = now;
        }
        self.updated_at = now;
    }
}

/// Create/update payload. `id` and `uuid` are only accepted so their misuse
/// can be reported.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleInput {
    pub id: Option<i64>,
    pub uuid: Option<Uuid>,
    pub name: String,
    pub code: String,
}
