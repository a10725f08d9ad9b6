use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use super::{Column, Entity, USER_ROLES_USER};
use crate::filter::{FieldDescriptor, FieldKind, FieldValue, Filterable};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    #[serde(rename = "uuid")]
    pub external_id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Opaque; verified by the external credential service
    #[serde(skip_serializing, default)]
    pub credential_hash: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: impl Into<String>, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            external_id: Uuid::new_v4(),
            email: email.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            credential_hash: String::new(),
            active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Filterable for User {
    const FIELDS: &'static [FieldDescriptor] = &[
        FieldDescriptor::new("id", "id", FieldKind::Id),
        FieldDescriptor::new("email", "email", FieldKind::Text),
        FieldDescriptor::new("firstName", "first_name", FieldKind::Text),
        FieldDescriptor::new("lastName", "last_name", FieldKind::Text),
        FieldDescriptor::new("active", "active", FieldKind::Boolean),
    ];

    fn field_value(&self, name: &str) -> Option<FieldValue> {
        match name {
            "id" => Some(FieldValue::Id(self.id)),
            "email" => Some(FieldValue::Text(self.email.clone())),
            "firstName" => Some(FieldValue::Text(self.first_name.clone())),
            "lastName" => Some(FieldValue::Text(self.last_name.clone())),
            "active" => Some(FieldValue::Bool(self.active)),
            _ => None,
        }
    }
}

impl Entity for User {
    const TABLE: &'static str = "users";
    const LABEL: &'static str = "User";
    const COLUMNS: &'static [Column] = &[
        Column::new("external_id", "uuid"),
        Column::new("email", "text"),
        Column::new("first_name", "text"),
        Column::new("last_name", "text"),
        Column::new("credential_hash", "text"),
        Column::new("active", "bool"),
    ];
    const OWNS: &'static [super::Reference] = &[USER_ROLES_USER];

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
            Value::String(self.email.clone()),
            Value::String(self.first_name.clone()),
            Value::String(self.last_name.clone()),
            Value::String(self.credential_hash.clone()),
            Value::Bool(self.active),
        ]
    }

    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        vec![("email", self.email.to_lowercase())]
    }

    fn preserve(&mut self, stored: &Self) {
        self.created_at = stored.created_at;
        self.credential_hash = stored.credential_hash.clone();
    }

    fn touch(&mut self, now: DateTime<Utc>, inserted: bool) {
        if inserted {
            self.created_at = now;
        }
        self.updated_at = now;
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInput {
    pub id: Option<i64>,
    pub uuid: Option<Uuid>,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default = "default_active")]
    pub active: bool,
    /// External ids of the roles the user should hold; replaces the current set
    #[serde(default)]
    pub roles: Vec<Uuid>,
}

fn default_active() -> bool {
    true
}
