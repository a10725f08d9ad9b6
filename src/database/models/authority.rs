use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use super::{Column, Entity, MENU_ITEM_AUTHORITIES_AUTHORITY, ROLE_AUTHORITIES_AUTHORITY};
use crate::catalog::RequiredAuthority;
use crate::filter::{FieldDescriptor, FieldKind, FieldValue, Filterable};

/// Atomic permission for one (resource, action) pair. Rows are created by the
/// registrar only.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Authority {
    pub id: i64,
    #[serde(rename = "uuid")]
    pub external_id: Uuid,
    pub name: String,
    pub resource: String,
    pub action: String,
    pub method: String,
    pub description: String,
    pub service: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Authority {
    pub fn from_requirement(required: &RequiredAuthority, service: &str) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            external_id: Uuid::new_v4(),
            name: required.name.clone(),
            resource: required.resource.clone(),
            action: required.action.clone(),
            method: required.method_label.clone(),
            description: required.description.clone(),
            service: service.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn key(&self) -> (String, String) {
        (self.resource.clone(), self.action.clone())
    }
}

impl Filterable for Authority {
    const FIELDS: &'static [FieldDescriptor] = &[
        FieldDescriptor::new("id", "id", FieldKind::Id),
        FieldDescriptor::new("name", "name", FieldKind::Text),
        FieldDescriptor::new("resource", "resource", FieldKind::Text),
        FieldDescriptor::new("action", "action", FieldKind::Text),
        FieldDescriptor::new("description", "description", FieldKind::Text),
        FieldDescriptor::new("service", "service", FieldKind::Text),
    ];

    fn field_value(&self, name: &str) -> Option<FieldValue> {
        match name {
            "id" => Some(FieldValue::Id(self.id)),
            "name" => Some(FieldValue::Text(self.name.clone())),
            "resource" => Some(FieldValue::Text(self.resource.clone())),
            "action" => Some(FieldValue::Text(self.action.clone())),
            "description" => Some(FieldValue::Text(self.description.clone())),
            "service" => Some(FieldValue::Text(self.service.clone())),
            _ => None,
        }
    }
}

impl Entity for Authority {
    const TABLE: &'static str = "authorities";
    const LABEL: &'static str = "Authority";
    const COLUMNS: &'static [Column] = &[
        Column::new("external_id", "uuid"),
        Column::new("name", "text"),
        Column::new("resource", "text"),
        Column::new("action", "text"),
        Column::new("method", "text"),
        Column::new("description", "text"),
        Column::new("service", "text"),
    ];
    const REFERENCED_BY: &'static [super::Reference] =
        &[ROLE_AUTHORITIES_AUTHORITY, MENU_ITEM_AUTHORITIES_AUTHORITY];

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
            Value::String(self.resource.clone()),
            Value::String(self.action.clone()),
            Value::String(self.method.clone()),
            Value::String(self.description.clone()),
            Value::String(self.service.clone()),
        ]
    }

    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        vec![("name", self.name.clone())]
    }

    fn preserve(&mut self, stored: &Self) {
        self.created_at = stored.created_at;
    }

    fn touch(&mut self, now: DateTime<Utc>, inserted: bool) {
        if inserted {
            self.created_at = now;
        }
        self.updated_at = now;
    }
}
