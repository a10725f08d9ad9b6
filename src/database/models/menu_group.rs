use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use super::{opt_int, opt_text, Column, Entity, MENU_ITEMS_GROUP};
use crate::filter::{FieldDescriptor, FieldKind, FieldValue, Filterable};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MenuGroup {
    pub id: i64,
    #[serde(rename = "uuid")]
    pub external_id: Uuid,
    pub name: String,
    pub icon: Option<String>,
    pub sort_order: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MenuGroup {
    pub fn new(name: impl Into<String>, icon: Option<String>, sort_order: Option<i32>) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            external_id: Uuid::new_v4(),
            name: name.into(),
            icon,
            sort_order,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Filterable for MenuGroup {
    const FIELDS: &'static [FieldDescriptor] = &[
        FieldDescriptor::new("id", "id", FieldKind::Id),
        FieldDescriptor::new("name", "name", FieldKind::Text),
        FieldDescriptor::new("icon", "icon", FieldKind::Text),
    ];

    fn field_value(&self, name: &str) -> Option<FieldValue> {
        match name {
            "id" => Some(FieldValue::Id(self.id)),
            "name" => Some(FieldValue::Text(self.name.clone())),
            "icon" => self.icon.clone().map(FieldValue::Text),
            _ => None,
        }
    }
}

impl Entity for MenuGroup {
    const TABLE: &'static str = "menu_groups";
    const LABEL: &'static str = "MenuGroup";
    const COLUMNS: &'static [Column] = &[
        Column::new("external_id", "uuid"),
        Column::new("name", "text"),
        Column::new("icon", "text"),
        Column::new("sort_order", "int4"),
    ];
    const REFERENCED_BY: &'static [super::Reference] = &[MENU_ITEMS_GROUP];

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
            opt_text(&self.icon),
            opt_int(self.sort_order),
        ]
    }

    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        vec![]
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

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuGroupInput {
    pub id: Option<i64>,
    pub uuid: Option<Uuid>,
    pub name: String,
    pub icon: Option<String>,
    pub sort_order: Option<i32>,
}
