use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use super::{opt_int, opt_text, Column, Entity, MENU_ITEM_AUTHORITIES_ITEM};
use crate::filter::{FieldDescriptor, FieldKind, FieldValue, Filterable};

/// Navigation entry. Without a group it is rendered as a top-level node.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub id: i64,
    #[serde(rename = "uuid")]
    pub external_id: Uuid,
    pub name: String,
    pub icon: Option<String>,
    pub route: String,
    pub sort_order: Option<i32>,
    pub menu_group_id: Option<i64>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MenuItem {
    pub fn new(
        name: impl Into<String>,
        icon: Option<String>,
        route: impl Into<String>,
        sort_order: Option<i32>,
        menu_group_id: Option<i64>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            external_id: Uuid::new_v4(),
            name: name.into(),
            icon,
            route: route.into(),
            sort_order,
            menu_group_id,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Filterable for MenuItem {
    const FIELDS: &'static [FieldDescriptor] = &[
        FieldDescriptor::new("id", "id", FieldKind::Id),
        FieldDescriptor::new("name", "name", FieldKind::Text),
        FieldDescriptor::new("route", "route", FieldKind::Text),
        FieldDescriptor::new("menuGroupId", "menu_group_id", FieldKind::Id),
    ];

    fn field_value(&self, name: &str) -> Option<FieldValue> {
        match name {
            "id" => Some(FieldValue::Id(self.id)),
            "name" => Some(FieldValue::Text(self.name.clone())),
            "route" => Some(FieldValue::Text(self.route.clone())),
            "menuGroupId" => self.menu_group_id.map(FieldValue::Id),
            _ => None,
        }
    }
}

impl Entity for MenuItem {
    const TABLE: &'static str = "menu_items";
    const LABEL: &'static str = "MenuItem";
    const COLUMNS: &'static [Column] = &[
        Column::new("external_id", "uuid"),
        Column::new("name", "text"),
        Column::new("icon", "text"),
        Column::new("route", "text"),
        Column::new("sort_order", "int4"),
        Column::new("menu_group_id", "int8"),
    ];
    const OWNS: &'static [super::Reference] = &[MENU_ITEM_AUTHORITIES_ITEM];

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
            Value::String(self.route.clone()),
            opt_int(self.sort_order),
            opt_int(self.menu_group_id),
        ]
    }

    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        vec![]
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

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItemInput {
    pub id: Option<i64>,
    pub uuid: Option<Uuid>,
    pub name: String,
    pub icon: Option<String>,
    pub route: String,
    pub sort_order: Option<i32>,
    /// External id of the owning group
    pub menu_group: Option<Uuid>,
}
