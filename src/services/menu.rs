//! Login-time menu tree.
//!
//! Items are reached through their authority edges. Grouped items hang under
//! their group; items without a group are promoted to top-level nodes so the
//! result is always two levels deep.
use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::database::models::{MenuGroup, MenuItem};
use crate::database::repository::StoreResult;
use crate::database::store::GraphStore;

/// Placeholder id keeping membership queries off empty collections
pub const SENTINEL_ID: i64 = 0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuNode {
    pub id: i64,
    pub uuid: Uuid,
    pub name: String,
    pub label: String,
    pub icon: Option<String>,
    pub sort_order: Option<i32>,
    /// Set on promoted items only
    pub route: Option<String>,
    pub children: Vec<MenuLeaf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuLeaf {
    pub id: i64,
    pub uuid: Uuid,
    pub name: String,
    pub label: String,
    pub icon: Option<String>,
    pub sort_order: Option<i32>,
    pub route: String,
}

impl From<&MenuItem> for MenuLeaf {
    fn from(item: &MenuItem) -> Self {
        Self {
            id: item.id,
            uuid: item.external_id,
            name: item.name.clone(),
            label: item.name.clone(),
            icon: item.icon.clone(),
            sort_order: item.sort_order,
            route: item.route.clone(),
        }
    }
}

impl MenuNode {
    fn group(group: &MenuGroup, children: Vec<MenuLeaf>) -> Self {
        Self {
            id: group.id,
            uuid: group.external_id,
            name: group.name.clone(),
            label: group.name.clone(),
            icon: group.icon.clone(),
            sort_order: group.sort_order,
            route: None,
            children,
        }
    }

    fn promoted(item: &MenuItem) -> Self {
        Self {
            id: item.id,
            uuid: item.external_id,
            name: item.name.clone(),
            label: item.name.clone(),
            icon: item.icon.clone(),
            sort_order: item.sort_order,
            route: Some(item.route.clone()),
            children: Vec::new(),
        }
    }
}

pub struct MenuResolver {
    store: Arc<dyn GraphStore>,
}

impl MenuResolver {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    pub async fn resolve(&self, authority_ids: &[i64]) -> StoreResult<Vec<MenuNode>> {
        let mut ids: Vec<i64> = authority_ids.to_vec();
        if !ids.contains(&SENTINEL_ID) {
            ids.push(SENTINEL_ID);
        }

        let grouped = self.store.menu_items_for_authorities(&ids, true).await?;
        let ungrouped = self.store.menu_items_for_authorities(&ids, false).await?;

        let mut group_ids: BTreeSet<i64> = grouped.iter().filter_map(|item| item.menu_group_id).collect();
        group_ids.insert(SENTINEL_ID);
        let group_ids: Vec<i64> = group_ids.into_iter().collect();
        let groups = self.store.menu_groups_by_ids(&group_ids).await?;

        debug!(
            "Resolving menu: {} grouped items, {} ungrouped items, {} groups",
            grouped.len(),
            ungrouped.len(),
            groups.len()
        );

        Ok(assemble(&groups, &grouped, &ungrouped))
    }
}

/// Builds the node list from already-ordered store results
pub fn assemble(groups: &[MenuGroup], grouped: &[MenuItem], ungrouped: &[MenuItem]) -> Vec<MenuNode> {
    let mut nodes: Vec<MenuNode> = ungrouped.iter().map(MenuNode::promoted).collect();

    for group in groups {
        let mut children: Vec<MenuLeaf> = grouped
            .iter()
            .filter(|item| item.menu_group_id == Some(group.id))
            .map(MenuLeaf::from)
            .collect();
        children.sort_by_key(|leaf| (leaf.sort_order.unwrap_or(0), leaf.id));
        nodes.push(MenuNode::group(group, children));
    }

    // stable: ties keep promoted nodes ahead of groups
    nodes.sort_by_key(|node| node.sort_order.unwrap_or(0));
    nodes
}
