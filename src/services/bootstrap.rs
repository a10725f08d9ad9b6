use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::database::models::role::{SUPER_ADMINISTRATOR_CODE, SUPER_ADMINISTRATOR_NAME};
use crate::database::models::{MenuGroup, MenuItem, Role, User};
use crate::database::repository::StoreResult;
use crate::database::store::GraphStore;

struct SeedItem {
    name: &'static str,
    route: &'static str,
    icon: &'static str,
    sort_order: i32,
    authority: &'static str,
}

const SYSTEM_GROUP: &str = "System Configuration";

const SYSTEM_ITEMS: &[SeedItem] = &[
    SeedItem { name: "Roles", route: "/main/config/role", icon: "pi pi-users", sort_order: 1, authority: "ROLE_CREATE" },
    SeedItem {
        name: "Menu Groups",
        route: "/main/config/menu-group",
        icon: "pi pi-expand",
        sort_order: 2,
        authority: "MENUGROUP_CREATE",
    },
    SeedItem {
        name: "Menu Items",
        route: "/main/config/menu-item",
        icon: "pi pi-bars",
        sort_order: 3,
        authority: "MENUITEM_CREATE",
    },
    SeedItem { name: "Users", route: "/main/config/user", icon: "pi pi-user", sort_order: 4, authority: "USER_CREATE" },
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    pub role_created: bool,
    pub admin_created: bool,
    pub menu_items_seeded: usize,
}

/// Post-registration seeding. Every step is skipped when its data already
/// exists, so restarts leave administrator edits alone. Each node is written
/// together with its edges, so a failed step leaves nothing behind.
pub struct Bootstrap {
    store: Arc<dyn GraphStore>,
    config: Arc<AppConfig>,
}

impl Bootstrap {
    pub fn new(store: Arc<dyn GraphStore>, config: Arc<AppConfig>) -> Self {
        Self { store, config }
    }

    pub async fn run(&self) -> StoreResult<BootstrapReport> {
        let (role, role_created) = self.ensure_super_administrator().await?;
        let admin_created = self.ensure_admin_user(&role).await?;
        let menu_items_seeded = if self.config.bootstrap.seed_menus {
            self.seed_menus().await?
        } else {
            0
        };

        let report = BootstrapReport {
            role_created,
            admin_created,
            menu_items_seeded,
        };
        info!("Bootstrap complete: {:?}", report);
        Ok(report)
    }

    async fn ensure_super_administrator(&self) -> StoreResult<(Role, bool)> {
        if let Some(role) = self.store.find_role_by_code(SUPER_ADMINISTRATOR_CODE).await? {
            return Ok((role, false));
        }

        let authorities = self
            .store
            .authorities_for_service(&self.config.service.service_name)
            .await?;
        let ids: Vec<Uuid> = authorities.iter().map(|a| a.external_id).collect();
        let role = self
            .store
            .insert_role_with_authorities(Role::new(SUPER_ADMINISTRATOR_NAME, SUPER_ADMINISTRATOR_CODE), &ids)
            .await?;

        info!("Created role {} with {} authorities", role.code, ids.len());
        Ok((role, true))
    }

    async fn ensure_admin_user(&self, role: &Role) -> StoreResult<bool> {
        let Some(email) = self.config.bootstrap.admin_email.as_deref() else {
            return Ok(false);
        };
        if self.store.find_user_by_email(email).await?.is_some() {
            return Ok(false);
        }

        let mut admin = User::new(email, "System", "Administrator");
        if let Some(hash) = &self.config.bootstrap.admin_credential_hash {
            admin.credential_hash = hash.clone();
        } else {
            warn!("No ADMIN_CREDENTIAL_HASH configured for {}", email);
        }
        let (admin, _) = self
            .store
            .save_user_with_roles(admin, &[role.external_id])
            .await?;

        info!("Created administrator {}", admin.email);
        Ok(true)
    }

    async fn seed_menus(&self) -> StoreResult<usize> {
        if self.store.count_menu_groups().await? > 0 {
            return Ok(0);
        }

        let mut items = Vec::with_capacity(SYSTEM_ITEMS.len());
        for seed in SYSTEM_ITEMS {
            let authorities = match self.store.find_authority_by_name(seed.authority).await? {
                Some(authority) => vec![authority.external_id],
                None => {
                    warn!("Authority {} missing, menu item {} has no authority", seed.authority, seed.name);
                    vec![]
                }
            };
            let item = MenuItem::new(seed.name, Some(seed.icon.to_string()), seed.route, Some(seed.sort_order), None);
            items.push((item, authorities));
        }

        let group = MenuGroup::new(SYSTEM_GROUP, Some("pi pi-cog".to_string()), Some(2));
        let (group, items) = self.store.insert_menu_group_with_items(group, items).await?;
        let seeded = items.len();

        info!("Seeded menu group {} with {} items", group.name, seeded);
        Ok(seeded)
    }
}
