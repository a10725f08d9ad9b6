//! Route-derived permission catalog.
//!
//! Built once at startup from the route table. It is the only place the
//! naming convention (`UPPER(resource)_UPPER(action)`) is applied: the
//! registrar seeds authorities from `registrable()` and the enforcer looks
//! requirements up with `requirement()`.
use std::collections::{HashMap, HashSet};

use axum::http::Method;
use convert_case::{Case, Casing};
use serde::Serialize;

pub mod route;

pub use route::{ApiRoutes, ResourceRoutes, RouteDescriptor, RouteTable};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequiredAuthority {
    pub resource: String,
    pub action: String,
    pub name: String,
    pub method_label: String,
    pub description: String,
}

impl RequiredAuthority {
    pub fn derive(component: &str, action: &str, suffix: &str, methods: &[Method]) -> Self {
        let resource = resource_name(component, suffix);
        let name = authority_name(&resource, action);
        let verbs: Vec<&str> = methods.iter().map(Method::as_str).collect();
        Self {
            resource,
            action: action.to_string(),
            name,
            method_label: format!("[{}]", verbs.join(", ")),
            description: describe_action(action),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteRequirement {
    Exempt,
    Authority(RequiredAuthority),
}

/// `RoleResource` -> `Role`, `menuItemResource` -> `MenuItem`
pub fn resource_name(component: &str, suffix: &str) -> String {
    let base = if suffix.is_empty() {
        component
    } else {
        component.strip_suffix(suffix).unwrap_or(component)
    };
    let mut chars = base.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn authority_name(resource: &str, action: &str) -> String {
    format!("{}_{}", resource.to_uppercase(), action.to_uppercase())
}

/// `api/` and `/api/` -> `/api`. A bare `/` collapses to the empty prefix.
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

fn under_prefix(prefix: &str, path: &str) -> bool {
    path == prefix || path.starts_with(&format!("{}/", prefix))
}

/// `assignAuthorities` -> `Assign Authorities`
pub fn describe_action(action: &str) -> String {
    action.to_case(Case::Title)
}

#[derive(Debug, Clone)]
pub struct PermissionCatalog {
    prefix: String,
    requirements: HashMap<(Method, String), RouteRequirement>,
    registrable: Vec<RequiredAuthority>,
}

impl PermissionCatalog {
    pub fn build(table: &RouteTable, prefix: &str, suffix: &str) -> Self {
        let prefix = normalize_prefix(prefix);
        let mut requirements = HashMap::new();
        let mut registrable = Vec::new();
        let mut seen = HashSet::new();

        for route in table.routes() {
            let requirement = if route.exempt {
                RouteRequirement::Exempt
            } else {
                RouteRequirement::Authority(RequiredAuthority::derive(
                    &route.component,
                    &route.handler,
                    suffix,
                    &route.methods,
                ))
            };

            for pattern in &route.patterns {
                for method in &route.methods {
                    requirements.insert((method.clone(), pattern.clone()), requirement.clone());
                }
            }

            // Only single-pattern API routes with verbs are seeded as authorities
            if let RouteRequirement::Authority(required) = requirement {
                let registers = route.patterns.len() == 1
                    && under_prefix(&prefix, &route.patterns[0])
                    && !route.methods.is_empty();
                if registers && seen.insert((required.resource.clone(), required.action.clone())) {
                    registrable.push(required);
                }
            }
        }

        Self {
            prefix,
            requirements,
            registrable,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Whether requests on this path go through enforcement
    pub fn covers(&self, path: &str) -> bool {
        under_prefix(&self.prefix, path)
    }

    /// Requirement of a matched route pattern. HEAD is served by GET handlers
    /// and is looked up as GET.
    pub fn requirement(&self, method: &Method, pattern: &str) -> Option<&RouteRequirement> {
        let method = if method == Method::HEAD { Method::GET } else { method.clone() };
        self.requirements.get(&(method, pattern.to_string()))
    }

    pub fn registrable(&self) -> &[RequiredAuthority] {
        &self.registrable
    }

    pub fn len(&self) -> usize {
        self.requirements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(patterns: &[&str], method: Method, component: &str, handler: &str, exempt: bool) -> RouteDescriptor {
        RouteDescriptor {
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
            methods: vec![method],
            component: component.to_string(),
            handler: handler.to_string(),
            exempt,
        }
    }

    fn table() -> RouteTable {
        let mut table = RouteTable::new();
        table.push(route(&["/api/roles"], Method::POST, "RoleResource", "create", false));
        table.push(route(&["/api/roles/:uuid"], Method::DELETE, "RoleResource", "delete", false));
        table.push(route(&["/api/roles/assign-authorities"], Method::POST, "RoleResource", "assignAuthorities", false));
        table.push(route(&["/api/authorities"], Method::GET, "AuthorityResource", "getAuthorities", true));
        table.push(route(&["/api/me", "/api/userinfo"], Method::GET, "UserInfoResource", "userInfo", false));
        table.push(route(&["/status"], Method::GET, "StatusResource", "status", false));
        // Same (resource, action) under a second path collapses to one authority
        table.push(route(&["/api/v2/roles"], Method::POST, "RoleResource", "create", false));
        table
    }

    #[test]
    fn derives_names_from_component_and_action() {
        assert_eq!(resource_name("RoleResource", "Resource"), "Role");
        assert_eq!(resource_name("menuItemResource", "Resource"), "MenuItem");
        assert_eq!(resource_name("Health", "Resource"), "Health");
        assert_eq!(authority_name("MenuItem", "assignAuthorities"), "MENUITEM_ASSIGNAUTHORITIES");
        assert_eq!(describe_action("assignAuthorities"), "Assign Authorities");
        assert_eq!(describe_action("findById"), "Find By Id");
    }

    #[test]
    fn registrable_skips_exempt_multi_pattern_and_foreign_routes() {
        let catalog = PermissionCatalog::build(&table(), "/api", "Resource");
        let names: Vec<&str> = catalog.registrable().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["ROLE_CREATE", "ROLE_DELETE", "ROLE_ASSIGNAUTHORITIES"]);

        let create = &catalog.registrable()[0];
        assert_eq!(create.resource, "Role");
        assert_eq!(create.action, "create");
        assert_eq!(create.method_label, "[POST]");
        assert_eq!(create.description, "Create");
    }

    #[test]
    fn requirement_lookup_by_method_and_pattern() {
        let catalog = PermissionCatalog::build(&table(), "/api", "Resource");

        match catalog.requirement(&Method::DELETE, "/api/roles/:uuid") {
            Some(RouteRequirement::Authority(required)) => assert_eq!(required.name, "ROLE_DELETE"),
            other => panic!("unexpected requirement: {:?}", other),
        }
        assert_eq!(
            catalog.requirement(&Method::GET, "/api/authorities"),
            Some(&RouteRequirement::Exempt)
        );
        assert_eq!(
            catalog.requirement(&Method::HEAD, "/api/authorities"),
            Some(&RouteRequirement::Exempt)
        );
        // Multi-pattern routes are still enforced under every pattern
        assert!(matches!(
            catalog.requirement(&Method::GET, "/api/userinfo"),
            Some(RouteRequirement::Authority(_))
        ));
        assert!(catalog.requirement(&Method::PUT, "/api/roles").is_none());
    }

    #[test]
    fn covers_only_paths_under_prefix() {
        let catalog = PermissionCatalog::build(&table(), "/api", "Resource");
        assert!(catalog.covers("/api/roles"));
        assert!(catalog.covers("/api"));
        assert!(!catalog.covers("/apis"));
        assert!(!catalog.covers("/health"));
    }

    #[test]
    fn trailing_slash_prefix_is_normalized() {
        assert_eq!(normalize_prefix("/api/"), "/api");
        assert_eq!(normalize_prefix("api"), "/api");
        assert_eq!(normalize_prefix("/"), "");

        let catalog = PermissionCatalog::build(&table(), "/api/", "Resource");
        assert_eq!(catalog.prefix(), "/api");
        assert!(catalog.covers("/api/roles"));
        assert_eq!(catalog.registrable().len(), 3);
    }

    #[test]
    fn registration_and_enforcement_share_the_prefix_rule() {
        let mut table = table();
        // contains "/api" but is not under it
        table.push(route(&["/legacy/api/roles"], Method::GET, "RoleResource", "get", false));
        let catalog = PermissionCatalog::build(&table, "/api", "Resource");

        for required in catalog.registrable() {
            assert_ne!(required.action, "get");
        }
        assert!(!catalog.covers("/legacy/api/roles"));
    }
}
