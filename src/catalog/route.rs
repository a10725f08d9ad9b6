use std::collections::BTreeMap;

use axum::handler::Handler;
use axum::http::Method;
use axum::routing::{self, MethodRouter};
use axum::Router;

/// One registered handler as the permission engine sees it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDescriptor {
    pub patterns: Vec<String>,
    pub methods: Vec<Method>,
    /// Owning component, e.g. `RoleResource`
    pub component: String,
    /// Handler method name, e.g. `assignAuthorities`
    pub handler: String,
    pub exempt: bool,
}

/// Every handler registered through `ApiRoutes`, in registration order
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<RouteDescriptor>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, descriptor: RouteDescriptor) {
        self.routes.push(descriptor);
    }

    pub fn routes(&self) -> &[RouteDescriptor] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Mounts axum handlers and records each one in a `RouteTable` at the same
/// time, so the table cannot drift from what is actually served.
pub struct ApiRoutes<S> {
    base: String,
    table: RouteTable,
    routers: BTreeMap<String, MethodRouter<S>>,
}

impl<S> ApiRoutes<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// `base` is prepended to every path given to the resource builders
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: super::normalize_prefix(&base.into()),
            table: RouteTable::new(),
            routers: BTreeMap::new(),
        }
    }

    pub fn resource(
        self,
        component: impl Into<String>,
        build: impl FnOnce(ResourceRoutes<S>) -> ResourceRoutes<S>,
    ) -> Self {
        let component = component.into();
        build(ResourceRoutes { component, last: None, parent: self }).finish()
    }

    fn mount(&mut self, descriptor: RouteDescriptor, router: MethodRouter<S>) {
        for pattern in &descriptor.patterns {
            let merged = match self.routers.remove(pattern) {
                Some(existing) => existing.merge(router.clone()),
                None => router.clone(),
            };
            self.routers.insert(pattern.clone(), merged);
        }
        self.table.push(descriptor);
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    pub fn into_parts(self) -> (RouteTable, Router<S>) {
        let router = self
            .routers
            .into_iter()
            .fold(Router::new(), |router, (path, method_router)| router.route(&path, method_router));
        (self.table, router)
    }
}

/// Routes of one component. Each verb call registers one handler under the
/// given action name; `exempt()` applies to the handler registered last.
pub struct ResourceRoutes<S> {
    component: String,
    last: Option<(RouteDescriptor, MethodRouter<S>)>,
    parent: ApiRoutes<S>,
}

impl<S> ResourceRoutes<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn get<H, T>(self, path: &str, action: &str, handler: H) -> Self
    where
        H: Handler<T, S>,
        T: 'static,
    {
        self.add(&[path], Method::GET, action, routing::get(handler))
    }

    pub fn post<H, T>(self, path: &str, action: &str, handler: H) -> Self
    where
        H: Handler<T, S>,
        T: 'static,
    {
        self.add(&[path], Method::POST, action, routing::post(handler))
    }

    pub fn put<H, T>(self, path: &str, action: &str, handler: H) -> Self
    where
        H: Handler<T, S>,
        T: 'static,
    {
        self.add(&[path], Method::PUT, action, routing::put(handler))
    }

    pub fn delete<H, T>(self, path: &str, action: &str, handler: H) -> Self
    where
        H: Handler<T, S>,
        T: 'static,
    {
        self.add(&[path], Method::DELETE, action, routing::delete(handler))
    }

    /// One handler served under several patterns
    pub fn get_many<H, T>(self, paths: &[&str], action: &str, handler: H) -> Self
    where
        H: Handler<T, S>,
        T: 'static,
    {
        self.add(paths, Method::GET, action, routing::get(handler))
    }

    pub fn exempt(mut self) -> Self {
        if let Some((descriptor, _)) = self.last.as_mut() {
            descriptor.exempt = true;
        }
        self
    }

    fn add(mut self, paths: &[&str], method: Method, action: &str, router: MethodRouter<S>) -> Self {
        self.flush();
        let patterns = paths
            .iter()
            .map(|p| format!("{}{}", self.parent.base, p))
            .collect();
        let descriptor = RouteDescriptor {
            patterns,
            methods: vec![method],
            component: self.component.clone(),
            handler: action.to_string(),
            exempt: false,
        };
        self.last = Some((descriptor, router));
        self
    }

    fn flush(&mut self) {
        if let Some((descriptor, router)) = self.last.take() {
            self.parent.mount(descriptor, router);
        }
    }

    fn finish(mut self) -> ApiRoutes<S> {
        self.flush();
        self.parent
    }
}
