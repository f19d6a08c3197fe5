//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store compiled routes
//! - Look up the matching route for a path and method
//! - Return the matched route, a method mismatch, or an explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) segment scan (acceptable for typical route counts)
//! - Routes with more literal segments are checked first
//! - Explicit NotFound / MethodNotAllowed rather than silent default

use std::sync::Arc;

use axum::http::Method;

use crate::config::RouteConfig;
use crate::routing::matcher::{MethodMatcher, PathParams, PathPattern};
use crate::upstream::{Backend, BackendRegistry};

/// A compiled route.
#[derive(Debug)]
pub struct Route {
    pub name: String,
    pub group: String,
    pub description: String,
    pub backend: Arc<Backend>,
    pattern: PathPattern,
    target: PathPattern,
    methods: MethodMatcher,
}

impl Route {
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn methods(&self) -> &[Method] {
        self.methods.allowed()
    }
}

/// A successful lookup: the route plus the backend path to call.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub route: Arc<Route>,
    pub params: PathParams,
    pub target_path: String,
}

impl RouteMatch {
    pub fn backend(&self) -> &Arc<Backend> {
        &self.route.backend
    }
}

/// Outcome of a route table lookup.
#[derive(Debug)]
pub enum Resolution {
    Matched(RouteMatch),
    /// The path is known but no route on it accepts the method.
    MethodNotAllowed { allowed: Vec<Method> },
    NotFound,
}

/// Errors building the table from configuration.
#[derive(Debug, thiserror::Error)]
pub enum RouteTableError {
    #[error("route {route:?} references unknown backend {backend:?}")]
    UnknownBackend { route: String, backend: String },

    #[error("route {route:?}: {source}")]
    Pattern {
        route: String,
        #[source]
        source: crate::routing::matcher::PatternError,
    },

    #[error("route {route:?} has invalid method {method:?}")]
    Method { route: String, method: String },
}

/// The immutable route table.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<Arc<Route>>,
}

impl RouteTable {
    /// Compile routes, resolving each backend reference against the registry.
    pub fn from_config(
        configs: &[RouteConfig],
        backends: &BackendRegistry,
    ) -> Result<Self, RouteTableError> {
        let mut routes = Vec::with_capacity(configs.len());

        for config in configs {
            let backend = backends.get(&config.backend).ok_or_else(|| {
                RouteTableError::UnknownBackend {
                    route: config.name.clone(),
                    backend: config.backend.clone(),
                }
            })?;

            let pattern_err = |source| RouteTableError::Pattern {
                route: config.name.clone(),
                source,
            };
            let pattern = PathPattern::parse(&config.pattern).map_err(pattern_err)?;
            let target = match &config.target {
                Some(template) => pattern.check_template(template).map_err(pattern_err)?,
                None => pattern.clone(),
            };

            let mut methods = Vec::with_capacity(config.methods.len());
            for raw in &config.methods {
                let method = raw.parse::<Method>().map_err(|_| RouteTableError::Method {
                    route: config.name.clone(),
                    method: raw.clone(),
                })?;
                methods.push(method);
            }

            routes.push(Arc::new(Route {
                name: config.name.clone(),
                group: config.group.clone(),
                description: config.description.clone(),
                backend,
                pattern,
                target,
                methods: MethodMatcher::new(methods),
            }));
        }

        // Stable sort keeps configuration order among equally specific routes.
        routes.sort_by(|a, b| b.pattern.literal_count().cmp(&a.pattern.literal_count()));

        tracing::debug!(routes = routes.len(), "Route table compiled");
        Ok(Self { routes })
    }

    /// Find the route for `path` and `method`.
    pub fn resolve(&self, path: &str, method: &Method) -> Resolution {
        let mut allowed: Vec<Method> = Vec::new();

        for route in &self.routes {
            let Some(params) = route.pattern.matches(path) else {
                continue;
            };
            if route.methods.matches(method) {
                let target_path = route.target.render(&params);
                return Resolution::Matched(RouteMatch {
                    route: Arc::clone(route),
                    params,
                    target_path,
                });
            }
            for m in route.methods() {
                if !allowed.contains(m) {
                    allowed.push(m.clone());
                }
            }
        }

        if allowed.is_empty() {
            Resolution::NotFound
        } else {
            Resolution::MethodNotAllowed { allowed }
        }
    }

    /// All routes, most specific first.
    pub fn routes(&self) -> &[Arc<Route>] {
        &self.routes
    }

    /// Distinct counter groups, in first-seen order.
    pub fn groups(&self) -> Vec<String> {
        let mut groups: Vec<String> = Vec::new();
        for route in &self.routes {
            if !groups.contains(&route.group) {
                groups.push(route.group.clone());
            }
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use crate::config::schema::default_routes;

    fn table() -> RouteTable {
        let config = GatewayConfig::default();
        let registry = BackendRegistry::from_config(&config).unwrap();
        RouteTable::from_config(&default_routes(), &registry).unwrap()
    }

    fn matched(resolution: Resolution) -> RouteMatch {
        match resolution {
            Resolution::Matched(m) => m,
            other => panic!("expected a match, got {:?}", other),
        }
    }

    #[test]
    fn resolves_collection_and_item_routes() {
        let table = table();

        let m = matched(table.resolve("/users", &Method::POST));
        assert_eq!(m.route.name, "users-collection");
        assert_eq!(m.backend().name, "users");
        assert_eq!(m.target_path, "/users");

        let m = matched(table.resolve("/orders/5", &Method::DELETE));
        assert_eq!(m.route.name, "orders-item");
        assert_eq!(m.params.get("id"), Some("5"));
        assert_eq!(m.target_path, "/orders/5");
    }

    #[test]
    fn literal_routes_win_over_params() {
        let table = table();
        let m = matched(table.resolve("/orders/user/3", &Method::GET));
        assert_eq!(m.route.name, "orders-by-user");
        assert_eq!(m.target_path, "/orders/user/3");

        let m = matched(table.resolve("/users/search/ana", &Method::GET));
        assert_eq!(m.route.name, "users-search");
    }

    #[test]
    fn method_mismatch_reports_allowed_methods() {
        let table = table();
        match table.resolve("/users/7", &Method::POST) {
            Resolution::MethodNotAllowed { allowed } => {
                assert_eq!(allowed, vec![Method::GET, Method::PUT, Method::DELETE]);
            }
            other => panic!("expected MethodNotAllowed, got {:?}", other),
        }

        assert!(matches!(
            table.resolve("/orders/status/shipped", &Method::DELETE),
            Resolution::MethodNotAllowed { .. }
        ));
    }

    #[test]
    fn unknown_paths_are_not_found() {
        let table = table();
        assert!(matches!(table.resolve("/payments", &Method::GET), Resolution::NotFound));
        assert!(matches!(table.resolve("/users/1/orders", &Method::GET), Resolution::NotFound));
    }

    #[test]
    fn rewrite_template_applied() {
        let config = GatewayConfig::default();
        let registry = BackendRegistry::from_config(&config).unwrap();
        let mut route = RouteConfig::new("legacy", "/v1/customers/{id}", &["GET"], "users", "users");
        route.target = Some("/users/{id}".to_string());

        let table = RouteTable::from_config(&[route], &registry).unwrap();
        let m = matched(table.resolve("/v1/customers/9", &Method::GET));
        assert_eq!(m.target_path, "/users/9");
    }

    #[test]
    fn groups_are_distinct() {
        assert_eq!(table().groups().len(), 2);
    }
}
