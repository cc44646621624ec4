//! Navigation guard: decides whether a view transition may proceed.
//!
//! The decision depends only on the requested destination, the access rule
//! declared for it, and whether the session holds an access credential. The
//! cached identity plays no part, and the guard never mutates the session.

use tracing::debug;

use crate::auth::SessionStore;

/// Access rule declared by a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Reachable in any state
    Public,
    /// Needs a signed-in session
    RequiresAuth,
    /// Only makes sense signed out (login, registration)
    GuestOnly,
}

#[derive(Debug, Clone)]
pub struct Route {
    pub path: String,
    pub name: String,
    pub access: Access,
    /// Alias target; the route itself is never shown
    pub redirect: Option<String>,
}

impl Route {
    pub fn new(path: &str, name: &str, access: Access) -> Self {
        Self {
            path: path.to_string(),
            name: name.to_string(),
            access,
            redirect: None,
        }
    }

    pub fn alias(path: &str, target: &str) -> Self {
        Self {
            path: path.to_string(),
            name: String::new(),
            access: Access::Public,
            redirect: Some(target.to_string()),
        }
    }
}

/// Outcome of a guard check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Show the requested destination as is
    Proceed,
    /// Show this path instead
    Redirect(String),
}

pub struct RouteTable {
    routes: Vec<Route>,
    login_path: String,
    landing_path: String,
}

/// Alias chains longer than this are treated as misconfigured
const MAX_ALIAS_HOPS: usize = 8;

impl RouteTable {
    pub fn new(login_path: &str, landing_path: &str) -> Self {
        Self {
            routes: Vec::new(),
            login_path: login_path.to_string(),
            landing_path: landing_path.to_string(),
        }
    }

    pub fn with_route(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    /// Routes of the user-management front end
    pub fn standard() -> Self {
        Self::new("/login", "/users")
            .with_route(Route::alias("/", "/users"))
            .with_route(Route::new("/login", "login", Access::GuestOnly))
            .with_route(Route::new("/register", "register", Access::GuestOnly))
            .with_route(Route::new("/users", "users", Access::RequiresAuth))
            .with_route(Route::new("/profile", "profile", Access::RequiresAuth))
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    pub fn landing_path(&self) -> &str {
        &self.landing_path
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn find(&self, path: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.path == path)
    }

    /// Follow aliases and return the final path with its access rule.
    /// Unknown paths are public.
    pub fn resolve(&self, path: &str) -> (String, Access) {
        let mut current = normalize(path);
        for _ in 0..MAX_ALIAS_HOPS {
            match self.find(&current) {
                Some(Route { redirect: Some(target), .. }) => current = normalize(target),
                Some(route) => return (current, route.access),
                None => return (current, Access::Public),
            }
        }
        (current, Access::Public)
    }
}

/// Drop query, fragment and trailing slash
fn normalize(path: &str) -> String {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let trimmed = path[..end].trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

pub struct NavigationGuard {
    routes: RouteTable,
}

impl NavigationGuard {
    pub fn new(routes: RouteTable) -> Self {
        Self { routes }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn check(&self, path: &str, is_authenticated: bool) -> Navigation {
        let (destination, access) = self.routes.resolve(path);

        let decision = match access {
            Access::RequiresAuth if !is_authenticated => {
                Navigation::Redirect(self.routes.login_path.clone())
            }
            Access::GuestOnly if is_authenticated => {
                Navigation::Redirect(self.routes.landing_path.clone())
            }
            _ if destination != normalize(path) => Navigation::Redirect(destination),
            _ => Navigation::Proceed,
        };

        debug!(path, is_authenticated, ?decision, "Navigation checked");
        decision
    }

    /// Check against the live session flag.
    pub async fn check_session(&self, path: &str, session: &SessionStore) -> Navigation {
        self.check(path, session.is_authenticated().await)
    }
}

impl Default for NavigationGuard {
    fn default() -> Self {
        Self::new(RouteTable::standard())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protected_route_redirects_to_login_when_signed_out() {
        let guard = NavigationGuard::default();
        assert_eq!(guard.check("/users", false), Navigation::Redirect("/login".into()));
        assert_eq!(guard.check("/profile", false), Navigation::Redirect("/login".into()));
    }

    #[test]
    fn test_protected_route_proceeds_when_signed_in() {
        let guard = NavigationGuard::default();
        assert_eq!(guard.check("/users", true), Navigation::Proceed);
        assert_eq!(guard.check("/profile", true), Navigation::Proceed);
    }

    #[test]
    fn test_guest_only_routes_redirect_to_landing_when_signed_in() {
        let guard = NavigationGuard::default();
        assert_eq!(guard.check("/login", true), Navigation::Redirect("/users".into()));
        assert_eq!(guard.check("/register", true), Navigation::Redirect("/users".into()));
        assert_eq!(guard.check("/login", false), Navigation::Proceed);
        assert_eq!(guard.check("/register", false), Navigation::Proceed);
    }

    #[test]
    fn test_alias_is_resolved_before_policy() {
        let guard = NavigationGuard::default();
        assert_eq!(guard.check("/", true), Navigation::Redirect("/users".into()));
        assert_eq!(guard.check("/", false), Navigation::Redirect("/login".into()));
    }

    #[test]
    fn test_unknown_route_is_public() {
        let guard = NavigationGuard::default();
        assert_eq!(guard.check("/about", false), Navigation::Proceed);
        assert_eq!(guard.check("/about", true), Navigation::Proceed);
    }

    #[test]
    fn test_paths_are_normalized() {
        let guard = NavigationGuard::default();
        assert_eq!(guard.check("/users/?page=2", false), Navigation::Redirect("/login".into()));
        assert_eq!(guard.check("/login#top", true), Navigation::Redirect("/users".into()));
        assert_eq!(guard.check("/profile?tab=security", true), Navigation::Proceed);
        assert_eq!(normalize("users"), "/users");
        assert_eq!(normalize(""), "/");
    }

    #[test]
    fn test_alias_loop_terminates() {
        let routes = RouteTable::new("/login", "/home")
            .with_route(Route::alias("/a", "/b"))
            .with_route(Route::alias("/b", "/a"));
        let (_, access) = routes.resolve("/a");
        assert_eq!(access, Access::Public);
    }
}
