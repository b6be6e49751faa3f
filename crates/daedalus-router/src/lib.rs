//! Radix tree router for Daedalus.
//!
//! The router maps a path pattern plus an HTTP verb to an arbitrary value.
//! Daedalus registers one pipeline chain per (verb, path), but the router
//! itself knows nothing about chains: it is generic over the stored value.
//!
//! # Features
//!
//! - **Radix Tree Matching**: O(k) lookup in the number of path segments
//! - **Path Parameters**: `/users/{id}` or gin-style `/users/:id`
//! - **Wildcards**: Catch-all routes (`/files/*path`)
//! - **Method-Based Routing**: one value per HTTP verb
//!
//! # Example
//!
//! ```rust
//! use daedalus_router::{Router, MethodRouter};
//! use http::Method;
//!
//! let mut router = Router::new();
//! router.insert("/users", MethodRouter::new().get("list").post("create")).unwrap();
//! router.insert("/users/:id", MethodRouter::new().get("show")).unwrap();
//!
//! let m = router.match_route(&Method::GET, "/users/42").unwrap();
//! assert_eq!(*m.value, "show");
//! assert_eq!(m.params.get("id"), Some("42"));
//! ```

mod error;
mod method_router;
mod node;
mod params;
mod router;

pub use error::PatternError;
pub use method_router::MethodRouter;
pub use node::{Node, SegmentKind};
pub use params::Params;
pub use router::Router;

/// A matched route: the value registered for the verb plus path parameters.
#[derive(Debug, PartialEq, Eq)]
pub struct RouteMatch<'a, T> {
    /// The value registered for the matched verb
    pub value: &'a T,
    /// Extracted path parameters
    pub params: Params,
}

impl<'a, T> RouteMatch<'a, T> {
    /// Creates a new route match.
    #[must_use]
    pub fn new(value: &'a T, params: Params) -> Self {
        Self { value, params }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    #[test]
    fn test_basic_routing() {
        let mut router = Router::new();
        router.insert("/users", MethodRouter::new().get(1)).unwrap();
        router.insert("/users/{id}", MethodRouter::new().get(2)).unwrap();

        let m = router.match_route(&Method::GET, "/users").unwrap();
        assert_eq!(*m.value, 1);
        assert!(m.params.is_empty());

        let m = router.match_route(&Method::GET, "/users/123").unwrap();
        assert_eq!(*m.value, 2);
        assert_eq!(m.params.get("id"), Some("123"));
    }

    #[test]
    fn test_gin_style_params() {
        let mut router = Router::new();
        router
            .insert("/orgs/:org/users/:user", MethodRouter::new().delete("remove"))
            .unwrap();

        let m = router
            .match_route(&Method::DELETE, "/orgs/acme/users/7")
            .unwrap();
        assert_eq!(*m.value, "remove");
        assert_eq!(m.params.get("org"), Some("acme"));
        assert_eq!(m.params.get("user"), Some("7"));
    }

    #[test]
    fn test_wildcard_routing() {
        let mut router = Router::new();
        router
            .insert("/files/*path", MethodRouter::new().get("serve"))
            .unwrap();

        let m = router
            .match_route(&Method::GET, "/files/images/logo.png")
            .unwrap();
        assert_eq!(m.params.get("path"), Some("images/logo.png"));
    }
}
