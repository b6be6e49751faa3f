//! Per-verb storage for a single path.

use http::Method;

/// Values registered for each HTTP verb of one path.
///
/// ```rust
/// use daedalus_router::MethodRouter;
/// use http::Method;
///
/// let methods = MethodRouter::new().get("read").put("write");
/// assert_eq!(methods.get_value(&Method::GET), Some(&"read"));
/// assert_eq!(methods.get_value(&Method::DELETE), None);
/// ```
#[derive(Debug, Clone)]
pub struct MethodRouter<T> {
    get: Option<T>,
    post: Option<T>,
    put: Option<T>,
    delete: Option<T>,
    patch: Option<T>,
    head: Option<T>,
    options: Option<T>,
}

impl<T> Default for MethodRouter<T> {
    fn default() -> Self {
        Self {
            get: None,
            post: None,
            put: None,
            delete: None,
            patch: None,
            head: None,
            options: None,
        }
    }
}

impl<T> MethodRouter<T> {
    /// Creates an empty method router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a GET value.
    #[must_use]
    pub fn get(mut self, value: T) -> Self {
        self.get = Some(value);
        self
    }

    /// Registers a POST value.
    #[must_use]
    pub fn post(mut self, value: T) -> Self {
        self.post = Some(value);
        self
    }

    /// Registers a PUT value.
    #[must_use]
    pub fn put(mut self, value: T) -> Self {
        self.put = Some(value);
        self
    }

    /// Registers a DELETE value.
    #[must_use]
    pub fn delete(mut self, value: T) -> Self {
        self.delete = Some(value);
        self
    }

    /// Registers a PATCH value.
    #[must_use]
    pub fn patch(mut self, value: T) -> Self {
        self.patch = Some(value);
        self
    }

    /// Registers a value for an arbitrary verb.
    ///
    /// Verbs without a slot (TRACE, CONNECT, extensions) are ignored.
    #[must_use]
    pub fn method(mut self, method: &Method, value: T) -> Self {
        if let Some(slot) = self.slot_mut(method) {
            *slot = Some(value);
        }
        self
    }

    /// Returns the value registered for `method`.
    #[must_use]
    pub fn get_value(&self, method: &Method) -> Option<&T> {
        match *method {
            Method::GET => self.get.as_ref(),
            Method::POST => self.post.as_ref(),
            Method::PUT => self.put.as_ref(),
            Method::DELETE => self.delete.as_ref(),
            Method::PATCH => self.patch.as_ref(),
            Method::HEAD => self.head.as_ref(),
            Method::OPTIONS => self.options.as_ref(),
            _ => None,
        }
    }

    /// True if `method` already has a value.
    #[must_use]
    pub fn contains(&self, method: &Method) -> bool {
        self.get_value(method).is_some()
    }

    fn slot_mut(&mut self, method: &Method) -> Option<&mut Option<T>> {
        match *method {
            Method::GET => Some(&mut self.get),
            Method::POST => Some(&mut self.post),
            Method::PUT => Some(&mut self.put),
            Method::DELETE => Some(&mut self.delete),
            Method::PATCH => Some(&mut self.patch),
            Method::HEAD => Some(&mut self.head),
            Method::OPTIONS => Some(&mut self.options),
            _ => None,
        }
    }

    /// Moves verbs from `other` that are not yet set here.
    ///
    /// Existing values are never overwritten.
    pub fn merge(&mut self, other: MethodRouter<T>) {
        let MethodRouter {
            get,
            post,
            put,
            delete,
            patch,
            head,
            options,
        } = other;
        for (slot, incoming) in [
            (&mut self.get, get),
            (&mut self.post, post),
            (&mut self.put, put),
            (&mut self.delete, delete),
            (&mut self.patch, patch),
            (&mut self.head, head),
            (&mut self.options, options),
        ] {
            if slot.is_none() {
                *slot = incoming;
            }
        }
    }

    /// Verbs with a registered value, in a stable order.
    ///
    /// Used to build the `Allow` header of 405 responses.
    #[must_use]
    pub fn allowed_methods(&self) -> Vec<Method> {
        [
            (Method::GET, self.get.is_some()),
            (Method::POST, self.post.is_some()),
            (Method::PUT, self.put.is_some()),
            (Method::DELETE, self.delete.is_some()),
            (Method::PATCH, self.patch.is_some()),
            (Method::HEAD, self.head.is_some()),
            (Method::OPTIONS, self.options.is_some()),
        ]
        .into_iter()
        .filter_map(|(method, set)| set.then_some(method))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_dispatch() {
        let router = MethodRouter::new()
            .method(&Method::PATCH, 5)
            .method(&Method::TRACE, 6);
        assert_eq!(router.get_value(&Method::PATCH), Some(&5));
        assert_eq!(router.get_value(&Method::TRACE), None);
    }

    #[test]
    fn test_merge_keeps_existing() {
        let mut router = MethodRouter::new().get("a");
        router.merge(MethodRouter::new().get("b").post("c"));
        assert_eq!(router.get_value(&Method::GET), Some(&"a"));
        assert_eq!(router.get_value(&Method::POST), Some(&"c"));
    }

    #[test]
    fn test_allowed_methods() {
        let router = MethodRouter::new().delete(()).get(());
        assert_eq!(router.allowed_methods(), vec![Method::GET, Method::DELETE]);
        assert!(MethodRouter::<()>::new().allowed_methods().is_empty());
    }
}
