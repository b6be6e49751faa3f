//! Radix tree node.
//!
//! Each node owns one path segment. Children are split by kind so matching
//! can try static segments first, then a parameter, then a catch-all.

use crate::error::PatternError;
use crate::method_router::MethodRouter;
use crate::params::Params;

/// Type of path segment in the radix tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentKind {
    /// Static path segment (e.g., "users", "api")
    Static,
    /// Named parameter (`{id}` or `:id`)
    Param(String),
    /// Catch-all wildcard (`*path`)
    Wildcard(String),
}

impl SegmentKind {
    /// Classifies one raw pattern segment.
    fn classify(raw: &str) -> Self {
        if let Some(name) = raw.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            Self::Param(name.to_string())
        } else if let Some(name) = raw.strip_prefix(':') {
            Self::Param(name.to_string())
        } else if let Some(name) = raw.strip_prefix('*') {
            Self::Wildcard(name.to_string())
        } else {
            Self::Static
        }
    }
}

/// A node in the radix tree.
#[derive(Debug, Clone)]
pub struct Node<T> {
    /// The path segment this node represents
    pub segment: String,

    /// The kind of segment
    pub kind: SegmentKind,

    /// Per-verb values, present when a route ends here
    pub methods: Option<MethodRouter<T>>,

    /// Static children, sorted by segment for binary search
    pub static_children: Vec<Node<T>>,

    /// Parameter child (at most one per node)
    pub param_child: Option<Box<Node<T>>>,

    /// Wildcard child (at most one per node, always a leaf)
    pub wildcard_child: Option<Box<Node<T>>>,
}

impl<T> Node<T> {
    fn with_kind(segment: String, kind: SegmentKind) -> Self {
        Self {
            segment,
            kind,
            methods: None,
            static_children: Vec::new(),
            param_child: None,
            wildcard_child: None,
        }
    }

    /// Creates the root node of a tree.
    #[must_use]
    pub fn root() -> Self {
        Self::with_kind(String::new(), SegmentKind::Static)
    }

    /// Splits a pattern into classified segments, rejecting malformed ones.
    pub(crate) fn parse_pattern(path: &str) -> Result<Vec<(String, SegmentKind)>, PatternError> {
        let raw: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let last = raw.len().saturating_sub(1);
        raw.iter()
            .enumerate()
            .map(|(i, s)| {
                let kind = SegmentKind::classify(s);
                match &kind {
                    SegmentKind::Param(name) | SegmentKind::Wildcard(name) if name.is_empty() => {
                        Err(PatternError::EmptyName(path.to_string()))
                    }
                    SegmentKind::Wildcard(_) if i != last => {
                        Err(PatternError::WildcardNotLast(path.to_string()))
                    }
                    _ => Ok(((*s).to_string(), kind)),
                }
            })
            .collect()
    }

    /// Inserts a route, merging verbs into an existing node for the same pattern.
    pub fn insert(&mut self, path: &str, methods: MethodRouter<T>) -> Result<(), PatternError> {
        let segments = Self::parse_pattern(path)?;
        let target = self.descend_or_create(&segments, path)?;
        match &mut target.methods {
            Some(existing) => existing.merge(methods),
            None => target.methods = Some(methods),
        }
        Ok(())
    }

    fn descend_or_create(
        &mut self,
        segments: &[(String, SegmentKind)],
        path: &str,
    ) -> Result<&mut Node<T>, PatternError> {
        let Some(((segment, kind), remaining)) = segments.split_first() else {
            return Ok(self);
        };

        let child = match kind {
            SegmentKind::Static => {
                let idx = match self
                    .static_children
                    .binary_search_by(|c| c.segment.as_str().cmp(segment))
                {
                    Ok(idx) => idx,
                    Err(idx) => {
                        self.static_children
                            .insert(idx, Node::with_kind(segment.clone(), kind.clone()));
                        idx
                    }
                };
                &mut self.static_children[idx]
            }
            SegmentKind::Param(name) | SegmentKind::Wildcard(name) => {
                let slot = if matches!(kind, SegmentKind::Param(_)) {
                    &mut self.param_child
                } else {
                    &mut self.wildcard_child
                };
                let child =
                    slot.get_or_insert_with(|| Box::new(Node::with_kind(segment.clone(), kind.clone())));
                if child.kind != *kind {
                    return Err(PatternError::ConflictingName {
                        pattern: path.to_string(),
                        existing: child.segment.clone(),
                        name: name.clone(),
                    });
                }
                child.as_mut()
            }
        };
        child.descend_or_create(remaining, path)
    }

    /// Walks the tree by pattern (not by request path) and returns the verbs
    /// registered at exactly that pattern.
    #[must_use]
    pub fn find_pattern(&self, path: &str) -> Option<&MethodRouter<T>> {
        let segments = Self::parse_pattern(path).ok()?;
        let mut node = self;
        for (segment, kind) in &segments {
            node = match kind {
                SegmentKind::Static => node.find_static_child(segment)?,
                SegmentKind::Param(_) => node.param_child.as_deref()?,
                SegmentKind::Wildcard(_) => node.wildcard_child.as_deref()?,
            };
            if node.kind != *kind {
                return None;
            }
        }
        node.methods.as_ref()
    }

    /// Matches a request path against the tree.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<(&MethodRouter<T>, Params)> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut params = Params::new();
        let methods = self.match_segments(&segments, &mut params)?;
        Some((methods, params))
    }

    fn match_segments<'a>(
        &'a self,
        segments: &[&str],
        params: &mut Params,
    ) -> Option<&'a MethodRouter<T>> {
        let Some((segment, remaining)) = segments.split_first() else {
            return self.methods.as_ref();
        };

        if let Some(child) = self.find_static_child(segment) {
            if let Some(found) = child.match_segments(remaining, params) {
                return Some(found);
            }
        }

        if let Some(child) = &self.param_child {
            if let SegmentKind::Param(name) = &child.kind {
                let mark = params.len();
                params.push(name.clone(), *segment);
                if let Some(found) = child.match_segments(remaining, params) {
                    return Some(found);
                }
                params.truncate(mark);
            }
        }

        if let Some(child) = &self.wildcard_child {
            if let SegmentKind::Wildcard(name) = &child.kind {
                let methods = child.methods.as_ref()?;
                params.push(name.clone(), segments.join("/"));
                return Some(methods);
            }
        }

        None
    }

    fn find_static_child(&self, segment: &str) -> Option<&Node<T>> {
        self.static_children
            .binary_search_by(|c| c.segment.as_str().cmp(segment))
            .ok()
            .map(|i| &self.static_children[i])
    }
}
