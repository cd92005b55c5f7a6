//! Environments for identifier resolution during expression evaluation.
//!
//! [`Bindings`] is an immutable linked list of name/value bindings with
//! shadowing semantics. The [`Environment`] trait is what the evaluator asks
//! for: anything that can turn an identifier (possibly dotted) into a
//! [`Value`]. It is implemented for `Bindings<Value>`, plain maps, and, in
//! [`crate::expr::evaluation`], for the document's scope chain.

use crate::error::WdlError;
use crate::value::Value;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

/// Source of identifier values for the evaluator.
pub trait Environment {
    /// Value bound to `name`, failing with `unresolved` when there is none.
    fn lookup(&self, name: &str) -> Result<Value, WdlError>;
}

/// An individual binding of a name to a value.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding<T> {
    name: String,
    value: T,
}

impl<T> Binding<T> {
    pub fn new(name: impl Into<String>, value: T) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    /// Namespaced names are dot-separated.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &T {
        &self.value
    }
}

impl<T: fmt::Display> fmt::Display for Binding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.name, self.value)
    }
}

/// Immutable environment consisting of a linked list of bindings.
///
/// Binding is O(1) and shares the tail with the environment it extends; newer
/// bindings hide older ones with the same name.
#[derive(Debug, Clone)]
pub struct Bindings<T> {
    head: Option<Rc<Node<T>>>,
}

#[derive(Debug)]
struct Node<T> {
    binding: Binding<T>,
    next: Option<Rc<Node<T>>>,
}

impl<T> Default for Bindings<T> {
    fn default() -> Self {
        Self { head: None }
    }
}

impl<T> Bindings<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Number of unique (unshadowed) bindings
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Return a new environment with a binding added.
    pub fn bind(&self, name: impl Into<String>, value: T) -> Self {
        Self {
            head: Some(Rc::new(Node {
                binding: Binding::new(name, value),
                next: self.head.clone(),
            })),
        }
    }

    pub fn resolve_binding(&self, name: &str) -> Option<&Binding<T>> {
        let mut current = self.head.as_deref();
        while let Some(node) = current {
            if node.binding.name == name {
                return Some(&node.binding);
            }
            current = node.next.as_deref();
        }
        None
    }

    pub fn resolve(&self, name: &str) -> Option<&T> {
        self.resolve_binding(name).map(|b| b.value())
    }

    pub fn has_binding(&self, name: &str) -> bool {
        self.resolve_binding(name).is_some()
    }

    /// Dot-separated prefixes of binding names, each ending with a dot.
    pub fn namespaces(&self) -> HashSet<String> {
        let mut namespaces = HashSet::new();
        for binding in self.iter() {
            let parts: Vec<&str> = binding.name().split('.').collect();
            for i in 0..parts.len().saturating_sub(1) {
                namespaces.insert(parts[..=i].join(".") + ".");
            }
        }
        namespaces
    }

    pub fn has_namespace(&self, namespace: &str) -> bool {
        let ns = if namespace.ends_with('.') {
            namespace.to_string()
        } else {
            format!("{}.", namespace)
        };
        self.namespaces().contains(&ns)
    }

    /// Iterator over unique bindings, most recent first.
    pub fn iter(&self) -> BindingIterator<'_, T> {
        BindingIterator {
            current: self.head.as_deref(),
            seen: HashSet::new(),
        }
    }
}

impl<T: Clone> Bindings<T> {
    /// The bindings under `namespace.`, with the prefix removed.
    pub fn enter_namespace(&self, namespace: &str) -> Self {
        let ns = if namespace.ends_with('.') {
            namespace.to_string()
        } else {
            format!("{}.", namespace)
        };
        let inner: Vec<Binding<T>> = self
            .iter()
            .filter_map(|b| {
                b.name()
                    .strip_prefix(&ns)
                    .map(|rest| Binding::new(rest, b.value().clone()))
            })
            .collect();
        inner
            .into_iter()
            .rev()
            .fold(Bindings::new(), |env, b| env.bind(b.name, b.value))
    }
}

impl<T> FromIterator<(String, T)> for Bindings<T> {
    fn from_iter<I: IntoIterator<Item = (String, T)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Bindings::new(), |env, (name, value)| env.bind(name, value))
    }
}

pub struct BindingIterator<'a, T> {
    current: Option<&'a Node<T>>,
    seen: HashSet<&'a str>,
}

impl<'a, T> Iterator for BindingIterator<'a, T> {
    type Item = &'a Binding<T>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.current {
            self.current = node.next.as_deref();
            if self.seen.insert(node.binding.name.as_str()) {
                return Some(&node.binding);
            }
        }
        None
    }
}

impl Environment for Bindings<Value> {
    fn lookup(&self, name: &str) -> Result<Value, WdlError> {
        self.resolve(name)
            .cloned()
            .ok_or_else(|| WdlError::unresolved(name))
    }
}

impl Environment for HashMap<String, Value> {
    fn lookup(&self, name: &str) -> Result<Value, WdlError> {
        self.get(name).cloned().ok_or_else(|| WdlError::unresolved(name))
    }
}

impl Environment for IndexMap<String, Value> {
    fn lookup(&self, name: &str) -> Result<Value, WdlError> {
        self.get(name).cloned().ok_or_else(|| WdlError::unresolved(name))
    }
}

impl<E: Environment + ?Sized> Environment for &E {
    fn lookup(&self, name: &str) -> Result<Value, WdlError> {
        (**self).lookup(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_environment() {
        let env: Bindings<i32> = Bindings::new();
        assert!(env.is_empty());
        assert_eq!(env.len(), 0);
        assert!(!env.has_binding("x"));
    }

    #[test]
    fn test_shadowing() {
        let base = Bindings::new().bind("x", 42);
        let env = base.bind("x", 100);

        assert_eq!(env.len(), 1);
        assert_eq!(env.resolve("x"), Some(&100));
        // The extended environment leaves the original untouched
        assert_eq!(base.resolve("x"), Some(&42));
    }

    #[test]
    fn test_iteration_order() {
        let env = Bindings::new().bind("a", 1).bind("b", 2).bind("c", 3);
        let names: Vec<&str> = env.iter().map(|b| b.name()).collect();
        assert_eq!(names, vec!["c", "b", "a"]);
    }

    #[test]
    fn test_namespaces() {
        let env = Bindings::new()
            .bind("align.bam", 1)
            .bind("align.index.bai", 2)
            .bind("plain", 3);
        assert!(env.has_namespace("align"));
        assert!(env.has_namespace("align.index."));
        assert!(!env.has_namespace("plain"));

        let inner = env.enter_namespace("align");
        assert_eq!(inner.resolve("bam"), Some(&1));
        assert_eq!(inner.resolve("index.bai"), Some(&2));
        assert!(!inner.has_binding("plain"));
    }

    #[test]
    fn test_environment_lookup() {
        let env: Bindings<Value> = vec![("i".to_string(), Value::int(4))].into_iter().collect();
        assert_eq!(env.lookup("i").unwrap(), Value::int(4));
        assert!(matches!(
            env.lookup("j"),
            Err(WdlError::Unresolved { name }) if name == "j"
        ));

        let mut map = HashMap::new();
        map.insert("s".to_string(), Value::string("x"));
        assert_eq!(map.lookup("s").unwrap(), Value::string("x"));

        let mut ordered = IndexMap::new();
        ordered.insert("f".to_string(), Value::float(0.5));
        assert_eq!((&ordered).lookup("f").unwrap(), Value::float(0.5));
    }
}
