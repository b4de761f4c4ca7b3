//! Copy-on-write payload tree
//!
//! A [`PayloadTree`] is the structured object a handler has accumulated via
//! `with_attrs` and `with_group`, plus the path of groups opened so far.
//! Every mutating operation returns a new tree; the receiver is untouched, so
//! trees derived from a common ancestor never see each other's writes.

use super::attr::Attribute;
use super::convert::decorate;
use super::rewrite::AttrMapper;
use super::value::{object_at_path, object_entry, Map, StructuredValue};
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PayloadTree {
    root: Arc<Map>,
    groups: Vec<String>,
}

impl PayloadTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of the groups opened so far, outermost first
    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    /// Accumulated fields, rooted at the top level
    pub fn root(&self) -> &Map {
        &self.root
    }

    /// Write `attrs` at the open group path of a copy of this tree
    pub fn with_attrs(
        &self,
        attrs: impl IntoIterator<Item = Attribute>,
        mapper: Option<&AttrMapper>,
    ) -> Self {
        let mut root = Map::clone(&self.root);
        let current = object_at_path(&mut root, &self.groups);
        for attr in attrs {
            decorate(current, apply(mapper, &self.groups, attr));
        }

        Self {
            root: Arc::new(root),
            groups: self.groups.clone(),
        }
    }

    /// Open a group below the current path
    ///
    /// An empty name returns an identical tree. An existing field with the
    /// same name is kept when it is already an object.
    pub fn with_group(&self, name: &str) -> Self {
        if name.is_empty() {
            return self.clone();
        }

        let mut root = Map::clone(&self.root);
        object_entry(object_at_path(&mut root, &self.groups), name);

        let mut groups = Vec::with_capacity(self.groups.len() + 1);
        groups.extend_from_slice(&self.groups);
        groups.push(name.to_string());

        Self {
            root: Arc::new(root),
            groups,
        }
    }

    /// Build the payload of one record
    ///
    /// The record attributes go into a private copy at the open group path.
    /// Groups on that path left without fields are removed afterwards.
    pub fn record_payload(
        &self,
        attrs: impl IntoIterator<Item = Attribute>,
        mapper: Option<&AttrMapper>,
    ) -> Map {
        let mut root = Map::clone(&self.root);
        set_and_clean(&mut root, &self.groups, |current| {
            for attr in attrs {
                decorate(current, apply(mapper, &self.groups, attr));
            }
        });
        root
    }
}

fn apply(mapper: Option<&AttrMapper>, groups: &[String], attr: Attribute) -> Attribute {
    match mapper {
        Some(mapper) => mapper(groups, attr),
        None => attr,
    }
}

fn set_and_clean<F: FnOnce(&mut Map)>(fields: &mut Map, path: &[String], write: F) {
    let Some((group, rest)) = path.split_first() else {
        write(fields);
        return;
    };

    let emptied = {
        let child = object_entry(fields, group);
        set_and_clean(child, rest, write);
        child.is_empty()
    };

    if emptied {
        fields.remove(group);
    }
}

/// Merge `value` into `fields` under `key` at `path`, creating groups
pub fn insert_at_path(fields: &mut Map, path: &[String], key: &str, value: StructuredValue) {
    object_at_path(fields, path).insert(key.to_string(), value);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number(n: f64) -> StructuredValue {
        StructuredValue::Number(n)
    }

    fn at<'a>(fields: &'a Map, path: &[&str]) -> &'a Map {
        path.iter().fold(fields, |current, key| {
            current[*key].as_object().expect("object on path")
        })
    }

    #[test]
    fn test_with_attrs_does_not_touch_parent() {
        let base = PayloadTree::new();
        let h1 = base.with_attrs(vec![Attribute::int("a", 1)], None);
        let h2 = base.with_attrs(vec![Attribute::int("b", 2)], None);

        assert!(base.root().is_empty());
        assert_eq!(h1.root().len(), 1);
        assert_eq!(h1.root()["a"], number(1.0));
        assert_eq!(h2.root().len(), 1);
        assert_eq!(h2.root()["b"], number(2.0));
    }

    #[test]
    fn test_with_group_empty_name_is_noop() {
        let tree = PayloadTree::new().with_group("g");
        assert_eq!(tree.with_group(""), tree);
    }

    #[test]
    fn test_group_path() {
        let tree = PayloadTree::new()
            .with_group("g1")
            .with_group("g2")
            .with_attrs(vec![Attribute::string("k", "v")], None);

        assert_eq!(tree.groups(), ["g1".to_string(), "g2".to_string()]);
        assert_eq!(at(tree.root(), &["g1", "g2"])["k"], StructuredValue::from("v"));
    }

    #[test]
    fn test_last_write_wins() {
        let tree = PayloadTree::new()
            .with_attrs(vec![Attribute::int("a", 1)], None)
            .with_attrs(vec![Attribute::int("a", 2)], None);
        assert_eq!(tree.root()["a"], number(2.0));
    }

    #[test]
    fn test_record_payload_prunes_unused_groups() {
        let tree = PayloadTree::new().with_group("g1").with_group("g2");
        let payload = tree.record_payload(Vec::new(), None);
        assert!(payload.is_empty());

        // the handler's own tree keeps its groups
        assert!(tree.root().contains_key("g1"));
    }

    #[test]
    fn test_record_payload_keeps_populated_groups() {
        let tree = PayloadTree::new()
            .with_group("g1")
            .with_attrs(vec![Attribute::int("a", 1)], None)
            .with_group("g2");

        let payload = tree.record_payload(Vec::new(), None);
        let g1 = at(&payload, &["g1"]);
        assert_eq!(g1.len(), 1);
        assert_eq!(g1["a"], number(1.0));

        let payload = tree.record_payload(vec![Attribute::bool("b", true)], None);
        assert_eq!(at(&payload, &["g1", "g2"])["b"], StructuredValue::Bool(true));
    }

    #[test]
    fn test_record_payload_is_isolated() {
        let tree = PayloadTree::new().with_group("g");
        let _ = tree.record_payload(vec![Attribute::int("a", 1)], None);
        let payload = tree.record_payload(Vec::new(), None);
        assert!(payload.is_empty());
    }

    #[test]
    fn test_mapper_sees_open_groups() {
        let mapper: AttrMapper = Arc::new(|groups: &[String], attr: Attribute| {
            Attribute::string(attr.key, groups.join("."))
        });
        let tree = PayloadTree::new()
            .with_group("a")
            .with_group("b")
            .with_attrs(vec![Attribute::int("path", 0)], Some(&mapper));
        assert_eq!(at(tree.root(), &["a", "b"])["path"], StructuredValue::from("a.b"));
    }

    #[test]
    fn test_insert_at_path_creates_groups() {
        let mut fields = Map::new();
        insert_at_path(&mut fields, &["x".to_string()], "k", StructuredValue::from("v"));
        assert_eq!(at(&fields, &["x"])["k"], StructuredValue::from("v"));
    }
}
