//! Ordered, view-linked node collections.
//!
//! A collection owns its nodes in a single shared arena; every node gets a
//! stable opaque id on insertion. Searching does not copy: it returns
//! another `Collection` over the same arena carrying one more selector, so
//! a derived view and its source never disagree. Writes through the view
//! land in the arena, and removals on the source are visible to the view
//! on its next access.

use std::cell::RefCell;
use std::rc::Rc;
use std::str::FromStr;

use toml::Value;

use super::node::{Node, NodeKind};
use super::ConfigError;

/// Stable identifier of a node within its collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjId(u64);

#[derive(Debug)]
struct Entry {
    id: ObjId,
    node: Node,
}

#[derive(Debug)]
struct Store {
    entries: Vec<Entry>,
    /// Node kinds this collection accepts; `None` accepts all.
    allowed: Option<Vec<NodeKind>>,
    next_id: u64,
}

impl Store {
    fn ensure_allowed(&self, node: &Node) -> Result<(), ConfigError> {
        match &self.allowed {
            Some(kinds) if !kinds.contains(&node.kind()) => Err(ConfigError::TypeMismatch {
                expected: kinds
                    .iter()
                    .map(|k| k.label())
                    .collect::<Vec<_>>()
                    .join(" or "),
                actual: node.kind().label().to_owned(),
            }),
            _ => Ok(()),
        }
    }
}

/// A searchable property of collection nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Property {
    Name,
    Class,
    Content,
}

impl FromStr for Property {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(Property::Name),
            "class" => Ok(Property::Class),
            "content" => Ok(Property::Content),
            other => Err(ConfigError::InvalidProperty(other.to_owned())),
        }
    }
}

/// A predicate selecting nodes by one property value.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    Name(String),
    Kind(NodeKind),
    Content(Value),
}

impl Selector {
    /// Builds a selector from a property name and a searched value.
    ///
    /// Unknown property names are [`ConfigError::InvalidProperty`].
    pub fn from_property(property: &str, needle: &Value) -> Result<Self, ConfigError> {
        match property.parse::<Property>()? {
            Property::Name => match needle.as_str() {
                Some(name) => Ok(Selector::Name(name.to_owned())),
                None => Err(ConfigError::TypeMismatch {
                    expected: "string name".to_owned(),
                    actual: value_kind(needle).to_owned(),
                }),
            },
            Property::Class => match needle.as_str() {
                Some(label) => Ok(Selector::Kind(NodeKind::parse(label)?)),
                None => Err(ConfigError::TypeMismatch {
                    expected: "kind label".to_owned(),
                    actual: value_kind(needle).to_owned(),
                }),
            },
            Property::Content => Ok(Selector::Content(needle.clone())),
        }
    }

    fn matches(&self, node: &Node) -> bool {
        match self {
            Selector::Name(name) => node.name() == name,
            Selector::Kind(kind) => node.kind() == *kind,
            Selector::Content(value) => node.value() == Some(value),
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::String(_) => "string",
        Value::Integer(_) => "integer",
        Value::Float(_) => "float",
        Value::Boolean(_) => "boolean",
        Value::Datetime(_) => "datetime",
        Value::Array(_) => "array",
        Value::Table(_) => "table",
    }
}

/// An ordered list of config nodes with selector-bound derived views.
#[derive(Debug, Clone)]
pub struct Collection {
    store: Rc<RefCell<Store>>,
    selectors: Vec<Selector>,
}

impl Collection {
    /// Creates an empty collection accepting every node kind.
    pub fn new() -> Self {
        Self::with_allowed(None)
    }

    /// Creates an empty collection accepting only the given kinds.
    pub fn restricted(kinds: &[NodeKind]) -> Self {
        Self::with_allowed(Some(kinds.to_vec()))
    }

    fn with_allowed(allowed: Option<Vec<NodeKind>>) -> Self {
        Self {
            store: Rc::new(RefCell::new(Store {
                entries: Vec::new(),
                allowed,
                next_id: 0,
            })),
            selectors: Vec::new(),
        }
    }

    /// Whether this collection is a derived view over another one.
    pub fn is_view(&self) -> bool {
        !self.selectors.is_empty()
    }

    /// Arena positions of the nodes this collection (or view) sees.
    fn positions(&self) -> Vec<usize> {
        let store = self.store.borrow();
        store
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| self.selectors.iter().all(|s| s.matches(&entry.node)))
            .map(|(index, _)| index)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.positions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions().is_empty()
    }

    /// Appends a node; in a view, the node lands in the shared arena and
    /// is therefore also seen by the source collection.
    pub fn append(&self, node: Node) -> Result<ObjId, ConfigError> {
        let mut store = self.store.borrow_mut();
        store.ensure_allowed(&node)?;
        let id = ObjId(store.next_id);
        store.next_id += 1;
        store.entries.push(Entry { id, node });
        Ok(id)
    }

    /// The node at a view position, cloned.
    pub fn get(&self, position: usize) -> Option<Node> {
        let index = *self.positions().get(position)?;
        let store = self.store.borrow();
        Some(store.entries[index].node.clone())
    }

    /// Like [`get`](Self::get), but an out-of-range position is an error.
    pub fn seek(&self, position: usize) -> Result<Node, ConfigError> {
        self.get(position).ok_or_else(|| ConfigError::OutOfRange {
            position,
            len: self.len(),
        })
    }

    /// The stable id of the node at a view position.
    pub fn id_at(&self, position: usize) -> Option<ObjId> {
        let index = *self.positions().get(position)?;
        Some(self.store.borrow().entries[index].id)
    }

    /// Replaces the node at a view position.
    ///
    /// The replacement keeps the slot's id, so the change is visible at
    /// the same offset of the source collection and of every other view.
    pub fn set(&self, position: usize, node: Node) -> Result<(), ConfigError> {
        let positions = self.positions();
        let index = *positions.get(position).ok_or(ConfigError::OutOfRange {
            position,
            len: positions.len(),
        })?;
        let mut store = self.store.borrow_mut();
        store.ensure_allowed(&node)?;
        store.entries[index].node = node;
        Ok(())
    }

    /// Removes and returns the node at a view position.
    pub fn remove(&self, position: usize) -> Result<Node, ConfigError> {
        let positions = self.positions();
        let index = *positions.get(position).ok_or(ConfigError::OutOfRange {
            position,
            len: positions.len(),
        })?;
        let entry = self.store.borrow_mut().entries.remove(index);
        Ok(entry.node)
    }

    /// Derives a view selecting nodes matching `selector`, bound to the
    /// same arena. Selectors compose: a view of a view narrows further.
    pub fn search(&self, selector: Selector) -> Collection {
        let mut selectors = self.selectors.clone();
        selectors.push(selector);
        Collection {
            store: Rc::clone(&self.store),
            selectors,
        }
    }

    /// Derives a view through a property name, as in
    /// `search_property("content", ..)`. Unknown properties are an error.
    pub fn search_property(
        &self,
        property: &str,
        needle: &Value,
    ) -> Result<Collection, ConfigError> {
        Ok(self.search(Selector::from_property(property, needle)?))
    }

    /// View of the nodes carrying a name.
    pub fn filter_names(&self, name: &str) -> Collection {
        self.search(Selector::Name(name.to_owned()))
    }

    /// View of the nodes of one kind.
    pub fn filter_kinds(&self, kind: NodeKind) -> Collection {
        self.search(Selector::Kind(kind))
    }

    /// Replaces every node matching `selector` with clones of `node`;
    /// returns how many were replaced.
    pub fn replace_matching(
        &self,
        selector: &Selector,
        node: &Node,
    ) -> Result<usize, ConfigError> {
        let view = self.search(selector.clone());
        let positions = view.positions();
        let mut store = self.store.borrow_mut();
        store.ensure_allowed(node)?;
        for &index in &positions {
            store.entries[index].node = node.clone();
        }
        Ok(positions.len())
    }

    /// Removes every node matching `selector`; returns how many.
    pub fn remove_matching(&self, selector: &Selector) -> usize {
        let view = self.search(selector.clone());
        let positions = view.positions();
        let mut store = self.store.borrow_mut();
        for &index in positions.iter().rev() {
            store.entries.remove(index);
        }
        positions.len()
    }

    /// Snapshot of the visible nodes, in order.
    pub fn nodes(&self) -> Vec<Node> {
        let store = self.store.borrow();
        self.positions()
            .into_iter()
            .map(|index| store.entries[index].node.clone())
            .collect()
    }

    pub fn iter(&self) -> std::vec::IntoIter<Node> {
        self.nodes().into_iter()
    }

    /// Whether two collections share the same arena.
    pub fn shares_store(&self, other: &Collection) -> bool {
        Rc::ptr_eq(&self.store, &other.store)
    }
}

impl Default for Collection {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = Node;
    type IntoIter = std::vec::IntoIter<Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::node::Directive;

    fn directive(name: &str, value: i64) -> Node {
        Node::Directive(Directive::new(name, value).unwrap())
    }

    fn sample() -> Collection {
        let collection = Collection::new();
        collection.append(directive("a", 1)).unwrap();
        collection.append(directive("b", 2)).unwrap();
        collection.append(directive("a", 3)).unwrap();
        collection
    }

    #[test]
    fn append_assigns_sequential_positions() {
        let collection = sample();
        assert_eq!(collection.len(), 3);
        assert_eq!(collection.get(0).unwrap().name(), "a");
        assert_eq!(collection.get(2).unwrap().value(), Some(&Value::Integer(3)));
    }

    #[test]
    fn seek_out_of_range_is_an_error() {
        let collection = sample();
        let err = collection.seek(9).unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { position: 9, .. }));
    }

    #[test]
    fn name_views_select_all_occurrences() {
        let collection = sample();
        let view = collection.filter_names("a");
        assert_eq!(view.len(), 2);
        assert_eq!(view.get(0).unwrap().value(), Some(&Value::Integer(1)));
        assert_eq!(view.get(1).unwrap().value(), Some(&Value::Integer(3)));
    }

    #[test]
    fn writes_through_a_view_reach_the_source() {
        let collection = sample();
        let view = collection.search_property("content", &Value::Integer(2)).unwrap();
        assert_eq!(view.len(), 1);
        view.set(0, directive("b", 20)).unwrap();

        // Same offset in the source, same total count.
        assert_eq!(collection.get(1).unwrap().value(), Some(&Value::Integer(20)));
        assert_eq!(collection.len(), 3);
    }

    #[test]
    fn source_removals_are_visible_to_views() {
        let collection = sample();
        let view = collection.filter_names("a");
        assert_eq!(view.len(), 2);
        collection.remove(0).unwrap();
        assert_eq!(view.len(), 1);
        assert_eq!(view.get(0).unwrap().value(), Some(&Value::Integer(3)));
    }

    #[test]
    fn appends_through_a_view_reach_the_source() {
        let collection = sample();
        let view = collection.filter_names("a");
        view.append(directive("a", 4)).unwrap();
        assert_eq!(collection.len(), 4);
        assert_eq!(view.len(), 3);
    }

    #[test]
    fn views_compose() {
        let collection = sample();
        let named = collection.filter_names("a");
        let narrowed = named.search(Selector::Content(Value::Integer(3)));
        assert_eq!(narrowed.len(), 1);
        assert!(narrowed.shares_store(&collection));
    }

    #[test]
    fn unknown_search_properties_are_rejected() {
        let collection = sample();
        let err = collection
            .search_property("colour", &Value::Integer(1))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidProperty(_)));
    }

    #[test]
    fn restricted_collections_reject_other_kinds() {
        let collection = Collection::restricted(&[NodeKind::Comment]);
        let err = collection.append(directive("a", 1)).unwrap_err();
        assert!(matches!(err, ConfigError::TypeMismatch { .. }));
        assert_eq!(collection.len(), 0);
    }

    #[test]
    fn replace_matching_swaps_every_occurrence() {
        let collection = sample();
        let replaced = collection
            .replace_matching(&Selector::Name("a".to_owned()), &directive("a", 9))
            .unwrap();
        assert_eq!(replaced, 2);
        assert_eq!(collection.get(0).unwrap().value(), Some(&Value::Integer(9)));
        assert_eq!(collection.get(2).unwrap().value(), Some(&Value::Integer(9)));
    }

    #[test]
    fn remove_matching_drops_every_occurrence() {
        let collection = sample();
        assert_eq!(collection.remove_matching(&Selector::Name("a".to_owned())), 2);
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.get(0).unwrap().name(), "b");
    }

    #[test]
    fn ids_are_stable_across_replacement() {
        let collection = sample();
        let id = collection.id_at(1).unwrap();
        collection.set(1, directive("b", 20)).unwrap();
        assert_eq!(collection.id_at(1).unwrap(), id);
    }
}
