//! Config sections: named containers of directives, sub-sections and
//! comments, addressable like a nested associative structure.

use std::path::Path;

use toml::Value;

use super::collection::{Collection, Selector};
use super::comment::Comment;
use super::node::{Directive, Node};
use super::ConfigError;

/// What an assignment into a section can carry.
///
/// Classification is explicit: a leaf value becomes a [`Directive`], a
/// table becomes a nested [`Section`], an existing node is renamed and
/// appended as it is.
#[derive(Debug, Clone)]
pub enum Assign {
    Value(Value),
    Table(toml::Table),
    Node(Node),
}

impl Assign {
    fn classify(value: Value) -> Assign {
        match value {
            Value::Table(table) => Assign::Table(table),
            other => Assign::Value(other),
        }
    }
}

impl From<Value> for Assign {
    fn from(value: Value) -> Self {
        Assign::classify(value)
    }
}

impl From<toml::Table> for Assign {
    fn from(table: toml::Table) -> Self {
        Assign::Table(table)
    }
}

impl From<Node> for Assign {
    fn from(node: Node) -> Self {
        Assign::Node(node)
    }
}

impl From<Directive> for Assign {
    fn from(directive: Directive) -> Self {
        Assign::Node(Node::Directive(directive))
    }
}

impl From<Section> for Assign {
    fn from(section: Section) -> Self {
        Assign::Node(Node::Section(section))
    }
}

impl From<Comment> for Assign {
    fn from(comment: Comment) -> Self {
        Assign::Node(Node::Comment(comment))
    }
}

impl From<&str> for Assign {
    fn from(value: &str) -> Self {
        Assign::Value(Value::String(value.to_owned()))
    }
}

impl From<String> for Assign {
    fn from(value: String) -> Self {
        Assign::Value(Value::String(value))
    }
}

impl From<i64> for Assign {
    fn from(value: i64) -> Self {
        Assign::Value(Value::Integer(value))
    }
}

impl From<f64> for Assign {
    fn from(value: f64) -> Self {
        Assign::Value(Value::Float(value))
    }
}

impl From<bool> for Assign {
    fn from(value: bool) -> Self {
        Assign::Value(Value::Boolean(value))
    }
}

/// A named container of config nodes.
///
/// Assignments always append, so several entries may share one name;
/// keyed reads return the bound same-name view (position 0 is the first
/// occurrence) and keyed unset removes all of them.
#[derive(Debug, Clone)]
pub struct Section {
    name: String,
    children: Collection,
    comment: Comment,
}

impl Section {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Collection::new(),
            comment: Comment::empty(),
        }
    }

    /// Builds a section from a TOML table.
    ///
    /// Nested tables become sub-sections; an array of tables becomes
    /// several same-name sub-sections, matching TOML's `[[name]]` shape.
    pub fn from_table(name: impl Into<String>, table: &toml::Table) -> Result<Self, ConfigError> {
        let section = Self::new(name);
        for (key, value) in table {
            section.set(key, Assign::classify(value.clone()))?;
        }
        Ok(section)
    }

    /// Loads a section from a TOML file; the file is required.
    pub fn from_file(name: impl Into<String>, path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::FileNotFound(path.to_path_buf()));
            }
            Err(e) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: e,
                });
            }
        };
        let table: toml::Table = toml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_table(name, &table)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = name.into();
        self
    }

    pub fn comment(&self) -> &Comment {
        &self.comment
    }

    pub fn comment_mut(&mut self) -> &mut Comment {
        &mut self.comment
    }

    /// Appends a note to the section comment.
    pub fn annotate(&mut self, note: &str) -> Result<&mut Self, ConfigError> {
        self.comment.new_line(note)?;
        Ok(self)
    }

    /// The backing collection of children.
    pub fn children(&self) -> &Collection {
        &self.children
    }

    /// Assigns a value under a name, appending a new child.
    ///
    /// A leaf value becomes a directive, a table a sub-section, a node is
    /// renamed and appended as-is. An array whose elements are all tables
    /// expands into one sub-section per element, all sharing the name.
    pub fn set(&self, name: &str, value: impl Into<Assign>) -> Result<(), ConfigError> {
        match value.into() {
            Assign::Value(Value::Array(items))
                if !items.is_empty() && items.iter().all(|item| item.as_table().is_some()) =>
            {
                for item in items {
                    if let Value::Table(table) = item {
                        self.children
                            .append(Node::Section(Section::from_table(name, &table)?))?;
                    }
                }
                Ok(())
            }
            Assign::Value(value) => {
                self.children
                    .append(Node::Directive(Directive::new(name, value)?))?;
                Ok(())
            }
            Assign::Table(table) => {
                self.children
                    .append(Node::Section(Section::from_table(name, &table)?))?;
                Ok(())
            }
            Assign::Node(mut node) => {
                node.set_name(name);
                self.children.append(node)?;
                Ok(())
            }
        }
    }

    /// All children sharing a name, as a view bound to this section.
    pub fn get(&self, name: &str) -> Collection {
        self.children.filter_names(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        !self.get(name).is_empty()
    }

    /// Removes every child carrying the name; returns how many.
    pub fn unset(&self, name: &str) -> usize {
        self.children
            .remove_matching(&Selector::Name(name.to_owned()))
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Children in insertion order.
    pub fn iter(&self) -> std::vec::IntoIter<Node> {
        self.children.iter()
    }

    /// Renders the section back to a TOML table.
    ///
    /// Same-name sub-sections group into an array of tables, same-name
    /// directives into an array of values. Comments have no TOML value
    /// rendering and are skipped.
    pub fn to_table(&self) -> toml::Table {
        let mut table = toml::Table::new();
        for node in self.children.iter() {
            let value = match &node {
                Node::Directive(directive) => directive.value().clone(),
                Node::Section(section) => Value::Table(section.to_table()),
                Node::Comment(_) => continue,
            };
            let name = node.name().to_owned();
            match table.get_mut(&name) {
                None => {
                    table.insert(name, value);
                }
                Some(Value::Array(existing)) => existing.push(value),
                Some(existing) => {
                    let first = existing.clone();
                    *existing = Value::Array(vec![first, value]);
                }
            }
        }
        table
    }
}

impl<'a> IntoIterator for &'a Section {
    type Item = Node;
    type IntoIter = std::vec::IntoIter<Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
