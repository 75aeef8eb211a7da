//! Config tree node kinds.

use std::fmt;

use toml::Value;

use super::comment::Comment;
use super::section::Section;
use super::ConfigError;

/// The closed set of node kinds a config tree can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NodeKind {
    Directive,
    Section,
    Comment,
}

impl NodeKind {
    pub fn label(self) -> &'static str {
        match self {
            NodeKind::Directive => "directive",
            NodeKind::Section => "section",
            NodeKind::Comment => "comment",
        }
    }

    /// Parses a kind label, as used by property-based searches.
    pub fn parse(label: &str) -> Result<Self, ConfigError> {
        match label {
            "directive" => Ok(NodeKind::Directive),
            "section" => Ok(NodeKind::Section),
            "comment" => Ok(NodeKind::Comment),
            other => Err(ConfigError::TypeMismatch {
                expected: "directive, section or comment".to_owned(),
                actual: other.to_owned(),
            }),
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A named scalar config entry with an attached comment.
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    name: String,
    value: Value,
    comment: Comment,
}

impl Directive {
    /// Creates a directive; the value must be a leaf (anything but a
    /// table, since tables belong in sections).
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Result<Self, ConfigError> {
        let value = Self::validate(value.into())?;
        Ok(Self {
            name: name.into(),
            value,
            comment: Comment::empty(),
        })
    }

    fn validate(value: Value) -> Result<Value, ConfigError> {
        match value {
            Value::Table(_) => Err(ConfigError::TypeMismatch {
                expected: "leaf value".to_owned(),
                actual: "table".to_owned(),
            }),
            other => Ok(other),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = name.into();
        self
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn set_value(&mut self, value: impl Into<Value>) -> Result<&mut Self, ConfigError> {
        self.value = Self::validate(value.into())?;
        Ok(self)
    }

    pub fn comment(&self) -> &Comment {
        &self.comment
    }

    pub fn comment_mut(&mut self) -> &mut Comment {
        &mut self.comment
    }

    pub fn set_comment(&mut self, comment: Comment) -> &mut Self {
        self.comment = comment;
        self
    }

    /// Appends a note to the attached comment.
    pub fn annotate(&mut self, note: &str) -> Result<&mut Self, ConfigError> {
        self.comment.new_line(note)?;
        Ok(self)
    }
}

/// A node of the configuration tree.
#[derive(Debug, Clone)]
pub enum Node {
    Directive(Directive),
    Section(Section),
    Comment(Comment),
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Directive(_) => NodeKind::Directive,
            Node::Section(_) => NodeKind::Section,
            Node::Comment(_) => NodeKind::Comment,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Node::Directive(directive) => directive.name(),
            Node::Section(section) => section.name(),
            Node::Comment(comment) => comment.name(),
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        match self {
            Node::Directive(directive) => {
                directive.set_name(name);
            }
            Node::Section(section) => {
                section.set_name(name);
            }
            Node::Comment(comment) => {
                comment.set_name(name);
            }
        }
        self
    }

    /// The directive value, when this node is one.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Node::Directive(directive) => Some(directive.value()),
            _ => None,
        }
    }

    pub fn as_directive(&self) -> Option<&Directive> {
        match self {
            Node::Directive(directive) => Some(directive),
            _ => None,
        }
    }

    pub fn as_section(&self) -> Option<&Section> {
        match self {
            Node::Section(section) => Some(section),
            _ => None,
        }
    }

    pub fn as_comment(&self) -> Option<&Comment> {
        match self {
            Node::Comment(comment) => Some(comment),
            _ => None,
        }
    }
}

impl From<Directive> for Node {
    fn from(directive: Directive) -> Self {
        Node::Directive(directive)
    }
}

impl From<Section> for Node {
    fn from(section: Section) -> Self {
        Node::Section(section)
    }
}

impl From<Comment> for Node {
    fn from(comment: Comment) -> Self {
        Node::Comment(comment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_rejects_table_content() {
        let table = Value::Table(toml::Table::new());
        let err = Directive::new("d", table).unwrap_err();
        assert!(matches!(err, ConfigError::TypeMismatch { .. }));
    }

    #[test]
    fn directive_accepts_leaf_values() {
        assert!(Directive::new("d", "text").is_ok());
        assert!(Directive::new("d", 3i64).is_ok());
        assert!(Directive::new("d", Value::Array(vec![Value::Integer(1)])).is_ok());
    }

    #[test]
    fn annotate_extends_the_comment() {
        let mut directive = Directive::new("d", true).unwrap();
        directive.annotate("first").unwrap();
        directive.annotate("second\nthird").unwrap();
        assert_eq!(directive.comment().lines(), &["first", "second", "third"]);
    }

    #[test]
    fn node_exposes_kind_and_name() {
        let node: Node = Directive::new("port", 80i64).unwrap().into();
        assert_eq!(node.kind(), NodeKind::Directive);
        assert_eq!(node.name(), "port");
        assert_eq!(node.value(), Some(&Value::Integer(80)));
    }

    #[test]
    fn kind_labels_parse_back() {
        for kind in [NodeKind::Directive, NodeKind::Section, NodeKind::Comment] {
            assert_eq!(NodeKind::parse(kind.label()).unwrap(), kind);
        }
        assert!(NodeKind::parse("other").is_err());
    }
}
