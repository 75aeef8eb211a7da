//! Observer-linked configuration tree.
//!
//! A tree is built from three node kinds: [`Directive`] (a named leaf
//! value), [`Section`] (a named container) and [`Comment`] (a multi-line
//! annotation). Sections are addressed like nested associative
//! structures; reads return [`Collection`] views bound to their source,
//! so a result set and the tree it came from never diverge.
//!
//! ## Example
//!
//! ```
//! use wyvern_fnd::config::Section;
//!
//! let section = Section::new("app");
//! section.set("port", 8080i64)?;
//! section.set("host", "localhost")?;
//!
//! let port = section.get("port");
//! let node = port.seek(0)?;
//! assert_eq!(node.value().and_then(|v| v.as_integer()), Some(8080));
//! # Ok::<(), wyvern_fnd::config::ConfigError>(())
//! ```

mod collection;
mod comment;
mod error;
mod node;
mod section;

pub use collection::{Collection, ObjId, Property, Selector};
pub use comment::{Comment, DEFAULT_END_OF_LINE};
pub use error::ConfigError;
pub use node::{Directive, Node, NodeKind};
pub use section::{Assign, Section};
