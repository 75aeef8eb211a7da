//! Convention-based entity loading.
//!
//! An *entity* is a symbolic name some rule may resolve to a backing file.
//! Rules filter names against a pattern, locate files under a base
//! directory, and cache both steps per context. A [`Container`] owns the
//! rules and walks them in registration order until one resolves.
//!
//! ## Example
//!
//! ```no_run
//! use wyvern_fnd::context::{Context, SharedContext};
//! use wyvern_fnd::loader::{Container, ParamSpec, StartWith};
//!
//! let context = SharedContext::new(Context::new("loader", "production"));
//! let mut container = Container::new(context);
//! container.add_rule(
//!     StartWith::KIND,
//!     ParamSpec::new().with_base_dir("/srv/app").with_filter("app"),
//! )?;
//! let loaded = container.require("appCoreRouter")?;
//! # Ok::<(), wyvern_fnd::loader::LoaderError>(())
//! ```

mod container;
mod dash_and_context;
mod error;
mod params;
mod rule;
mod start_with;

pub use container::{Container, RuleFactory, RuleKey};
pub use dash_and_context::DashAndContext;
pub use error::LoaderError;
pub use params::{CachedPath, ParamSpec, RuleParams};
pub use rule::{EntityParts, Loaded, Rule, RuleDefaults};
pub use start_with::StartWith;
