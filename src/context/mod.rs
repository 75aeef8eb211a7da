//! Scoped key/value environment with template substitution.
//!
//! A context is set by a subject and an environment, optionally a moment
//! while it occurs. Named descriptions parametrize other values through
//! `{name}` template references, and named behaviours let callers override
//! policies (naming schemes, factories) without hard dependencies.
//!
//! ## Example
//!
//! ```
//! use wyvern_fnd::context::Context;
//! use toml::Value;
//!
//! let mut ctx = Context::new("loader", "production");
//! ctx.describe("root", "/srv/app");
//! let dir = ctx.about("root", "")?;
//! assert_eq!(dir, Value::String("/srv/app".into()));
//!
//! let path = ctx.normalize(&Value::String("{root}/rules".into()))?;
//! assert_eq!(path, Value::String("/srv/app/rules".into()));
//! # Ok::<(), wyvern_fnd::context::ContextError>(())
//! ```

mod behaviour;
mod error;
pub(crate) mod template;

pub use behaviour::{Behaviour, BehaviourFn, ConstructorFn, Resolved};
pub use error::ContextError;

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use toml::Value;

use crate::fingerprint::Fingerprint;

/// Moment used when none is given.
pub const DEFAULT_MOMENT: i64 = 10;

/// A minimal execution context: what happens, where, and while when.
///
/// Descriptions are used to make replacements in other descriptions,
/// in behaviour names and arguments, and in the subject, environment and
/// moment themselves. Replacements support recursive definitions up to a
/// fixed depth; see [`ContextError::RecursionLimit`].
#[derive(Debug, Clone)]
pub struct Context {
    subject: Value,
    environment: Value,
    moment: Value,
    descriptions: BTreeMap<String, Value>,
    behaviours: BTreeMap<String, behaviour::Registered>,
    next_token: u64,
}

impl Context {
    pub fn new(subject: impl Into<Value>, environment: impl Into<Value>) -> Self {
        Self {
            subject: subject.into(),
            environment: environment.into(),
            moment: Value::Integer(DEFAULT_MOMENT),
            descriptions: BTreeMap::new(),
            behaviours: BTreeMap::new(),
            next_token: 0,
        }
    }

    /// Sets the context subject.
    pub fn with(&mut self, subject: impl Into<Value>) -> &mut Self {
        self.subject = subject.into();
        self
    }

    /// Sets the context environment.
    pub fn within(&mut self, environment: impl Into<Value>) -> &mut Self {
        self.environment = environment.into();
        self
    }

    /// Sets the context moment.
    pub fn during(&mut self, moment: impl Into<Value>) -> &mut Self {
        self.moment = moment.into();
        self
    }

    /// Returns the normalized subject.
    pub fn subject(&self) -> Result<Value, ContextError> {
        self.normalize(&self.subject)
    }

    /// Returns the normalized environment.
    pub fn environment(&self) -> Result<Value, ContextError> {
        self.normalize(&self.environment)
    }

    /// Returns the normalized moment.
    pub fn moment(&self) -> Result<Value, ContextError> {
        self.normalize(&self.moment)
    }

    /// Stores a named value, used to normalize other context values.
    pub fn describe(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.descriptions.insert(name.into(), value.into());
        self
    }

    /// Removes a description.
    pub fn forget(&mut self, name: &str) -> &mut Self {
        self.descriptions.remove(name);
        self
    }

    pub fn describes(&self, name: &str) -> bool {
        self.descriptions.contains_key(name)
    }

    pub(crate) fn description(&self, name: &str) -> Option<&Value> {
        self.descriptions.get(name)
    }

    /// Returns the named description, or the default, normalized.
    pub fn about(
        &self,
        name: &str,
        default: impl Into<Value>,
    ) -> Result<Value, ContextError> {
        match self.descriptions.get(name) {
            Some(value) => self.normalize(value),
            None => self.normalize(&default.into()),
        }
    }

    /// Applies template substitution to a value.
    pub fn normalize(&self, value: &Value) -> Result<Value, ContextError> {
        template::apply(self, value, 0)
    }

    /// Returns a hash identifying the current context.
    ///
    /// Two contexts built from identical constructor arguments and
    /// description/behaviour sequences identify alike; any change to
    /// subject, environment, moment, descriptions or behaviours changes
    /// the result.
    pub fn identify(&self) -> String {
        let mut fp = Fingerprint::new();
        fp.push_value(&self.subject);
        fp.push_value(&self.environment);
        fp.push_value(&self.moment);
        for (name, value) in &self.descriptions {
            fp.push_str(name);
            fp.push_value(value);
        }
        for (name, registered) in &self.behaviours {
            fp.push_str(name);
            fp.push_str(registered.behaviour.tag());
            match &registered.behaviour {
                Behaviour::Alias(value) => fp.push_value(value),
                // Callables have no byte rendering; their registration
                // token stands in for them.
                _ => fp.push_str(&registered.token.to_string()),
            }
        }
        fp.finish()
    }
}

/// A cloneable handle sharing one [`Context`] between a container, its
/// rules and their parameter caches.
///
/// Reads are concurrent; mutation takes the write lock. Instances are
/// intended to be confined to one logical scope (one container, one
/// request); the lock makes sharing sound, not concurrent mutation wise.
#[derive(Debug, Clone)]
pub struct SharedContext {
    inner: Arc<RwLock<Context>>,
}

impl SharedContext {
    pub fn new(context: Context) -> Self {
        Self {
            inner: Arc::new(RwLock::new(context)),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Context> {
        self.inner.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Context> {
        self.inner.write()
    }

    pub fn subject(&self) -> Result<Value, ContextError> {
        self.read().subject()
    }

    pub fn environment(&self) -> Result<Value, ContextError> {
        self.read().environment()
    }

    pub fn moment(&self) -> Result<Value, ContextError> {
        self.read().moment()
    }

    pub fn identify(&self) -> String {
        self.read().identify()
    }

    /// Sets the environment through the handle; see [`Context::within`].
    pub fn within(&self, environment: impl Into<Value>) -> &Self {
        self.write().within(environment);
        self
    }

    /// Sets the subject through the handle; see [`Context::with`].
    pub fn with(&self, subject: impl Into<Value>) -> &Self {
        self.write().with(subject);
        self
    }

    /// Sets the moment through the handle; see [`Context::during`].
    pub fn during(&self, moment: impl Into<Value>) -> &Self {
        self.write().during(moment);
        self
    }

    pub fn describe(&self, name: impl Into<String>, value: impl Into<Value>) -> &Self {
        self.write().describe(name, value);
        self
    }
}

impl From<Context> for SharedContext {
    fn from(context: Context) -> Self {
        Self::new(context)
    }
}
