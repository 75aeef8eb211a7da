//! Named behaviours: context-resolved indirections to callables and
//! constructors.
//!
//! A behaviour aliases a value, a function or a constructor under a name.
//! Because names and arguments pass through template substitution, a
//! description can hold the literal name of a behaviour and redirect the
//! call site without it knowing.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use toml::Value;

use super::template::scalar_text;
use super::{Context, ContextError};

/// A function behaviour, invoked by [`Context::proceed`].
pub type BehaviourFn =
    Arc<dyn Fn(&Context, &[Value]) -> Result<Value, ContextError> + Send + Sync>;

/// A constructor behaviour, invoked by [`Context::construct`].
pub type ConstructorFn =
    Arc<dyn Fn(&Context, &[Value]) -> Result<Box<dyn Any>, ContextError> + Send + Sync>;

/// A named target registered on a context.
#[derive(Clone)]
pub enum Behaviour {
    /// A plain value, normalized on resolution. May itself be a template.
    Alias(Value),
    /// A function called with normalized arguments.
    Callable(BehaviourFn),
    /// A constructor building an object from normalized arguments.
    Constructor(ConstructorFn),
}

impl Behaviour {
    pub fn alias(value: impl Into<Value>) -> Self {
        Behaviour::Alias(value.into())
    }

    pub fn callable<F>(f: F) -> Self
    where
        F: Fn(&Context, &[Value]) -> Result<Value, ContextError> + Send + Sync + 'static,
    {
        Behaviour::Callable(Arc::new(f))
    }

    pub fn constructor<F>(f: F) -> Self
    where
        F: Fn(&Context, &[Value]) -> Result<Box<dyn Any>, ContextError> + Send + Sync + 'static,
    {
        Behaviour::Constructor(Arc::new(f))
    }

    pub(crate) fn tag(&self) -> &'static str {
        match self {
            Behaviour::Alias(_) => "alias",
            Behaviour::Callable(_) => "callable",
            Behaviour::Constructor(_) => "constructor",
        }
    }
}

impl fmt::Debug for Behaviour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Behaviour::Alias(value) => f.debug_tuple("Alias").field(value).finish(),
            Behaviour::Callable(_) => f.write_str("Callable(..)"),
            Behaviour::Constructor(_) => f.write_str("Constructor(..)"),
        }
    }
}

/// A registered behaviour plus the token used to fingerprint callables,
/// which cannot be rendered as bytes themselves.
#[derive(Debug, Clone)]
pub(crate) struct Registered {
    pub behaviour: Behaviour,
    pub token: u64,
}

/// Outcome of the resolve phase, before anything is invoked.
#[derive(Clone)]
pub enum Resolved {
    Callable(BehaviourFn),
    Constructor(ConstructorFn),
    /// An alias, already normalized.
    Value(Value),
    NotFound,
}

impl Context {
    /// Registers a behaviour under a name, replacing any previous one.
    pub fn add_behaviour(&mut self, name: impl Into<String>, behaviour: Behaviour) -> &mut Self {
        let token = self.next_token;
        self.next_token += 1;
        self.behaviours
            .insert(name.into(), Registered { behaviour, token });
        self
    }

    pub fn has_behaviour(&self, name: &str) -> bool {
        self.behaviours.contains_key(name)
    }

    pub fn del_behaviour(&mut self, name: &str) -> &mut Self {
        self.behaviours.remove(name);
        self
    }

    /// Resolves a behaviour name without invoking it.
    ///
    /// The name passes through template substitution first, so a
    /// description can hold the actual behaviour name.
    pub fn resolve_behaviour(&self, name: &str) -> Result<Resolved, ContextError> {
        let normalized = self.normalize(&Value::String(name.to_owned()))?;
        let key = scalar_text(&normalized)
            .ok_or_else(|| ContextError::InvalidBehaviour(name.to_owned()))?;
        match self.behaviours.get(&key).map(|r| &r.behaviour) {
            Some(Behaviour::Callable(f)) => Ok(Resolved::Callable(f.clone())),
            Some(Behaviour::Constructor(f)) => Ok(Resolved::Constructor(f.clone())),
            Some(Behaviour::Alias(value)) => Ok(Resolved::Value(self.normalize(value)?)),
            None => Ok(Resolved::NotFound),
        }
    }

    /// Invokes a behaviour as a function.
    ///
    /// Name, arguments and return value are all normalized, so the call
    /// stays contextual end to end. Invoking a name that is missing or
    /// does not resolve to a callable is an error.
    pub fn proceed(&self, name: &str, args: &[Value]) -> Result<Value, ContextError> {
        match self.resolve_behaviour(name)? {
            Resolved::Callable(f) => {
                let args = self.normalize_all(args)?;
                tracing::trace!(behaviour = name, "invoking behaviour");
                let out = f(self, &args)?;
                self.normalize(&out)
            }
            _ => Err(ContextError::InvalidBehaviour(name.to_owned())),
        }
    }

    /// Invokes a behaviour as a constructor and downcasts the result.
    pub fn construct<T: 'static>(&self, name: &str, args: &[Value]) -> Result<T, ContextError> {
        match self.resolve_behaviour(name)? {
            Resolved::Constructor(f) => {
                let args = self.normalize_all(args)?;
                tracing::trace!(behaviour = name, "constructing from behaviour");
                let built = f(self, &args)?;
                built
                    .downcast::<T>()
                    .map(|boxed| *boxed)
                    .map_err(|_| ContextError::ConstructMismatch(name.to_owned()))
            }
            _ => Err(ContextError::InvalidBehaviour(name.to_owned())),
        }
    }

    fn normalize_all(&self, values: &[Value]) -> Result<Vec<Value>, ContextError> {
        values.iter().map(|v| self.normalize(v)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn greeter() -> Behaviour {
        Behaviour::callable(|_ctx, args| {
            let who = args
                .first()
                .and_then(|v| v.as_str())
                .unwrap_or("nobody")
                .to_owned();
            Ok(Value::String(format!("hello {who}")))
        })
    }

    #[test]
    fn proceed_invokes_with_normalized_args() {
        let mut ctx = Context::new("s", "e");
        ctx.describe("user", "ada");
        ctx.add_behaviour("greet", greeter());
        let out = ctx
            .proceed("greet", &[Value::String("{user}".into())])
            .unwrap();
        assert_eq!(out, Value::String("hello ada".into()));
    }

    #[test]
    fn behaviour_name_can_come_from_a_description() {
        let mut ctx = Context::new("s", "e");
        ctx.describe("action", "greet");
        ctx.add_behaviour("greet", greeter());
        let out = ctx
            .proceed("{action}", &[Value::String("bob".into())])
            .unwrap();
        assert_eq!(out, Value::String("hello bob".into()));
    }

    #[test]
    fn missing_behaviour_is_an_error() {
        let ctx = Context::new("s", "e");
        let err = ctx.proceed("nope", &[]).unwrap_err();
        assert!(matches!(err, ContextError::InvalidBehaviour(_)));
    }

    #[test]
    fn alias_resolves_to_a_normalized_value() {
        let mut ctx = Context::new("s", "e");
        ctx.describe("root", "/srv");
        ctx.add_behaviour("data dir", Behaviour::alias("{root}/data"));
        match ctx.resolve_behaviour("data dir").unwrap() {
            Resolved::Value(v) => assert_eq!(v, Value::String("/srv/data".into())),
            _ => panic!("expected an alias value"),
        }
    }

    #[test]
    fn aliases_are_not_callable() {
        let mut ctx = Context::new("s", "e");
        ctx.add_behaviour("name", Behaviour::alias("value"));
        assert!(matches!(
            ctx.proceed("name", &[]),
            Err(ContextError::InvalidBehaviour(_))
        ));
    }

    #[test]
    fn construct_builds_and_downcasts() {
        let mut ctx = Context::new("s", "e");
        ctx.add_behaviour(
            "make pair",
            Behaviour::constructor(|_ctx, args| {
                let first = args.first().and_then(|v| v.as_str()).unwrap_or("").to_owned();
                Ok(Box::new((first, args.len())) as Box<dyn std::any::Any>)
            }),
        );
        let (text, count): (String, usize) = ctx
            .construct("make pair", &[Value::String("a".into())])
            .unwrap();
        assert_eq!(text, "a");
        assert_eq!(count, 1);
    }

    #[test]
    fn construct_with_wrong_type_fails() {
        let mut ctx = Context::new("s", "e");
        ctx.add_behaviour(
            "make pair",
            Behaviour::constructor(|_ctx, _args| {
                Ok(Box::new(1u8) as Box<dyn std::any::Any>)
            }),
        );
        let err = ctx.construct::<String>("make pair", &[]).unwrap_err();
        assert!(matches!(err, ContextError::ConstructMismatch(_)));
    }

    #[test]
    fn del_behaviour_unregisters() {
        let mut ctx = Context::new("s", "e");
        ctx.add_behaviour("greet", greeter());
        assert!(ctx.has_behaviour("greet"));
        ctx.del_behaviour("greet");
        assert!(!ctx.has_behaviour("greet"));
    }
}
