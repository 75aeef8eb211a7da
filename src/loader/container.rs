//! The rule container: owns rule instances and the resolution chain.

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use toml::Value;

use crate::context::{Behaviour, SharedContext};

use super::dash_and_context::DashAndContext;
use super::params::{ParamSpec, RuleParams};
use super::rule::{Loaded, Rule, RuleDefaults};
use super::start_with::StartWith;
use super::LoaderError;

/// Builds a rule instance from prepared parameters.
pub struct RuleFactory {
    defaults: RuleDefaults,
    build: Box<dyn Fn(RuleParams) -> Box<dyn Rule> + Send + Sync>,
}

impl RuleFactory {
    pub fn new<F>(defaults: RuleDefaults, build: F) -> Self
    where
        F: Fn(RuleParams) -> Box<dyn Rule> + Send + Sync + 'static,
    {
        Self {
            defaults,
            build: Box::new(build),
        }
    }

    pub fn defaults(&self) -> &RuleDefaults {
        &self.defaults
    }
}

impl fmt::Debug for RuleFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleFactory")
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

/// Identity of an attached rule: its kind plus its parameter fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RuleKey {
    kind: String,
    params: String,
}

impl RuleKey {
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn fingerprint(&self) -> &str {
        &self.params
    }
}

impl fmt::Display for RuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind, &self.params[..8.min(self.params.len())])
    }
}

/// One rule declaration inside a setup table.
#[derive(Debug, Deserialize)]
struct RuleSetup {
    rule: String,
    #[serde(flatten)]
    spec: ParamSpec,
}

/// Rule container for entity loading.
///
/// The container resolves a symbolic rule type to a rule kind through the
/// context behaviour [`Container::KIND_BEHAVIOUR`] (replace it to change
/// the naming policy), builds the rule from the registered factory, and
/// keeps the instance on an explicit, ordered resolution chain. The chain
/// is the only registry: there is no ambient global hook, a composition
/// root owns the container and asks it to resolve.
///
/// At most one rule instance exists per (kind, parameter fingerprint)
/// pair; adding an equivalent rule again is an idempotent no-op.
pub struct Container {
    context: SharedContext,
    factories: BTreeMap<String, RuleFactory>,
    rules: BTreeMap<RuleKey, Box<dyn Rule>>,
    chain: Vec<RuleKey>,
}

impl Container {
    /// Behaviour consulted to turn a rule type into a factory kind.
    pub const KIND_BEHAVIOUR: &'static str = "rule kind from type";

    /// Creates a container with the built-in rule kinds registered.
    ///
    /// The default kind-naming behaviour is added to the context only if
    /// the caller has not already provided one.
    pub fn new(context: SharedContext) -> Self {
        {
            let mut ctx = context.write();
            if !ctx.has_behaviour(Self::KIND_BEHAVIOUR) {
                ctx.add_behaviour(
                    Self::KIND_BEHAVIOUR,
                    Behaviour::callable(|_ctx, args| {
                        Ok(args
                            .first()
                            .cloned()
                            .unwrap_or_else(|| Value::String(String::new())))
                    }),
                );
            }
        }

        let mut container = Self {
            context,
            factories: BTreeMap::new(),
            rules: BTreeMap::new(),
            chain: Vec::new(),
        };
        container.add_factory(
            StartWith::KIND,
            RuleFactory::new(StartWith::DEFAULTS, |params| {
                Box::new(StartWith::new(params))
            }),
        );
        container.add_factory(
            DashAndContext::KIND,
            RuleFactory::new(DashAndContext::DEFAULTS, |params| {
                Box::new(DashAndContext::new(params))
            }),
        );
        container
    }

    pub fn context(&self) -> &SharedContext {
        &self.context
    }

    /// Registers a rule factory under a kind name.
    pub fn add_factory(&mut self, kind: impl Into<String>, factory: RuleFactory) -> &mut Self {
        self.factories.insert(kind.into(), factory);
        self
    }

    /// Resolves a rule type to a factory kind through the context.
    fn rule_kind(&self, rule_type: &str) -> Result<String, LoaderError> {
        let resolved = self
            .context
            .read()
            .proceed(Self::KIND_BEHAVIOUR, &[Value::String(rule_type.to_owned())])?;
        match resolved {
            Value::String(kind) if !kind.is_empty() => Ok(kind),
            _ => Err(LoaderError::InvalidKind(rule_type.to_owned())),
        }
    }

    /// Prepares parameters for a rule type without attaching anything.
    fn init(&self, rule_type: &str) -> Result<(String, &RuleFactory), LoaderError> {
        let kind = self.rule_kind(rule_type)?;
        let factory = self
            .factories
            .get(&kind)
            .ok_or_else(|| LoaderError::UnknownKind(kind.clone()))?;
        Ok((kind, factory))
    }

    /// Adds a rule to the resolution chain.
    ///
    /// Re-adding a rule with equivalent parameters returns the existing
    /// instance's key without touching the chain.
    pub fn add_rule(&mut self, rule_type: &str, spec: ParamSpec) -> Result<RuleKey, LoaderError> {
        let (kind, factory) = self.init(rule_type)?;
        let params = RuleParams::new(self.context.clone(), spec, factory.defaults());
        let key = RuleKey {
            kind,
            params: params.fingerprint().to_owned(),
        };
        if self.rules.contains_key(&key) {
            tracing::debug!(rule = %key, "rule already attached, reusing");
            return Ok(key);
        }
        let rule = (factory.build)(params);
        self.rules.insert(key.clone(), rule);
        self.chain.push(key.clone());
        tracing::info!(rule = %key, "rule attached");
        Ok(key)
    }

    /// Returns the rule for a type and spec, attaching it if needed.
    pub fn get_rule(
        &mut self,
        rule_type: &str,
        spec: ParamSpec,
    ) -> Result<&dyn Rule, LoaderError> {
        let key = self.add_rule(rule_type, spec)?;
        match self.rules.get(&key) {
            Some(rule) => Ok(rule.as_ref()),
            None => Err(LoaderError::UnknownKind(key.kind().to_owned())),
        }
    }

    /// Removes the rule matching a type and spec from the chain.
    pub fn del_rule(&mut self, rule_type: &str, spec: ParamSpec) -> Result<bool, LoaderError> {
        let (kind, factory) = self.init(rule_type)?;
        let params = RuleParams::new(self.context.clone(), spec, factory.defaults());
        let key = RuleKey {
            kind,
            params: params.fingerprint().to_owned(),
        };
        Ok(self.detach(&key))
    }

    /// Detaches a rule by key; returns whether it was attached.
    pub fn detach(&mut self, key: &RuleKey) -> bool {
        let removed = self.rules.remove(key).is_some();
        if removed {
            self.chain.retain(|k| k != key);
            tracing::info!(rule = %key, "rule detached");
        }
        removed
    }

    /// Direct access to an attached rule.
    pub fn rule(&self, key: &RuleKey) -> Option<&dyn Rule> {
        self.rules.get(key).map(|rule| rule.as_ref())
    }

    /// Attached rule keys, in chain order.
    pub fn keys(&self) -> impl Iterator<Item = &RuleKey> {
        self.chain.iter()
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Resolves an entity against the chain, in registration order.
    ///
    /// Rules that do not apply are skipped; the first resolution wins.
    pub fn resolve(
        &self,
        entity: &str,
    ) -> Result<Option<(RuleKey, std::path::PathBuf)>, LoaderError> {
        for key in &self.chain {
            let Some(rule) = self.rules.get(key) else {
                continue;
            };
            if let Some(path) = rule.locate(entity)? {
                return Ok(Some((key.clone(), path)));
            }
            tracing::trace!(entity, rule = %key, "rule does not apply");
        }
        Ok(None)
    }

    /// Loads an entity through the first applicable rule.
    pub fn load(&self, entity: &str) -> Result<Option<Loaded>, LoaderError> {
        for key in &self.chain {
            let Some(rule) = self.rules.get(key) else {
                continue;
            };
            if let Some(loaded) = rule.load(entity)? {
                tracing::debug!(entity, rule = %key, "entity loaded");
                return Ok(Some(loaded));
            }
        }
        Ok(None)
    }

    /// Loads an entity, surfacing a miss as [`LoaderError::Unresolved`].
    pub fn require(&self, entity: &str) -> Result<Loaded, LoaderError> {
        self.load(entity)?
            .ok_or_else(|| LoaderError::Unresolved(entity.to_owned()))
    }

    /// Registers every rule declared in a `[[rule]]` array of a TOML
    /// table. Each entry names its `rule` type; the remaining keys are the
    /// parameter spec.
    pub fn add_rules_from_table(
        &mut self,
        table: &toml::Table,
    ) -> Result<Vec<RuleKey>, LoaderError> {
        let mut keys = Vec::new();
        let Some(declared) = table.get("rule") else {
            return Ok(keys);
        };
        let Some(declared) = declared.as_array() else {
            return Err(LoaderError::InvalidSetup);
        };
        for entry in declared {
            let setup: RuleSetup = entry.clone().try_into()?;
            keys.push(self.add_rule(&setup.rule, setup.spec)?);
        }
        Ok(keys)
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("factories", &self.factories.keys().collect::<Vec<_>>())
            .field("chain", &self.chain)
            .finish_non_exhaustive()
    }
}
