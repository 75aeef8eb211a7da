//! Rule parameters and their context-scoped caches.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::Deserialize;

use crate::context::{ContextError, SharedContext};
use crate::fingerprint::Fingerprint;

use super::rule::{EntityParts, RuleDefaults};

/// A cached path resolution.
///
/// `Missing` records that resolution already failed for an entity under the
/// current context, so the filesystem is not probed again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedPath {
    Found(PathBuf),
    Missing,
}

/// Partial rule parameters, as accepted by the container.
///
/// Every field is optional; missing ones are filled from the defaults of
/// the rule kind being built. Derives `Deserialize` so rule sets can be
/// declared in a TOML table.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ParamSpec {
    pub base_dir: Option<PathBuf>,
    pub filter: Option<String>,
    pub default_kind: Option<String>,
    pub extension: Option<String>,
}

impl ParamSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_dir(mut self, base_dir: impl AsRef<Path>) -> Self {
        self.base_dir = Some(base_dir.as_ref().to_path_buf());
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_default_kind(mut self, default_kind: impl Into<String>) -> Self {
        self.default_kind = Some(default_kind.into());
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }
}

type CacheMap<T> = HashMap<String, HashMap<String, T>>;

/// Parameters of one rule instance, within a shared context.
///
/// A rule has a base directory from where files are searched, a name
/// filter, a default entity kind and a file extension. Resolution results
/// are kept in two caches, filter results and resolved paths, keyed by a
/// fingerprint of the context's (subject, environment, moment), so entries
/// become invisible as soon as the context moves. Every parameter setter
/// empties both caches.
///
/// The fingerprint of the initial parameters identifies the instance to
/// the container; it does not change when parameters are mutated later.
#[derive(Debug)]
pub struct RuleParams {
    context: SharedContext,
    base_dir: PathBuf,
    filter: String,
    default_kind: String,
    extension: String,
    hash: String,
    filter_cache: Mutex<CacheMap<Option<EntityParts>>>,
    path_cache: Mutex<CacheMap<CachedPath>>,
}

impl RuleParams {
    pub fn new(context: SharedContext, spec: ParamSpec, defaults: &RuleDefaults) -> Self {
        let base_dir = spec
            .base_dir
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
        let base_dir = std::fs::canonicalize(&base_dir).unwrap_or(base_dir);
        let filter = spec.filter.unwrap_or_else(|| defaults.filter.to_owned());
        let default_kind = spec
            .default_kind
            .unwrap_or_else(|| defaults.default_kind.to_owned());
        let extension = spec
            .extension
            .unwrap_or_else(|| defaults.extension.to_owned());

        let mut fp = Fingerprint::new();
        fp.push_str(&base_dir.to_string_lossy());
        fp.push_str(&filter);
        fp.push_str(&default_kind);
        fp.push_str(&extension);

        Self {
            context,
            base_dir,
            filter,
            default_kind,
            extension,
            hash: fp.finish(),
            filter_cache: Mutex::new(HashMap::new()),
            path_cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn context(&self) -> &SharedContext {
        &self.context
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn default_kind(&self) -> &str {
        &self.default_kind
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Hash of the initial parameters, used as the instance identity.
    pub fn fingerprint(&self) -> &str {
        &self.hash
    }

    pub fn set_base_dir(&mut self, base_dir: impl AsRef<Path>) -> &mut Self {
        let base_dir = base_dir.as_ref().to_path_buf();
        self.base_dir = std::fs::canonicalize(&base_dir).unwrap_or(base_dir);
        self.clear_cache()
    }

    pub fn set_filter(&mut self, filter: impl Into<String>) -> &mut Self {
        self.filter = filter.into();
        self.clear_cache()
    }

    pub fn set_default_kind(&mut self, default_kind: impl Into<String>) -> &mut Self {
        self.default_kind = default_kind.into();
        self.clear_cache()
    }

    pub fn set_extension(&mut self, extension: impl Into<String>) -> &mut Self {
        self.extension = extension.into();
        self.clear_cache()
    }

    /// Deletes every filter and path cache entry, for all context ids.
    pub fn clear_cache(&mut self) -> &mut Self {
        self.filter_cache.lock().clear();
        self.path_cache.lock().clear();
        tracing::trace!("rule parameter caches cleared");
        self
    }

    /// Cache key scoping entries to the current subject, environment and
    /// moment of the owning context.
    pub fn cache_id(&self) -> Result<String, ContextError> {
        let ctx = self.context.read();
        let mut fp = Fingerprint::new();
        fp.push_value(&ctx.subject()?);
        fp.push_value(&ctx.environment()?);
        fp.push_value(&ctx.moment()?);
        Ok(fp.finish())
    }

    /// Stores a filter result for an entity under the current context id.
    ///
    /// A stored `None` means the entity is definitively not recognized.
    pub fn set_filter_cache(
        &self,
        entity: &str,
        parts: Option<EntityParts>,
    ) -> Result<(), ContextError> {
        let id = self.cache_id()?;
        self.filter_cache
            .lock()
            .entry(id)
            .or_default()
            .insert(entity.to_owned(), parts);
        Ok(())
    }

    /// Returns the cached filter result for an entity.
    ///
    /// The outer `Option` distinguishes "not cached" from a cached
    /// negative result.
    pub fn filter_cache(
        &self,
        entity: &str,
    ) -> Result<Option<Option<EntityParts>>, ContextError> {
        let id = self.cache_id()?;
        Ok(self
            .filter_cache
            .lock()
            .get(&id)
            .and_then(|entries| entries.get(entity))
            .cloned())
    }

    pub fn has_filter_cache(&self, entity: &str) -> Result<bool, ContextError> {
        Ok(self.filter_cache(entity)?.is_some())
    }

    /// Stores a path resolution for an entity under the current context id.
    pub fn set_path_cache(&self, entity: &str, path: CachedPath) -> Result<(), ContextError> {
        let id = self.cache_id()?;
        self.path_cache
            .lock()
            .entry(id)
            .or_default()
            .insert(entity.to_owned(), path);
        Ok(())
    }

    /// Returns the cached path resolution for an entity, if any.
    pub fn path_cache(&self, entity: &str) -> Result<Option<CachedPath>, ContextError> {
        let id = self.cache_id()?;
        Ok(self
            .path_cache
            .lock()
            .get(&id)
            .and_then(|entries| entries.get(entity))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;

    fn params() -> RuleParams {
        let context = SharedContext::new(Context::new("loader", "test"));
        RuleParams::new(
            context,
            ParamSpec::new().with_base_dir("/tmp"),
            &RuleDefaults {
                filter: "wvn",
                default_kind: "lib",
                extension: "toml",
            },
        )
    }

    #[test]
    fn defaults_fill_missing_spec_fields() {
        let p = params();
        assert_eq!(p.filter(), "wvn");
        assert_eq!(p.default_kind(), "lib");
        assert_eq!(p.extension(), "toml");
    }

    #[test]
    fn equivalent_specs_share_a_fingerprint() {
        assert_eq!(params().fingerprint(), params().fingerprint());
        let other = RuleParams::new(
            SharedContext::new(Context::new("loader", "test")),
            ParamSpec::new().with_base_dir("/tmp").with_filter("other"),
            &RuleDefaults {
                filter: "wvn",
                default_kind: "lib",
                extension: "toml",
            },
        );
        assert_ne!(params().fingerprint(), other.fingerprint());
    }

    #[test]
    fn path_cache_round_trips() {
        let p = params();
        p.set_path_cache("Entity", CachedPath::Found("/tmp/e.toml".into()))
            .unwrap();
        assert_eq!(
            p.path_cache("Entity").unwrap(),
            Some(CachedPath::Found("/tmp/e.toml".into()))
        );
        assert_eq!(p.path_cache("Other").unwrap(), None);
    }

    #[test]
    fn missing_sentinel_is_cached() {
        let p = params();
        p.set_path_cache("Gone", CachedPath::Missing).unwrap();
        assert_eq!(p.path_cache("Gone").unwrap(), Some(CachedPath::Missing));
    }

    #[test]
    fn context_move_hides_cache_entries() {
        let p = params();
        p.set_path_cache("Entity", CachedPath::Found("/tmp/e.toml".into()))
            .unwrap();
        p.context().within("other-env");
        assert_eq!(p.path_cache("Entity").unwrap(), None);
    }

    #[test]
    fn cache_entries_reappear_when_the_context_returns() {
        let p = params();
        p.set_path_cache("Entity", CachedPath::Found("/tmp/e.toml".into()))
            .unwrap();
        p.context().within("other-env");
        p.context().within("test");
        assert_eq!(
            p.path_cache("Entity").unwrap(),
            Some(CachedPath::Found("/tmp/e.toml".into()))
        );
    }

    #[test]
    fn moment_change_hides_cache_entries_too() {
        let p = params();
        p.set_path_cache("Entity", CachedPath::Found("/tmp/e.toml".into()))
            .unwrap();
        p.context().during(11i64);
        assert_eq!(p.path_cache("Entity").unwrap(), None);
    }

    #[test]
    fn parameter_setters_clear_both_caches() {
        let mut p = params();
        p.set_path_cache("Entity", CachedPath::Found("/tmp/e.toml".into()))
            .unwrap();
        p.set_filter_cache("Entity", None).unwrap();
        p.set_filter("x");
        assert_eq!(p.path_cache("Entity").unwrap(), None);
        assert_eq!(p.filter_cache("Entity").unwrap(), None);
    }

    #[test]
    fn filter_cache_distinguishes_negative_results() {
        let p = params();
        assert_eq!(p.filter_cache("Entity").unwrap(), None);
        p.set_filter_cache("Entity", None).unwrap();
        assert_eq!(p.filter_cache("Entity").unwrap(), Some(None));
        assert!(p.has_filter_cache("Entity").unwrap());
    }
}
