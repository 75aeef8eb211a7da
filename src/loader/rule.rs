//! The rule seam: filtering, locating and loading entity files.

use std::fs;
use std::path::PathBuf;

use super::params::{CachedPath, RuleParams};
use super::LoaderError;

/// Structured result of filtering an entity name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityParts {
    /// Short name of the entity; becomes the file name.
    pub name: String,
    /// Category directory, when the naming scheme carries one.
    pub pack: Option<String>,
    /// Generic kind of the entity (lib, states, views...), resolving the
    /// directory the file lives under.
    pub kind: String,
}

/// Built-in parameter defaults of a rule kind, applied to the fields a
/// [`ParamSpec`](super::ParamSpec) leaves unset.
#[derive(Debug, Clone, Copy)]
pub struct RuleDefaults {
    pub filter: &'static str,
    pub default_kind: &'static str,
    pub extension: &'static str,
}

/// A successfully loaded entity file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loaded {
    pub path: PathBuf,
    pub source: String,
}

/// A policy object that recognizes, locates and loads entity files.
///
/// Implementors provide `filter` and `where_is`; the cache-backed lookup
/// cycle (`know`, `locate`, `load`) is shared. Per entity, a lookup moves
/// from unknown through filtered to known-with-path or known-without-path,
/// consulting the parameter caches at each step.
///
/// A missing backing file is never an error here: `where_is` answers
/// `None`, the miss is cached, and the rule simply does not apply. Only
/// genuine I/O failures surface as errors.
pub trait Rule {
    fn params(&self) -> &RuleParams;

    fn params_mut(&mut self) -> &mut RuleParams;

    /// Extracts name, package and kind from an entity name, or `None` when
    /// the entity does not match this rule's naming scheme.
    fn filter(&self, entity: &str) -> Result<Option<EntityParts>, LoaderError>;

    /// Resolves the file backing a filtered entity, or `None` when no such
    /// file exists.
    fn where_is(&self, entity: &str) -> Result<Option<PathBuf>, LoaderError>;

    /// Filter result for an entity, through the filter cache.
    fn parts(&self, entity: &str) -> Result<Option<EntityParts>, LoaderError> {
        if let Some(cached) = self.params().filter_cache(entity)? {
            tracing::trace!(entity, "filter cache hit");
            return Ok(cached);
        }
        let parts = self.filter(entity)?;
        self.params().set_filter_cache(entity, parts.clone())?;
        Ok(parts)
    }

    /// The kind of an entity, from its filter result.
    fn who_is(&self, entity: &str) -> Result<Option<String>, LoaderError> {
        Ok(self.parts(entity)?.map(|parts| parts.kind))
    }

    /// Whether this rule recognizes the entity name.
    fn know(&self, entity: &str) -> Result<bool, LoaderError> {
        if let Some(CachedPath::Found(_)) = self.params().path_cache(entity)? {
            return Ok(true);
        }
        Ok(self.parts(entity)?.is_some())
    }

    /// Resolves the entity's file, through the path cache.
    ///
    /// A resolution miss is cached as [`CachedPath::Missing`] so the
    /// filesystem is not probed again for the same entity and context.
    fn locate(&self, entity: &str) -> Result<Option<PathBuf>, LoaderError> {
        match self.params().path_cache(entity)? {
            Some(CachedPath::Found(path)) => {
                tracing::trace!(entity, "path cache hit");
                Ok(Some(path))
            }
            Some(CachedPath::Missing) => Ok(None),
            None => {
                if self.parts(entity)?.is_none() {
                    return Ok(None);
                }
                let resolved = self.where_is(entity)?;
                let cached = match &resolved {
                    Some(path) => CachedPath::Found(path.clone()),
                    None => CachedPath::Missing,
                };
                self.params().set_path_cache(entity, cached)?;
                if let Some(path) = &resolved {
                    tracing::debug!(entity, path = %path.display(), "entity resolved");
                }
                Ok(resolved)
            }
        }
    }

    /// Loads the entity's file contents, or `None` when the rule does not
    /// apply or no backing file exists.
    fn load(&self, entity: &str) -> Result<Option<Loaded>, LoaderError> {
        let Some(path) = self.locate(entity)? else {
            return Ok(None);
        };
        match fs::read_to_string(&path) {
            Ok(source) => Ok(Some(Loaded { path, source })),
            // A cached path may have disappeared since resolution.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(LoaderError::Read { path, source: e }),
        }
    }
}
