//! Rule for entities typed by their name suffix and stored in
//! dash-prefixed files, searched within the context environment.
//!
//! For the entity `LoadConstantState`, kind `states`: the search first
//! probes `base_dir/states/<environment>/` for any `*-LoadConstant` file,
//! then falls back to `base_dir/states/`. The dash prefix leaves room for
//! ordering tokens, so `10-LoadConstant.toml` or `10.1-LoadConstant.toml`
//! both match.

use std::path::{Path, PathBuf};

use regex::Regex;

use super::params::RuleParams;
use super::rule::{EntityParts, Rule, RuleDefaults};
use super::LoaderError;
use crate::context::template::scalar_text;

/// Resolves `NameKind`-style entities to `base_dir/kind/[env/]*-Name`.
#[derive(Debug)]
pub struct DashAndContext {
    params: RuleParams,
}

impl DashAndContext {
    pub const KIND: &'static str = "dash_and_context";

    pub(crate) const DEFAULTS: RuleDefaults = RuleDefaults {
        filter: "^([A-Z][a-z_]+(?:[A-Z][a-z_]+)*)([A-Z][a-z_]+)$",
        default_kind: "lib",
        extension: "toml",
    };

    pub fn new(params: RuleParams) -> Self {
        Self { params }
    }

    fn pattern(&self) -> Result<Regex, LoaderError> {
        let pattern = self.params.filter().to_owned();
        Regex::new(&pattern).map_err(|source| LoaderError::InvalidFilter { pattern, source })
    }

    /// First file under `dir` ending in `suffix`, in lexicographic order.
    fn first_match(dir: &Path, suffix: &str) -> Result<Option<PathBuf>, LoaderError> {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(LoaderError::Read {
                    path: dir.to_path_buf(),
                    source: e,
                })
            }
        };
        let mut found: Vec<PathBuf> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| LoaderError::Read {
                path: dir.to_path_buf(),
                source: e,
            })?;
            let path = entry.path();
            let matches = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(suffix));
            if matches && path.is_file() {
                found.push(path);
            }
        }
        found.sort();
        match found.into_iter().next() {
            Some(path) => Ok(Some(std::fs::canonicalize(&path).unwrap_or(path))),
            None => Ok(None),
        }
    }
}

impl Rule for DashAndContext {
    fn params(&self) -> &RuleParams {
        &self.params
    }

    fn params_mut(&mut self) -> &mut RuleParams {
        &mut self.params
    }

    fn filter(&self, entity: &str) -> Result<Option<EntityParts>, LoaderError> {
        let pattern = self.pattern()?;
        let Some(caps) = pattern.captures(entity) else {
            return Ok(None);
        };
        let (Some(name), Some(suffix)) = (caps.get(1), caps.get(2)) else {
            return Ok(None);
        };
        Ok(Some(EntityParts {
            name: name.as_str().to_owned(),
            pack: None,
            kind: format!("{}s", suffix.as_str().to_lowercase()),
        }))
    }

    fn where_is(&self, entity: &str) -> Result<Option<PathBuf>, LoaderError> {
        let Some(parts) = self.parts(entity)? else {
            return Ok(None);
        };
        let kind_dir = self.params.base_dir().join(&parts.kind);
        let suffix = format!("-{}.{}", parts.name, self.params.extension());

        // Environment-specific directory first, kind root as fallback.
        let environment = self.params.context().environment()?;
        if let Some(env) = scalar_text(&environment) {
            if let Some(path) = Self::first_match(&kind_dir.join(env), &suffix)? {
                return Ok(Some(path));
            }
        }
        Self::first_match(&kind_dir, &suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Context, SharedContext};
    use crate::loader::ParamSpec;
    use std::fs;

    fn rule_in(dir: &std::path::Path) -> DashAndContext {
        let context = SharedContext::new(Context::new("loader", "test"));
        DashAndContext::new(RuleParams::new(
            context,
            ParamSpec::new().with_base_dir(dir),
            &DashAndContext::DEFAULTS,
        ))
    }

    #[test]
    fn filter_splits_name_and_kind_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let rule = rule_in(dir.path());
        let parts = rule.filter("LoadConstantState").unwrap().unwrap();
        assert_eq!(parts.name, "LoadConstant");
        assert_eq!(parts.kind, "states");
        assert_eq!(parts.pack, None);
    }

    #[test]
    fn single_word_names_are_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let rule = rule_in(dir.path());
        assert!(rule.filter("State").unwrap().is_none());
        assert!(rule.filter("lowercase").unwrap().is_none());
    }

    #[test]
    fn environment_directory_wins_over_the_kind_root() {
        let dir = tempfile::tempdir().unwrap();
        let states = dir.path().join("states");
        fs::create_dir_all(states.join("test")).unwrap();
        fs::write(states.join("10-LoadConstant.toml"), "root = true\n").unwrap();
        fs::write(states.join("test").join("10-LoadConstant.toml"), "env = true\n").unwrap();

        let rule = rule_in(dir.path());
        let loaded = rule.load("LoadConstantState").unwrap().unwrap();
        assert!(loaded.path.ends_with("states/test/10-LoadConstant.toml"));
        assert_eq!(loaded.source, "env = true\n");
    }

    #[test]
    fn falls_back_to_the_kind_root() {
        let dir = tempfile::tempdir().unwrap();
        let states = dir.path().join("states");
        fs::create_dir_all(&states).unwrap();
        fs::write(states.join("10-LoadConstant.toml"), "root = true\n").unwrap();

        let rule = rule_in(dir.path());
        let loaded = rule.load("LoadConstantState").unwrap().unwrap();
        assert!(loaded.path.ends_with("states/10-LoadConstant.toml"));
    }

    #[test]
    fn first_match_is_lexicographic() {
        let dir = tempfile::tempdir().unwrap();
        let states = dir.path().join("states");
        fs::create_dir_all(&states).unwrap();
        fs::write(states.join("20-LoadConstant.toml"), "b\n").unwrap();
        fs::write(states.join("10-LoadConstant.toml"), "a\n").unwrap();

        let rule = rule_in(dir.path());
        let path = rule.locate("LoadConstantState").unwrap().unwrap();
        assert!(path.ends_with("states/10-LoadConstant.toml"));
    }

    #[test]
    fn changing_environment_changes_the_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let states = dir.path().join("states");
        fs::create_dir_all(states.join("test")).unwrap();
        fs::create_dir_all(states.join("prod")).unwrap();
        fs::write(states.join("test").join("1-Boot.toml"), "test\n").unwrap();
        fs::write(states.join("prod").join("1-Boot.toml"), "prod\n").unwrap();

        let rule = rule_in(dir.path());
        let first = rule.locate("BootState").unwrap().unwrap();
        assert!(first.ends_with("states/test/1-Boot.toml"));

        rule.params().context().within("prod");
        let second = rule.locate("BootState").unwrap().unwrap();
        assert!(second.ends_with("states/prod/1-Boot.toml"));
    }

    #[test]
    fn unknown_kind_directory_resolves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let rule = rule_in(dir.path());
        assert!(rule.locate("LoadConstantState").unwrap().is_none());
        assert!(rule.load("LoadConstantState").unwrap().is_none());
    }
}
