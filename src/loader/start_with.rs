//! Rule for entities whose names start with a fixed token.
//!
//! Entity names are the filter token followed by CamelCase words:
//! a short name (the file name), a package (the category directory) and
//! optionally a kind (abstracts, interfaces...; the default kind
//! otherwise). Whether a trailing word names a kind is decided by probing
//! for a matching directory under the base directory.

use std::path::PathBuf;

use regex::Regex;

use super::params::RuleParams;
use super::rule::{EntityParts, Rule, RuleDefaults};
use super::LoaderError;

/// Resolves `wvnPackageName`-style entities to `base_dir/kind/pack/Name`.
#[derive(Debug)]
pub struct StartWith {
    params: RuleParams,
}

impl StartWith {
    pub const KIND: &'static str = "start_with";

    pub(crate) const DEFAULTS: RuleDefaults = RuleDefaults {
        filter: "wvn",
        default_kind: "lib",
        extension: "toml",
    };

    pub fn new(params: RuleParams) -> Self {
        Self { params }
    }

    /// Compiles the name pattern for the configured start token.
    ///
    /// Compilation happens per uncached `filter` call; the filter cache is
    /// what amortizes it.
    fn pattern(&self) -> Result<Regex, LoaderError> {
        let pattern = format!(
            "^{}([A-Z][a-z_]+)?((?:[A-Z][a-z_]+)+)?([A-Z][a-z_]+)$",
            regex::escape(self.params.filter())
        );
        Regex::new(&pattern).map_err(|source| LoaderError::InvalidFilter { pattern, source })
    }

    /// Whether a trailing word names a kind directory under the base dir.
    fn kind_dir_exists(&self, word: &str) -> bool {
        self.params.base_dir().join(word).is_dir()
    }
}

impl Rule for StartWith {
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
        let first = caps.get(1).map(|m| m.as_str());
        let middle = caps.get(2).map(|m| m.as_str());
        let last = match caps.get(3) {
            Some(m) => m.as_str(),
            None => return Ok(None),
        };

        let parts = match (first, middle) {
            // One word: default kind, the word is both name and package.
            (None, _) => EntityParts {
                name: last.to_owned(),
                pack: Some(last.to_lowercase()),
                kind: self.params.default_kind().to_owned(),
            },
            // Two words: the trailing word is a kind if its directory
            // exists, otherwise it is the name.
            (Some(first), None) => {
                let candidate = format!("{}s", last.to_lowercase());
                if self.kind_dir_exists(&candidate) {
                    EntityParts {
                        name: first.to_owned(),
                        pack: Some(first.to_lowercase()),
                        kind: candidate,
                    }
                } else {
                    EntityParts {
                        name: last.to_owned(),
                        pack: Some(first.to_lowercase()),
                        kind: self.params.default_kind().to_owned(),
                    }
                }
            }
            // Three or more words: same probe, the middle words carry the
            // name either way.
            (Some(first), Some(middle)) => {
                let candidate = format!("{}s", last.to_lowercase());
                if self.kind_dir_exists(&candidate) {
                    EntityParts {
                        name: middle.to_owned(),
                        pack: Some(first.to_lowercase()),
                        kind: candidate,
                    }
                } else {
                    EntityParts {
                        name: format!("{middle}{last}"),
                        pack: Some(first.to_lowercase()),
                        kind: self.params.default_kind().to_owned(),
                    }
                }
            }
        };
        Ok(Some(parts))
    }

    fn where_is(&self, entity: &str) -> Result<Option<PathBuf>, LoaderError> {
        let Some(parts) = self.parts(entity)? else {
            return Ok(None);
        };
        let mut path = self.params.base_dir().join(&parts.kind);
        if let Some(pack) = &parts.pack {
            path.push(pack);
        }
        path.push(format!("{}.{}", parts.name, self.params.extension()));
        if path.is_file() {
            Ok(Some(std::fs::canonicalize(&path).unwrap_or(path)))
        } else {
            Ok(None)
        }
    }
}
