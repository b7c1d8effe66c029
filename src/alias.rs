//! Component alias registry.
//!
//! Maps short tag names (`if`, `for`, `x-button`) to component exports and
//! records, per compiled file, which import statements the resolved tags need.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::options::{short_hash, CompilerOptions, ConfigError};

/// `{ "source module": { "ExportedName": "alias" | ["alias", ...] } }`
pub type AliasConfig = BTreeMap<String, BTreeMap<String, AliasNames>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AliasNames {
    One(String),
    Many(Vec<String>),
}

impl AliasNames {
    pub fn names(&self) -> Vec<&str> {
        match self {
            AliasNames::One(s) => vec![s.as_str()],
            AliasNames::Many(v) => v.iter().map(|s| s.as_str()).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AliasConflictPolicy {
    /// Binding one alias to two different targets is a configuration error.
    #[default]
    Reject,
    /// The later binding replaces the earlier one.
    Overwrite,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasTarget {
    pub exported: String,
    pub source: String,
    pub local: String,
}

#[derive(Debug, Clone, Default)]
pub struct AliasRegistry {
    aliases: HashMap<String, AliasTarget>,
}

/// Framework control-flow components available without configuration.
pub fn builtin_aliases(runtime_module: &str) -> AliasConfig {
    let mut exports = BTreeMap::new();
    for (exported, alias) in [
        ("LogComponent", "log"),
        ("IfComponent", "if"),
        ("ForComponent", "for"),
        ("SwitchComponent", "switch"),
        ("HideComponent", "hide"),
        ("BindHtmlComponent", "bind-html"),
        ("ToggleClassComponent", "toggle-class"),
        ("DynamicRenderComponent", "dynamic"),
        ("TransitionComponent", "transition"),
    ] {
        exports.insert(exported.to_string(), AliasNames::One(alias.to_string()));
    }
    let mut config = AliasConfig::new();
    config.insert(runtime_module.to_string(), exports);
    config
}

/// Shallow merge: for a source present in both, exports of `src` replace
/// those of `dst` one by one.
pub fn merge_alias(dst: &mut AliasConfig, src: &AliasConfig) {
    for (source, exports) in src {
        let entry = dst.entry(source.clone()).or_default();
        for (exported, names) in exports {
            entry.insert(exported.clone(), names.clone());
        }
    }
}

impl AliasRegistry {
    pub fn from_options(options: &CompilerOptions) -> Result<Self, ConfigError> {
        let mut merged = builtin_aliases(&options.runtime_module);
        if let Some(user) = &options.component_alias {
            for config in user.configs() {
                merge_alias(&mut merged, config);
            }
        }
        Self::build(&merged, &options.alias_postfix(), options.alias_conflict)
    }

    pub fn build(
        config: &AliasConfig,
        alias_postfix: &str,
        policy: AliasConflictPolicy,
    ) -> Result<Self, ConfigError> {
        let mut registry = AliasRegistry::default();
        for (source, exports) in config {
            if source.starts_with('.') {
                return Err(ConfigError::RelativeAliasSource(source.clone()));
            }
            let source_hash = short_hash(source);
            for (i, (exported, names)) in exports.iter().enumerate() {
                let base = if exported == "default" {
                    format!("Component_default_{}", i)
                } else {
                    exported.clone()
                };
                let target = AliasTarget {
                    exported: exported.clone(),
                    source: source.clone(),
                    local: format!("{}_{}{}", base, source_hash, alias_postfix),
                };
                for alias in names.names() {
                    registry.register(alias, target.clone(), policy)?;
                }
            }
        }
        tracing::debug!(count = registry.aliases.len(), "component aliases registered");
        Ok(registry)
    }

    fn register(
        &mut self,
        alias: &str,
        target: AliasTarget,
        policy: AliasConflictPolicy,
    ) -> Result<(), ConfigError> {
        if alias.is_empty() || alias.chars().any(|c| c.is_whitespace() || c == '<' || c == '>') {
            return Err(ConfigError::BadAliasFormat(format!(
                "alias '{}' of {} is not a valid tag name",
                alias, target.exported
            )));
        }
        if let Some(existing) = self.aliases.get(alias) {
            let same = existing.source == target.source && existing.exported == target.exported;
            if !same && policy == AliasConflictPolicy::Reject {
                return Err(ConfigError::DuplicateAlias {
                    alias: alias.to_string(),
                    first: format!("{}#{}", existing.source, existing.exported),
                    second: format!("{}#{}", target.source, target.exported),
                });
            }
        }
        self.aliases.insert(alias.to_string(), target);
        Ok(())
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.aliases.contains_key(tag)
    }

    pub fn target(&self, tag: &str) -> Option<&AliasTarget> {
        self.aliases.get(tag)
    }

    /// Resolves `tag` to its local identifier and records the import it needs.
    pub fn resolve(&self, tag: &str, imports: &mut AliasImports) -> Option<String> {
        let target = self.aliases.get(tag)?;
        imports.record(&target.source, &target.exported, &target.local);
        Some(target.local.clone())
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

/// Imports required by the aliases one file used, in first-use order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasImports {
    entries: Vec<(String, Vec<(String, String)>)>,
}

impl AliasImports {
    pub fn record(&mut self, source: &str, exported: &str, local: &str) {
        let idx = match self.entries.iter().position(|(s, _)| s == source) {
            Some(i) => i,
            None => {
                self.entries.push((source.to_string(), Vec::new()));
                self.entries.len() - 1
            }
        };
        let specs = &mut self.entries[idx].1;
        if !specs.iter().any(|(e, _)| e == exported) {
            specs.push((exported.to_string(), local.to_string()));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get_code(&self) -> String {
        self.entries
            .iter()
            .map(|(source, specs)| {
                let list = specs
                    .iter()
                    .map(|(e, l)| format!("{} as {}", e, l))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("import {{ {} }} from '{}';", list, source)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(json: &str) -> AliasConfig {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_builtins_resolve_and_record_import() {
        let registry = AliasRegistry::from_options(&CompilerOptions::default()).unwrap();
        let mut imports = AliasImports::default();
        let local = registry.resolve("if", &mut imports).unwrap();
        assert!(local.starts_with("IfComponent_"));
        registry.resolve("for", &mut imports).unwrap();
        registry.resolve("if", &mut imports).unwrap();
        let code = imports.get_code();
        assert_eq!(code.matches("import {").count(), 1);
        assert!(code.contains("IfComponent as IfComponent_"));
        assert!(code.contains("ForComponent as ForComponent_"));
        assert!(code.ends_with("from 'jinge';"));
        assert_eq!(code.matches("IfComponent as").count(), 1);
    }

    #[test]
    fn test_unknown_tag_is_not_resolved() {
        let registry = AliasRegistry::from_options(&CompilerOptions::default()).unwrap();
        let mut imports = AliasImports::default();
        assert!(registry.resolve("div", &mut imports).is_none());
        assert!(imports.is_empty());
    }

    #[test]
    fn test_local_names_are_deterministic() {
        let cfg = config(r#"{"@ui/kit":{"default":"x-card","Button":["btn","x-button"]}}"#);
        let a = AliasRegistry::build(&cfg, "_p", AliasConflictPolicy::Reject).unwrap();
        let b = AliasRegistry::build(&cfg, "_p", AliasConflictPolicy::Reject).unwrap();
        assert_eq!(a.target("btn"), b.target("btn"));
        assert_eq!(a.target("btn"), a.target("x-button"));
        let card = a.target("x-card").unwrap();
        assert!(card.local.starts_with("Component_default_"));
        assert!(card.local.ends_with("_p"));
    }

    #[test]
    fn test_duplicate_alias_policy() {
        let cfg = config(r#"{"@a/one":{"A":"dup"},"@b/two":{"B":"dup"}}"#);
        let err = AliasRegistry::build(&cfg, "", AliasConflictPolicy::Reject).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateAlias { ref alias, .. } if alias == "dup"));

        let reg = AliasRegistry::build(&cfg, "", AliasConflictPolicy::Overwrite).unwrap();
        assert_eq!(reg.target("dup").unwrap().source, "@b/two");
    }

    #[test]
    fn test_relative_source_rejected() {
        let cfg = config(r#"{"./local":{"A":"a-tag"}}"#);
        assert!(matches!(
            AliasRegistry::build(&cfg, "", AliasConflictPolicy::Reject),
            Err(ConfigError::RelativeAliasSource(_))
        ));
    }

    #[test]
    fn test_user_config_overrides_builtin_export() {
        let mut merged = builtin_aliases("jinge");
        merge_alias(&mut merged, &config(r#"{"jinge":{"IfComponent":"when"}}"#));
        let reg = AliasRegistry::build(&merged, "", AliasConflictPolicy::Reject).unwrap();
        assert!(reg.contains("when"));
        assert!(!reg.contains("if"));
        assert!(reg.contains("for"));
    }
}
