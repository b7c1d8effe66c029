//! Compiler configuration.
//!
//! Options are plain serde structs so the Node bridge and tests can build
//! them from JSON with camelCase keys.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

use crate::alias::{AliasConfig, AliasConflictPolicy};

pub const DEFAULT_SYMBOL_POSTFIX: &str = "792732ac12612c8319900402";
pub const DEFAULT_RUNTIME_MODULE: &str = "jinge";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("bad config format: {0}")]
    Json(#[from] serde_json::Error),
    #[error("bad alias format: {0}")]
    BadAliasFormat(String),
    #[error("component base source must be absolute path or package under node_modules, but got '{0}'")]
    RelativeAliasSource(String),
    #[error("duplicated component alias: {alias} (bound to {first} and {second})")]
    DuplicateAlias {
        alias: String,
        first: String,
        second: String,
    },
    #[error("bad symbolPostfix '{0}', only [0-9a-zA-Z_] is allowed")]
    BadSymbolPostfix(String),
}

/// One alias config or a list of them merged left to right.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ComponentAliasOption {
    Single(AliasConfig),
    List(Vec<AliasConfig>),
}

impl ComponentAliasOption {
    pub fn configs(&self) -> Vec<&AliasConfig> {
        match self {
            ComponentAliasOption::Single(c) => vec![c],
            ComponentAliasOption::List(list) => list.iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompilerOptions {
    pub symbol_postfix: String,
    pub runtime_module: String,
    pub component_alias: Option<ComponentAliasOption>,
    pub alias_conflict: AliasConflictPolicy,
    pub add_debug_name: bool,
    pub base_line_position: u32,
    pub wrap_code: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            symbol_postfix: DEFAULT_SYMBOL_POSTFIX.to_string(),
            runtime_module: DEFAULT_RUNTIME_MODULE.to_string(),
            component_alias: None,
            alias_conflict: AliasConflictPolicy::default(),
            add_debug_name: false,
            base_line_position: 1,
            wrap_code: true,
        }
    }
}

impl CompilerOptions {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        let options: CompilerOptions = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&data)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let ok = !self.symbol_postfix.is_empty()
            && self
                .symbol_postfix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !ok {
            return Err(ConfigError::BadSymbolPostfix(self.symbol_postfix.clone()));
        }
        Ok(())
    }

    /// Suffix of identifiers declared through comment imports.
    pub fn import_postfix(&self) -> String {
        format!("_{}", short_hash(&format!("import-postfix:{}", self.symbol_postfix)))
    }

    /// Suffix shared by every alias-resolved component identifier.
    pub fn alias_postfix(&self) -> String {
        format!(
            "_{}",
            short_hash(&format!("component-alias-postfix:{}", self.symbol_postfix))
        )
    }
}

/// First 12 hex digits of the SHA-256 of `input`.
pub fn short_hash(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..12].to_string()
}
