//! # Jinge Template Compiler
//!
//! Compiles jinge HTML-like templates into JavaScript render functions and
//! rewrites component class constructors for the reactive view-model runtime.
//!
//! ## Pipeline
//!
//! 1. **Parse**: `parse_template` turns markup into `TemplateNode`s.
//! 2. **Render**: `RenderVisitor` walks the tree, classifying attributes and
//!    compiling every `${...}` expression into constant code or reactive
//!    watch/update code.
//! 3. **Assemble**: `codegen::assemble` substitutes the symbol postfix and
//!    builds the runtime, alias and comment import blocks.
//!
//! ## Output Invariants
//!
//! 1. Every runtime symbol referenced by a render function is imported exactly
//!    once, under its postfixed local name.
//! 2. A reactive expression watches each distinct path once and unwatches
//!    everything it watched when its owning component is destroyed.
//! 3. A constant expression compiles to the same code wherever it appears.
//! 4. A failing template still yields a module: an `errorRenderFn` stub with
//!    the diagnostic as a leading comment.

#[cfg(feature = "napi")]
use napi_derive::napi;

mod alias;
mod attributes;
mod cache;
mod class_rewrite;
mod codegen;
mod compile;
mod component;
mod diagnostics;
mod discovery;
mod edits;
mod element;
mod expression;
mod listener;
mod member;
mod options;
mod parse;
mod render;
mod scope;
mod tags;
mod tpl;
mod validate;
mod visitor;

#[cfg(test)]
mod component_tests;
#[cfg(test)]
mod expression_tests;

pub use alias::{AliasConflictPolicy, AliasRegistry};
pub use cache::IncrementalCache;
pub use class_rewrite::{rewrite_component, ClassRewrite};
pub use codegen::{CompileStatus, CompiledModule};
pub use compile::{SourceFile, SourceKind, TemplateCompiler};
pub use diagnostics::{CollectingSink, Diagnostic, DiagnosticSink, Severity, TracingSink};
pub use discovery::{compile_dir, find_sources, FileOutput};
pub use edits::{apply_edits, apply_edits_within, Edit, EditConflict};
pub use expression::CompiledExpr;
pub use options::{ComponentAliasOption, CompilerOptions, ConfigError};
pub use parse::{decode_entities, parse_template};
pub use render::{RenderOutput, RenderVisitor};
pub use validate::*;
pub use visitor::TemplateVisitor;

#[cfg(feature = "napi")]
pub use compile::{compile_template_native, rewrite_component_native};
#[cfg(feature = "napi")]
pub use discovery::compile_dir_native;
#[cfg(feature = "napi")]
pub use parse::parse_template_native;

/// Installs the stderr log subscriber once; filtered by `JINGE_LOG`
/// (default `warn`).
#[cfg(feature = "napi")]
pub(crate) fn init_tracing() {
    use std::sync::Once;
    use tracing_subscriber::EnvFilter;

    static TRACING_INIT: Once = Once::new();
    TRACING_INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_env("JINGE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .try_init();
    });
}

#[cfg(feature = "napi")]
#[napi]
pub fn compile_bridge() -> String {
    "Jinge Native Bridge Connected".to_string()
}
