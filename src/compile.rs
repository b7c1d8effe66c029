//! Per-file compiler entry points.
//!
//! A `TemplateCompiler` owns everything shared between files (options, the
//! alias registry, the cache); every compile builds its own visitor, so
//! batches run in parallel without locking anything but the cache.

#[cfg(feature = "napi")]
use lazy_static::lazy_static;
#[cfg(feature = "napi")]
use napi_derive::napi;
#[cfg(feature = "napi")]
use parking_lot::Mutex;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
#[cfg(feature = "napi")]
use std::collections::HashMap;
use std::path::Path;
#[cfg(feature = "napi")]
use std::sync::Arc;

use crate::alias::AliasRegistry;
use crate::cache::IncrementalCache;
use crate::class_rewrite;
use crate::codegen::{
    assemble, empty_module, error_module, source_module, CompileStatus, CompiledModule,
};
#[cfg(feature = "napi")]
use crate::diagnostics::TracingSink;
use crate::diagnostics::{emit, Diagnostic, DiagnosticSink, Severity};
use crate::options::{CompilerOptions, ConfigError};
use crate::parse::parse_template;
use crate::render::{RenderOutput, RenderVisitor};
use crate::validate::CompilerError;

// ═══════════════════════════════════════════════════════════════════════════════
// SOURCE FILES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceKind {
    /// `*.html`
    Template,
    /// `*.c.js` / `*.c.ts`
    ComponentClass,
}

impl SourceKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        if name.ends_with(".html") {
            Some(SourceKind::Template)
        } else if name.ends_with(".c.js") || name.ends_with(".c.ts") {
            Some(SourceKind::ComponentClass)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFile {
    pub path: String,
    pub source: String,
    pub kind: SourceKind,
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILER
// ═══════════════════════════════════════════════════════════════════════════════

pub struct TemplateCompiler {
    options: CompilerOptions,
    aliases: AliasRegistry,
    import_postfix: String,
    cache: IncrementalCache,
}

impl TemplateCompiler {
    pub fn new(options: CompilerOptions) -> Result<Self, ConfigError> {
        options.validate()?;
        let aliases = AliasRegistry::from_options(&options)?;
        let import_postfix = options.import_postfix();
        tracing::debug!(
            runtime = %options.runtime_module,
            aliases = aliases.len(),
            "template compiler initialized"
        );
        Ok(Self {
            options,
            aliases,
            import_postfix,
            cache: IncrementalCache::new(),
        })
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn cache(&self) -> &IncrementalCache {
        &self.cache
    }

    /// Parses and renders a template without assembling the module.
    pub fn render(&self, source: &str) -> Result<RenderOutput, CompilerError> {
        let nodes = parse_template(source)?;
        RenderVisitor::new(&self.aliases, &self.import_postfix, self.options.add_debug_name)
            .visit_template(&nodes)
    }

    /// Compiles one template. Failures become an error stub plus an error
    /// diagnostic; this never returns without a module.
    #[tracing::instrument(level = "debug", skip_all, fields(file = resource_path))]
    pub fn compile(
        &self,
        source: &str,
        resource_path: &str,
        sink: &mut dyn DiagnosticSink,
    ) -> CompiledModule {
        if let Some(hit) = self.cache.get(resource_path, source) {
            hit.diagnostics.iter().for_each(|d| emit(sink, d));
            return hit;
        }
        let module = self.compile_template(source, resource_path);
        module.diagnostics.iter().for_each(|d| emit(sink, d));
        self.cache.set(resource_path, source, module.clone());
        module
    }

    fn compile_template(&self, source: &str, resource_path: &str) -> CompiledModule {
        if source.trim().is_empty() {
            return empty_module(&self.options);
        }
        let base_line = self.options.base_line_position;
        match self.render(source) {
            Ok(output) => {
                let mut module = assemble(&output, &self.options);
                module.diagnostics = output
                    .warnings
                    .iter()
                    .map(|w| diagnostic(Severity::Warning, w, resource_path, source, base_line))
                    .collect();
                module
            }
            Err(err) => {
                let diag = diagnostic(Severity::Error, &err, resource_path, source, base_line);
                let mut module = error_module(&diag.render(), &self.options);
                module.diagnostics.push(diag);
                module
            }
        }
    }

    /// Rewrites the component classes of a `*.c.js`/`*.c.ts` module. On error
    /// the source is returned unchanged.
    #[tracing::instrument(level = "debug", skip_all, fields(file = resource_path))]
    pub fn rewrite_component(
        &self,
        source: &str,
        resource_path: &str,
        sink: &mut dyn DiagnosticSink,
    ) -> CompiledModule {
        let module = match class_rewrite::rewrite_component(source, resource_path, &self.options) {
            Ok(out) => {
                let mut module = source_module(out.code, CompileStatus::Ok);
                module.diagnostics = out
                    .warnings
                    .iter()
                    .map(|w| diagnostic(Severity::Warning, w, resource_path, source, 1))
                    .collect();
                module
            }
            Err(err) => {
                let mut module = source_module(source.to_string(), CompileStatus::Error);
                module
                    .diagnostics
                    .push(diagnostic(Severity::Error, &err, resource_path, source, 1));
                module
            }
        };
        module.diagnostics.iter().for_each(|d| emit(sink, d));
        module
    }

    pub fn compile_file(&self, file: &SourceFile, sink: &mut dyn DiagnosticSink) -> CompiledModule {
        match file.kind {
            SourceKind::Template => self.compile(&file.source, &file.path, sink),
            SourceKind::ComponentClass => self.rewrite_component(&file.source, &file.path, sink),
        }
    }

    /// Compiles `files` in parallel; results keep the input order.
    pub fn compile_many(&self, files: &[SourceFile]) -> Vec<CompiledModule> {
        tracing::debug!(files = files.len(), "compiling batch");
        files
            .par_iter()
            .map(|file| {
                let mut sink = crate::diagnostics::CollectingSink::new();
                let module = self.compile_file(file, &mut sink);
                tracing::trace!(
                    file = %file.path,
                    diagnostics = sink.diagnostics.len(),
                    "file compiled"
                );
                module
            })
            .collect()
    }
}

fn diagnostic(
    severity: Severity,
    err: &CompilerError,
    resource_path: &str,
    source: &str,
    base_line: u32,
) -> Diagnostic {
    let mut err = err.clone();
    err.file = resource_path.to_string();
    Diagnostic::from_error(severity, &err, source, base_line)
}

// ═══════════════════════════════════════════════════════════════════════════════
// NODE BRIDGE
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(feature = "napi")]
lazy_static! {
    static ref COMPILERS: Mutex<HashMap<String, Arc<TemplateCompiler>>> =
        Mutex::new(HashMap::new());
}

/// One compiler per distinct options string, kept for the process lifetime.
#[cfg(feature = "napi")]
fn shared_compiler(options_json: Option<String>) -> napi::Result<Arc<TemplateCompiler>> {
    crate::init_tracing();
    let key = options_json.unwrap_or_default();
    let mut compilers = COMPILERS.lock();
    if let Some(compiler) = compilers.get(&key) {
        return Ok(compiler.clone());
    }
    let compiler = CompilerOptions::from_json(&key)
        .and_then(TemplateCompiler::new)
        .map_err(|e| napi::Error::from_reason(format!("[jinge] {}", e)))?;
    let compiler = Arc::new(compiler);
    compilers.insert(key, compiler.clone());
    Ok(compiler)
}

#[cfg(feature = "napi")]
fn to_json(module: &CompiledModule) -> napi::Result<serde_json::Value> {
    serde_json::to_value(module)
        .map_err(|e| napi::Error::from_reason(format!("Failed to serialize module: {}", e)))
}

#[cfg(feature = "napi")]
#[napi]
pub fn compile_template_native(
    source: String,
    resource_path: String,
    options_json: Option<String>,
) -> napi::Result<serde_json::Value> {
    let compiler = shared_compiler(options_json)?;
    to_json(&compiler.compile(&source, &resource_path, &mut TracingSink))
}

#[cfg(feature = "napi")]
#[napi]
pub fn rewrite_component_native(
    source: String,
    resource_path: String,
    options_json: Option<String>,
) -> napi::Result<serde_json::Value> {
    let compiler = shared_compiler(options_json)?;
    to_json(&compiler.rewrite_component(&source, &resource_path, &mut TracingSink))
}
