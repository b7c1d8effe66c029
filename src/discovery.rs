//! Source discovery: finds the templates and component classes under a
//! directory and compiles them as one batch.

#[cfg(feature = "napi")]
use napi_derive::napi;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::codegen::CompiledModule;
use crate::compile::{SourceFile, SourceKind, TemplateCompiler};

// ═══════════════════════════════════════════════════════════════════════════════
// DISCOVERY
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileOutput {
    pub path: String,
    pub kind: SourceKind,
    pub module: CompiledModule,
}

/// Every compilable file under `dir`, sorted by path.
fn find_source_paths(dir: &Path) -> Vec<(PathBuf, SourceKind)> {
    let mut files: Vec<(PathBuf, SourceKind)> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let kind = SourceKind::from_path(entry.path())?;
            Some((entry.into_path(), kind))
        })
        .collect();
    files.sort_by(|a, b| a.0.cmp(&b.0));
    files
}

/// Reads every template and component class under `root`.
pub fn find_sources(root: &Path) -> io::Result<Vec<SourceFile>> {
    let paths = find_source_paths(root);
    tracing::debug!(root = %root.display(), files = paths.len(), "sources discovered");
    paths
        .into_iter()
        .map(|(path, kind)| {
            let source = fs::read_to_string(&path)?;
            Ok(SourceFile {
                path: path.to_string_lossy().to_string(),
                source,
                kind,
            })
        })
        .collect()
}

/// Discovers and compiles everything under `root`.
pub fn compile_dir(compiler: &TemplateCompiler, root: &Path) -> io::Result<Vec<FileOutput>> {
    let files = find_sources(root)?;
    let modules = compiler.compile_many(&files);
    Ok(files
        .into_par_iter()
        .zip(modules)
        .map(|(file, module)| FileOutput {
            path: file.path,
            kind: file.kind,
            module,
        })
        .collect())
}

#[cfg(feature = "napi")]
#[napi]
pub fn compile_dir_native(
    root: String,
    options_json: Option<String>,
) -> napi::Result<serde_json::Value> {
    crate::init_tracing();
    let options = crate::options::CompilerOptions::from_json(&options_json.unwrap_or_default())
        .map_err(|e| napi::Error::from_reason(format!("[jinge] {}", e)))?;
    let compiler = TemplateCompiler::new(options)
        .map_err(|e| napi::Error::from_reason(format!("[jinge] {}", e)))?;
    let outputs = compile_dir(&compiler, Path::new(&root))
        .map_err(|e| napi::Error::from_reason(format!("Failed to read {}: {}", root, e)))?;
    serde_json::to_value(outputs).map_err(|e| napi::Error::from_reason(e.to_string()))
}
