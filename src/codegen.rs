//! Codegen module for the Jinge template compiler
//!
//! Assembles the render function and the import blocks into the final
//! JavaScript module.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostic;
use crate::options::CompilerOptions;
use crate::render::RenderOutput;
use crate::tpl::{replace_tpl, EMPTY, ERROR, POSTFIX};

// ═══════════════════════════════════════════════════════════════════════════════
// OUTPUT TYPES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompileStatus {
    Ok,
    Empty,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledModule {
    /// Complete module; empty when `wrapCode` is off.
    pub code: String,
    pub render_fn: String,
    /// `name as name<postfix>` specifiers imported from the runtime module.
    pub global_imports: Vec<String>,
    pub alias_imports: String,
    pub local_imports: String,
    pub status: CompileStatus,
    pub diagnostics: Vec<Diagnostic>,
}

impl CompiledModule {
    pub fn is_ok(&self) -> bool {
        self.status == CompileStatus::Ok
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ASSEMBLY
// ═══════════════════════════════════════════════════════════════════════════════

/// Runtime symbols referenced by `render_fn`, deduplicated in first-use order.
pub fn collect_runtime_imports(render_fn: &str, symbol_postfix: &str) -> Vec<String> {
    let pattern = format!(r"([\w$][\w\d$]+){}\b", regex::escape(symbol_postfix));
    let Ok(re) = Regex::new(&pattern) else {
        return Vec::new();
    };
    let mut names: Vec<&str> = Vec::new();
    for caps in re.captures_iter(render_fn) {
        if let Some(m) = caps.get(1) {
            if !names.contains(&m.as_str()) {
                names.push(m.as_str());
            }
        }
    }
    names
        .into_iter()
        .map(|n| format!("{} as {}{}", n, n, symbol_postfix))
        .collect()
}

fn with_postfix(code: &str, options: &CompilerOptions) -> String {
    replace_tpl(code, &[(&POSTFIX[1..POSTFIX.len() - 1], &options.symbol_postfix)])
}

fn module_code(
    render_fn: &str,
    imports: &[String],
    alias_imports: &str,
    local_imports: &str,
    options: &CompilerOptions,
) -> String {
    if !options.wrap_code {
        return String::new();
    }
    let mut parts = vec![format!(
        "import {{ {} }} from '{}';",
        imports.join(", "),
        options.runtime_module
    )];
    for block in [alias_imports, local_imports] {
        if !block.is_empty() {
            parts.push(block.to_string());
        }
    }
    parts.push(format!("export default {};", render_fn));
    parts.join("\n")
}

pub fn assemble(output: &RenderOutput, options: &CompilerOptions) -> CompiledModule {
    let render_fn = with_postfix(&output.render_fn, options);
    let global_imports = collect_runtime_imports(&render_fn, &options.symbol_postfix);
    let code = module_code(
        &render_fn,
        &global_imports,
        &output.alias_imports,
        &output.imports,
        options,
    );
    CompiledModule {
        code,
        render_fn,
        global_imports,
        alias_imports: output.alias_imports.clone(),
        local_imports: output.imports.clone(),
        status: CompileStatus::Ok,
        diagnostics: Vec::new(),
    }
}

fn stub_module(stub: &str, status: CompileStatus, header: &str, options: &CompilerOptions) -> CompiledModule {
    let render_fn = with_postfix(stub, options);
    let global_imports = collect_runtime_imports(&render_fn, &options.symbol_postfix);
    let mut code = module_code(&render_fn, &global_imports, "", "", options);
    if !code.is_empty() && !header.is_empty() {
        code = format!("{}\n{}", header, code);
    }
    CompiledModule {
        code,
        render_fn,
        global_imports,
        alias_imports: String::new(),
        local_imports: String::new(),
        status,
        diagnostics: Vec::new(),
    }
}

/// Module of a blank template.
pub fn empty_module(options: &CompilerOptions) -> CompiledModule {
    stub_module(EMPTY, CompileStatus::Empty, "", options)
}

/// Module standing in for a template that failed to compile; `message`
/// is kept as a leading comment block.
pub fn error_module(message: &str, options: &CompilerOptions) -> CompiledModule {
    let header = message
        .lines()
        .map(|l| format!("// {}", l).trim_end().to_string())
        .collect::<Vec<_>>()
        .join("\n");
    stub_module(ERROR, CompileStatus::Error, &header, options)
}

/// Module of a component class file: `code` is the rewritten source.
pub fn source_module(code: String, status: CompileStatus) -> CompiledModule {
    CompiledModule {
        code,
        render_fn: String::new(),
        global_imports: Vec::new(),
        alias_imports: String::new(),
        local_imports: String::new(),
        status,
        diagnostics: Vec::new(),
    }
}
