//! Source kinds and per-kind import scanning.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    Argument, CallExpression, ExportAllDeclaration, ExportNamedDeclaration, Expression,
    ImportDeclaration, ImportExpression,
};
use oxc_ast_visit::{Visit, walk};
use oxc_parser::Parser;
use oxc_span::SourceType as OxcSourceType;
use regex::Regex;
use tracing::warn;

use crate::identifier::Identifier;

/// `@import`, `@use` and `@forward` targets in stylesheets.
static STYLESHEET_IMPORT: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#"@(?:import|use|forward)\s+(?:url\(\s*)?['"]?([^'"\)\s;]+)['"]?"#).ok()
});

/// Closed set of module kinds the graph understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Js,
    Ts,
    Css,
    Less,
    Sass,
    Json,
    Coffee,
    Wasm,
    /// Empty module standing in for something that could not be located.
    Stub,
    /// Referenced by URL, never fetched at build time.
    External,
}

/// Output format a module contributes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Js,
    Css,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Js => "js",
            Self::Css => "css",
        }
    }
}

/// Import specifiers found in one module, in source order, deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedImports {
    pub static_imports: Vec<String>,
    pub dynamic_imports: Vec<String>,
}

impl SourceKind {
    /// Extensions tried, in order, when an import omits one.
    pub const RESOLVE_EXTENSIONS: &'static [&'static str] = &[
        "js", "ts", "json", "css", "less", "scss", "sass", "coffee", "wasm",
    ];

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "js" | "mjs" | "cjs" | "jsx" => Some(Self::Js),
            "ts" | "mts" | "cts" | "tsx" => Some(Self::Ts),
            "css" => Some(Self::Css),
            "less" => Some(Self::Less),
            "scss" | "sass" => Some(Self::Sass),
            "json" => Some(Self::Json),
            "coffee" => Some(Self::Coffee),
            "wasm" => Some(Self::Wasm),
            _ => None,
        }
    }

    /// Infer the kind from a file path. Unknown extensions become stubs.
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
            .unwrap_or(Self::Stub)
    }

    pub fn is_stylesheet(self) -> bool {
        matches!(self, Self::Css | Self::Less | Self::Sass)
    }

    /// Stubs and externals carry no source to transpile.
    pub fn is_transpilable(self) -> bool {
        !matches!(self, Self::Stub | Self::External)
    }

    pub fn output_format(self) -> OutputFormat {
        if self.is_stylesheet() {
            OutputFormat::Css
        } else {
            OutputFormat::Js
        }
    }

    /// Scan `source` for the imports relevant to this kind.
    pub fn parse_imports(self, path: &Path, source: &str) -> ParsedImports {
        match self {
            Self::Js | Self::Ts => scan_script(self, path, source),
            Self::Css | Self::Less | Self::Sass => scan_stylesheet(source),
            _ => ParsedImports::default(),
        }
    }
}

fn scan_script(kind: SourceKind, path: &Path, source: &str) -> ParsedImports {
    let source_type = match kind {
        SourceKind::Ts => OxcSourceType::from_path(path).unwrap_or_else(|_| OxcSourceType::ts()),
        _ => OxcSourceType::from_path(path).unwrap_or_else(|_| OxcSourceType::mjs()),
    };

    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, source_type).parse();
    if !ret.errors.is_empty() {
        // The recovered AST is still scanned; the transpiler reports real failures.
        warn!(path = %path.display(), errors = ret.errors.len(), "parse errors while scanning imports");
    }

    let mut collector = ImportCollector::default();
    collector.visit_program(&ret.program);
    collector.imports
}

#[derive(Default)]
struct ImportCollector {
    imports: ParsedImports,
}

impl ImportCollector {
    fn push_static(&mut self, specifier: &str) {
        if !self.imports.static_imports.iter().any(|s| s == specifier) {
            self.imports.static_imports.push(specifier.to_string());
        }
    }

    fn push_dynamic(&mut self, specifier: &str) {
        if !self.imports.dynamic_imports.iter().any(|s| s == specifier) {
            self.imports.dynamic_imports.push(specifier.to_string());
        }
    }
}

fn first_string_argument<'b>(call: &'b CallExpression<'_>) -> Option<&'b str> {
    match call.arguments.first()? {
        Argument::StringLiteral(lit) if call.arguments.len() == 1 => Some(lit.value.as_str()),
        _ => None,
    }
}

impl<'a> Visit<'a> for ImportCollector {
    fn visit_import_declaration(&mut self, decl: &ImportDeclaration<'a>) {
        if !decl.import_kind.is_type() {
            self.push_static(decl.source.value.as_str());
        }
    }

    fn visit_export_named_declaration(&mut self, decl: &ExportNamedDeclaration<'a>) {
        if let Some(source) = &decl.source
            && !decl.export_kind.is_type()
        {
            self.push_static(source.value.as_str());
        }
        walk::walk_export_named_declaration(self, decl);
    }

    fn visit_export_all_declaration(&mut self, decl: &ExportAllDeclaration<'a>) {
        if !decl.export_kind.is_type() {
            self.push_static(decl.source.value.as_str());
        }
    }

    fn visit_import_expression(&mut self, expr: &ImportExpression<'a>) {
        if let Expression::StringLiteral(lit) = &expr.source {
            self.push_dynamic(lit.value.as_str());
        }
        walk::walk_import_expression(self, expr);
    }

    fn visit_call_expression(&mut self, call: &CallExpression<'a>) {
        match &call.callee {
            // require('x')
            Expression::Identifier(ident) if ident.name == "require" => {
                if let Some(specifier) = first_string_argument(call) {
                    self.push_static(specifier);
                }
            }
            // require.async('x')
            Expression::StaticMemberExpression(member)
                if member.property.name == "async"
                    && matches!(&member.object, Expression::Identifier(obj) if obj.name == "require") =>
            {
                if let Some(specifier) = first_string_argument(call) {
                    self.push_dynamic(specifier);
                }
            }
            _ => {}
        }
        walk::walk_call_expression(self, call);
    }
}

fn scan_stylesheet(source: &str) -> ParsedImports {
    let mut imports = ParsedImports::default();
    let Some(pattern) = STYLESHEET_IMPORT.as_ref() else {
        return imports;
    };
    for caps in pattern.captures_iter(source) {
        let Some(target) = caps.get(1).map(|m| m.as_str()) else {
            continue;
        };
        let specifier = stylesheet_specifier(target);
        if !imports.static_imports.contains(&specifier) {
            imports.static_imports.push(specifier);
        }
    }
    imports
}

/// Stylesheet imports are relative unless prefixed with `~` (package) or a URL.
fn stylesheet_specifier(target: &str) -> String {
    if let Some(package) = target.strip_prefix('~') {
        package.to_string()
    } else if Identifier::is_relative(target) || Identifier::is_url(target) {
        target.to_string()
    } else {
        format!("./{target}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(name: &str, source: &str) -> ParsedImports {
        let path = Path::new(name);
        SourceKind::from_path(path).parse_imports(path, source)
    }

    #[test]
    fn test_kind_from_path() {
        assert_eq!(SourceKind::from_path(Path::new("a.mjs")), SourceKind::Js);
        assert_eq!(SourceKind::from_path(Path::new("a.tsx")), SourceKind::Ts);
        assert_eq!(SourceKind::from_path(Path::new("a.scss")), SourceKind::Sass);
        assert_eq!(SourceKind::from_path(Path::new("logo.png")), SourceKind::Stub);
        assert_eq!(SourceKind::Less.output_format(), OutputFormat::Css);
    }

    #[test]
    fn test_scan_esm_and_commonjs() {
        let imports = scan(
            "a.js",
            r#"
            import React from 'react';
            import './side-effect.js';
            export { x } from './x';
            export * from './all';
            const util = require('./util');
            const lazy = import('./lazy.js');
            require.async('./later');
            require('react');
            "#,
        );
        assert_eq!(
            imports.static_imports,
            vec!["react", "./side-effect.js", "./x", "./all", "./util"]
        );
        assert_eq!(imports.dynamic_imports, vec!["./lazy.js", "./later"]);
    }

    #[test]
    fn test_scan_skips_type_only_and_computed() {
        let imports = scan(
            "a.ts",
            r#"
            import type { Props } from './types';
            export type { Other } from './other';
            import { real } from './real';
            const name = 'x';
            require(name);
            import(name);
            "#,
        );
        assert_eq!(imports.static_imports, vec!["./real"]);
        assert!(imports.dynamic_imports.is_empty());
    }

    #[test]
    fn test_scan_nested_require() {
        let imports = scan(
            "a.js",
            "export const load = () => { return require('./inner'); };",
        );
        assert_eq!(imports.static_imports, vec!["./inner"]);
    }

    #[test]
    fn test_scan_stylesheet() {
        let imports = scan(
            "a.css",
            r#"
            @import "base.css";
            @import url('./theme.css');
            @import '~normalize.css/normalize.css';
            @import url(https://fonts.example.com/x.css);
            "#,
        );
        assert_eq!(
            imports.static_imports,
            vec![
                "./base.css",
                "./theme.css",
                "normalize.css/normalize.css",
                "https://fonts.example.com/x.css"
            ]
        );
    }

    #[test]
    fn test_other_kinds_have_no_imports() {
        assert_eq!(scan("a.json", r#"{"require":"x"}"#), ParsedImports::default());
    }
}
