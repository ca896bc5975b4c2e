//! Transpiler capability and the built-in transpilers.
//!
//! The graph never inspects a transpiler beyond the salt inputs it reports
//! (`name`, `version`, `options`); everything else is an opaque
//! `source -> {code, map}` function.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use oxc_sourcemap::SourceMapBuilder;

use crate::source_kind::SourceKind;

/// Output of one transpile call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranspileOutput {
    pub code: String,
    /// Source map as JSON, if the transpiler produced one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map: Option<String>,
}

/// Pluggable transformation for one or more [`SourceKind`]s.
pub trait Transpiler: Send + Sync {
    fn name(&self) -> &str;

    fn version(&self) -> &str;

    /// Options that influence output. Part of the cache salt.
    fn options(&self) -> serde_json::Value {
        serde_json::Value::Null
    }

    fn transpile(
        &self,
        kind: SourceKind,
        path: &Path,
        source: &[u8],
    ) -> Result<TranspileOutput, String>;
}

/// Identity transform with a line-for-line source map.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughTranspiler;

impl Transpiler for PassthroughTranspiler {
    fn name(&self) -> &str {
        "passthrough"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn transpile(
        &self,
        _kind: SourceKind,
        path: &Path,
        source: &[u8],
    ) -> Result<TranspileOutput, String> {
        let code = std::str::from_utf8(source)
            .map_err(|e| format!("{} is not valid UTF-8: {e}", path.display()))?
            .to_string();
        let map = identity_source_map(&path.to_string_lossy(), &code);
        Ok(TranspileOutput {
            code,
            map: Some(map),
        })
    }
}

/// Build a source map that maps every line onto itself.
pub fn identity_source_map(source_name: &str, code: &str) -> String {
    let mut builder = SourceMapBuilder::default();
    let source_id = builder.set_source_and_content(source_name, code);
    for (line, _) in code.lines().enumerate() {
        let line = u32::try_from(line).unwrap_or(u32::MAX);
        builder.add_token(line, 0, line, 0, Some(source_id), None);
    }
    builder.into_sourcemap().to_json_string()
}

/// Wraps JSON documents as `module.exports = …`.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonTranspiler;

impl Transpiler for JsonTranspiler {
    fn name(&self) -> &str {
        "json"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn transpile(
        &self,
        _kind: SourceKind,
        path: &Path,
        source: &[u8],
    ) -> Result<TranspileOutput, String> {
        let value: serde_json::Value = serde_json::from_slice(source)
            .map_err(|e| format!("invalid JSON in {}: {e}", path.display()))?;
        Ok(TranspileOutput {
            code: format!("module.exports = {value};"),
            map: None,
        })
    }
}

/// Dispatches transpilation by [`SourceKind`].
#[derive(Clone, Default)]
pub struct TranspilerRegistry {
    by_kind: BTreeMap<SourceKind, Arc<dyn Transpiler>>,
}

impl std::fmt::Debug for TranspilerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.by_kind.iter().map(|(k, t)| (k, t.name())))
            .finish()
    }
}

impl TranspilerRegistry {
    /// Empty registry; every transpilable kind fails until registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// JS and CSS pass through unchanged; JSON is wrapped as a module.
    pub fn with_builtins() -> Self {
        let passthrough: Arc<dyn Transpiler> = Arc::new(PassthroughTranspiler);
        Self::new()
            .with(SourceKind::Js, passthrough.clone())
            .with(SourceKind::Css, passthrough)
            .with(SourceKind::Json, Arc::new(JsonTranspiler))
    }

    pub fn with(mut self, kind: SourceKind, transpiler: Arc<dyn Transpiler>) -> Self {
        self.register(kind, transpiler);
        self
    }

    pub fn register(&mut self, kind: SourceKind, transpiler: Arc<dyn Transpiler>) {
        self.by_kind.insert(kind, transpiler);
    }

    pub fn get(&self, kind: SourceKind) -> Option<&Arc<dyn Transpiler>> {
        self.by_kind.get(&kind)
    }

    /// Transpile one module. Stubs and externals produce empty code.
    pub fn transpile(
        &self,
        kind: SourceKind,
        path: &Path,
        source: &[u8],
    ) -> Result<TranspileOutput, String> {
        if !kind.is_transpilable() {
            return Ok(TranspileOutput {
                code: String::new(),
                map: None,
            });
        }
        match self.get(kind) {
            Some(transpiler) => transpiler.transpile(kind, path, source),
            None => Err(format!("no transpiler registered for {kind:?} sources")),
        }
    }

    /// `(kind, name, version, options)` for every registered transpiler, in
    /// kind order. Cache salts are derived from this.
    pub fn salt_inputs(&self) -> Vec<(SourceKind, String, String, serde_json::Value)> {
        self.by_kind
            .iter()
            .map(|(kind, t)| {
                (
                    *kind,
                    t.name().to_string(),
                    t.version().to_string(),
                    t.options(),
                )
            })
            .collect()
    }
}
