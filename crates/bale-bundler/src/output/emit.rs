//! Bundle rendering.
//!
//! A JS bundle is a sequence of self-registering module wrappers:
//!
//! ```text
//! define("app/1.0.0/home.js", ["./nav", "react"], function(require, exports, module) {
//! <transpiled code>
//! });
//! ```
//!
//! CSS bundles are the members' code concatenated. In both cases each
//! member's source map is shifted to the line its code starts on and merged
//! into one map for the bundle.

use oxc_sourcemap::{ConcatSourceMapBuilder, SourceMap};
use serde::{Deserialize, Serialize};
use tracing::warn;

use bale_graph::{ModuleGraph, ModuleIdx, OutputFormat};

use super::writer::OutputFile;
use crate::bundle::{Bundle, BundleKind, BundlePlan, file_name};

/// Description of one emitted bundle file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmittedBundle {
    pub name: String,
    pub kind: BundleKind,
    pub format: OutputFormat,
    /// File name relative to the output directory.
    pub file: String,
    pub content_hash: String,
    /// Root module ids.
    pub roots: Vec<String>,
    /// Member module ids, sorted.
    pub members: Vec<String>,
}

/// Accumulates code and keeps track of the current line for map offsets.
struct Concat {
    code: String,
    line: u32,
    maps: ConcatSourceMapBuilder,
    has_maps: bool,
}

impl Concat {
    fn new() -> Self {
        Self {
            code: String::new(),
            line: 0,
            maps: ConcatSourceMapBuilder::default(),
            has_maps: false,
        }
    }

    fn push(&mut self, text: &str) {
        self.code.push_str(text);
        let lines = text.bytes().filter(|&b| b == b'\n').count();
        self.line = self
            .line
            .saturating_add(u32::try_from(lines).unwrap_or(u32::MAX));
    }

    /// Append module code, ending it with a newline, and merge its map at the
    /// line the code starts on.
    fn push_module(&mut self, id: &str, code: &str, map: Option<&str>) {
        if let Some(json) = map {
            match SourceMap::from_json_string(json) {
                Ok(sourcemap) => {
                    self.maps.add_sourcemap(&sourcemap, self.line);
                    self.has_maps = true;
                }
                Err(e) => warn!(id, error = ?e, "dropping unreadable source map"),
            }
        }
        self.push(code);
        if !code.is_empty() && !code.ends_with('\n') {
            self.push("\n");
        }
    }
}

fn sorted_by_id(graph: &ModuleGraph, members: impl Iterator<Item = ModuleIdx>) -> Vec<ModuleIdx> {
    let mut sorted: Vec<ModuleIdx> = members.collect();
    sorted.sort_by(|a, b| graph.module(*a).id.cmp(&graph.module(*b).id));
    sorted
}

fn define_header(id: &str, deps: &[String]) -> String {
    // Serializing strings and string lists cannot fail.
    let id = serde_json::to_string(id).unwrap_or_default();
    let deps = serde_json::to_string(deps).unwrap_or_else(|_| "[]".to_string());
    format!("define({id}, {deps}, function(require, exports, module) {{\n")
}

/// Render the body of a JS bundle. Stylesheet ids carried by the CSS sibling
/// get empty registrations so `require('./x.css')` still resolves.
fn render_js(graph: &ModuleGraph, bundle: &Bundle, css_sibling: Option<&Bundle>) -> Concat {
    let mut out = Concat::new();
    for idx in sorted_by_id(graph, bundle.members.iter().copied()) {
        let node = graph.module(idx);
        out.push(&define_header(&node.id, &node.static_imports));
        let (code, map) = node
            .cache
            .as_ref()
            .map(|c| (c.code.as_str(), c.map.as_deref()))
            .unwrap_or_default();
        out.push_module(&node.id, code, map);
        out.push("});\n");
    }
    if let Some(css) = css_sibling {
        for idx in sorted_by_id(graph, css.members.iter().copied()) {
            out.push(&define_header(&graph.module(idx).id, &[]));
            out.push("});\n");
        }
    }
    out
}

fn render_css(graph: &ModuleGraph, bundle: &Bundle) -> Concat {
    let mut out = Concat::new();
    for idx in sorted_by_id(graph, bundle.members.iter().copied()) {
        let node = graph.module(idx);
        if let Some(cached) = &node.cache {
            out.push_module(&node.id, &cached.code, cached.map.as_deref());
        }
    }
    out
}

/// Render one bundle into its output file(s).
///
/// Returns the bundle description plus the bundle file and, when
/// `sourcemap` is on and any member had a map, its `.map` file.
pub fn render_bundle(
    graph: &ModuleGraph,
    plan: &BundlePlan,
    bundle: &Bundle,
    sourcemap: bool,
) -> (EmittedBundle, Vec<OutputFile>) {
    let content_hash = bundle.content_hash(graph);
    let file = file_name(&bundle.name, &content_hash, bundle.format);

    let mut body = match bundle.format {
        OutputFormat::Js => render_js(graph, bundle, plan.css_sibling(bundle)),
        OutputFormat::Css => render_css(graph, bundle),
    };

    let mut files = Vec::with_capacity(2);
    if sourcemap && body.has_maps {
        let map_file = format!("{file}.map");
        let map = body.maps.into_sourcemap().to_json_string();
        match bundle.format {
            OutputFormat::Js => body.code.push_str(&format!("//# sourceMappingURL={map_file}\n")),
            OutputFormat::Css => body.code.push_str(&format!("/*# sourceMappingURL={map_file} */\n")),
        }
        files.push(OutputFile::new(map_file, map));
    }
    files.insert(0, OutputFile::new(file.clone(), body.code));

    let emitted = EmittedBundle {
        name: bundle.name.clone(),
        kind: bundle.kind,
        format: bundle.format,
        file,
        content_hash,
        roots: bundle
            .roots
            .iter()
            .map(|&idx| graph.module(idx).id.clone())
            .collect(),
        members: sorted_by_id(graph, bundle.members.iter().copied())
            .into_iter()
            .map(|idx| graph.module(idx).id.clone())
            .collect(),
    };
    (emitted, files)
}

/// Render every bundle of `plan`, in plan order.
pub fn render_plan(
    graph: &ModuleGraph,
    plan: &BundlePlan,
    sourcemap: bool,
) -> (Vec<EmittedBundle>, Vec<OutputFile>) {
    let mut emitted = Vec::with_capacity(plan.len());
    let mut files = Vec::new();
    for bundle in plan.iter() {
        let (description, mut rendered) = render_bundle(graph, plan, bundle, sourcemap);
        emitted.push(description);
        files.append(&mut rendered);
    }
    (emitted, files)
}
