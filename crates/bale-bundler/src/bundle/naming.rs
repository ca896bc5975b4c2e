use bale_graph::{ModuleGraph, ModuleIdx, OutputFormat};

/// Hex characters of the content hash embedded in file names.
const FILE_HASH_LEN: usize = 8;

/// Make `raw` safe as a file-name stem: `@scope/pkg` → `scope-pkg`.
pub fn sanitize(raw: &str) -> String {
    let trimmed = raw.trim_start_matches(['@', '.', '/']);
    let mut out = String::with_capacity(trimmed.len());
    for c in trimmed.chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
            out.push(c);
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    let out = out.trim_end_matches('-').to_string();
    if out.is_empty() { "bundle".to_string() } else { out }
}

fn strip_extension(rel: &str) -> &str {
    match rel.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() && !stem.ends_with('/') => stem,
        _ => rel,
    }
}

/// Logical bundle name for a bundle rooted at `root`.
///
/// Root-package modules are named after their path (`pages/home.js` →
/// `pages-home`); a package's main module after the package; any other package
/// module after the package and path.
pub fn bundle_name(graph: &ModuleGraph, root: ModuleIdx) -> String {
    let node = graph.module(root);
    let Some(packet_idx) = node.packet else {
        return sanitize(&node.id);
    };
    let packet = graph.packet(packet_idx);
    let prefix = format!("{}/{}/", packet.name, packet.version);
    let rel = node.id.strip_prefix(&prefix).unwrap_or(&node.id);

    if packet_idx == graph.root() {
        sanitize(strip_extension(rel))
    } else if rel == packet.main || packet.aliases.get(&packet.main).is_some_and(|t| t == rel) {
        sanitize(&packet.name)
    } else {
        sanitize(&format!("{}-{}", packet.name, strip_extension(rel)))
    }
}

/// `{name}.{hash8}.{ext}`.
pub fn file_name(name: &str, content_hash: &str, format: OutputFormat) -> String {
    let hash = content_hash.get(..FILE_HASH_LEN).unwrap_or(content_hash);
    format!("{name}.{hash}.{}", format.extension())
}
