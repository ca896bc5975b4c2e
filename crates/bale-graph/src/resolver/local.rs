//! Packet-local path resolution.
//!
//! Paths here are packet-relative and `/`-separated; they double as the
//! subpath component of module ids.

use std::path::{Component, Path, PathBuf};

use path_clean::PathClean;

use crate::package_json::{DEFAULT_MAIN, PackageJson};
use crate::runtime::{Runtime, is_file};
use crate::source_kind::SourceKind;

/// Join `specifier` against the directory of `from` (both packet-relative).
///
/// Returns `None` when the result would escape the packet directory.
pub fn join_relative(from: &str, specifier: &str) -> Option<String> {
    let base = Path::new(from).parent().unwrap_or(Path::new(""));
    let joined: PathBuf = base.join(specifier).clean();
    to_rel_string(&joined)
}

fn to_rel_string(path: &Path) -> Option<String> {
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(parts.join("/"))
}

fn join_rel(base: &str, rest: &str) -> String {
    match (base.is_empty(), rest.is_empty()) {
        (true, _) => rest.to_string(),
        (_, true) => base.to_string(),
        _ => format!("{base}/{rest}"),
    }
}

/// Literal path, then each known extension appended.
fn locate_file(runtime: &dyn Runtime, dir: &Path, rel: &str) -> Option<String> {
    if rel.is_empty() {
        return None;
    }
    if is_file(runtime, &dir.join(rel)) {
        return Some(rel.to_string());
    }
    SourceKind::RESOLVE_EXTENSIONS
        .iter()
        .map(|ext| format!("{rel}.{ext}"))
        .find(|candidate| is_file(runtime, &dir.join(candidate)))
}

/// `rel/index.<ext>` for each known extension.
fn locate_index(runtime: &dyn Runtime, dir: &Path, rel: &str) -> Option<String> {
    SourceKind::RESOLVE_EXTENSIONS
        .iter()
        .map(|ext| join_rel(rel, &format!("index.{ext}")))
        .find(|candidate| is_file(runtime, &dir.join(candidate)))
}

/// Find the file a packet-relative import refers to.
///
/// Tries the literal path, the path with each known extension, the directory's
/// `index.<ext>`, and finally the `main` of a package.json inside the directory.
pub async fn locate(runtime: &dyn Runtime, dir: &Path, rel: &str) -> Option<String> {
    if let Some(found) = locate_file(runtime, dir, rel) {
        return Some(found);
    }

    let as_dir = dir.join(rel);
    if !runtime.is_dir(&as_dir) {
        return None;
    }
    if let Some(found) = locate_index(runtime, dir, rel) {
        return Some(found);
    }

    let manifest = as_dir.join("package.json");
    if !is_file(runtime, &manifest) {
        return None;
    }
    let pkg = PackageJson::from_path(runtime, &manifest).await.ok()?;
    let main = pkg.entry();
    if main == DEFAULT_MAIN {
        return None;
    }
    let main_rel = to_rel_string(&Path::new(rel).join(main).clean())?;
    locate_file(runtime, dir, &main_rel).or_else(|| {
        runtime
            .is_dir(&dir.join(&main_rel))
            .then(|| locate_index(runtime, dir, &main_rel))
            .flatten()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::memory::MemoryRuntime;

    #[test]
    fn test_join_relative() {
        assert_eq!(join_relative("src/a.js", "./b.js").as_deref(), Some("src/b.js"));
        assert_eq!(join_relative("src/a.js", "../lib/c").as_deref(), Some("lib/c"));
        assert_eq!(join_relative("a.js", "./dir").as_deref(), Some("dir"));
        assert_eq!(join_relative("a.js", "..").as_deref(), None);
        assert_eq!(join_relative("src/a.js", "..").as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_locate_order() {
        let runtime = MemoryRuntime::new()
            .with_file("/p/util.js", "")
            .with_file("/p/util.ts", "")
            .with_file("/p/widgets/index.css", "")
            .with_file("/p/lib/package.json", r#"{"main":"./dist/lib"}"#)
            .with_file("/p/lib/dist/lib.js", "")
            .with_file("/p/exact", "");
        let dir = Path::new("/p");

        assert_eq!(locate(&runtime, dir, "util").await.as_deref(), Some("util.js"));
        assert_eq!(locate(&runtime, dir, "util.ts").await.as_deref(), Some("util.ts"));
        assert_eq!(locate(&runtime, dir, "exact").await.as_deref(), Some("exact"));
        assert_eq!(
            locate(&runtime, dir, "widgets").await.as_deref(),
            Some("widgets/index.css")
        );
        assert_eq!(locate(&runtime, dir, "lib").await.as_deref(), Some("lib/dist/lib.js"));
        assert_eq!(locate(&runtime, dir, "missing").await, None);
    }

    #[tokio::test]
    async fn test_locate_packet_root() {
        let runtime = MemoryRuntime::new().with_file("/p/index.js", "");
        assert_eq!(
            locate(&runtime, Path::new("/p"), "").await.as_deref(),
            Some("index.js")
        );
    }
}
