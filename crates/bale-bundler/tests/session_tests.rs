//! End-to-end build session tests.
//!
//! Sources live in a `MemoryRuntime`; output and cache directories are real
//! temp directories.

mod helpers;

use std::sync::Arc;

use bale_bundler::{BuildConfig, BuildSession, Error, LOADER_CONFIG_FILE};
use bale_graph::{DiagnosticKind, LoaderConfig, MemoryRuntime, TranspilerRegistry};
use helpers::{app, install, session};
use tempfile::TempDir;

fn two_entries(a_source: &str) -> MemoryRuntime {
    app("{}")
        .with_file("/app/home.js", "require('./a');")
        .with_file("/app/a.js", a_source)
        .with_file("/app/about.js", "require('./b');")
        .with_file("/app/b.js", "module.exports = 'b';")
}

#[tokio::test]
async fn build_writes_bundles_and_loader_config() {
    let out = TempDir::new().unwrap();
    let runtime = install(app(r#"{"jquery":"3"}"#), "jquery", "3.7.1", "{}", "module.exports = {};")
        .with_file("/app/home.js", "var $ = require('jquery');\nrequire('./style.css');")
        .with_file("/app/style.css", "body { margin: 0; }")
        .with_file("/app/preload.js", "require('jquery');");
    let config = BuildConfig::new("/app")
        .entry("home.js")
        .preload("preload.js")
        .out_dir(out.path());

    let output = session(runtime, config).build().await.unwrap();

    let home = output.bundle("home").unwrap();
    assert!(home.file.starts_with("home.") && home.file.ends_with(".js"));
    let written = std::fs::read_to_string(out.path().join(&home.file)).unwrap();
    assert!(written.starts_with(
        "define(\"app/1.0.0/home.js\", [\"jquery\",\"./style.css\"], function(require, exports, module) {\n"
    ));
    // The stylesheet ships in the CSS sibling; the JS bundle only registers it.
    assert!(written.contains("define(\"app/1.0.0/style.css\", [], function(require, exports, module) {\n});"));
    assert!(written.ends_with(&format!("//# sourceMappingURL={}.map\n", home.file)));
    assert!(out.path().join(format!("{}.map", home.file)).exists());

    let css = output
        .bundles
        .iter()
        .find(|b| b.name == "home" && b.file.ends_with(".css"))
        .unwrap();
    let css_text = std::fs::read_to_string(out.path().join(&css.file)).unwrap();
    assert!(css_text.starts_with("body { margin: 0; }\n"));
    assert!(css_text.ends_with(&format!("/*# sourceMappingURL={}.map */\n", css.file)));

    let config_json = std::fs::read_to_string(out.path().join(LOADER_CONFIG_FILE)).unwrap();
    let loader = LoaderConfig::from_json(&config_json).unwrap();
    assert_eq!(loader.package, "app/1.0.0");
    assert_eq!(loader.base_url, "/");
    assert_eq!(loader.preload, vec!["app/1.0.0/preload.js"]);

    let preload_file = &output.bundle("preload").unwrap().file;
    let jquery = loader.lock.get("jquery", "3.7.1").unwrap();
    assert_eq!(jquery.manifest.as_ref().unwrap()["index.js"], *preload_file);
    let app_lock = loader.lock.get("app", "1.0.0").unwrap();
    let manifest = app_lock.manifest.as_ref().unwrap();
    assert_eq!(manifest["home.js"], home.file);
    assert_eq!(manifest["style.css"], home.file);
}

#[tokio::test]
async fn identical_inputs_produce_identical_names() {
    let config = || BuildConfig::new("/app").entry("home.js").entry("about.js");
    let first = session(two_entries("module.exports = 1;"), config()).compile().await.unwrap();
    let second = session(two_entries("module.exports = 1;"), config()).compile().await.unwrap();

    let files = |o: &bale_bundler::BuildOutput| o.bundles.iter().map(|b| b.file.clone()).collect::<Vec<_>>();
    assert_eq!(files(&first), files(&second));
    assert_eq!(first.files, second.files);
}

#[tokio::test]
async fn one_byte_change_renames_only_its_bundle() {
    let config = || BuildConfig::new("/app").entry("home.js").entry("about.js");
    let before = session(two_entries("module.exports = 1;"), config()).compile().await.unwrap();
    let after = session(two_entries("module.exports = 2;"), config()).compile().await.unwrap();

    assert_ne!(
        before.bundle("home").unwrap().content_hash,
        after.bundle("home").unwrap().content_hash
    );
    assert_eq!(
        before.bundle("about").unwrap().file,
        after.bundle("about").unwrap().file
    );
}

#[tokio::test]
async fn missing_import_is_a_stub_not_a_failure() {
    let runtime = app("{}").with_file("/app/home.js", "require('./missing.js');");
    let output = session(runtime, BuildConfig::new("/app").entry("home.js"))
        .compile()
        .await
        .unwrap();

    assert_eq!(
        output.bundle("home").unwrap().members,
        vec!["app/1.0.0/home.js", "app/1.0.0/missing.js"]
    );
    assert!(output
        .diagnostics
        .iter()
        .any(|d| d.kind == DiagnosticKind::UnresolvedImport));
}

#[tokio::test]
async fn untranspilable_dependency_fails_with_chain() {
    let runtime = app("{}")
        .with_file("/app/home.js", "require('./util');")
        .with_file("/app/util.ts", "export const x: number = 1;");
    let err = session(runtime, BuildConfig::new("/app").entry("home.js"))
        .compile()
        .await
        .unwrap_err();

    assert_eq!(
        err.dependency_chain().unwrap(),
        ["app/1.0.0/home.js", "app/1.0.0/util.ts"]
    );
    assert!(err.to_string().contains("no transpiler registered"));
}

#[tokio::test]
async fn unknown_entry_is_an_error() {
    let runtime = app("{}");
    let err = session(runtime, BuildConfig::new("/app").entry("./nope.js"))
        .compile()
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Graph(bale_graph::Error::EntryNotFound(_))));
}

#[tokio::test]
async fn reload_picks_up_new_and_changed_files() {
    let runtime = Arc::new(app("{}").with_file("/app/home.js", "require('./missing.js');"));
    let session = BuildSession::new(
        BuildConfig::new("/app").entry("home.js").cache_dir(None),
        runtime.clone(),
        TranspilerRegistry::with_builtins(),
    )
    .unwrap();
    session.compile().await.unwrap();

    runtime.add_file("/app/missing.js", "module.exports = 'found';");
    let changes = session.reload("/app/missing.js".as_ref()).await.unwrap();
    assert!(changes.modified.contains("app/1.0.0/missing.js"));
    assert!(changes.affected.contains("app/1.0.0/home.js"));

    let output = session.compile().await.unwrap();
    let file = output.file(&output.bundle("home").unwrap().file).unwrap();
    assert!(String::from_utf8_lossy(&file.contents).contains("module.exports = 'found';"));

    runtime.add_file("/app/home.js", "require('./missing.js'); require('./extra');");
    runtime.add_file("/app/extra.js", "");
    session.reload("/app/home.js".as_ref()).await.unwrap();
    let output = session.compile().await.unwrap();
    assert!(output
        .bundle("home")
        .unwrap()
        .members
        .contains(&"app/1.0.0/extra.js".to_string()));
}

#[tokio::test]
async fn reload_resolves_extensionless_import_once_file_exists() {
    let runtime = Arc::new(app("{}").with_file("/app/home.js", "require('./missing');"));
    let session = BuildSession::new(
        BuildConfig::new("/app").entry("home.js").cache_dir(None),
        runtime.clone(),
        TranspilerRegistry::with_builtins(),
    )
    .unwrap();
    let output = session.compile().await.unwrap();
    assert!(output
        .bundle("home")
        .unwrap()
        .members
        .contains(&"app/1.0.0/missing".to_string()));

    runtime.add_file("/app/missing.js", "module.exports = 'late';");
    let changes = session.reload("/app/missing.js".as_ref()).await.unwrap();
    assert!(changes.has_changes());
    assert!(changes.modified.contains("app/1.0.0/missing"));
    assert!(changes.affected.contains("app/1.0.0/home.js"));

    let output = session.compile().await.unwrap();
    let home = output.bundle("home").unwrap();
    assert_eq!(home.members, vec!["app/1.0.0/home.js", "app/1.0.0/missing.js"]);
    let file = output.file(&home.file).unwrap();
    assert!(String::from_utf8_lossy(&file.contents).contains("module.exports = 'late';"));
    let app_lock = output.loader_config.lock.get("app", "1.0.0").unwrap();
    assert_eq!(app_lock.alias.as_ref().unwrap()["missing"], "missing.js");
}

#[tokio::test]
async fn manifest_change_reloads_the_tree() {
    let runtime = Arc::new(app("{}").with_file("/app/home.js", "require('lodash');"));
    let session = BuildSession::new(
        BuildConfig::new("/app").entry("home.js").cache_dir(None),
        runtime.clone(),
        TranspilerRegistry::with_builtins(),
    )
    .unwrap();
    let output = session.compile().await.unwrap();
    assert!(output.bundle("home").unwrap().members.contains(&"lodash".to_string()));

    runtime.add_file(
        "/app/package.json",
        r#"{"name":"app","version":"1.0.0","dependencies":{"lodash":"4"}}"#,
    );
    runtime.add_file("/app/node_modules/lodash/package.json", r#"{"name":"lodash","version":"4.17.21"}"#);
    runtime.add_file("/app/node_modules/lodash/index.js", "module.exports = {};");

    let changes = session.reload("/app/package.json".as_ref()).await.unwrap();
    assert!(changes.full_rebuild);
    assert!(session.with_graph(|g| g.is_none()).await);

    let output = session.compile().await.unwrap();
    assert!(output
        .bundle("home")
        .unwrap()
        .members
        .contains(&"lodash/4.17.21/index.js".to_string()));
}

#[tokio::test]
async fn persistent_cache_hits_and_salt_purge() {
    let cache = TempDir::new().unwrap();
    let runtime = || two_entries("module.exports = 1;");
    let config = |options: serde_json::Value| {
        let mut config = BuildConfig::new("/app")
            .entry("home.js")
            .entry("about.js")
            .cache_dir(Some(cache.path().to_path_buf()));
        config.transpiler_options = options;
        config
    };
    let open = |options| {
        BuildSession::new(
            config(options),
            Arc::new(runtime()),
            TranspilerRegistry::with_builtins(),
        )
        .unwrap()
    };

    let cold = open(serde_json::Value::Null).compile().await.unwrap();
    assert_eq!(cold.stats.transpiled, 4);
    assert_eq!(cold.stats.cache_hits, 0);

    let warm = open(serde_json::Value::Null).compile().await.unwrap();
    assert_eq!(warm.stats.transpiled, 0);
    assert_eq!(warm.stats.cache_hits, 4);
    assert_eq!(warm.files, cold.files);

    let salted = open(serde_json::json!({"minify": true})).compile().await.unwrap();
    assert_eq!(salted.stats.cache_hits, 0);
    assert!(salted
        .diagnostics
        .iter()
        .any(|d| d.kind == DiagnosticKind::SaltMismatch));
}
