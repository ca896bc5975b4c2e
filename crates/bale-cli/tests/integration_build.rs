//! Integration tests for the build command.
//!
//! These run real builds against projects laid out in temporary directories.

use bale_cli::cli::BuildArgs;
use bale_cli::commands::build;
use bale_cli::{BuildError, CliError};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn project() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(root, "package.json", r#"{"name":"app","version":"1.0.0","dependencies":{"jquery":"^3.7.0"}}"#);
    write(root, "home.js", "var $ = require('jquery');\nrequire('./nav.js');\n");
    write(root, "nav.js", "module.exports = 'nav';\n");
    write(
        root,
        "node_modules/jquery/package.json",
        r#"{"name":"jquery","version":"3.7.1","main":"dist/jquery.js"}"#,
    );
    write(root, "node_modules/jquery/dist/jquery.js", "module.exports = function $() {};\n");
    temp
}

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn args(root: &Path, entries: &[&str]) -> BuildArgs {
    BuildArgs {
        entries: entries.iter().map(|e| e.to_string()).collect(),
        root: Some(root.to_path_buf()),
        no_cache: true,
        ..BuildArgs::default()
    }
}

fn files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_build_writes_bundles_and_loader_config() {
    let temp = project();
    build::execute(args(temp.path(), &["home.js"])).await.unwrap();

    let dist = temp.path().join("dist");
    let names = files(&dist);
    let bundle = names
        .iter()
        .find(|n| n.starts_with("home.") && n.ends_with(".js"))
        .expect("home bundle written");
    assert!(names.contains(&format!("{bundle}.map")));
    assert!(names.contains(&"loaderConfig.json".to_string()));

    let code = fs::read_to_string(dist.join(bundle)).unwrap();
    assert!(code.contains(r#"define("app/1.0.0/home.js""#));
    assert!(code.contains(r#"define("app/1.0.0/nav.js""#));
    assert!(code.contains(r#"define("jquery/3.7.1/dist/jquery.js""#));

    let loader_config: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dist.join("loaderConfig.json")).unwrap())
            .unwrap();
    assert_eq!(loader_config["package"], "app/1.0.0");
}

#[tokio::test]
async fn test_preload_takes_shared_dependency() {
    let temp = project();
    write(temp.path(), "preload.js", "require('jquery');\n");
    let mut build_args = args(temp.path(), &["home.js"]);
    build_args.preload = vec!["preload.js".into()];
    build::execute(build_args).await.unwrap();

    let dist = temp.path().join("dist");
    let read = |prefix: &str| {
        let name = files(&dist)
            .into_iter()
            .find(|n| n.starts_with(prefix) && n.ends_with(".js"))
            .unwrap();
        fs::read_to_string(dist.join(name)).unwrap()
    };
    assert!(read("preload.").contains("jquery/3.7.1"));
    assert!(!read("home.").contains("jquery/3.7.1"));
}

#[tokio::test]
async fn test_build_without_package_json() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "home.js", "");

    let err = build::execute(args(temp.path(), &["home.js"])).await.unwrap_err();
    assert!(matches!(err, CliError::Build(BuildError::MissingManifest(_))));
}

#[tokio::test]
async fn test_unknown_entry_fails() {
    let temp = project();
    let err = build::execute(args(temp.path(), &["./nope.js"])).await.unwrap_err();
    assert!(matches!(err, CliError::Bundler(_)), "got {err:?}");
}

#[tokio::test]
async fn test_out_dir_outside_project_is_rejected() {
    let temp = project();
    let mut build_args = args(temp.path(), &["home.js"]);
    build_args.out_dir = Some("/".into());

    let err = build::execute(build_args).await.unwrap_err();
    assert!(matches!(err, CliError::Build(BuildError::OutputNotWritable(_))));
}

#[tokio::test]
async fn test_cache_dir_is_created_and_reused() {
    let temp = project();
    let mut build_args = args(temp.path(), &["home.js"]);
    build_args.no_cache = false;

    build::execute(build_args.clone()).await.unwrap();
    let first = files(&temp.path().join("dist"));
    assert!(temp.path().join(".bale-cache").is_dir());

    build::execute(build_args).await.unwrap();
    assert_eq!(files(&temp.path().join("dist")), first);
}
