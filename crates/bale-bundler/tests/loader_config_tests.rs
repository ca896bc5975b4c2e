//! A build's `loaderConfig.json` drives `bale_loader::Loader` to the same
//! module ids the build shipped.

mod helpers;

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use bale_bundler::{BuildConfig, BuildOutput, BuildSession};
use bale_graph::MemoryRuntime;
use bale_loader::{Exports, Fetcher, Loader, ModuleScope, Registration, Result};
use helpers::{app, install, session};

#[derive(Clone, Default)]
struct Requests(Rc<RefCell<Vec<String>>>);

impl Fetcher for Requests {
    fn fetch(&mut self, url: &str) {
        self.0.borrow_mut().push(url.to_string());
    }
}

/// `a` carries its own `shared@2`; `c` is hoisted and imports `shared`
/// without declaring it. `home.js` reaches `c` through `a`, `other.js`
/// through `b`.
fn hoisted_project() -> MemoryRuntime {
    let runtime = app(r#"{"a":"1","b":"1","shared":"1"}"#);
    let runtime = install(runtime, "a", "1.0.0", r#"{"shared":"2","c":"1"}"#, "require('shared');\nrequire('c');");
    let runtime = install(runtime, "b", "1.0.0", r#"{"c":"1"}"#, "require('c');");
    let runtime = install(runtime, "c", "1.0.0", "{}", "module.exports = require('shared');");
    let runtime = install(runtime, "shared", "1.0.0", "{}", "module.exports = 1;");
    runtime
        .with_file(
            "/app/node_modules/a/node_modules/shared/package.json",
            r#"{"name":"shared","version":"2.0.0"}"#,
        )
        .with_file("/app/node_modules/a/node_modules/shared/index.js", "module.exports = 2;")
        .with_file("/app/home.js", "require('a');")
        .with_file("/app/other.js", "require('b');")
}

/// Static import specifiers of every emitted module, by id.
async fn declared_deps(session: &BuildSession, output: &BuildOutput) -> BTreeMap<String, Vec<String>> {
    session
        .with_graph(|graph| {
            let graph = graph.expect("graph after a build");
            output
                .bundles
                .iter()
                .flat_map(|b| b.members.iter())
                .filter_map(|id| {
                    let idx = graph.module_by_id(id)?;
                    Some((id.clone(), graph.module(idx).static_imports.clone()))
                })
                .collect()
        })
        .await
}

/// Answer every fetch with the registrations of the bundle at that URL,
/// until the loader stops asking.
fn serve(
    loader: &mut Loader,
    requests: &Requests,
    output: &BuildOutput,
    deps: &BTreeMap<String, Vec<String>>,
    executed: &Rc<RefCell<Vec<String>>>,
) {
    let mut served = 0;
    while served < requests.0.borrow().len() {
        let url = requests.0.borrow()[served].clone();
        served += 1;
        let bundle = output
            .bundles
            .iter()
            .find(|b| format!("/{}", b.file) == url)
            .unwrap_or_else(|| panic!("loader asked for {url}, which the build did not emit"));
        let registrations = bundle
            .members
            .iter()
            .map(|id| {
                let log = executed.clone();
                let specifiers = deps.get(id).cloned().unwrap_or_default();
                Registration::new(id.clone(), specifiers, move |scope: &mut ModuleScope| {
                    log.borrow_mut().push(scope.id().to_string());
                    Ok(())
                })
            })
            .collect();
        loader.complete_fetch(&url, Ok(registrations));
    }
}

#[tokio::test]
async fn runtime_resolution_matches_build_on_every_page() {
    let session = session(
        hoisted_project(),
        BuildConfig::new("/app").entry("home.js").entry("other.js"),
    );
    let output = session.compile().await.unwrap();
    let other = output.bundle("other").unwrap();
    assert!(other.members.contains(&"shared/2.0.0/index.js".to_string()));
    assert!(!other.members.contains(&"shared/1.0.0/index.js".to_string()));

    let lock = &output.loader_config.lock;
    assert_eq!(lock.get("c", "1.0.0").unwrap().parent.as_deref(), Some("a/1.0.0"));
    assert_eq!(lock.get("app", "1.0.0").unwrap().parent, None);

    let deps = declared_deps(&session, &output).await;

    // Load the `other` page alone: `a` is never fetched.
    let requests = Requests::default();
    let mut loader = Loader::new(&output.loader_config, requests.clone());
    let executed = Rc::new(RefCell::new(Vec::new()));
    let result: Rc<RefCell<Option<Result<Exports>>>> = Rc::new(RefCell::new(None));
    let slot = result.clone();
    loader.import("other.js", move |r| *slot.borrow_mut() = Some(r));
    serve(&mut loader, &requests, &output, &deps, &executed);

    assert!(matches!(result.borrow().as_ref(), Some(Ok(_))), "{:?}", result.borrow());
    assert_eq!(*requests.0.borrow(), vec![format!("/{}", other.file)]);
    assert_eq!(
        loader.resolve(Some("c/1.0.0/index.js"), "shared"),
        "shared/2.0.0/index.js"
    );
    let executed = executed.borrow();
    assert!(executed.contains(&"shared/2.0.0/index.js".to_string()));
    assert!(!executed.contains(&"shared/1.0.0/index.js".to_string()));
}
