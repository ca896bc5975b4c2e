//! Loader state machine tests.
//!
//! Each test drives a `Loader` by hand: imports go in, the recorded fetch
//! requests are inspected, and completions are delivered explicitly.

mod helpers;

use bale_loader::{LoaderError, ModuleState, NetworkError, Registration};
use helpers::{Fixture, Log, exports, fill, logged, slot};
use serde_json::Value;
use std::cell::RefCell;

#[test]
fn bundle_modules_execute_dependencies_first() {
    let fixture = Fixture::new()
        .ships("app/1.0.0/home.js", "home.1a2b3c4d.js")
        .ships("app/1.0.0/nav.js", "home.1a2b3c4d.js");
    let (mut loader, requests) = fixture.loader();
    let log = Log::default();

    let result = slot();
    loader.import("home.js", fill(&result));
    assert_eq!(requests.urls(), ["/home.1a2b3c4d.js"]);
    assert_eq!(loader.state("app/1.0.0/home.js"), Some(ModuleState::Fetching));
    assert!(result.borrow().is_none());

    loader.complete_fetch(
        "/home.1a2b3c4d.js",
        Ok(vec![
            logged(&log, "app/1.0.0/home.js", &["./nav.js"]),
            logged(&log, "app/1.0.0/nav.js", &[]),
        ]),
    );

    // nav.js shipped in the same script, so nothing else was requested.
    assert_eq!(requests.urls().len(), 1);
    assert_eq!(*log.borrow(), ["app/1.0.0/nav.js", "app/1.0.0/home.js"]);
    assert_eq!(
        exports(&result).get("name"),
        Some(Value::from("app/1.0.0/home.js"))
    );
    assert_eq!(loader.state("app/1.0.0/nav.js"), Some(ModuleState::Executed));
}

#[test]
fn concurrent_imports_share_one_fetch() {
    let fixture = Fixture::new()
        .ships("app/1.0.0/home.js", "home.js")
        .ships("app/1.0.0/about.js", "home.js");
    let (mut loader, requests) = fixture.loader();
    let log = Log::default();

    let (first, second, third) = (slot(), slot(), slot());
    loader.import("home.js", fill(&first));
    loader.import("about.js", fill(&second));
    loader.import("home.js", fill(&third));
    assert_eq!(requests.urls(), ["/home.js"]);

    loader.complete_fetch(
        "/home.js",
        Ok(vec![
            logged(&log, "app/1.0.0/home.js", &[]),
            logged(&log, "app/1.0.0/about.js", &[]),
        ]),
    );
    assert!(exports(&first).same(&exports(&third)));
    assert_eq!(
        exports(&second).get("name"),
        Some(Value::from("app/1.0.0/about.js"))
    );
    // Executed once, even though requested twice.
    assert_eq!(log.borrow().len(), 2);
}

#[test]
fn cycle_sees_partial_exports() {
    let fixture = Fixture::new()
        .ships("app/1.0.0/a.js", "main.js")
        .ships("app/1.0.0/b.js", "main.js");
    let (mut loader, _) = fixture.loader();

    let a = Registration::new("app/1.0.0/a.js", ["./b.js"], |scope| {
        let b = scope.require("./b.js").map_err(|e| e.to_string())?;
        scope.exports.set("b_done", b.contains("done"));
        scope.exports.set("done", true);
        Ok(())
    });
    let b = Registration::new("app/1.0.0/b.js", ["./a.js"], |scope| {
        let a = scope.require("./a.js").map_err(|e| e.to_string())?;
        // a is still executing, so its exports are not populated yet.
        scope.exports.set("a_was_empty", a.is_empty());
        scope.exports.set("done", true);
        Ok(())
    });

    let result = slot();
    loader.import("app/1.0.0/a.js", fill(&result));
    loader.complete_fetch("/main.js", Ok(vec![a, b]));

    let a = exports(&result);
    assert_eq!(a.get("b_done"), Some(Value::Bool(true)));
    let b = loader.exports("app/1.0.0/b.js").unwrap();
    assert_eq!(b.get("a_was_empty"), Some(Value::Bool(true)));
    assert_eq!(loader.state("app/1.0.0/a.js"), Some(ModuleState::Executed));
    assert_eq!(loader.state("app/1.0.0/b.js"), Some(ModuleState::Executed));
}

#[test]
fn network_failure_poisons_only_dependents() {
    let fixture = Fixture::new()
        .ships("app/1.0.0/home.js", "home.js")
        .ships("app/1.0.0/widget.js", "widget.js")
        .ships("app/1.0.0/about.js", "about.js");
    let (mut loader, requests) = fixture.loader();
    let log = Log::default();

    let (home, about) = (slot(), slot());
    loader.import("home.js", fill(&home));
    loader.import("about.js", fill(&about));
    loader.complete_fetch(
        "/home.js",
        Ok(vec![logged(&log, "app/1.0.0/home.js", &["./widget.js"])]),
    );
    assert_eq!(requests.urls(), ["/home.js", "/about.js", "/widget.js"]);

    loader.complete_fetch(
        "/widget.js",
        Err(NetworkError::new("connection reset").with_status(503)),
    );
    let err = match home.borrow().as_ref() {
        Some(Err(err)) => err.clone(),
        other => panic!("expected failure, got {other:?}"),
    };
    assert_eq!(err.id(), "app/1.0.0/home.js");
    assert!(matches!(
        err.root_cause(),
        LoaderError::NetworkFailure { id, source, .. }
            if id == "app/1.0.0/widget.js" && source.status == Some(503)
    ));
    assert_eq!(loader.state("app/1.0.0/home.js"), Some(ModuleState::Error));

    // The unrelated import is still pending and completes normally.
    assert!(about.borrow().is_none());
    loader.complete_fetch("/about.js", Ok(vec![logged(&log, "app/1.0.0/about.js", &[])]));
    assert_eq!(
        exports(&about).get("name"),
        Some(Value::from("app/1.0.0/about.js"))
    );
    assert_eq!(*log.borrow(), ["app/1.0.0/about.js"]);
}

#[test]
fn script_without_the_module_is_an_error() {
    let fixture = Fixture::new().ships("app/1.0.0/home.js", "home.js");
    let (mut loader, _) = fixture.loader();
    let result = slot();
    loader.import("home.js", fill(&result));
    loader.complete_fetch("/home.js", Ok(vec![Registration::empty("app/1.0.0/other.js")]));

    assert!(matches!(
        result.borrow().as_ref(),
        Some(Err(LoaderError::NotDefined { url, .. })) if url == "/home.js"
    ));
}

#[test]
fn factory_error_fails_dependents() {
    let fixture = Fixture::new()
        .ships("app/1.0.0/home.js", "home.js")
        .ships("app/1.0.0/broken.js", "home.js");
    let (mut loader, _) = fixture.loader();
    let log = Log::default();

    let result = slot();
    loader.import("home.js", fill(&result));
    loader.complete_fetch(
        "/home.js",
        Ok(vec![
            logged(&log, "app/1.0.0/home.js", &["./broken.js"]),
            Registration::new("app/1.0.0/broken.js", Vec::<String>::new(), |_| {
                Err("undefined is not a function".to_string())
            }),
        ]),
    );

    let err = match result.borrow().as_ref() {
        Some(Err(err)) => err.clone(),
        other => panic!("expected failure, got {other:?}"),
    };
    assert!(matches!(
        err.root_cause(),
        LoaderError::Factory { message, .. } if message == "undefined is not a function"
    ));
    assert!(log.borrow().is_empty());
    assert_eq!(loader.state("app/1.0.0/broken.js"), Some(ModuleState::Error));
}

#[test]
fn versions_resolve_per_scope() {
    let fixture = Fixture::new()
        .package("app", "1.0.0", &[("react", "17.0.2"), ("widget", "1.0.0")])
        .package("widget", "1.0.0", &[("react", "18.2.0")])
        .package("react", "17.0.2", &[])
        .package("react", "18.2.0", &[])
        .ships("app/1.0.0/home.js", "home.js")
        .ships("widget/1.0.0/index.js", "home.js")
        .ships("react/17.0.2/index.js", "home.js")
        .ships("react/18.2.0/index.js", "widget.js");
    let (mut loader, requests) = fixture.loader();

    let versioned = |id: &'static str, version: &'static str| {
        Registration::new(id, Vec::<String>::new(), move |scope| {
            scope.exports.set("version", version);
            Ok(())
        })
    };
    let home = Registration::new("app/1.0.0/home.js", ["react", "widget"], |scope| {
        let react = scope.require("react").map_err(|e| e.to_string())?;
        let widget = scope.require("widget").map_err(|e| e.to_string())?;
        scope.exports.set("react", react.get("version").unwrap_or_default());
        scope.exports.set("widget_react", widget.get("react").unwrap_or_default());
        Ok(())
    });
    let widget = Registration::new("widget/1.0.0/index.js", ["react"], |scope| {
        let react = scope.require("react").map_err(|e| e.to_string())?;
        scope.exports.set("react", react.get("version").unwrap_or_default());
        Ok(())
    });

    let result = slot();
    loader.import("home.js", fill(&result));
    loader.complete_fetch(
        "/home.js",
        Ok(vec![home, widget, versioned("react/17.0.2/index.js", "17.0.2")]),
    );
    assert_eq!(requests.urls(), ["/home.js", "/widget.js"]);
    loader.complete_fetch("/widget.js", Ok(vec![versioned("react/18.2.0/index.js", "18.2.0")]));

    let home = exports(&result);
    assert_eq!(home.get("react"), Some(Value::from("17.0.2")));
    assert_eq!(home.get("widget_react"), Some(Value::from("18.2.0")));
}

#[test]
fn preload_executes_before_entries() {
    let fixture = Fixture::new()
        .ships("app/1.0.0/preload.js", "preload.js")
        .ships("app/1.0.0/home.js", "home.js")
        .preload("app/1.0.0/preload.js");
    let (mut loader, requests) = fixture.loader();
    let log = Log::default();

    let result = slot();
    loader.import("home.js", fill(&result));
    assert_eq!(requests.urls(), ["/home.js", "/preload.js"]);

    // The entry arrives first but has to wait for preload.
    loader.complete_fetch("/home.js", Ok(vec![logged(&log, "app/1.0.0/home.js", &[])]));
    assert!(result.borrow().is_none());
    assert_eq!(loader.state("app/1.0.0/home.js"), Some(ModuleState::Resolved));

    loader.complete_fetch(
        "/preload.js",
        Ok(vec![logged(&log, "app/1.0.0/preload.js", &[])]),
    );
    assert_eq!(*log.borrow(), ["app/1.0.0/preload.js", "app/1.0.0/home.js"]);
    assert!(result.borrow().as_ref().is_some_and(|r| r.is_ok()));
}

#[test]
fn async_import_loads_on_demand() {
    let fixture = Fixture::new()
        .ships("app/1.0.0/home.js", "home.js")
        .ships("app/1.0.0/pages/settings.js", "pages-settings.js");
    let (mut loader, requests) = fixture.loader();
    let log = Log::default();

    let settings = slot();
    // The factory is Fn but the callback is FnOnce; hand it over once.
    let callback = RefCell::new(Some(fill(&settings)));
    let home = Registration::new("app/1.0.0/home.js", Vec::<String>::new(), move |scope| {
        if let Some(callback) = callback.borrow_mut().take() {
            scope.import_async("./pages/settings.js", callback);
        }
        Ok(())
    });

    let result = slot();
    loader.import("home.js", fill(&result));
    loader.complete_fetch("/home.js", Ok(vec![home]));
    assert!(result.borrow().is_some());
    assert_eq!(requests.urls(), ["/home.js", "/pages-settings.js"]);

    loader.complete_fetch(
        "/pages-settings.js",
        Ok(vec![logged(&log, "app/1.0.0/pages/settings.js", &[])]),
    );
    assert_eq!(
        exports(&settings).get("name"),
        Some(Value::from("app/1.0.0/pages/settings.js"))
    );
}

#[test]
fn url_dependency_is_a_plain_script() {
    let fixture = Fixture::new().ships("app/1.0.0/home.js", "home.js");
    let (mut loader, requests) = fixture.loader();
    let log = Log::default();

    let result = slot();
    loader.import("home.js", fill(&result));
    loader.complete_fetch(
        "/home.js",
        Ok(vec![logged(
            &log,
            "app/1.0.0/home.js",
            &["https://cdn.example.com/analytics.js"],
        )]),
    );
    assert_eq!(
        requests.urls(),
        ["/home.js", "https://cdn.example.com/analytics.js"]
    );

    loader.complete_fetch("https://cdn.example.com/analytics.js", Ok(Vec::new()));
    assert!(exports(&result).contains("name"));
    assert_eq!(
        loader.state("https://cdn.example.com/analytics.js"),
        Some(ModuleState::Executed)
    );
}
