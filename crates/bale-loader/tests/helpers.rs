//! Shared test utilities for bale-loader tests

#![allow(dead_code)]

use bale_graph::{Identifier, LoaderConfig, LockEntry};
use bale_loader::{Exports, Fetcher, Loader, ModuleScope, Registration, Result};
use std::cell::RefCell;
use std::rc::Rc;

/// Records every URL the loader asks for.
#[derive(Debug, Clone, Default)]
pub struct Requests(pub Rc<RefCell<Vec<String>>>);

impl Requests {
    pub fn urls(&self) -> Vec<String> {
        self.0.borrow().clone()
    }
}

impl Fetcher for Requests {
    fn fetch(&mut self, url: &str) {
        self.0.borrow_mut().push(url.to_string());
    }
}

/// Builds a `LoaderConfig` for an `app/1.0.0` root package.
pub struct Fixture {
    config: LoaderConfig,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            config: LoaderConfig {
                package: "app/1.0.0".into(),
                base_url: "/".into(),
                ..LoaderConfig::default()
            },
        }
        .package("app", "1.0.0", &[])
    }

    pub fn package(mut self, name: &str, version: &str, deps: &[(&str, &str)]) -> Self {
        let entry = self
            .config
            .lock
            .0
            .entry(name.to_string())
            .or_default()
            .entry(version.to_string())
            .or_insert_with(LockEntry::default);
        entry.dependencies.extend(
            deps.iter()
                .map(|(n, v)| (n.to_string(), v.to_string())),
        );
        self
    }

    /// Record that module `id` ships in `file`.
    pub fn ships(mut self, id: &str, file: &str) -> Self {
        let ident = Identifier::parse(id);
        let version = ident.version.expect("module ids carry a version");
        self.config
            .lock
            .record_output(&ident.name, &version, &ident.subpath, file);
        self
    }

    pub fn preload(mut self, id: &str) -> Self {
        self.config.preload.push(id.to_string());
        self
    }

    pub fn loader(&self) -> (Loader, Requests) {
        let requests = Requests::default();
        (Loader::new(&self.config, requests.clone()), requests)
    }
}

/// Where an import callback leaves its result.
pub type Slot = Rc<RefCell<Option<Result<Exports>>>>;

pub fn slot() -> Slot {
    Rc::new(RefCell::new(None))
}

pub fn fill(slot: &Slot) -> impl FnOnce(Result<Exports>) + 'static {
    let slot = slot.clone();
    move |result| *slot.borrow_mut() = Some(result)
}

pub fn exports(slot: &Slot) -> Exports {
    match slot.borrow().as_ref() {
        Some(Ok(exports)) => exports.clone(),
        other => panic!("import did not succeed: {other:?}"),
    }
}

/// Execution order, shared by every factory of a test.
pub type Log = Rc<RefCell<Vec<String>>>;

/// A module that appends its id to `log` and exports `name = id`.
pub fn logged(log: &Log, id: &str, deps: &[&str]) -> Registration {
    let log = log.clone();
    Registration::new(id, deps.to_vec(), move |scope: &mut ModuleScope| {
        log.borrow_mut().push(scope.id().to_string());
        scope.exports.set("name", scope.id().to_string());
        Ok(())
    })
}
