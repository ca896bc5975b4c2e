//! # bale-loader
//!
//! The loader runtime that consumes a build's `loaderConfig.json`.
//!
//! Bundles register their modules as `(id, deps, factory)` triples. The
//! [`Loader`] fetches the bundle holding a requested module, resolves each
//! declared dependency with the same nearest-scope version lookup the build
//! used (so two versions of a package stay apart at runtime too), and runs
//! factories dependencies first.
//!
//! Every module moves through [`ModuleState`]:
//!
//! ```text
//! INIT → FETCHING → FETCHED → RESOLVING → RESOLVED → EXECUTING → EXECUTED
//!           │                     │                      │
//!           └─────────────────────┴──────────────────────┴──▶ ERROR
//! ```
//!
//! The loader is single threaded and never blocks. The host owns the network:
//! it receives requests through a [`Fetcher`] and reports results with
//! [`Loader::complete_fetch`].
//!
//! ```
//! use bale_graph::LoaderConfig;
//! use bale_loader::{Fetcher, Loader, Registration};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! struct Queue(Rc<RefCell<Vec<String>>>);
//! impl Fetcher for Queue {
//!     fn fetch(&mut self, url: &str) {
//!         self.0.borrow_mut().push(url.to_string());
//!     }
//! }
//!
//! let config = LoaderConfig {
//!     package: "app/1.0.0".into(),
//!     base_url: "/".into(),
//!     ..LoaderConfig::default()
//! };
//! let requested = Rc::new(RefCell::new(Vec::new()));
//! let mut loader = Loader::new(&config, Queue(requested.clone()));
//!
//! let greeting = Rc::new(RefCell::new(None));
//! let slot = greeting.clone();
//! loader.import("app/1.0.0/home.js", move |exports| {
//!     *slot.borrow_mut() = exports.ok().and_then(|e| e.get("greeting"));
//! });
//! assert_eq!(*requested.borrow(), ["/app/1.0.0/home.js"]);
//!
//! loader.complete_fetch(
//!     "/app/1.0.0/home.js",
//!     Ok(vec![Registration::new("app/1.0.0/home.js", Vec::<String>::new(), |scope| {
//!         scope.exports.set("greeting", "hello");
//!         Ok(())
//!     })]),
//! );
//! assert_eq!(*greeting.borrow(), Some("hello".into()));
//! ```

pub mod error;
pub mod exports;
pub mod loader;
pub mod registry;
pub mod resolve;
pub mod state;

pub use error::{LoaderError, NetworkError, Result};
pub use exports::Exports;
pub use loader::{Fetcher, Loader};
pub use registry::{Callback, Factory, ModuleScope, Registration};
pub use resolve::ScopeResolver;
pub use state::ModuleState;
