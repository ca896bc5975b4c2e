//! Module self-registration.
//!
//! A fetched bundle script runs one `define(id, deps, factory)` per module it
//! carries. The host turns those calls into [`Registration`]s and hands them
//! to [`Loader::complete_fetch`](crate::Loader::complete_fetch).

use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::error::{LoaderError, Result};
use crate::exports::Exports;

/// Module body. Runs once, after every dependency has executed (or is part
/// of a cycle with this module and is still executing).
pub type Factory = Rc<dyn Fn(&mut ModuleScope) -> std::result::Result<(), String>>;

/// Receives the outcome of an import.
pub type Callback = Box<dyn FnOnce(Result<Exports>)>;

#[derive(Clone)]
pub struct Registration {
    pub id: String,
    /// Static dependency specifiers, exactly as written in the source.
    pub deps: Vec<String>,
    pub factory: Factory,
}

impl Registration {
    pub fn new(
        id: impl Into<String>,
        deps: impl IntoIterator<Item = impl Into<String>>,
        factory: impl Fn(&mut ModuleScope) -> std::result::Result<(), String> + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            deps: deps.into_iter().map(Into::into).collect(),
            factory: Rc::new(factory),
        }
    }

    /// A module with no dependencies and no exports, e.g. a stylesheet stub.
    pub fn empty(id: impl Into<String>) -> Self {
        Self::new(id, Vec::<String>::new(), |_| Ok(()))
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("id", &self.id)
            .field("deps", &self.deps)
            .finish_non_exhaustive()
    }
}

/// What a factory sees while it runs: `require`, `exports` and
/// `import_async`.
pub struct ModuleScope {
    id: String,
    pub exports: Exports,
    required: FxHashMap<String, Exports>,
    pub(crate) async_imports: Vec<(String, Callback)>,
}

impl ModuleScope {
    pub(crate) fn new(id: String, exports: Exports, required: FxHashMap<String, Exports>) -> Self {
        Self {
            id,
            exports,
            required,
            async_imports: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Exports of a declared dependency.
    pub fn require(&self, specifier: &str) -> Result<Exports> {
        self.required
            .get(specifier)
            .cloned()
            .ok_or_else(|| LoaderError::Undeclared {
                id: self.id.clone(),
                specifier: specifier.to_string(),
            })
    }

    /// Load `specifier` on demand. `callback` runs once it has executed, after
    /// this factory returns.
    pub fn import_async(
        &mut self,
        specifier: impl Into<String>,
        callback: impl FnOnce(Result<Exports>) + 'static,
    ) {
        self.async_imports
            .push((specifier.into(), Box::new(callback)));
    }
}

impl fmt::Debug for ModuleScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleScope")
            .field("id", &self.id)
            .field("exports", &self.exports)
            .field("async_imports", &self.async_imports.len())
            .finish_non_exhaustive()
    }
}
