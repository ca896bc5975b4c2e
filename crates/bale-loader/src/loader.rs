//! The module loader.
//!
//! Everything is driven by two kinds of events: [`Loader::import`] calls and
//! fetch completions delivered through [`Loader::complete_fetch`]. Nothing
//! blocks and nothing polls; each event advances module states as far as it
//! can and runs whatever callbacks became ready.
//!
//! Readiness is checked per request by walking the requested module's
//! dependency closure. Once the whole closure is registered and linked, every
//! module in it moves to `Resolved` together, which is what lets import cycles
//! resolve.

use std::collections::VecDeque;

use bale_graph::{Identifier, LoaderConfig};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace, warn};

use crate::error::{LoaderError, NetworkError, Result};
use crate::exports::Exports;
use crate::registry::{Callback, Factory, ModuleScope, Registration};
use crate::resolve::ScopeResolver;
use crate::state::ModuleState;

/// Issues script requests on behalf of the loader.
pub trait Fetcher {
    /// Start loading the script at `url`. The host reports the outcome with
    /// [`Loader::complete_fetch`], possibly much later.
    fn fetch(&mut self, url: &str);
}

#[derive(Default)]
struct ModuleRecord {
    id: String,
    state: ModuleState,
    deps: Vec<String>,
    /// `deps` resolved to module indices, once linked.
    resolved: Vec<usize>,
    factory: Option<Factory>,
    exports: Exports,
    error: Option<LoaderError>,
}

struct Request {
    target: usize,
    callback: Callback,
}

enum Readiness {
    Ready,
    Pending,
    Failed(LoaderError),
}

pub struct Loader {
    resolver: ScopeResolver,
    fetcher: Box<dyn Fetcher>,
    modules: Vec<ModuleRecord>,
    by_id: FxHashMap<String, usize>,
    /// URL → modules waiting on it.
    in_flight: FxHashMap<String, Vec<usize>>,
    preload: Vec<usize>,
    started: bool,
    preloaded: bool,
    requests: VecDeque<Request>,
}

impl std::fmt::Debug for Loader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Loader")
            .field("modules", &self.modules.len())
            .field("in_flight", &self.in_flight.keys().collect::<Vec<_>>())
            .field("pending_imports", &self.requests.len())
            .finish_non_exhaustive()
    }
}

impl Loader {
    pub fn new(config: &LoaderConfig, fetcher: impl Fetcher + 'static) -> Self {
        let mut loader = Self {
            resolver: ScopeResolver::new(config),
            fetcher: Box::new(fetcher),
            modules: Vec::new(),
            by_id: FxHashMap::default(),
            in_flight: FxHashMap::default(),
            preload: Vec::new(),
            started: false,
            preloaded: false,
            requests: VecDeque::new(),
        };
        let preload: Vec<usize> = config.preload.iter().map(|id| loader.record(id)).collect();
        loader.preload = preload;
        loader
    }

    pub fn state(&self, id: &str) -> Option<ModuleState> {
        self.by_id.get(id).map(|&idx| self.modules[idx].state)
    }

    /// Exports of a module that has started executing.
    pub fn exports(&self, id: &str) -> Option<Exports> {
        let record = &self.modules[*self.by_id.get(id)?];
        matches!(record.state, ModuleState::Executing | ModuleState::Executed)
            .then(|| record.exports.clone())
    }

    pub fn error(&self, id: &str) -> Option<&LoaderError> {
        self.by_id
            .get(id)
            .and_then(|&idx| self.modules[idx].error.as_ref())
    }

    /// URLs requested and not yet completed.
    pub fn in_flight(&self) -> impl Iterator<Item = &str> {
        self.in_flight.keys().map(String::as_str)
    }

    /// Resolve `specifier` the way an import from `from` would.
    pub fn resolve(&mut self, from: Option<&str>, specifier: &str) -> String {
        self.resolver.resolve(from, specifier)
    }

    /// Begin loading the preload modules. Called implicitly by the first
    /// [`Loader::import`].
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        debug!(preload = self.preload.len(), "loader started");
        for idx in self.preload.clone() {
            self.ensure(idx);
        }
        self.settle();
    }

    /// Load, resolve and execute `specifier`, then hand its exports to
    /// `callback`. Preload modules always execute first.
    pub fn import(&mut self, specifier: &str, callback: impl FnOnce(Result<Exports>) + 'static) {
        let id = self.resolver.resolve(None, specifier);
        debug!(specifier, %id, "import");
        let target = self.record(&id);
        self.requests.push_back(Request {
            target,
            callback: Box::new(callback),
        });
        self.ensure(target);
        if self.started {
            self.settle();
        } else {
            self.start();
        }
    }

    /// Register a module outside of any fetch, e.g. from an inline script.
    pub fn define(&mut self, registration: Registration) {
        if let Some(idx) = self.register(registration) {
            self.link(idx);
        }
        self.settle();
    }

    /// Deliver the outcome of a fetch started through the [`Fetcher`].
    ///
    /// On success the script's registrations are applied; modules that were
    /// waiting on `url` but not registered by it fail, except URL modules,
    /// which are plain scripts and get empty exports. On failure every module
    /// waiting on `url` fails, and so does everything depending on them.
    pub fn complete_fetch(
        &mut self,
        url: &str,
        result: std::result::Result<Vec<Registration>, NetworkError>,
    ) {
        let waiting = self.in_flight.remove(url).unwrap_or_default();
        if waiting.is_empty() {
            debug!(url, "completion for a URL nothing is waiting on");
        }

        match result {
            Ok(registrations) => {
                debug!(url, modules = registrations.len(), "fetched");
                // Register the whole script before linking anything, so
                // dependencies it carries aren't requested again.
                let wanted: Vec<usize> = registrations
                    .into_iter()
                    .filter_map(|registration| self.register(registration))
                    .collect();
                for idx in wanted {
                    self.link(idx);
                }
                for idx in waiting {
                    if self.modules[idx].state != ModuleState::Fetching {
                        continue;
                    }
                    let id = self.modules[idx].id.clone();
                    if Identifier::is_url(&id) {
                        if let Some(idx) = self.register(Registration::empty(id)) {
                            self.link(idx);
                        }
                    } else {
                        warn!(%id, url, "fetched script does not define module");
                        self.fail(
                            idx,
                            LoaderError::NotDefined {
                                id,
                                url: url.to_string(),
                            },
                        );
                    }
                }
            }
            Err(source) => {
                warn!(url, error = %source, "fetch failed");
                for idx in waiting {
                    let id = self.modules[idx].id.clone();
                    self.fail(
                        idx,
                        LoaderError::NetworkFailure {
                            id,
                            url: url.to_string(),
                            source: source.clone(),
                        },
                    );
                }
            }
        }
        self.settle();
    }

    fn record(&mut self, id: &str) -> usize {
        if let Some(&idx) = self.by_id.get(id) {
            return idx;
        }
        let idx = self.modules.len();
        self.modules.push(ModuleRecord {
            id: id.to_string(),
            ..ModuleRecord::default()
        });
        self.by_id.insert(id.to_string(), idx);
        idx
    }

    fn transition(&mut self, idx: usize, next: ModuleState) -> bool {
        let record = &mut self.modules[idx];
        if !record.state.can_advance_to(next) {
            trace!(id = %record.id, from = %record.state, to = %next, "transition ignored");
            return false;
        }
        trace!(id = %record.id, from = %record.state, to = %next, "module state");
        record.state = next;
        true
    }

    fn fail(&mut self, idx: usize, error: LoaderError) {
        if self.transition(idx, ModuleState::Error) {
            self.modules[idx].error = Some(error);
        }
    }

    fn error_of(&self, idx: usize) -> LoaderError {
        let record = &self.modules[idx];
        record.error.clone().unwrap_or_else(|| LoaderError::NotDefined {
            id: record.id.clone(),
            url: self.resolver.url_for(&record.id),
        })
    }

    /// Store a registration. Returns the module's index when something was
    /// already waiting for it, in which case the caller links it.
    fn register(&mut self, registration: Registration) -> Option<usize> {
        let idx = self.record(&registration.id);
        let wanted = match self.modules[idx].state {
            ModuleState::Init => false,
            ModuleState::Fetching => true,
            state => {
                debug!(id = %registration.id, %state, "ignoring duplicate registration");
                return None;
            }
        };
        let record = &mut self.modules[idx];
        record.deps = registration.deps;
        record.factory = Some(registration.factory);
        self.transition(idx, ModuleState::Fetched);
        wanted.then_some(idx)
    }

    /// Make sure `idx` is on its way to being resolved.
    fn ensure(&mut self, idx: usize) {
        match self.modules[idx].state {
            ModuleState::Init => {
                let url = self.resolver.url_for(&self.modules[idx].id);
                self.transition(idx, ModuleState::Fetching);
                let waiting = self.in_flight.entry(url.clone()).or_default();
                waiting.push(idx);
                if waiting.len() == 1 {
                    debug!(%url, id = %self.modules[idx].id, "fetching");
                    self.fetcher.fetch(&url);
                }
            }
            ModuleState::Fetched => self.link(idx),
            _ => {}
        }
    }

    /// Resolve a registered module's dependencies and request them.
    fn link(&mut self, idx: usize) {
        if !self.transition(idx, ModuleState::Resolving) {
            return;
        }
        let id = self.modules[idx].id.clone();
        let deps = self.modules[idx].deps.clone();
        let resolved: Vec<usize> = deps
            .iter()
            .map(|specifier| {
                let dep_id = self.resolver.resolve(Some(&id), specifier);
                self.record(&dep_id)
            })
            .collect();
        self.modules[idx].resolved = resolved.clone();
        for dep in resolved {
            self.ensure(dep);
        }
    }

    /// Walk the dependency closure of `root`, returning the modules visited,
    /// those not linked yet and those in `Error`.
    fn closure(&self, root: usize) -> (Vec<usize>, Vec<usize>, Vec<usize>) {
        let mut seen = FxHashSet::default();
        let mut order = Vec::new();
        let mut unlinked = Vec::new();
        let mut failed = Vec::new();
        let mut stack = vec![root];
        while let Some(idx) = stack.pop() {
            if !seen.insert(idx) {
                continue;
            }
            order.push(idx);
            let record = &self.modules[idx];
            match record.state {
                ModuleState::Error => failed.push(idx),
                state if state.is_linked() => stack.extend(record.resolved.iter().copied()),
                _ => unlinked.push(idx),
            }
        }
        (order, unlinked, failed)
    }

    fn readiness(&mut self, root: usize) -> Readiness {
        let (order, failed) = loop {
            let (order, unlinked, failed) = self.closure(root);
            let startable: Vec<usize> = unlinked
                .into_iter()
                .filter(|&idx| {
                    matches!(
                        self.modules[idx].state,
                        ModuleState::Init | ModuleState::Fetched
                    )
                })
                .collect();
            if startable.is_empty() {
                break (order, failed);
            }
            for idx in startable {
                self.ensure(idx);
            }
        };

        if !failed.is_empty() {
            self.poison(&order, &failed);
            return match self.modules[root].state {
                ModuleState::Error => Readiness::Failed(self.error_of(root)),
                ModuleState::Executing | ModuleState::Executed => Readiness::Ready,
                _ => Readiness::Pending,
            };
        }
        if order
            .iter()
            .any(|&idx| !self.modules[idx].state.is_linked())
        {
            return Readiness::Pending;
        }
        for idx in order {
            if self.modules[idx].state == ModuleState::Resolving {
                self.transition(idx, ModuleState::Resolved);
            }
        }
        Readiness::Ready
    }

    /// Fail every module in `order` that depends, directly or not, on one of
    /// the `failed` modules.
    fn poison(&mut self, order: &[usize], failed: &[usize]) {
        let members: FxHashSet<usize> = order.iter().copied().collect();
        let mut dependents: FxHashMap<usize, Vec<usize>> = FxHashMap::default();
        for &idx in order {
            if self.modules[idx].state.is_linked() {
                for &dep in &self.modules[idx].resolved {
                    if members.contains(&dep) {
                        dependents.entry(dep).or_default().push(idx);
                    }
                }
            }
        }

        for &bad in failed {
            let mut seen = FxHashSet::from_iter([bad]);
            let mut queue = VecDeque::from([bad]);
            while let Some(current) = queue.pop_front() {
                let Some(parents) = dependents.get(&current) else {
                    continue;
                };
                for &parent in parents {
                    if !seen.insert(parent) {
                        continue;
                    }
                    queue.push_back(parent);
                    if matches!(
                        self.modules[parent].state,
                        ModuleState::Executing | ModuleState::Executed | ModuleState::Error
                    ) {
                        continue;
                    }
                    let cause = match &self.modules[current].error {
                        Some(error) => error.clone(),
                        None => self.error_of(bad),
                    };
                    let error = LoaderError::Dependency {
                        id: self.modules[parent].id.clone(),
                        failed: self.modules[current].id.clone(),
                        cause: Box::new(cause),
                    };
                    debug!(id = %self.modules[parent].id, failed = %self.modules[current].id, "dependency failed");
                    self.fail(parent, error);
                }
            }
        }
    }

    /// Run preload once it is ready, then every import that is ready, until
    /// nothing else can make progress.
    fn settle(&mut self) {
        loop {
            let mut progressed = false;

            if self.started && !self.preloaded {
                let mut ready = true;
                for idx in self.preload.clone() {
                    match self.readiness(idx) {
                        Readiness::Pending => ready = false,
                        Readiness::Failed(error) => warn!(%error, "preload module failed"),
                        Readiness::Ready => {}
                    }
                }
                if ready {
                    for idx in self.preload.clone() {
                        if let Err(error) = self.execute(idx) {
                            warn!(%error, "preload module failed");
                        }
                    }
                    self.preloaded = true;
                    progressed = true;
                }
            }

            // Imports keep resolving while preload is outstanding; they only
            // wait to execute.
            let mut waiting = VecDeque::new();
            while let Some(request) = self.requests.pop_front() {
                match self.readiness(request.target) {
                    Readiness::Pending => waiting.push_back(request),
                    Readiness::Ready if !self.preloaded => waiting.push_back(request),
                    Readiness::Ready => {
                        let result = self.execute(request.target);
                        (request.callback)(result);
                        progressed = true;
                    }
                    Readiness::Failed(error) => {
                        (request.callback)(Err(error));
                        progressed = true;
                    }
                }
            }
            self.requests = waiting;

            if !progressed {
                return;
            }
        }
    }

    /// Execute `idx` after its dependencies. A dependency that is already
    /// executing is part of a cycle; its exports are used as they are.
    fn execute(&mut self, idx: usize) -> Result<Exports> {
        match self.modules[idx].state {
            ModuleState::Executing | ModuleState::Executed => {
                return Ok(self.modules[idx].exports.clone());
            }
            ModuleState::Error => return Err(self.error_of(idx)),
            _ => {}
        }
        self.transition(idx, ModuleState::Executing);
        let id = self.modules[idx].id.clone();

        let resolved = self.modules[idx].resolved.clone();
        for &dep in &resolved {
            if let Err(cause) = self.execute(dep) {
                let error = LoaderError::Dependency {
                    id: id.clone(),
                    failed: self.modules[dep].id.clone(),
                    cause: Box::new(cause),
                };
                self.fail(idx, error.clone());
                return Err(error);
            }
        }

        let record = &self.modules[idx];
        let required = record
            .deps
            .iter()
            .cloned()
            .zip(resolved.iter().map(|&dep| self.modules[dep].exports.clone()))
            .collect();
        let mut scope = ModuleScope::new(id.clone(), record.exports.clone(), required);
        if let Some(factory) = record.factory.clone() {
            debug!(%id, "executing");
            if let Err(message) = factory(&mut scope) {
                warn!(%id, %message, "module factory failed");
                let error = LoaderError::Factory {
                    id: id.clone(),
                    message,
                };
                self.fail(idx, error.clone());
                return Err(error);
            }
        }
        self.transition(idx, ModuleState::Executed);

        for (specifier, callback) in std::mem::take(&mut scope.async_imports) {
            let target_id = self.resolver.resolve(Some(&id), &specifier);
            let target = self.record(&target_id);
            self.requests.push_back(Request { target, callback });
        }
        Ok(scope.exports)
    }
}
