//! Build sessions.
//!
//! A [`BuildSession`] owns everything that lives for one `build`/`watch`
//! invocation: the filesystem runtime, the module graph, the transpilers and
//! the transpile cache. Builds and reloads take the graph's write lock, so a
//! reload never observes a half-updated graph and vice versa.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use path_clean::PathClean;
use rayon::prelude::*;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use bale_graph::{
    CachedOutput, DependencyTree, Diagnostic, LoaderConfig, ModuleGraph, ModuleIdx, ModuleState,
    Resolver, Runtime, SourceKind, TranspileOutput, TranspilerRegistry,
};

use crate::bundle::{BundlePolicy, compute_bundles};
use crate::cache::{
    ChangeSet, Salt, SingleFlight, TranspileCache, affected_modules, detect_changes, digest,
    is_manifest,
};
use crate::config::BuildConfig;
use crate::output::{
    EmittedBundle, OutputFile, build_loader_config, render_plan, write_files, write_loader_config,
};
use crate::Result;

/// Result of one build.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    /// Emitted bundles in claim order.
    pub bundles: Vec<EmittedBundle>,
    pub loader_config: LoaderConfig,
    /// Rendered bundle and source-map files, relative to the output directory.
    pub files: Vec<OutputFile>,
    /// Recoverable problems found since the previous build.
    pub diagnostics: Vec<Diagnostic>,
    pub stats: BuildStats,
}

impl BuildOutput {
    pub fn bundle(&self, name: &str) -> Option<&EmittedBundle> {
        self.bundles.iter().find(|b| b.name == name)
    }

    pub fn file(&self, name: &str) -> Option<&OutputFile> {
        self.files.iter().find(|f| f.name == name)
    }
}

/// Counters for the build summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub modules: usize,
    pub transpiled: usize,
    pub cache_hits: usize,
}

/// Owned copy of what one transpile needs, so the graph isn't borrowed
/// across the parallel section.
struct Work {
    idx: ModuleIdx,
    id: String,
    path: Option<PathBuf>,
    kind: SourceKind,
    source: Arc<[u8]>,
    digest: String,
}

type Transpiled = (std::result::Result<TranspileOutput, String>, bool);

pub struct BuildSession {
    config: BuildConfig,
    runtime: Arc<dyn Runtime>,
    transpilers: TranspilerRegistry,
    cache: Option<TranspileCache>,
    flight: SingleFlight<(String, String), Transpiled>,
    /// `None` until the installed tree has been loaded, and again after a
    /// manifest change.
    graph: RwLock<Option<ModuleGraph>>,
}

impl std::fmt::Debug for BuildSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildSession")
            .field("root", &self.config.root)
            .field("transpilers", &self.transpilers)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl BuildSession {
    /// Validate `config` and open the transpile cache, if one is configured.
    pub fn new(
        config: BuildConfig,
        runtime: Arc<dyn Runtime>,
        transpilers: TranspilerRegistry,
    ) -> Result<Self> {
        let mut config = config.validate()?;
        if !config.root.is_absolute() {
            let cwd = runtime.get_cwd().map_err(bale_graph::Error::from)?;
            config.root = cwd.join(&config.root).clean();
        }

        let cache = match config.cache_dir_path() {
            Some(dir) => {
                let salt = Salt::compute(&transpilers, &config.transpiler_options);
                Some(TranspileCache::open(&dir, salt)?)
            }
            None => None,
        };

        Ok(Self {
            config,
            runtime,
            transpilers,
            cache,
            flight: SingleFlight::new(),
            graph: RwLock::new(None),
        })
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Run `f` against the current graph (`None` before the first build).
    pub async fn with_graph<R>(&self, f: impl FnOnce(Option<&ModuleGraph>) -> R) -> R {
        let guard = self.graph.read().await;
        f(guard.as_ref())
    }

    /// Compile and write every bundle plus `loaderConfig.json` to the output
    /// directory.
    pub async fn build(&self) -> Result<BuildOutput> {
        let output = self.compile().await?;
        let out_dir = self.config.out_dir_path();
        write_files(&out_dir, &output.files, true)?;
        write_loader_config(&out_dir, &output.loader_config)?;
        info!(
            bundles = output.bundles.len(),
            modules = output.stats.modules,
            transpiled = output.stats.transpiled,
            cache_hits = output.stats.cache_hits,
            out_dir = %out_dir.display(),
            "build complete"
        );
        Ok(output)
    }

    /// Resolve, transpile, compute bundles and render them, without writing.
    pub async fn compile(&self) -> Result<BuildOutput> {
        let mut guard = self.graph.write().await;
        let graph = match guard.take() {
            Some(graph) => graph,
            None => self.load_graph().await?,
        };
        let graph = guard.insert(graph);

        let (entries, preload, lazyload) = {
            let mut resolver = Resolver::new(self.runtime.as_ref(), graph);
            (
                resolver.resolve_all(&self.config.entries).await?,
                resolver.resolve_all(&self.config.preload).await?,
                resolver.resolve_all(&self.config.lazyload).await?,
            )
        };

        let policy = BundlePolicy {
            entries,
            preload,
            lazyload,
            isolate: self.config.isolate.clone(),
        };

        // Every module has to be transpiled before membership is final.
        let mut stats = self.transpile_reachable(graph, &policy);

        let plan = compute_bundles(graph, &policy)?;
        let (bundles, files) = render_plan(graph, &plan, self.config.sourcemap);
        let loader_config = build_loader_config(
            graph,
            &plan,
            &bundles,
            &self.config.base_url,
            &policy.preload,
        );

        let mut diagnostics = graph.take_diagnostics();
        if let Some(cache) = &self.cache {
            diagnostics.extend(cache.take_diagnostics());
        }
        stats.modules = graph.module_count();

        Ok(BuildOutput {
            bundles,
            loader_config,
            files,
            diagnostics,
            stats,
        })
    }

    async fn load_graph(&self) -> Result<ModuleGraph> {
        let (tree, diagnostics) = DependencyTree::load(self.runtime.as_ref(), &self.config.root).await?;
        debug!(packages = tree.node_count(), "loaded dependency tree");
        let mut graph = ModuleGraph::new(&tree);
        for diagnostic in diagnostics {
            graph.push_diagnostic(diagnostic);
        }
        Ok(graph)
    }

    /// Transpile every reachable module whose output is missing or stale.
    fn transpile_reachable(&self, graph: &mut ModuleGraph, policy: &BundlePolicy) -> BuildStats {
        let roots: Vec<ModuleIdx> = policy
            .preload
            .iter()
            .chain(&policy.entries)
            .chain(&policy.lazyload)
            .copied()
            .collect();

        let mut seen = rustc_hash::FxHashSet::default();
        let mut stack = roots;
        let mut work = Vec::new();
        while let Some(idx) = stack.pop() {
            if !seen.insert(idx) {
                continue;
            }
            let node = graph.module(idx);
            stack.extend(node.children.iter().chain(&node.dynamic_children).copied());

            if node.is_external() || node.state != ModuleState::Resolved {
                continue;
            }
            let source_digest = digest(&node.source);
            if node.cache.as_ref().is_some_and(|c| c.digest == source_digest) {
                continue;
            }
            work.push(Work {
                idx,
                id: node.id.clone(),
                path: node.file_path.clone(),
                kind: node.kind,
                source: node.source.clone(),
                digest: source_digest,
            });
        }

        let transpiled: Vec<(ModuleIdx, String, Transpiled)> = work
            .into_par_iter()
            .map(|w| {
                let result = self
                    .flight
                    .run((w.id.clone(), w.digest.clone()), || self.transpile_one(&w));
                (w.idx, w.digest, result)
            })
            .collect();

        let mut stats = BuildStats::default();
        for (idx, source_digest, (result, hit)) in transpiled {
            stats.transpiled += usize::from(!hit);
            stats.cache_hits += usize::from(hit);
            let node = graph.module_mut(idx);
            match result {
                Ok(output) => {
                    node.error = None;
                    node.cache = Some(CachedOutput {
                        code: output.code,
                        map: output.map,
                        digest: source_digest,
                    });
                }
                Err(message) => {
                    warn!(id = %node.id, %message, "transpile failed");
                    node.cache = None;
                    node.error = Some(message);
                }
            }
        }
        stats
    }

    fn transpile_one(&self, work: &Work) -> Transpiled {
        let cache_key = work
            .path
            .as_ref()
            .filter(|_| work.kind.is_transpilable())
            .map(|p| p.to_string_lossy().into_owned());
        let cache = self.cache.as_ref().zip(cache_key.as_deref());

        if let Some((cache, key)) = cache {
            match cache.get(key, &work.source) {
                Ok(Some(hit)) => {
                    debug!(id = %work.id, "transpile cache hit");
                    return (Ok(hit), true);
                }
                Ok(None) => {}
                Err(e) => warn!(id = %work.id, error = %e, "transpile cache read failed"),
            }
        }

        let path = work.path.as_deref().unwrap_or(Path::new(&work.id));
        let result = self.transpilers.transpile(work.kind, path, &work.source);
        debug!(id = %work.id, ok = result.is_ok(), "transpiled");

        if let (Some((cache, key)), Ok(output)) = (cache, &result) {
            if let Err(e) = cache.set(key, &work.source, output) {
                warn!(id = %work.id, error = %e, "transpile cache write failed");
            }
        }
        (result, false)
    }

    /// Apply a filesystem change.
    ///
    /// A `package.json` change discards the graph so the next build reloads
    /// the installed tree. Any other path invalidates the modules read from it,
    /// the stubs it may now satisfy, and the direct importers of both, and
    /// drops the path's cache entry.
    pub async fn reload(&self, path: &Path) -> Result<ChangeSet> {
        let mut guard = self.graph.write().await;

        if is_manifest(path) {
            if guard.take().is_some() {
                info!(path = %path.display(), "manifest changed, discarding module graph");
            }
            return Ok(ChangeSet::full());
        }

        let Some(graph) = guard.as_mut() else {
            return Ok(ChangeSet::default());
        };

        let changes = detect_changes(graph, path);
        if !changes.has_changes() {
            return Ok(changes);
        }

        // Stubs the new file may satisfy must be looked up again, not reused.
        for idx in graph.stubs_satisfied_by(path) {
            graph.detach(idx);
        }
        let (_, affected) = affected_modules(graph, path);
        for idx in affected {
            graph.invalidate(idx);
        }
        if let Some(cache) = &self.cache {
            cache.remove(&path.to_string_lossy())?;
        }

        info!(
            path = %path.display(),
            affected = changes.affected_count(),
            "invalidated modules"
        );
        Ok(changes)
    }
}
