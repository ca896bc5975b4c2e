//! Membership computation.
//!
//! Bundles claim modules in a fixed order and each one takes only what no
//! earlier bundle has claimed:
//!
//! 1. isolated packages, dependencies before dependents
//! 2. preload roots, in configuration order
//! 3. entries (against the claims of 1-2 only; entries are page alternatives)
//! 4. lazyload roots
//! 5. dynamic-import targets nothing above covered
//!
//! Eager traversals stop at lazyload roots. External modules are never members.

use std::collections::{BTreeSet, VecDeque};

use rustc_hash::FxHashSet;
use tracing::debug;

use bale_graph::{ModuleGraph, ModuleIdx, OutputFormat, PacketIdx};

use super::naming::{bundle_name, sanitize};
use super::{Bundle, BundleKind, BundlePlan};
use crate::Result;

/// Resolved inputs for [`compute_bundles`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundlePolicy {
    pub entries: Vec<ModuleIdx>,
    pub preload: Vec<ModuleIdx>,
    pub lazyload: Vec<ModuleIdx>,
    /// Package names; every resolved version of each becomes its own bundle.
    pub isolate: Vec<String>,
}

impl BundlePolicy {
    fn roots(&self) -> impl Iterator<Item = ModuleIdx> + '_ {
        self.preload
            .iter()
            .chain(&self.entries)
            .chain(&self.lazyload)
            .copied()
    }
}

/// A bundle before the JS/CSS split.
struct Claim {
    name: String,
    kind: BundleKind,
    roots: Vec<ModuleIdx>,
    members: BTreeSet<ModuleIdx>,
}

struct Isolated {
    packet: PacketIdx,
    roots: Vec<ModuleIdx>,
    closure: BTreeSet<ModuleIdx>,
    depends_on: FxHashSet<PacketIdx>,
}

/// Partition the reachable graph into bundles.
///
/// Fails with `TranspileFailure` if any bundle member carries a transpile
/// error; the reported chain starts at one of the policy roots.
pub fn compute_bundles(graph: &ModuleGraph, policy: &BundlePolicy) -> Result<BundlePlan> {
    let lazy: FxHashSet<ModuleIdx> = policy.lazyload.iter().copied().collect();
    let mut claimed: FxHashSet<ModuleIdx> = graph
        .modules()
        .filter(|(_, m)| m.is_external())
        .map(|(idx, _)| idx)
        .collect();
    let mut names = FxHashSet::default();
    let mut claims = Vec::new();

    for isolated in isolated_packets(graph, policy) {
        let members: BTreeSet<ModuleIdx> = isolated
            .closure
            .iter()
            .copied()
            .filter(|idx| !claimed.contains(idx))
            .filter(|idx| {
                graph
                    .module(*idx)
                    .packet
                    .is_none_or(|p| p == isolated.packet || !is_isolated(graph, policy, p))
            })
            .collect();
        claimed.extend(members.iter().copied());
        let packet = graph.packet(isolated.packet);
        claims.push(Claim {
            name: unique_name(&mut names, sanitize(&packet.name)),
            kind: BundleKind::Isolated,
            roots: isolated.roots,
            members,
        });
    }

    for &root in &policy.preload {
        let members = subtract(static_closure(graph, &[root], &lazy), &claimed);
        claimed.extend(members.iter().copied());
        claims.push(Claim {
            name: unique_name(&mut names, bundle_name(graph, root)),
            kind: BundleKind::Preload,
            roots: vec![root],
            members,
        });
    }

    let mut entry_union = FxHashSet::default();
    for &root in &policy.entries {
        let members = subtract(static_closure(graph, &[root], &lazy), &claimed);
        entry_union.extend(members.iter().copied());
        claims.push(Claim {
            name: unique_name(&mut names, bundle_name(graph, root)),
            kind: BundleKind::Entry,
            roots: vec![root],
            members,
        });
    }
    // A lazy bundle can load next to any entry, so it subtracts all of them.
    // On a page whose entry lacks a shared member, that member arrives with
    // the entry bundle that has it.
    claimed.extend(entry_union);

    for &root in &policy.lazyload {
        let others: FxHashSet<ModuleIdx> = lazy.iter().copied().filter(|&l| l != root).collect();
        let members = subtract(static_closure(graph, &[root], &others), &claimed);
        claimed.extend(members.iter().copied());
        claims.push(Claim {
            name: unique_name(&mut names, bundle_name(graph, root)),
            kind: BundleKind::Lazyload,
            roots: vec![root],
            members,
        });
    }

    let mut pending: VecDeque<ModuleIdx> = claims
        .iter()
        .flat_map(|c| dynamic_targets(graph, &c.members))
        .collect();
    while let Some(target) = pending.pop_front() {
        if claimed.contains(&target) {
            continue;
        }
        let members = subtract(static_closure(graph, &[target], &lazy), &claimed);
        claimed.extend(members.iter().copied());
        pending.extend(dynamic_targets(graph, &members));
        claims.push(Claim {
            name: unique_name(&mut names, bundle_name(graph, target)),
            kind: BundleKind::Dynamic,
            roots: vec![target],
            members,
        });
    }

    check_failures(graph, policy, &claims)?;

    let plan = split_formats(graph, claims);
    debug!(bundles = plan.len(), "computed bundle plan");
    Ok(plan)
}

/// Static closure of `roots`, not entering `boundary` (roots themselves are
/// always included).
fn static_closure(
    graph: &ModuleGraph,
    roots: &[ModuleIdx],
    boundary: &FxHashSet<ModuleIdx>,
) -> BTreeSet<ModuleIdx> {
    let mut seen = BTreeSet::new();
    let mut stack = roots.to_vec();
    while let Some(idx) = stack.pop() {
        if !seen.insert(idx) {
            continue;
        }
        stack.extend(
            graph
                .module(idx)
                .children
                .iter()
                .copied()
                .filter(|child| !boundary.contains(child)),
        );
    }
    seen
}

fn subtract(set: BTreeSet<ModuleIdx>, claimed: &FxHashSet<ModuleIdx>) -> BTreeSet<ModuleIdx> {
    set.into_iter().filter(|idx| !claimed.contains(idx)).collect()
}

fn dynamic_targets<'a>(
    graph: &'a ModuleGraph,
    members: &'a BTreeSet<ModuleIdx>,
) -> impl Iterator<Item = ModuleIdx> + 'a {
    members
        .iter()
        .flat_map(move |&idx| graph.module(idx).dynamic_children.iter().copied())
}

fn is_isolated(graph: &ModuleGraph, policy: &BundlePolicy, packet: PacketIdx) -> bool {
    policy.isolate.contains(&graph.packet(packet).name)
}

fn unique_name(taken: &mut FxHashSet<String>, base: String) -> String {
    if taken.insert(base.clone()) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{base}-{n}");
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

/// Isolated packets reachable from the policy roots, ordered so that a packet
/// comes after every other isolated packet its closure reaches. Ties and
/// cycles fall back to `(name, version)` order.
fn isolated_packets(graph: &ModuleGraph, policy: &BundlePolicy) -> Vec<Isolated> {
    if policy.isolate.is_empty() {
        return Vec::new();
    }

    let reachable = reachable(graph, policy.roots());
    let mut packets: Vec<PacketIdx> = reachable
        .iter()
        .filter_map(|&idx| graph.module(idx).packet)
        .filter(|&p| is_isolated(graph, policy, p))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    packets.sort_by(|a, b| {
        let (a, b) = (graph.packet(*a), graph.packet(*b));
        (&a.name, &a.version).cmp(&(&b.name, &b.version))
    });

    let mut pending: Vec<Isolated> = packets
        .iter()
        .map(|&packet| {
            let roots: Vec<ModuleIdx> = reachable
                .iter()
                .copied()
                .filter(|&idx| graph.module(idx).packet == Some(packet))
                .collect();
            let closure = static_closure(graph, &roots, &FxHashSet::default());
            let depends_on = closure
                .iter()
                .filter_map(|&idx| graph.module(idx).packet)
                .filter(|&p| p != packet && packets.contains(&p))
                .collect();
            Isolated {
                packet,
                roots,
                closure,
                depends_on,
            }
        })
        .collect();

    let mut placed = FxHashSet::default();
    let mut ordered = Vec::with_capacity(pending.len());
    while !pending.is_empty() {
        let next = pending
            .iter()
            .position(|p| p.depends_on.iter().all(|d| placed.contains(d)))
            .unwrap_or(0);
        let isolated = pending.remove(next);
        placed.insert(isolated.packet);
        ordered.push(isolated);
    }
    ordered
}

/// Every module reachable over static and dynamic edges.
fn reachable(graph: &ModuleGraph, roots: impl Iterator<Item = ModuleIdx>) -> BTreeSet<ModuleIdx> {
    let mut seen = BTreeSet::new();
    let mut stack: Vec<ModuleIdx> = roots.collect();
    while let Some(idx) = stack.pop() {
        if seen.insert(idx) {
            let node = graph.module(idx);
            stack.extend(node.children.iter().chain(&node.dynamic_children).copied());
        }
    }
    seen
}

fn check_failures(graph: &ModuleGraph, policy: &BundlePolicy, claims: &[Claim]) -> Result<()> {
    let roots: Vec<ModuleIdx> = policy.roots().collect();
    for claim in claims {
        for &idx in &claim.members {
            let node = graph.module(idx);
            if let Some(message) = &node.error {
                let mut chain = graph.dependency_chain(&roots, idx);
                if chain.is_empty() {
                    chain = graph.dependency_chain(&claim.roots, idx);
                }
                return Err(bale_graph::Error::TranspileFailure {
                    id: node.id.clone(),
                    chain,
                    message: message.clone(),
                }
                .into());
            }
        }
    }
    Ok(())
}

/// Split each claim into a JS bundle and, when it holds stylesheets, a CSS
/// sibling with the same name. Empty non-entry bundles are dropped.
fn split_formats(graph: &ModuleGraph, claims: Vec<Claim>) -> BundlePlan {
    let mut bundles = Vec::with_capacity(claims.len());
    for claim in claims {
        let (css, js): (BTreeSet<ModuleIdx>, BTreeSet<ModuleIdx>) = claim
            .members
            .into_iter()
            .partition(|&idx| graph.module(idx).kind.is_stylesheet());

        if claim.kind == BundleKind::Entry || !js.is_empty() || !css.is_empty() {
            bundles.push(Bundle {
                name: claim.name.clone(),
                kind: claim.kind,
                format: OutputFormat::Js,
                roots: claim.roots.clone(),
                members: js,
            });
        }
        if !css.is_empty() {
            bundles.push(Bundle {
                name: claim.name,
                kind: claim.kind,
                format: OutputFormat::Css,
                roots: claim.roots,
                members: css,
            });
        }
    }
    BundlePlan { bundles }
}
