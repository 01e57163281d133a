//! Two-phase graph walk: a conflict-resolving traversal over every
//! reachable candidate, then a populate pass that flattens the graph
//! using only the globally winning description per library name.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use tracing::{debug, trace};

use rivet_core::library::{LibraryDescription, LibraryIdentity, TargetFramework};
use rivet_core::version::{Version, VersionRange};
use rivet_util::errors::{RivetError, RivetResult};

use crate::conflict::{ConflictReport, VersionConflict};
use crate::graph::ResolvedGraph;
use crate::provider::DependencyProvider;

/// Winning candidate so far for one library name.
struct Candidate {
    description: Arc<LibraryDescription>,
    depth: usize,
}

/// One recorded request for a library during the walk.
struct Request {
    range: Option<VersionRange>,
    depth: usize,
}

/// Mutable state threaded through one resolution walk. Passing it
/// explicitly keeps the resolver reentrant: concurrent independent
/// requests each carry their own state.
#[derive(Default)]
struct ResolutionState {
    /// Best candidate per case-folded name. Mutable across the whole
    /// walk and finalized only when the traversal completes: a
    /// later-discovered shallow occurrence can displace an earlier
    /// winner at any point.
    best: HashMap<String, Candidate>,
    /// Memoized provider answers per (name, rendered constraint), so
    /// repeated edges do not re-query providers within one walk.
    lookups: HashMap<(String, String), Option<Arc<LibraryDescription>>>,
    /// Every request seen, for conflict reporting.
    requests: HashMap<String, Vec<Request>>,
}

/// Resolve `root_name`/`root_version` against `providers`, flattening
/// the dependency graph to one authoritative description per library
/// name.
///
/// Providers are tried in slice order; the first answer wins for a given
/// name and constraint. A dependency no provider can supply is dropped
/// silently; a root no provider can supply is an error. Provider errors
/// abort the whole request.
pub fn resolve(
    root_name: &str,
    root_version: &Version,
    target: &TargetFramework,
    providers: &[Box<dyn DependencyProvider>],
) -> RivetResult<ResolvedGraph> {
    let mut state = ResolutionState::default();
    let root_range = VersionRange::exact(root_version.clone());
    let mut path = HashSet::new();

    walk(
        &mut state,
        providers,
        target,
        root_name,
        Some(&root_range),
        0,
        &mut path,
    )?;

    let root_key = root_name.to_lowercase();
    if !state.best.contains_key(&root_key) {
        return Err(RivetError::Resolution {
            message: format!("no provider can supply root library {root_name}@{root_version}"),
        }
        .into());
    }

    let mut graph = populate(&state, &root_key);
    graph.conflicts = build_conflicts(&state);

    let final_set: Vec<Arc<LibraryDescription>> =
        graph.all_libraries().into_iter().cloned().collect();
    for provider in providers {
        provider.initialize(&final_set, target)?;
    }

    debug!(
        root = root_name,
        libraries = graph.len(),
        conflicts = graph.conflicts.len(),
        "resolution complete"
    );
    Ok(graph)
}

/// Phase 1: visit every reachable node, recording each encountered
/// candidate into the best-candidate table.
fn walk(
    state: &mut ResolutionState,
    providers: &[Box<dyn DependencyProvider>],
    target: &TargetFramework,
    name: &str,
    range: Option<&VersionRange>,
    depth: usize,
    path: &mut HashSet<LibraryIdentity>,
) -> RivetResult<()> {
    state
        .requests
        .entry(name.to_lowercase())
        .or_default()
        .push(Request {
            range: range.cloned(),
            depth,
        });

    let Some(description) = lookup(state, providers, target, name, range)? else {
        debug!(name, depth, "no provider answered, dropping edge");
        return Ok(());
    };

    record_candidate(state, description.clone(), depth);

    // Candidacy above still counts on a cycle edge; only recursion is cut.
    let identity = description.identity.clone();
    if path.contains(&identity) {
        trace!(%identity, "cycle, cutting traversal");
        return Ok(());
    }

    path.insert(identity.clone());
    for dependency in &description.dependencies {
        walk(
            state,
            providers,
            target,
            &dependency.name,
            dependency.range.as_ref(),
            depth + 1,
            path,
        )?;
    }
    path.remove(&identity);
    Ok(())
}

/// Query providers in priority order, memoized per (name, constraint).
fn lookup(
    state: &mut ResolutionState,
    providers: &[Box<dyn DependencyProvider>],
    target: &TargetFramework,
    name: &str,
    range: Option<&VersionRange>,
) -> RivetResult<Option<Arc<LibraryDescription>>> {
    let memo_key = (
        name.to_lowercase(),
        range.map(|r| r.to_string()).unwrap_or_default(),
    );
    if let Some(answer) = state.lookups.get(&memo_key) {
        return Ok(answer.clone());
    }

    let mut answer = None;
    for provider in providers {
        if let Some(description) = provider.get_description(name, range, target)? {
            answer = Some(description);
            break;
        }
    }
    state.lookups.insert(memo_key, answer.clone());
    Ok(answer)
}

/// Nearest wins; at equal depth the greater version wins; otherwise the
/// existing candidate is kept.
fn record_candidate(state: &mut ResolutionState, description: Arc<LibraryDescription>, depth: usize) {
    use std::collections::hash_map::Entry;

    match state.best.entry(description.identity.key()) {
        Entry::Vacant(slot) => {
            slot.insert(Candidate { description, depth });
        }
        Entry::Occupied(mut slot) => {
            let existing = slot.get();
            let wins = depth < existing.depth
                || (depth == existing.depth
                    && description.identity.version > existing.description.identity.version);
            if wins {
                slot.insert(Candidate { description, depth });
            }
        }
    }
}

/// Phase 2: re-walk from the root substituting the global winner for
/// every name and recursing only into winners' own edges. Anything
/// reachable solely through a rejected candidate never appears.
fn populate(state: &ResolutionState, root_key: &str) -> ResolvedGraph {
    let mut graph = ResolvedGraph::new();
    let root_idx = graph.add_library(state.best[root_key].description.clone());
    graph.set_root(root_idx);

    let mut queue: VecDeque<String> = VecDeque::new();
    let mut visited: HashSet<String> = HashSet::new();
    queue.push_back(root_key.to_string());

    while let Some(key) = queue.pop_front() {
        if !visited.insert(key.clone()) {
            continue;
        }
        let winner = &state.best[&key];
        let from = graph.add_library(winner.description.clone());
        for dependency in &winner.description.dependencies {
            let dep_key = dependency.key();
            let Some(candidate) = state.best.get(&dep_key) else {
                // unresolved edge, dropped in phase 1
                continue;
            };
            let to = graph.add_library(candidate.description.clone());
            graph.add_edge(from, to);
            queue.push_back(dep_key);
        }
    }

    graph
}

/// A conflict is any recorded constraint the winning version fails to
/// satisfy. Reported sorted by name for deterministic output.
fn build_conflicts(state: &ResolutionState) -> ConflictReport {
    let mut report = ConflictReport::new();
    let mut keys: Vec<&String> = state.requests.keys().collect();
    keys.sort();

    for key in keys {
        let Some(winner) = state.best.get(key) else {
            continue;
        };
        let resolved = &winner.description.identity.version;
        let mut seen = HashSet::new();
        for request in &state.requests[key] {
            let Some(range) = &request.range else {
                continue;
            };
            if range.satisfies(resolved) {
                continue;
            }
            let rendered = range.to_string();
            if !seen.insert((rendered.clone(), request.depth)) {
                continue;
            }
            let reason = if request.depth == winner.depth {
                format!("higher version wins at depth {}", winner.depth)
            } else {
                format!("nearest wins (depth {} vs {})", winner.depth, request.depth)
            };
            report.add(VersionConflict {
                name: winner.description.identity.name.clone(),
                requested: rendered,
                resolved: resolved.clone(),
                reason,
            });
        }
    }

    report
}
