//! End-to-end resolution scenarios: conflict resolution, pruning,
//! dropped edges, and cycle handling.

use std::collections::HashMap;
use std::sync::Arc;

use rivet_core::library::{
    DependencySpec, LibraryDescription, LibraryIdentity, LibraryKind, TargetFramework,
};
use rivet_core::version::{Version, VersionRange};
use rivet_resolver::provider::{DependencyProvider, ProjectReferenceProvider};
use rivet_resolver::resolve;
use rivet_util::errors::RivetResult;

fn v(s: &str) -> Version {
    s.parse().unwrap()
}

fn target() -> TargetFramework {
    TargetFramework::new("rivet-1.0")
}

/// An in-memory multi-version package source. Each dependency edge is an
/// exact-version constraint; lookups return the highest stored version
/// satisfying the requested range.
#[derive(Default)]
struct MapProvider {
    libs: HashMap<String, Vec<Arc<LibraryDescription>>>,
}

impl MapProvider {
    fn new() -> Self {
        Self::default()
    }

    fn add(&mut self, name: &str, version: &str, deps: &[(&str, &str)]) {
        let dependencies = deps
            .iter()
            .map(|(dep, dep_version)| {
                DependencySpec::new(*dep, Some(VersionRange::exact(v(dep_version))))
            })
            .collect();
        let description =
            LibraryDescription::new(LibraryIdentity::new(name, v(version)), LibraryKind::Package)
                .with_dependencies(dependencies);
        self.libs
            .entry(name.to_lowercase())
            .or_default()
            .push(Arc::new(description));
    }
}

impl DependencyProvider for MapProvider {
    fn get_description(
        &self,
        name: &str,
        range: Option<&VersionRange>,
        _target: &TargetFramework,
    ) -> RivetResult<Option<Arc<LibraryDescription>>> {
        let Some(candidates) = self.libs.get(&name.to_lowercase()) else {
            return Ok(None);
        };
        Ok(candidates
            .iter()
            .filter(|d| range.map_or(true, |r| r.satisfies(&d.identity.version)))
            .max_by(|a, b| a.identity.version.cmp(&b.identity.version))
            .cloned())
    }

    fn initialize(
        &self,
        _resolved: &[Arc<LibraryDescription>],
        _target: &TargetFramework,
    ) -> RivetResult<()> {
        Ok(())
    }
}

fn providers(map: MapProvider) -> Vec<Box<dyn DependencyProvider>> {
    vec![Box::new(map)]
}

#[test]
fn nearest_wins_beats_higher_transitive_versions() {
    let mut map = MapProvider::new();
    map.add("root", "1.0.0", &[("b", "1.0.0"), ("c", "1.0.0"), ("x", "1.0.0")]);
    map.add("b", "1.0.0", &[("x", "2.0.0")]);
    map.add("c", "1.0.0", &[("x", "2.0.0")]);
    map.add("x", "1.0.0", &[]);
    map.add("x", "2.0.0", &[]);

    let graph = resolve("root", &v("1.0.0"), &target(), &providers(map)).unwrap();
    assert_eq!(graph.library("x").unwrap().identity.version, v("1.0.0"));

    // the transitive x@2.0 requests lost to the direct x@1.0
    assert_eq!(graph.conflicts.len(), 1);
    assert!(graph.conflicts.to_string().contains("nearest wins"));
}

#[test]
fn equal_depth_highest_version_wins() {
    let mut map = MapProvider::new();
    map.add("root", "1.0.0", &[("b", "1.0.0"), ("c", "1.0.0")]);
    map.add("b", "1.0.0", &[("x", "1.0.0")]);
    map.add("c", "1.0.0", &[("x", "2.0.0")]);
    map.add("x", "1.0.0", &[]);
    map.add("x", "2.0.0", &[]);

    let graph = resolve("root", &v("1.0.0"), &target(), &providers(map)).unwrap();
    assert_eq!(graph.library("x").unwrap().identity.version, v("2.0.0"));
    assert!(graph.conflicts.to_string().contains("higher version wins"));
}

#[test]
fn rejected_candidates_subtree_is_pruned() {
    let mut map = MapProvider::new();
    map.add("root", "1.0.0", &[("b", "1.0.0"), ("c", "1.0.0")]);
    map.add("b", "1.0.0", &[("d", "1.0.0")]);
    map.add("c", "1.0.0", &[("d", "2.0.0"), ("e", "1.0.0")]);
    map.add("d", "1.0.0", &[("e", "2.0.0")]);
    map.add("d", "2.0.0", &[]);
    map.add("e", "1.0.0", &[("x", "1.0.0")]);
    map.add("e", "2.0.0", &[("x", "2.0.0")]);
    map.add("x", "1.0.0", &[]);
    map.add("x", "2.0.0", &[]);

    let graph = resolve("root", &v("1.0.0"), &target(), &providers(map)).unwrap();

    // d@2.0 beats d@1.0 at equal depth, and d@2.0 has no dependencies,
    // so the edge d@1.0 -> e@2.0 is gone with its subtree
    assert_eq!(graph.library("d").unwrap().identity.version, v("2.0.0"));
    assert_eq!(graph.library("e").unwrap().identity.version, v("1.0.0"));
    assert_eq!(graph.library("x").unwrap().identity.version, v("1.0.0"));
}

#[test]
fn unknown_dependency_is_dropped_not_fatal() {
    let mut map = MapProvider::new();
    map.add("root", "1.0.0", &[("lib", "1.0.0"), ("z", "1.0.0")]);
    map.add("lib", "1.0.0", &[]);

    let graph = resolve("root", &v("1.0.0"), &target(), &providers(map)).unwrap();
    assert!(graph.library("lib").is_some());
    assert!(graph.library("z").is_none());
    assert_eq!(graph.len(), 1);
}

#[test]
fn cycles_terminate() {
    let mut map = MapProvider::new();
    map.add("a", "1.0.0", &[("b", "1.0.0")]);
    map.add("b", "1.0.0", &[("c", "1.0.0")]);
    map.add("c", "1.0.0", &[("a", "1.0.0")]);

    let graph = resolve("a", &v("1.0.0"), &target(), &providers(map)).unwrap();
    let names: Vec<String> = graph
        .all_libraries()
        .iter()
        .map(|d| d.identity.name.clone())
        .collect();
    assert_eq!(names, ["a", "b", "c"]);
}

#[test]
fn self_cycle_terminates() {
    let mut map = MapProvider::new();
    map.add("a", "1.0.0", &[("a", "1.0.0")]);

    let graph = resolve("a", &v("1.0.0"), &target(), &providers(map)).unwrap();
    assert_eq!(graph.all_libraries().len(), 1);
}

#[test]
fn provider_priority_order_is_respected() {
    // project references beat the package store for the same name
    let projects = ProjectReferenceProvider::new(vec![LibraryDescription::new(
        LibraryIdentity::new("lib", v("1.0.0")),
        LibraryKind::Project,
    )]);
    let mut map = MapProvider::new();
    map.add("root", "1.0.0", &[("lib", "1.0.0")]);
    map.add("lib", "1.0.0", &[]);

    let providers: Vec<Box<dyn DependencyProvider>> =
        vec![Box::new(projects), Box::new(map)];
    let graph = resolve("root", &v("1.0.0"), &target(), &providers).unwrap();
    assert_eq!(graph.library("lib").unwrap().kind, LibraryKind::Project);
}

#[test]
fn retained_edges_follow_winners() {
    let mut map = MapProvider::new();
    map.add("root", "1.0.0", &[("b", "1.0.0"), ("x", "1.0.0")]);
    map.add("b", "1.0.0", &[("x", "2.0.0")]);
    map.add("x", "1.0.0", &[]);
    map.add("x", "2.0.0", &[]);

    let graph = resolve("root", &v("1.0.0"), &target(), &providers(map)).unwrap();

    // b's edge to x is retained but points at the winning x@1.0
    let b = graph.find("b").unwrap();
    let deps = graph.dependencies_of(b);
    assert_eq!(deps.len(), 1);
    assert_eq!(graph.node(deps[0]).identity.version, v("1.0.0"));
}
