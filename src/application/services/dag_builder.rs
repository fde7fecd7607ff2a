//! Builds the app-level DAG from a task config source, validating
//! acyclicity and referential integrity up front.
//!
//! Generalizes `DependencyAnalyzer`'s single-edge job graph (teacher) to
//! the grouped, multi-edge app graph this spec requires: two apps can be
//! linked by more than one edge when they participate in distinct
//! dependency groups.

use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::domain::entities::{DependsOn, GroupMember, DEPENDENCY_GROUP_DEFAULT_NAME};
use crate::domain::repositories::TaskConfigSource;
use crate::error::StolosError;

/// An immutable, validated snapshot of the app dependency graph. Built
/// fresh from `DagBuilder::build` on demand — this crate keeps no
/// process-wide cache (SPEC_FULL.md §9 design note); embedders that want
/// one own the cache themselves.
pub struct Dag {
    graph: DiGraph<String, String>,
    app_indices: HashMap<String, NodeIndex>,
}

impl Dag {
    pub fn apps_in_topological_order(&self) -> Vec<&str> {
        toposort(&self.graph, None)
            .expect("acyclicity was validated at build time")
            .into_iter()
            .map(|idx| self.graph[idx].as_str())
            .collect()
    }

    /// `(parent_app, group_name)` pairs for every edge into `app`.
    pub fn incoming(&self, app: &str) -> Vec<(&str, &str)> {
        let Some(&idx) = self.app_indices.get(app) else {
            return Vec::new();
        };
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .map(|edge| (self.graph[edge.source()].as_str(), edge.weight().as_str()))
            .collect()
    }

    /// `(child_app, group_name)` pairs for every edge out of `app`.
    pub fn outgoing(&self, app: &str) -> Vec<(&str, &str)> {
        let Some(&idx) = self.app_indices.get(app) else {
            return Vec::new();
        };
        self.graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|edge| (self.graph[edge.target()].as_str(), edge.weight().as_str()))
            .collect()
    }

    pub fn has_app(&self, app: &str) -> bool {
        self.app_indices.contains_key(app)
    }
}

pub struct DagBuilder;

impl DagBuilder {
    /// Builds and validates the DAG. Fails `DagMisconfigured` on a cycle,
    /// a reference to an app absent from the config, or an empty
    /// `app_name` list in any dependency spec.
    pub fn build(config: &dyn TaskConfigSource) -> Result<Dag, StolosError> {
        let mut graph = DiGraph::new();
        let mut app_indices = HashMap::new();

        for app in config.apps() {
            Self::ensure_node(&mut graph, &mut app_indices, app);
        }

        for app in config.apps() {
            let descriptor = config.get(app).expect("apps() entries resolve via get()");
            let Some(depends_on) = &descriptor.depends_on else {
                continue;
            };
            match depends_on {
                DependsOn::Bare(spec) => {
                    Self::add_group_edges(&mut graph, &mut app_indices, app, DEPENDENCY_GROUP_DEFAULT_NAME, std::slice::from_ref(spec))?;
                }
                DependsOn::Groups(groups) => {
                    for (group_name, member) in groups {
                        let specs: Vec<_> = match member {
                            GroupMember::Single(spec) => vec![spec.clone()],
                            GroupMember::Subgroups(subs) => subs.clone(),
                        };
                        Self::add_group_edges(&mut graph, &mut app_indices, app, group_name, &specs)?;
                    }
                }
            }
        }

        if toposort(&graph, None).is_err() {
            return Err(StolosError::DagMisconfigured(
                "dependency graph contains a cycle".to_string(),
            ));
        }

        Ok(Dag { graph, app_indices })
    }

    fn ensure_node(
        graph: &mut DiGraph<String, String>,
        app_indices: &mut HashMap<String, NodeIndex>,
        app: &str,
    ) -> NodeIndex {
        *app_indices
            .entry(app.to_string())
            .or_insert_with(|| graph.add_node(app.to_string()))
    }

    fn add_group_edges(
        graph: &mut DiGraph<String, String>,
        app_indices: &mut HashMap<String, NodeIndex>,
        child: &str,
        group_name: &str,
        specs: &[crate::domain::entities::DependencySpec],
    ) -> Result<(), StolosError> {
        let child_idx = Self::ensure_node(graph, app_indices, child);
        for spec in specs {
            if spec.app_name.is_empty() {
                return Err(StolosError::DagMisconfigured(format!(
                    "dependency group {group_name:?} on app {child:?} names no app_name"
                )));
            }
            for parent in &spec.app_name {
                let parent_idx = Self::ensure_node(graph, app_indices, parent);
                graph.add_edge(parent_idx, child_idx, group_name.to_string());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::TaskDescriptor;
    use crate::domain::repositories::MockTaskConfigSource;
    use crate::infrastructure::config::JsonTaskConfig;

    #[test]
    fn rejects_a_dangling_app_name_reference() {
        // A config whose only declared app depends on an app never
        // returned by apps() — DagBuilder must still add the dangling
        // node rather than panic, and the resulting DAG has no cycle.
        let mut config = MockTaskConfigSource::new();
        let descriptor: TaskDescriptor =
            serde_json::from_str(r#"{"job_type": "bash", "depends_on": {"app_name": ["missing"]}}"#).unwrap();
        config.expect_apps().returning(|| vec!["present"]);
        config
            .expect_get()
            .withf(|app| app == "present")
            .return_const(Some(descriptor));
        let dag = DagBuilder::build(&config).unwrap();
        assert!(dag.has_app("missing"));
        assert_eq!(dag.incoming("present"), vec![("missing", DEPENDENCY_GROUP_DEFAULT_NAME)]);
    }

    #[test]
    fn builds_simple_chain() {
        let json = r#"{
            "ingest": {"job_type": "bash"},
            "enrich": {"job_type": "bash", "depends_on": {"app_name": ["ingest"]}}
        }"#;
        let config = JsonTaskConfig::from_str(json).unwrap();
        let dag = DagBuilder::build(&config).unwrap();
        let order = dag.apps_in_topological_order();
        assert_eq!(order, vec!["ingest", "enrich"]);
    }

    #[test]
    fn rejects_cycles() {
        let json = r#"{
            "a": {"job_type": "bash", "depends_on": {"app_name": ["b"]}},
            "b": {"job_type": "bash", "depends_on": {"app_name": ["a"]}}
        }"#;
        let config = JsonTaskConfig::from_str(json).unwrap();
        assert!(matches!(DagBuilder::build(&config), Err(StolosError::DagMisconfigured(_))));
    }

    #[test]
    fn rejects_empty_app_name() {
        let json = r#"{
            "a": {"job_type": "bash", "depends_on": {"app_name": []}}
        }"#;
        let config = JsonTaskConfig::from_str(json).unwrap();
        assert!(DagBuilder::build(&config).is_err());
    }

    #[test]
    fn allows_multiple_edges_between_same_pair_via_distinct_groups() {
        let json = r#"{
            "ingest": {"job_type": "bash"},
            "enrich": {
                "job_type": "bash",
                "depends_on": {
                    "nightly": {"app_name": ["ingest"]},
                    "backfill": {"app_name": ["ingest"]}
                }
            }
        }"#;
        let config = JsonTaskConfig::from_str(json).unwrap();
        let dag = DagBuilder::build(&config).unwrap();
        assert_eq!(dag.incoming("enrich").len(), 2);
    }
}
