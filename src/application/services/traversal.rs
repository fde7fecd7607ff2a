//! Parent/child traversal and topological grouping over the app DAG.
//!
//! Ported in spirit (not line-for-line) from the original scheduler's
//! `dag_tools/traversal.py`: `get_parents`/`get_children` walk dependency
//! groups rather than raw graph edges, because a single edge can expand
//! into many concrete (app, job_id) pairs once job-id templates and
//! cross-product fields are resolved.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use crate::application::services::dag_builder::Dag;
use crate::domain::entities::{
    DependencySpec, DependsOn, GroupMember, JobIdTemplate, ParsedJobId, DEPENDENCY_GROUP_FIELD,
    DEPENDENCY_GROUP_DEFAULT_NAME,
};
use crate::domain::repositories::TaskConfigSource;
use crate::error::StolosError;

/// One resolved (app, job_id) edge, with the dependency group it came
/// through when the caller asked to keep that information.
pub type TraversalHit = (String, String, Option<String>);

fn template_for(config: &dyn TaskConfigSource, app: &str) -> Result<Option<JobIdTemplate>, StolosError> {
    let descriptor = config.get(app).ok_or_else(|| {
        StolosError::DagMisconfigured(format!("app {app:?} has no task descriptor"))
    })?;
    descriptor
        .job_id
        .as_deref()
        .map(JobIdTemplate::compile)
        .transpose()
}

/// Normalizes a `depends_on` declaration into `(group_name, specs)` pairs,
/// where `specs` holds every subgroup that must match (a single spec for
/// `Single`, all of them for `Subgroups`).
fn normalized_groups(depends_on: &DependsOn) -> IndexMap<String, Vec<DependencySpec>> {
    let mut out = IndexMap::new();
    match depends_on {
        DependsOn::Bare(spec) => {
            out.insert(DEPENDENCY_GROUP_DEFAULT_NAME.to_string(), vec![spec.clone()]);
        }
        DependsOn::Groups(map) => {
            for (name, member) in map {
                let specs = match member {
                    GroupMember::Single(spec) => vec![spec.clone()],
                    GroupMember::Subgroups(subs) => subs.clone(),
                };
                out.insert(name.clone(), specs);
            }
        }
    }
    out
}

/// A dependency spec "matches" a child job id if it names only
/// `app_name`/`job_id` (unconditional), or every extra field it declares
/// accepts the child's parsed value for that field.
fn spec_matches(spec: &DependencySpec, child_parsed: Option<&ParsedJobId>) -> bool {
    if spec.job_id.is_some() || spec.fields.is_empty() {
        return true;
    }
    let Some(parsed) = child_parsed else {
        return false;
    };
    spec.fields.iter().all(|(field, accepted)| {
        parsed.get(field).map(|value| accepted.contains(value)).unwrap_or(false)
    })
}

/// A list-of-subgroups group matches only if every subgroup matches (see
/// DESIGN.md Open Question 1 — conjunctive, not the "OR" the name
/// suggests).
fn group_matches(specs: &[DependencySpec], child_parsed: Option<&ParsedJobId>) -> bool {
    specs.iter().all(|spec| spec_matches(spec, child_parsed))
}

/// Streaming cross product over per-field candidate lists: no recursion,
/// no materialized intermediate product, just an odometer over indices.
struct CrossProduct<'a> {
    fields: &'a [Vec<String>],
    counters: Vec<usize>,
    done: bool,
}

impl<'a> CrossProduct<'a> {
    fn new(fields: &'a [Vec<String>]) -> Self {
        let done = fields.is_empty() || fields.iter().any(|v| v.is_empty());
        Self { fields, counters: vec![0; fields.len()], done }
    }
}

impl<'a> Iterator for CrossProduct<'a> {
    type Item = Vec<&'a str>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let current: Vec<&str> = self
            .counters
            .iter()
            .zip(self.fields)
            .map(|(&i, values)| values[i].as_str())
            .collect();
        for digit in (0..self.counters.len()).rev() {
            self.counters[digit] += 1;
            if self.counters[digit] < self.fields[digit].len() {
                return Some(current);
            }
            self.counters[digit] = 0;
        }
        self.done = true;
        Some(current)
    }
}

/// Resolves every parent of `(app, job_id)`, optionally scoped to
/// `filter_deps` (dependency group names) and `filter_parents` (app
/// names within a selected group).
pub fn get_parents(
    config: &dyn TaskConfigSource,
    app: &str,
    job_id: Option<&str>,
    filter_deps: &[String],
    filter_parents: &[String],
) -> Result<Vec<TraversalHit>, StolosError> {
    let descriptor = config.get(app).ok_or_else(|| {
        StolosError::DagMisconfigured(format!("app {app:?} has no task descriptor"))
    })?;
    let Some(depends_on) = &descriptor.depends_on else {
        return Ok(Vec::new());
    };

    let child_template = template_for(config, app)?;
    let child_parsed = match (job_id, &child_template) {
        (Some(jid), Some(tmpl)) => Some(tmpl.parse(jid)?),
        _ => None,
    };

    let mut effective_filter_deps = filter_deps.to_vec();
    if let Some(parsed) = &child_parsed {
        if let Some(group) = parsed.get(DEPENDENCY_GROUP_FIELD) {
            effective_filter_deps.push(group.clone());
        }
    }

    let groups = normalized_groups(depends_on);
    if !effective_filter_deps.is_empty() {
        for name in &effective_filter_deps {
            if !groups.contains_key(name) {
                return Err(StolosError::DagMisconfigured(format!(
                    "app {app:?} has no dependency group named {name:?}"
                )));
            }
        }
    }

    let mut results = Vec::new();
    let mut seen = HashSet::new();
    for (group_name, specs) in &groups {
        if !effective_filter_deps.is_empty() && !effective_filter_deps.contains(group_name) {
            continue;
        }
        if !group_matches(specs, child_parsed.as_ref()) {
            continue;
        }
        for spec in specs {
            let parent_apps: Vec<&String> = if filter_parents.is_empty() {
                spec.app_name.iter().collect()
            } else {
                let intersected: Vec<&String> = spec
                    .app_name
                    .iter()
                    .filter(|a| filter_parents.contains(a))
                    .collect();
                if intersected.is_empty() && filter_parents.iter().any(|p| spec.app_name.contains(p)) {
                    return Err(StolosError::DagMisconfigured(format!(
                        "filter_parents names an app outside group {group_name:?}"
                    )));
                }
                intersected
            };
            for parent in parent_apps {
                let parent_template = template_for(config, parent)?;
                let parent_jids = resolve_parent_job_ids(
                    app,
                    parent,
                    group_name,
                    spec,
                    child_parsed.as_ref(),
                    parent_template.as_ref(),
                )?;
                for parent_jid in parent_jids {
                    let key = (parent.clone(), parent_jid.clone());
                    if seen.insert(key) {
                        results.push((parent.clone(), parent_jid, Some(group_name.clone())));
                    }
                }
            }
        }
    }
    Ok(results)
}

fn resolve_parent_job_ids(
    child_app: &str,
    parent_app: &str,
    group_name: &str,
    spec: &DependencySpec,
    child_parsed: Option<&ParsedJobId>,
    parent_template: Option<&JobIdTemplate>,
) -> Result<Vec<String>, StolosError> {
    if spec.is_inherit_only() {
        let Some(parent_template) = parent_template else {
            return Ok(vec![String::new()]);
        };
        let child_parsed = child_parsed.ok_or_else(|| StolosError::DagMisconfigured(format!(
            "app {child_app:?} inherits job id from {parent_app:?} but was not given a job_id"
        )))?;
        let jid = parent_template.format(child_parsed, None).map_err(|_| StolosError::InvalidJobId {
            app: child_app.to_string(),
            job_id: String::new(),
            reason: format!("child fields do not cover parent {parent_app:?} template"),
        })?;
        return Ok(vec![jid]);
    }

    if let Some(job_ids) = &spec.job_id {
        if let Some(parent_template) = parent_template {
            for jid in job_ids {
                parent_template.parse(jid).map_err(|_| StolosError::InvalidJobId {
                    app: parent_app.to_string(),
                    job_id: jid.clone(),
                    reason: "does not match parent app's job_id template".to_string(),
                })?;
            }
        }
        return Ok(job_ids.clone());
    }

    let Some(parent_template) = parent_template else {
        return Ok(Vec::new());
    };
    let field_lists: Vec<Vec<String>> = parent_template
        .fields()
        .iter()
        .map(|field| {
            spec.fields.get(field).cloned().ok_or_else(|| StolosError::DagMisconfigured(format!(
                "dependency group {group_name:?} does not supply values for parent field {field:?}"
            )))
        })
        .collect::<Result<_, _>>()?;

    let mut out = Vec::new();
    let mut seen = HashSet::new();
    for combo in CrossProduct::new(&field_lists) {
        let mut fields = ParsedJobId::new();
        for (name, value) in parent_template.fields().iter().zip(combo) {
            fields.insert(name.clone(), value.to_string());
        }
        let jid = parent_template.format(&fields, Some(group_name))?;
        if seen.insert(jid.clone()) {
            out.push(jid);
        }
    }
    Ok(out)
}

/// Resolves every child of `(app, job_id)`.
pub fn get_children(
    dag: &Dag,
    config: &dyn TaskConfigSource,
    app: &str,
    job_id: &str,
) -> Result<Vec<TraversalHit>, StolosError> {
    let mut results = Vec::new();
    let mut seen = HashSet::new();
    for (child_app, group_name) in dag.outgoing(app) {
        let child_descriptor = config.get(child_app).ok_or_else(|| {
            StolosError::DagMisconfigured(format!("app {child_app:?} has no task descriptor"))
        })?;
        let Some(depends_on) = &child_descriptor.depends_on else {
            continue;
        };
        let groups = normalized_groups(depends_on);
        let Some(specs) = groups.get(group_name) else {
            continue;
        };
        for spec in specs {
            if !spec.app_name.iter().any(|a| a == app) {
                continue;
            }
            for child_jid in resolve_child_job_ids(config, app, job_id, child_app, group_name, spec)? {
                let key = (child_app.to_string(), child_jid.clone());
                if seen.insert(key) {
                    results.push((child_app.to_string(), child_jid, Some(group_name.to_string())));
                }
            }
        }
    }
    Ok(results)
}

fn resolve_child_job_ids(
    config: &dyn TaskConfigSource,
    parent_app: &str,
    parent_job_id: &str,
    child_app: &str,
    group_name: &str,
    spec: &DependencySpec,
) -> Result<Vec<String>, StolosError> {
    if spec.is_inherit_only() {
        return Ok(vec![parent_job_id.to_string()]);
    }

    let parent_template = template_for(config, parent_app)?;
    let child_template = template_for(config, child_app)?;
    let parent_parsed = match &parent_template {
        Some(tmpl) => Some(tmpl.parse(parent_job_id)?),
        None => None,
    };

    if let Some(job_ids) = &spec.job_id {
        if !job_ids.iter().any(|jid| jid == parent_job_id) {
            return Ok(Vec::new());
        }
        let Some(child_template) = child_template else {
            return Ok(Vec::new());
        };
        let mut fields = ParsedJobId::new();
        if let Some(parsed) = &parent_parsed {
            for field in child_template.fields() {
                if let Some(value) = parsed.get(field) {
                    fields.insert(field.clone(), value.clone());
                }
            }
        }
        for (field, values) in &spec.fields {
            if values.len() == 1 {
                fields.insert(field.clone(), values[0].clone());
            }
        }
        let jid = child_template.format(&fields, Some(group_name))?;
        return Ok(vec![jid]);
    }

    // Implicit field-matching + cross-product case: every field of the
    // parent's parsed job id must appear in the spec with a matching
    // value — a parent field the spec leaves unconstrained disqualifies
    // the whole match rather than being silently ignored (spec §4.4).
    if let Some(parsed) = &parent_parsed {
        for (field, value) in parsed {
            match spec.fields.get(field) {
                Some(accepted) if accepted.contains(value) => {}
                _ => return Ok(Vec::new()),
            }
        }
    }

    let Some(child_template) = child_template else {
        return Ok(Vec::new());
    };
    let mut field_lists: HashMap<String, Vec<String>> = HashMap::new();
    for field in child_template.fields() {
        if let Some(parsed) = &parent_parsed {
            if let Some(value) = parsed.get(field) {
                field_lists.insert(field.clone(), vec![value.clone()]);
                continue;
            }
        }
        if let Some(values) = spec.fields.get(field) {
            field_lists.insert(field.clone(), values.clone());
        }
    }
    let lists: Vec<Vec<String>> = child_template
        .fields()
        .iter()
        .map(|f| field_lists.get(f).cloned().unwrap_or_default())
        .collect();

    let mut out = Vec::new();
    let mut seen = HashSet::new();
    for combo in CrossProduct::new(&lists) {
        let mut fields = ParsedJobId::new();
        for (name, value) in child_template.fields().iter().zip(combo) {
            fields.insert(name.clone(), value.to_string());
        }
        let jid = child_template.format(&fields, Some(group_name))?;
        if seen.insert(jid.clone()) {
            out.push(jid);
        }
    }
    Ok(out)
}

/// Groups `(app, job_id)` pairs by app and yields the groups in the DAG's
/// topological order. Order within a single app's group is unspecified,
/// matching the original's generator-based `topological_sort`.
pub fn topological_sort(dag: &Dag, pairs: &[(String, String)]) -> Vec<(String, String)> {
    let mut by_app: IndexMap<&str, Vec<(String, String)>> = IndexMap::new();
    for (app, job_id) in pairs {
        by_app.entry(app.as_str()).or_default().push((app.clone(), job_id.clone()));
    }
    let mut out = Vec::new();
    for app in dag.apps_in_topological_order() {
        if let Some(group) = by_app.shift_remove(app) {
            out.extend(group);
        }
    }
    out
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::infrastructure::config::JsonTaskConfig;
    use proptest::collection::vec as pvec;
    use proptest::prelude::*;
    use std::collections::HashSet as StdHashSet;

    proptest! {
        // Cross-product dedup: however many duplicate client ids a
        // dependency spec lists, get_parents yields each resolved parent
        // job id exactly once.
        #[test]
        fn cross_product_parent_resolution_never_duplicates(
            client_ids in pvec("[a-z]{1,4}", 1..8),
        ) {
            let values = client_ids
                .iter()
                .map(|v| format!("\"{v}\""))
                .collect::<Vec<_>>()
                .join(",");
            let json = format!(
                r#"{{
                    "ingest": {{"job_type": "bash", "job_id": "{{client_id}}"}},
                    "enrich": {{
                        "job_type": "bash",
                        "job_id": "{{date}}",
                        "depends_on": {{"app_name": ["ingest"], "client_id": [{values}]}}
                    }}
                }}"#
            );
            let config = JsonTaskConfig::from_str(&json).unwrap();
            let parents = get_parents(&config, "enrich", Some("2024-01-01"), &[], &[]).unwrap();
            let unique_inputs: StdHashSet<&String> = client_ids.iter().collect();
            prop_assert_eq!(parents.len(), unique_inputs.len());
            let unique_outputs: StdHashSet<&str> = parents.iter().map(|(_, jid, _)| jid.as_str()).collect();
            prop_assert_eq!(unique_outputs.len(), parents.len());
        }
    }
}
