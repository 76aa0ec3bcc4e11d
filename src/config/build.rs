// src/config/build.rs

//! Turning a validated campaign into a registered flow.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{input_from_vars, parse_need, Campaign, NeedRef, TaskSection};
use crate::errors::{AbiflowError, Result};
use crate::flow::{
    Dependency, DynamicSpec, Flow, NodeId, TaskId, TaskSpec, Work, WorkId, WorkKind,
};
use crate::types::DepMode;

/// Register every work and task of the campaign into a fresh flow.
///
/// Works (and tasks within a work) are registered in topological order so
/// each producer exists before its consumers reference it; the registered
/// ids therefore follow dependency order, not the alphabetical order of the
/// TOML tables.
pub fn build_flow(campaign: &Campaign, workdir_override: Option<&Path>) -> Result<Flow> {
    let workdir: PathBuf = match workdir_override {
        Some(dir) => dir.to_path_buf(),
        None => campaign
            .campaign
            .workdir
            .as_deref()
            .unwrap_or("flow")
            .into(),
    };

    let mut flow = Flow::new(workdir).with_max_retries(campaign.campaign.max_retries);

    let mut work_ids: BTreeMap<String, WorkId> = BTreeMap::new();
    let mut task_ids: BTreeMap<String, TaskId> = BTreeMap::new();

    for wname in work_order(campaign)? {
        let section = &campaign.work[&wname];

        if let Some(dynamic) = &section.dynamic {
            let spec = DynamicSpec {
                probe: dynamic.probe,
                template: input_from_vars(&dynamic.vars)?,
                produces: dynamic.produces.clone(),
                merge_kind: dynamic.merge.clone(),
                expanded: false,
            };
            let trigger = resolve_need(&parse_need(&dynamic.trigger)?, &work_ids, &task_ids)?;
            let id = flow.register_cbk(Work::new(&wname, WorkKind::Dynamic(spec)), trigger)?;
            work_ids.insert(wname.clone(), id);
            continue;
        }

        let mut deps = Vec::with_capacity(section.needs.len());
        for need in &section.needs {
            deps.push(resolve_need(&parse_need(need)?, &work_ids, &task_ids)?);
        }
        let id = flow.register_work(Work::new(&wname, WorkKind::Generic), deps)?;
        work_ids.insert(wname.clone(), id);

        for tname in task_order(&wname, &section.task)? {
            let task = &section.task[&tname];
            let mut spec = TaskSpec::new(&tname, input_from_vars(&task.vars)?);
            for kind in &task.produces {
                spec = spec.produces(kind);
            }
            for need in &task.needs {
                spec.deps
                    .push(resolve_need(&parse_need(need)?, &work_ids, &task_ids)?);
            }

            let tid = flow.register_task(id, spec)?;
            task_ids.insert(format!("{wname}/{tname}"), tid);
        }
    }

    Ok(flow)
}

fn resolve_need(
    need: &NeedRef,
    work_ids: &BTreeMap<String, WorkId>,
    task_ids: &BTreeMap<String, TaskId>,
) -> Result<Dependency> {
    let producer = match &need.task {
        Some(tname) => {
            let key = format!("{}/{tname}", need.work);
            NodeId::Task(*task_ids.get(&key).ok_or_else(|| {
                AbiflowError::Configuration(format!("unresolved producer task '{key}'"))
            })?)
        }
        None => NodeId::Work(*work_ids.get(&need.work).ok_or_else(|| {
            AbiflowError::Configuration(format!("unresolved producer work '{}'", need.work))
        })?),
    };

    Ok(match need.mode {
        DepMode::Hard => Dependency::hard(producer, &need.kind),
        DepMode::Soft => Dependency::soft(producer, &need.kind),
    })
}

/// Topological order of works, derived from all cross-work needs and
/// triggers. The campaign was validated acyclic, so this cannot fail in
/// practice.
fn work_order(campaign: &Campaign) -> Result<Vec<String>> {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for wname in campaign.work.keys() {
        graph.add_node(wname.as_str());
    }

    {
        let mut add_edge = |need: &NeedRef, consumer: &str| {
            if need.work != consumer {
                if let Some((producer, _)) = campaign.work.get_key_value(&need.work) {
                    if let Some((consumer, _)) = campaign.work.get_key_value(consumer) {
                        graph.add_edge(producer.as_str(), consumer.as_str(), ());
                    }
                }
            }
        };

        for (wname, work) in campaign.work.iter() {
            for need in &work.needs {
                add_edge(&parse_need(need)?, wname);
            }
            for task in work.task.values() {
                for need in &task.needs {
                    add_edge(&parse_need(need)?, wname);
                }
            }
            if let Some(dynamic) = &work.dynamic {
                add_edge(&parse_need(&dynamic.trigger)?, wname);
            }
        }
    }

    match toposort(&graph, None) {
        Ok(order) => Ok(order.into_iter().map(|s| s.to_string()).collect()),
        Err(cycle) => Err(AbiflowError::CyclicDependency(format!(
            "cycle detected between works involving '{}'",
            cycle.node_id()
        ))),
    }
}

/// Topological order of the tasks of one work, considering only same-work
/// edges (cross-work producers were registered earlier).
fn task_order(wname: &str, tasks: &BTreeMap<String, TaskSection>) -> Result<Vec<String>> {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for tname in tasks.keys() {
        graph.add_node(tname.as_str());
    }

    for (tname, task) in tasks.iter() {
        for need in &task.needs {
            let need = parse_need(need)?;
            if need.work != wname {
                continue;
            }
            if let Some(producer) = &need.task {
                if let Some((pkey, _)) = tasks.get_key_value(producer) {
                    graph.add_edge(pkey.as_str(), tname.as_str(), ());
                }
            }
        }
    }

    match toposort(&graph, None) {
        Ok(order) => Ok(order.into_iter().map(|s| s.to_string()).collect()),
        Err(cycle) => Err(AbiflowError::CyclicDependency(format!(
            "cycle detected between tasks of work '{wname}' involving '{}'",
            cycle.node_id()
        ))),
    }
}
