// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{parse_need, Campaign, NeedRef, RawCampaign, WorkSection};
use crate::errors::{AbiflowError, Result};

impl TryFrom<RawCampaign> for Campaign {
    type Error = AbiflowError;

    fn try_from(raw: RawCampaign) -> std::result::Result<Self, Self::Error> {
        validate_raw_campaign(&raw)?;
        Ok(Campaign::new_unchecked(raw.campaign, raw.work))
    }
}

fn validate_raw_campaign(raw: &RawCampaign) -> Result<()> {
    ensure_has_works(raw)?;
    validate_work_shapes(raw)?;
    validate_needs(raw)?;
    validate_dag(raw)?;
    Ok(())
}

fn ensure_has_works(raw: &RawCampaign) -> Result<()> {
    if raw.work.is_empty() {
        return Err(AbiflowError::Configuration(
            "campaign must contain at least one [work.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_work_shapes(raw: &RawCampaign) -> Result<()> {
    for (name, work) in raw.work.iter() {
        match (&work.dynamic, work.task.is_empty()) {
            (Some(_), false) => {
                return Err(AbiflowError::Configuration(format!(
                    "work '{name}' is dynamic; its tasks come from the probe and cannot be listed statically"
                )));
            }
            (Some(_), true) if !work.needs.is_empty() => {
                return Err(AbiflowError::Configuration(format!(
                    "work '{name}' is dynamic; declare its dependency via `trigger`, not `needs`"
                )));
            }
            (None, true) => {
                return Err(AbiflowError::Configuration(format!(
                    "work '{name}' has neither tasks nor a [work.{name}.dynamic] section"
                )));
            }
            _ => {}
        }
    }
    Ok(())
}

/// Every need string must parse, reference an existing producer, not
/// reference its own consumer, and name an artifact kind the producer
/// actually declares.
fn validate_needs(raw: &RawCampaign) -> Result<()> {
    for (wname, work) in raw.work.iter() {
        for need in &work.needs {
            let need = parse_need(need)?;
            check_producer(raw, &need, wname, None)?;
        }
        for (tname, task) in work.task.iter() {
            for need in &task.needs {
                let need = parse_need(need)?;
                check_producer(raw, &need, wname, Some(tname))?;
            }
        }
        if let Some(dynamic) = &work.dynamic {
            let need = parse_need(&dynamic.trigger)?;
            check_producer(raw, &need, wname, None)?;
        }
    }
    Ok(())
}

fn check_producer(
    raw: &RawCampaign,
    need: &NeedRef,
    consumer_work: &str,
    consumer_task: Option<&str>,
) -> Result<()> {
    let consumer = match consumer_task {
        Some(t) => format!("{consumer_work}/{t}"),
        None => consumer_work.to_string(),
    };

    let Some(producer) = raw.work.get(&need.work) else {
        return Err(AbiflowError::Configuration(format!(
            "'{consumer}' needs unknown work '{}'",
            need.work
        )));
    };

    let declared = match &need.task {
        Some(tname) => {
            let Some(task) = producer.task.get(tname) else {
                return Err(AbiflowError::Configuration(format!(
                    "'{consumer}' needs unknown task '{}/{tname}'",
                    need.work
                )));
            };
            if need.work == consumer_work && consumer_task == Some(tname.as_str()) {
                return Err(AbiflowError::Configuration(format!(
                    "task '{consumer}' cannot depend on itself"
                )));
            }
            task.produces.contains(&need.kind)
        }
        None => {
            if need.work == consumer_work && consumer_task.is_none() {
                return Err(AbiflowError::Configuration(format!(
                    "work '{consumer}' cannot depend on itself"
                )));
            }
            work_level_artifacts(producer).contains(&need.kind)
        }
    };

    if !declared {
        return Err(AbiflowError::Configuration(format!(
            "'{consumer}' needs artifact '{}' which its producer does not declare",
            need.kind
        )));
    }
    Ok(())
}

/// Kinds a work exposes at work level (through merge finalization).
fn work_level_artifacts(work: &WorkSection) -> Vec<String> {
    work.dynamic
        .as_ref()
        .and_then(|d| d.merge.clone())
        .into_iter()
        .collect()
}

/// Build a petgraph graph from works, tasks and their needs, and reject
/// cycles with a topological sort at configuration time, never at
/// schedule time.
///
/// Node keys are `"work"` and `"work/task"`. Edge direction is
/// producer -> consumer; a work additionally consumes each of its tasks.
fn validate_dag(raw: &RawCampaign) -> Result<()> {
    let keys = node_keys(raw);
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for key in &keys {
        graph.add_node(key.as_str());
    }

    for (wname, work) in raw.work.iter() {
        let wkey = find_key(&keys, wname).unwrap_or(wname.as_str());

        for (tname, task) in work.task.iter() {
            let tkey = find_key(&keys, &format!("{wname}/{tname}")).unwrap_or(wname.as_str());
            graph.add_edge(tkey, wkey, ());

            for need in &task.needs {
                let need = parse_need(need)?;
                if let Some(pkey) = find_key(&keys, &need_key(&need)) {
                    graph.add_edge(pkey, tkey, ());
                }
            }
        }

        for need in &work.needs {
            let need = parse_need(need)?;
            if let Some(pkey) = find_key(&keys, &need_key(&need)) {
                graph.add_edge(pkey, wkey, ());
            }
        }
        if let Some(dynamic) = &work.dynamic {
            let need = parse_need(&dynamic.trigger)?;
            if let Some(pkey) = find_key(&keys, &need_key(&need)) {
                graph.add_edge(pkey, wkey, ());
            }
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(AbiflowError::CyclicDependency(format!(
            "cycle detected in campaign involving '{}'",
            cycle.node_id()
        ))),
    }
}

fn find_key<'a>(keys: &'a [String], name: &str) -> Option<&'a str> {
    keys.iter().find(|k| k.as_str() == name).map(|k| k.as_str())
}

fn node_keys(raw: &RawCampaign) -> Vec<String> {
    let mut keys = Vec::new();
    for (wname, work) in raw.work.iter() {
        keys.push(wname.clone());
        for tname in work.task.keys() {
            keys.push(format!("{wname}/{tname}"));
        }
    }
    keys
}

fn need_key(need: &NeedRef) -> String {
    match &need.task {
        Some(t) => format!("{}/{t}", need.work),
        None => need.work.clone(),
    }
}
