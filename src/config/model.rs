// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::errors::{AbiflowError, Result};
use crate::flow::ProbeKind;
use crate::input::{AbinitInput, Var};
use crate::types::{DepMode, DEFAULT_MAX_RETRIES};

/// Top-level campaign file as read from TOML.
///
/// ```toml
/// [campaign]
/// workdir = "flow_si_g0w0"
/// solver_cmd = "abinit"
///
/// [work.gw.task.scf]
/// produces = ["DEN", "WFK"]
/// [work.gw.task.scf.vars]
/// ecut = 4.0
///
/// [work.gw.task.nscf]
/// produces = ["WFK"]
/// needs = ["gw/scf:DEN"]
///
/// [work.scr.dynamic]
/// probe = "qpoints"
/// trigger = "gw/nscf:WFK"
/// produces = ["SCR"]
/// merge = "SCR"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawCampaign {
    #[serde(default)]
    pub campaign: CampaignSection,

    /// All works from `[work.<name>]`. Keys are the work names.
    #[serde(default)]
    pub work: BTreeMap<String, WorkSection>,
}

/// `[campaign]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct CampaignSection {
    /// Flow working directory. Overridable on the command line.
    pub workdir: Option<String>,

    /// Bound on automatic restarts of a failed task.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Solver invocation, e.g. `"abinit"` or `"mpirun -n 4 abinit"`.
    #[serde(default = "default_solver_cmd")]
    pub solver_cmd: String,
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_solver_cmd() -> String {
    "abinit".to_string()
}

impl Default for CampaignSection {
    fn default() -> Self {
        Self {
            workdir: None,
            max_retries: default_max_retries(),
            solver_cmd: default_solver_cmd(),
        }
    }
}

/// `[work.<name>]` section.
///
/// A work either lists its tasks statically under `task.<name>` or carries
/// a `dynamic` table and gets populated from a probe at run time.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkSection {
    /// Work-level dependencies, `"producer:KIND"` strings.
    #[serde(default)]
    pub needs: Vec<String>,

    #[serde(default)]
    pub task: BTreeMap<String, TaskSection>,

    #[serde(default)]
    pub dynamic: Option<DynamicSection>,
}

/// `[work.<w>.task.<name>]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskSection {
    /// Solver input variables for this task's deck.
    #[serde(default)]
    pub vars: toml::Table,

    /// Artifact kinds this task writes.
    #[serde(default)]
    pub produces: Vec<String>,

    /// Dependencies, `"producer:KIND"` strings. A producer is either a
    /// work name or `"work/task"`; append `:soft` for a soft edge.
    #[serde(default)]
    pub needs: Vec<String>,
}

/// `[work.<w>.dynamic]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct DynamicSection {
    /// Which sub-problem list the probe emits.
    pub probe: ProbeKind,

    /// The dependency whose resolution fires the expansion,
    /// `"producer:KIND"`.
    pub trigger: String,

    /// Template variables cloned into every expanded task.
    #[serde(default)]
    pub vars: toml::Table,

    /// Artifact kinds each expanded task writes.
    #[serde(default)]
    pub produces: Vec<String>,

    /// If set, finalization merges this kind across all expanded tasks.
    #[serde(default)]
    pub merge: Option<String>,
}

/// Parsed form of a `"producer:KIND"` need string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeedRef {
    pub work: String,
    /// `None` for a work-level producer.
    pub task: Option<String>,
    pub kind: String,
    pub mode: DepMode,
}

/// Parse `"work:KIND"`, `"work/task:KIND"` or the same with a `:soft`
/// suffix.
pub fn parse_need(s: &str) -> Result<NeedRef> {
    let mut parts = s.split(':');
    let producer = parts.next().unwrap_or_default().trim();
    let kind = parts.next().map(str::trim);
    let modifier = parts.next().map(str::trim);

    let kind = match kind {
        Some(k) if !k.is_empty() => k.to_string(),
        _ => {
            return Err(AbiflowError::Configuration(format!(
                "need '{s}' must have the form 'producer:KIND'"
            )))
        }
    };

    let mode = match modifier {
        None => DepMode::Hard,
        Some("soft") => DepMode::Soft,
        Some(other) => {
            return Err(AbiflowError::Configuration(format!(
                "need '{s}' has unknown modifier '{other}' (expected 'soft')"
            )))
        }
    };

    if producer.is_empty() {
        return Err(AbiflowError::Configuration(format!(
            "need '{s}' is missing its producer"
        )));
    }

    let (work, task) = match producer.split_once('/') {
        Some((w, t)) => (w.to_string(), Some(t.to_string())),
        None => (producer.to_string(), None),
    };

    Ok(NeedRef {
        work,
        task,
        kind,
        mode,
    })
}

/// Convert one TOML value to a deck variable.
pub fn var_from_toml(name: &str, value: &toml::Value) -> Result<Var> {
    match value {
        toml::Value::Integer(v) => Ok(Var::Int(*v)),
        toml::Value::Float(v) => Ok(Var::Real(*v)),
        toml::Value::String(v) => Ok(Var::Str(v.clone())),
        toml::Value::Array(items) => {
            if items.iter().all(|v| matches!(v, toml::Value::Integer(_))) {
                let ints = items
                    .iter()
                    .filter_map(|v| v.as_integer())
                    .collect::<Vec<_>>();
                Ok(Var::Ints(ints))
            } else if items
                .iter()
                .all(|v| matches!(v, toml::Value::Integer(_) | toml::Value::Float(_)))
            {
                let reals = items
                    .iter()
                    .filter_map(|v| match v {
                        toml::Value::Integer(i) => Some(*i as f64),
                        toml::Value::Float(f) => Some(*f),
                        _ => None,
                    })
                    .collect::<Vec<_>>();
                Ok(Var::Reals(reals))
            } else {
                Err(AbiflowError::Configuration(format!(
                    "variable '{name}' must be a numeric array"
                )))
            }
        }
        other => Err(AbiflowError::Configuration(format!(
            "variable '{name}' has unsupported type {}",
            other.type_str()
        ))),
    }
}

/// Convert a `vars` table to an input deck.
pub fn input_from_vars(vars: &toml::Table) -> Result<AbinitInput> {
    let mut input = AbinitInput::new();
    for (name, value) in vars.iter() {
        let var = var_from_toml(name, value)?;
        input.set(name, var);
    }
    Ok(input)
}

/// Validated campaign. Construct via `Campaign::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct Campaign {
    pub campaign: CampaignSection,
    pub work: BTreeMap<String, WorkSection>,
}

impl Campaign {
    /// Internal constructor used by the validation layer after all checks
    /// have passed.
    pub(crate) fn new_unchecked(
        campaign: CampaignSection,
        work: BTreeMap<String, WorkSection>,
    ) -> Self {
        Self { campaign, work }
    }
}
