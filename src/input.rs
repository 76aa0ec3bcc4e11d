// src/input.rs

//! Solver input decks as immutable-ish value objects.
//!
//! An [`AbinitInput`] is an ordered map of input variables. Template inputs
//! are cloned and overlaid when dynamic works expand, so mutation never
//! leaks between sibling tasks.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// A single input variable value.
///
/// `untagged` keeps the persisted JSON close to what a human would write by
/// hand: `{"ecut": 4.0, "nband": 10, "qptdm": [0.5, 0.0, 0.0]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Var {
    Int(i64),
    Real(f64),
    Str(String),
    Ints(Vec<i64>),
    Reals(Vec<f64>),
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Var::Int(v) => write!(f, "{v}"),
            Var::Real(v) => write!(f, "{v}"),
            Var::Str(v) => write!(f, "{v}"),
            Var::Ints(vs) => {
                let parts: Vec<String> = vs.iter().map(|v| v.to_string()).collect();
                write!(f, "{}", parts.join(" "))
            }
            Var::Reals(vs) => {
                let parts: Vec<String> = vs.iter().map(|v| v.to_string()).collect();
                write!(f, "{}", parts.join(" "))
            }
        }
    }
}

impl From<i64> for Var {
    fn from(v: i64) -> Self {
        Var::Int(v)
    }
}

impl From<f64> for Var {
    fn from(v: f64) -> Self {
        Var::Real(v)
    }
}

impl From<&str> for Var {
    fn from(v: &str) -> Self {
        Var::Str(v.to_string())
    }
}

impl From<Vec<i64>> for Var {
    fn from(v: Vec<i64>) -> Self {
        Var::Ints(v)
    }
}

impl From<Vec<f64>> for Var {
    fn from(v: Vec<f64>) -> Self {
        Var::Reals(v)
    }
}

impl From<[f64; 3]> for Var {
    fn from(v: [f64; 3]) -> Self {
        Var::Reals(v.to_vec())
    }
}

/// An input deck: variable name -> value, plus an optional comment line.
///
/// Variables are kept in a `BTreeMap` so the serialized deck is stable
/// across runs (useful for diffing a re-built flow against a previous one).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AbinitInput {
    vars: BTreeMap<String, Var>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    comment: Option<String>,
}

impl AbinitInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style variant of [`set`](Self::set).
    pub fn with(mut self, name: &str, value: impl Into<Var>) -> Self {
        self.set(name, value);
        self
    }

    pub fn with_comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_string());
        self
    }

    /// Set (or overwrite) a variable.
    pub fn set(&mut self, name: &str, value: impl Into<Var>) {
        self.vars.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Var> {
        self.vars.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn vars(&self) -> impl Iterator<Item = (&str, &Var)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Overlay every variable of `other` onto this input, overwriting
    /// duplicates. Used when expanding a template into per-sub-problem
    /// inputs.
    pub fn merge(&mut self, other: &AbinitInput) {
        for (name, value) in other.vars.iter() {
            self.vars.insert(name.clone(), value.clone());
        }
    }

    /// Render the deck in the `name value` line format the solver reads.
    pub fn to_deck_string(&self) -> String {
        let mut out = String::new();
        if let Some(comment) = &self.comment {
            out.push_str(&format!("# {comment}\n"));
        }
        for (name, value) in self.vars.iter() {
            out.push_str(&format!("{name} {value}\n"));
        }
        out
    }

    /// Serialize the deck to `path`, creating parent directories as needed.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_deck_string())?;
        Ok(())
    }
}
