// src/flow/registry.rs

//! Artifact kind registry.
//!
//! Maps a string kind tag (`"WFK"`, `"DEN"`, ...) to the file name a
//! producer writes under its `outdata/` directory and to the input variable
//! a consumer uses to point the solver at that file.
//!
//! The registry is an explicit object constructed at startup and passed by
//! reference into build/finalize calls, so tests can substitute alternate
//! registries without touching any global state.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{AbiflowError, Result};

/// Naming rules for one artifact kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactNaming {
    /// File name the producer writes under `outdata/`.
    pub filename: String,
    /// Input variable a consumer sets to the resolved path.
    pub input_var: String,
}

/// Registry of known artifact kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRegistry {
    kinds: BTreeMap<String, ArtifactNaming>,
}

impl ArtifactRegistry {
    /// An empty registry. Use [`Default`] for the standard kinds.
    pub fn empty() -> Self {
        Self {
            kinds: BTreeMap::new(),
        }
    }

    /// Register (or overwrite) a kind.
    pub fn register(&mut self, kind: &str, naming: ArtifactNaming) {
        self.kinds.insert(kind.to_string(), naming);
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.kinds.contains_key(kind)
    }

    /// Naming rules for `kind`; unknown kinds are a configuration error.
    pub fn naming(&self, kind: &str) -> Result<&ArtifactNaming> {
        self.kinds.get(kind).ok_or_else(|| {
            AbiflowError::Configuration(format!("unknown artifact kind '{kind}'"))
        })
    }

    /// Deterministic location of a `kind` artifact inside `outdata`.
    pub fn path_in(&self, outdata: &Path, kind: &str) -> Result<PathBuf> {
        Ok(outdata.join(&self.naming(kind)?.filename))
    }
}

impl Default for ArtifactRegistry {
    fn default() -> Self {
        let mut reg = Self::empty();
        for kind in ["WFK", "DEN", "SCR", "DDB", "POT", "1WF", "1DEN"] {
            reg.register(
                kind,
                ArtifactNaming {
                    filename: format!("out_{kind}"),
                    input_var: format!("get{}_filepath", kind.to_lowercase()),
                },
            );
        }
        reg
    }
}
