//! Legacy group-abbreviation aliases.

use std::collections::HashMap;

/// Translation table from legacy or alternate group abbreviations to the
/// canonical codes stored in the groups table. Built once at startup and
/// handed to the reconciler explicitly.
#[derive(Debug, Clone)]
pub struct GroupAliases {
    table: HashMap<&'static str, &'static str>,
}

impl Default for GroupAliases {
    fn default() -> Self {
        Self {
            table: HashMap::from([
                ("S&D", "SD"),
                ("NA", "NI"),
                ("ID", "IND/DEM"),
                ("PPE", "EPP"),
                ("Verts/ALE", "Greens/EFA"),
            ]),
        }
    }
}

impl GroupAliases {
    /// Canonical abbreviation for `code`; codes without an alias pass
    /// through unchanged.
    pub fn canonical<'a>(&self, code: &'a str) -> &'a str {
        self.table.get(code).copied().unwrap_or(code)
    }
}
