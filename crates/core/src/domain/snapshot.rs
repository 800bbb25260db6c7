// Snapshot & Delta - append-only profile history and its diff

use crate::domain::job::OwnerKey;
use crate::domain::profile::CompanyProfile;
use serde::{Deserialize, Serialize};

/// Profile of one completed job, keyed by (owner, target url)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub owner_key: OwnerKey,
    pub target_url: String,
    pub profile: CompanyProfile,
    pub created_at: i64, // epoch ms
}

/// Classification of one tracked field between two snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldChange {
    Unchanged,
    Emerged,
    Lost,
    Changed,
}

impl FieldChange {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldChange::Unchanged => "unchanged",
            FieldChange::Emerged => "emerged",
            FieldChange::Lost => "lost",
            FieldChange::Changed => "changed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDelta {
    /// `section.field` path
    pub field: String,
    pub change: FieldChange,
}

/// Diff between the previous and current snapshot of a target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    pub baseline_at: i64,
    pub compared_at: i64,
    pub elapsed_days: f64,
    pub fields: Vec<FieldDelta>,
    /// unchanged / tracked, in [0, 1]
    pub stability: f64,
}

impl Delta {
    pub fn count(&self, change: FieldChange) -> usize {
        self.fields.iter().filter(|f| f.change == change).count()
    }

    /// Fields whose classification is not `unchanged`
    pub fn shifts(&self) -> impl Iterator<Item = &FieldDelta> {
        self.fields
            .iter()
            .filter(|f| f.change != FieldChange::Unchanged)
    }

    pub fn change_of(&self, field: &str) -> Option<FieldChange> {
        self.fields
            .iter()
            .find(|f| f.field == field)
            .map(|f| f.change)
    }

    /// Coarse label used in reports
    pub fn stability_label(&self) -> &'static str {
        if self.stability > 0.8 {
            "High"
        } else if self.stability > 0.5 {
            "Medium"
        } else {
            "Low"
        }
    }
}
