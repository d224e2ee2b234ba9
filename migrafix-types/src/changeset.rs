use crate::ToolInfo;
use crate::change::{ChangeCategory, ChangeId, ChangeRecord, ChangeState};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// All proposed edits for a run, grouped by category.
///
/// Within a category records keep insertion order, which the orchestrator
/// makes equal to file discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    #[serde(default)]
    pub categories: BTreeMap<ChangeCategory, Vec<ChangeRecord>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSummary {
    pub total: u64,
    pub per_category: BTreeMap<ChangeCategory, u64>,
    pub automatic: u64,
    pub manual: u64,
    pub downgraded: u64,
}

impl ChangeSet {
    pub fn push(&mut self, record: ChangeRecord) {
        self.categories
            .entry(record.category)
            .or_default()
            .push(record);
    }

    pub fn len(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records in category order, then insertion order.
    pub fn records(&self) -> impl Iterator<Item = &ChangeRecord> {
        self.categories.values().flatten()
    }

    pub fn records_mut(&mut self) -> impl Iterator<Item = &mut ChangeRecord> {
        self.categories.values_mut().flatten()
    }

    pub fn get(&self, id: &ChangeId) -> Option<&ChangeRecord> {
        self.records().find(|r| &r.id == id)
    }

    pub fn in_category(&self, category: ChangeCategory) -> &[ChangeRecord] {
        self.categories
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Derived on every call; never cached.
    pub fn summary(&self) -> ChangeSummary {
        let mut s = ChangeSummary::default();
        for (category, records) in &self.categories {
            if records.is_empty() {
                continue;
            }
            s.per_category.insert(*category, records.len() as u64);
            for r in records {
                s.total += 1;
                if r.automatic {
                    s.automatic += 1;
                } else {
                    s.manual += 1;
                }
                if r.passed_through(ChangeState::Downgraded) {
                    s.downgraded += 1;
                }
            }
        }
        s
    }

    /// Line annotations per file, merged across categories.
    pub fn file_lines(&self) -> BTreeMap<String, BTreeSet<u64>> {
        let mut out: BTreeMap<String, BTreeSet<u64>> = BTreeMap::new();
        for r in self.records() {
            out.entry(r.file.clone())
                .or_default()
                .extend(r.line_numbers.iter().copied());
        }
        out
    }

    /// Distinct files referenced by records that are eligible for apply.
    pub fn files_to_touch(&self) -> BTreeSet<String> {
        self.records()
            .filter(|r| r.is_eligible_for_apply())
            .map(|r| r.file.clone())
            .collect()
    }
}

/// On-disk form of a change set (`changes.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeSetDocument {
    pub schema: String,
    pub tool: ToolInfo,
    pub project: String,
    pub summary: ChangeSummary,
    pub changes: ChangeSet,
}

impl ChangeSetDocument {
    pub fn new(tool: ToolInfo, project: impl Into<String>, changes: ChangeSet) -> Self {
        Self {
            schema: crate::schema::MIGRAFIX_CHANGES_V1.to_string(),
            tool,
            project: project.into(),
            summary: changes.summary(),
            changes,
        }
    }
}
