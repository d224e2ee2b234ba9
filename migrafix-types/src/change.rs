use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// Fixed change taxonomy. Declaration order is the report/grouping order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeCategory {
    NamespaceMigration,
    SecurityConfig,
    DependencyVersion,
    ConfigurationProperty,
    Other,
}

impl ChangeCategory {
    pub const ALL: [ChangeCategory; 5] = [
        ChangeCategory::NamespaceMigration,
        ChangeCategory::SecurityConfig,
        ChangeCategory::DependencyVersion,
        ChangeCategory::ConfigurationProperty,
        ChangeCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeCategory::NamespaceMigration => "namespace-migration",
            ChangeCategory::SecurityConfig => "security-config",
            ChangeCategory::DependencyVersion => "dependency-version",
            ChangeCategory::ConfigurationProperty => "configuration-property",
            ChangeCategory::Other => "other",
        }
    }

    /// Key used for this category in model-produced change documents.
    pub fn bucket(&self) -> &'static str {
        match self {
            ChangeCategory::NamespaceMigration => "javax_to_jakarta",
            ChangeCategory::SecurityConfig => "spring_security_updates",
            ChangeCategory::DependencyVersion => "dependency_updates",
            ChangeCategory::ConfigurationProperty => "configuration_updates",
            ChangeCategory::Other => "other_changes",
        }
    }

    pub fn from_bucket(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.bucket() == key)
    }
}

impl fmt::Display for ChangeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a model-produced change document, before classification.
///
/// Every field is optional on the wire; the extractor normalizes what it can
/// and the classifier fills in the rest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedChange {
    /// Bucket key the model filed this entry under (`javax_to_jakarta`, ...).
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub file: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub line_numbers: Vec<u64>,
    /// The model's own claim. Recorded, never trusted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub automatic: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeId(pub String);

const CHANGE_ID_NAMESPACE: Uuid = Uuid::from_u128(0x4d1c_7a52_93e0_4f0b_9c4e_2a7d_51b8_66f3);

impl ChangeId {
    /// Deterministic id from the record's identity and its position in the
    /// file's change list.
    pub fn derive(
        file: &str,
        category: ChangeCategory,
        from: &str,
        to: &str,
        ordinal: usize,
    ) -> Self {
        let key = format!("{file}\n{category}\n{from}\n{to}\n{ordinal}");
        Self(Uuid::new_v5(&CHANGE_ID_NAMESPACE, key.as_bytes()).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight characters, for console output.
    pub fn short(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }
}

impl fmt::Display for ChangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle of a single record. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeState {
    Proposed,
    Classified,
    Verified,
    Downgraded,
    Confirmed,
    Declined,
    Applied,
    Skipped,
    Failed,
}

impl ChangeState {
    pub fn can_advance_to(self, next: ChangeState) -> bool {
        use ChangeState::*;
        matches!(
            (self, next),
            (Proposed, Classified)
                | (Classified, Verified)
                | (Classified, Downgraded)
                | (Verified, Confirmed)
                | (Verified, Declined)
                | (Downgraded, Confirmed)
                | (Downgraded, Declined)
                | (Downgraded, Skipped)
                | (Confirmed, Applied)
                | (Confirmed, Skipped)
                | (Confirmed, Failed)
                | (Declined, Skipped)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ChangeState::Applied | ChangeState::Skipped | ChangeState::Failed
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ChangeState::Proposed => "proposed",
            ChangeState::Classified => "classified",
            ChangeState::Verified => "verified",
            ChangeState::Downgraded => "downgraded",
            ChangeState::Confirmed => "confirmed",
            ChangeState::Declined => "declined",
            ChangeState::Applied => "applied",
            ChangeState::Skipped => "skipped",
            ChangeState::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("change {id}: illegal transition {from:?} -> {to:?}")]
pub struct TransitionError {
    pub id: ChangeId,
    pub from: ChangeState,
    pub to: ChangeState,
}

/// The atomic unit of migration: one proposed edit to one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub id: ChangeId,
    pub file: String,
    pub category: ChangeCategory,

    /// Free-form kind reported by the model (`import_replacement`, ...).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,

    pub from_value: String,
    pub to_value: String,

    /// Key for configuration-property records; `from_value`/`to_value` are
    /// then the old and new values of that key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,

    pub description: String,
    pub explanation: String,

    #[serde(default)]
    pub line_numbers: BTreeSet<u64>,

    pub automatic: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,

    pub state: ChangeState,

    /// Every state this record has been in, oldest first, including `state`.
    #[serde(default)]
    pub history: Vec<ChangeState>,
}

impl ChangeRecord {
    pub fn advance(&mut self, next: ChangeState) -> Result<(), TransitionError> {
        if !self.state.can_advance_to(next) {
            return Err(TransitionError {
                id: self.id.clone(),
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        self.history.push(next);
        Ok(())
    }

    /// Clear the automatic flag, attach `note` and move to `Downgraded`.
    pub fn downgrade(&mut self, note: impl Into<String>) -> Result<(), TransitionError> {
        self.advance(ChangeState::Downgraded)?;
        self.automatic = false;
        self.notes.push(note.into());
        Ok(())
    }

    pub fn passed_through(&self, state: ChangeState) -> bool {
        self.history.contains(&state)
    }

    /// Automatic, verified against content and confirmed by the decision.
    pub fn is_eligible_for_apply(&self) -> bool {
        self.automatic
            && self.state == ChangeState::Confirmed
            && self.passed_through(ChangeState::Verified)
            && !self.passed_through(ChangeState::Downgraded)
    }
}
