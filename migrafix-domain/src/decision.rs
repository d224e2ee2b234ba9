//! Human (or policy) confirmation of a classified change set.

use migrafix_types::change::{ChangeId, ChangeState, TransitionError};
use migrafix_types::changeset::ChangeSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Outcome of the confirmation step. Can only remove (decline) or downgrade
/// records; ids not present in the change set are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    /// Confirm every record.
    AcceptAll,
    /// Confirm automatic records and decline manual-review ones. Downgraded
    /// records are left out and stay `Downgraded`.
    AcceptAutomatic,
    DeclineAll,
    Select {
        confirm: BTreeSet<ChangeId>,
        #[serde(default)]
        downgrade: BTreeSet<ChangeId>,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionSummary {
    pub confirmed: u64,
    pub declined: u64,
    pub downgraded: u64,
}

pub const REVIEWER_DOWNGRADE: &str = "downgraded to manual review by reviewer";

/// Move undecided records to `Confirmed` or `Declined`.
pub fn apply_decision(
    set: &mut ChangeSet,
    decision: &Decision,
) -> Result<DecisionSummary, TransitionError> {
    let mut summary = DecisionSummary::default();
    for record in set.records_mut() {
        if !matches!(record.state, ChangeState::Verified | ChangeState::Downgraded) {
            continue;
        }
        if record.state == ChangeState::Downgraded && *decision == Decision::AcceptAutomatic {
            continue;
        }
        let confirm = match decision {
            Decision::AcceptAll => true,
            Decision::AcceptAutomatic => record.automatic,
            Decision::DeclineAll => false,
            Decision::Select { confirm, .. } => confirm.contains(&record.id),
        };
        if confirm {
            record.advance(ChangeState::Confirmed)?;
            summary.confirmed += 1;
            if let Decision::Select { downgrade, .. } = decision {
                if record.automatic && downgrade.contains(&record.id) {
                    record.automatic = false;
                    record.notes.push(REVIEWER_DOWNGRADE.to_string());
                    summary.downgraded += 1;
                }
            }
        } else {
            record.advance(ChangeState::Declined)?;
            summary.declined += 1;
        }
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ChangeClassifier;
    use migrafix_types::change::ProposedChange;
    use migrafix_types::source::SourceFile;

    fn set() -> ChangeSet {
        let c = ChangeClassifier::default();
        let f = SourceFile::new("A.java", "import javax.persistence.Entity;\nclass A extends WebSecurityConfigurerAdapter {}");
        let mut set = ChangeSet::default();
        set.push(c.classify(
            &ProposedChange {
                from: "javax.persistence.Entity".into(),
                to: "jakarta.persistence.Entity".into(),
                ..Default::default()
            },
            &f,
            0,
        ));
        set.push(c.classify(
            &ProposedChange {
                from: "WebSecurityConfigurerAdapter".into(),
                ..Default::default()
            },
            &f,
            1,
        ));
        set
    }

    #[test]
    fn accept_automatic_declines_manual() {
        let mut s = set();
        let summary = apply_decision(&mut s, &Decision::AcceptAutomatic).unwrap();
        assert_eq!((summary.confirmed, summary.declined), (1, 1));
        assert_eq!(s.files_to_touch().len(), 1);
    }

    #[test]
    fn accept_automatic_leaves_downgraded_records_alone() {
        let c = ChangeClassifier::new(
            crate::namespaces::NamespaceTable::default().with_mapping("javax.old", "jakarta.old"),
        );
        let f = SourceFile::new("A.java", "class A {}");
        let mut s = ChangeSet::default();
        s.push(c.classify(
            &ProposedChange {
                from: "javax.old.Thing".into(),
                to: "jakarta.old.Thing".into(),
                ..Default::default()
            },
            &f,
            0,
        ));
        let summary = apply_decision(&mut s, &Decision::AcceptAutomatic).unwrap();
        assert_eq!(summary, DecisionSummary::default());
        assert!(s.records().all(|r| r.state == ChangeState::Downgraded));
    }

    #[test]
    fn decline_all_leaves_nothing_to_touch() {
        let mut s = set();
        apply_decision(&mut s, &Decision::DeclineAll).unwrap();
        assert!(s.records().all(|r| r.state == ChangeState::Declined));
        assert!(s.files_to_touch().is_empty());
    }

    #[test]
    fn select_can_downgrade_but_not_add() {
        let mut s = set();
        let auto_id = s.records().find(|r| r.automatic).unwrap().id.clone();
        let summary = apply_decision(
            &mut s,
            &Decision::Select {
                confirm: BTreeSet::from([auto_id.clone(), ChangeId("not-a-record".into())]),
                downgrade: BTreeSet::from([auto_id.clone()]),
            },
        )
        .unwrap();
        assert_eq!(summary, DecisionSummary { confirmed: 1, declined: 1, downgraded: 1 });
        let r = s.get(&auto_id).unwrap();
        assert!(!r.is_eligible_for_apply());
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn deciding_twice_is_a_noop() {
        let mut s = set();
        apply_decision(&mut s, &Decision::AcceptAll).unwrap();
        let again = apply_decision(&mut s, &Decision::DeclineAll).unwrap();
        assert_eq!(again, DecisionSummary::default());
    }
}
