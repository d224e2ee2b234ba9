//! Domain logic: turn model proposals and repository content into a
//! verified, categorized change set.
//!
//! This crate owns *what* may change and how safe it is. It does not own *how*
//! edits are applied; that's the `migrafix-edit` crate.

mod assignments;
mod budget;
mod classify;
mod decision;
mod merge;
mod namespaces;
mod prompts;
mod select;

pub use assignments::{Assignment, find_assignments, is_assigned};
pub use budget::{ContentBudgeter, is_code_path, truncation_marker};
pub use classify::{
    ChangeClassifier, TARGET_NOT_FOUND, contains_version, is_config_file, is_dependency_file,
    locate_lines, split_property,
};
pub use decision::{Decision, DecisionSummary, REVIEWER_DOWNGRADE, apply_decision};
pub use merge::build_change_set;
pub use namespaces::{
    NamespaceMapping, NamespaceTable, dotted_name_at, has_token_prefix, is_identifier_char,
    is_qualified_name, strip_import, token_occurrences,
};
pub use prompts::{PromptBudgets, analysis_context, analysis_prompt, change_prompt, plan_prompt};
pub use select::{MIN_FILE_LIMIT, is_priority_path, limit_files, skip_reason};
