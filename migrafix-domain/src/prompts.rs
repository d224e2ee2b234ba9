//! Prompt construction for the analysis, plan and per-file change steps.
//!
//! Prompts are pure functions of their inputs so a cached response can be
//! matched to the exact prompt that produced it.

use crate::budget::{ContentBudgeter, prefix};
use crate::namespaces::NamespaceTable;
use migrafix_types::analysis::AnalysisRecord;
use migrafix_types::change::ChangeCategory;
use migrafix_types::source::SourceFile;

const PRIORITY_MARKERS: [&str; 8] = [
    "pom.xml",
    "build.gradle",
    "application.",
    "config",
    "controller",
    "service",
    "repository",
    "security",
];

const KEY_ANNOTATIONS: [&str; 8] = [
    "@Component",
    "@Service",
    "@Controller",
    "@RestController",
    "@Repository",
    "@Configuration",
    "@Entity",
    "@SpringBootApplication",
];

const MAX_IMPORT_LINES: usize = 10;
const MAX_ANNOTATION_LINES: usize = 5;
const SMALL_FILE_BYTES: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptBudgets {
    /// Budget for one file's content inside any prompt.
    pub per_file: usize,
    /// Budget for the whole repository context in the analysis prompt.
    pub analysis_context: usize,
}

impl Default for PromptBudgets {
    fn default() -> Self {
        Self {
            per_file: 5_000,
            analysis_context: 50_000,
        }
    }
}

fn is_priority(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    PRIORITY_MARKERS.iter().any(|m| lower.contains(m))
}

fn structure_entry(index: usize, file: &SourceFile) -> String {
    let imports: Vec<&str> = file
        .content
        .lines()
        .filter(|l| l.trim_start().starts_with("import"))
        .take(MAX_IMPORT_LINES)
        .collect();
    let annotations: Vec<&str> = file
        .content
        .lines()
        .filter(|l| KEY_ANNOTATIONS.iter().any(|a| l.contains(a)))
        .take(MAX_ANNOTATION_LINES)
        .collect();

    let mut entry = format!("--- File {index}: {} ---\n", file.path);
    entry.push_str("IMPORTS:\n");
    entry.push_str(&imports.join("\n"));
    entry.push_str("\nKEY ANNOTATIONS:\n");
    entry.push_str(&annotations.join("\n"));
    entry.push('\n');
    if file.content.len() > SMALL_FILE_BYTES {
        entry.push_str(&format!(
            "[File size: {} bytes - showing structure only]\n\n",
            file.content.len()
        ));
    } else {
        entry.push_str(&file.content);
        entry.push_str("\n\n");
    }
    entry
}

/// Repository context and file listing for the analysis prompt.
///
/// Build files, configuration and Spring stereotype sources contribute
/// budgeted content; other files contribute imports and key annotations.
/// Files past the context budget are counted but not included.
pub fn analysis_context(files: &[SourceFile], budgets: PromptBudgets) -> (String, String) {
    let budgeter = ContentBudgeter::new(budgets.per_file);
    let mut context = String::new();
    let mut listing = Vec::new();

    for (i, file) in files.iter().enumerate() {
        let entry = if is_priority(&file.path) {
            format!(
                "--- File {i}: {} ---\n{}\n\n",
                file.path,
                budgeter.budget(&file.path, &file.content)
            )
        } else {
            structure_entry(i, file)
        };

        if context.len() + entry.len() > budgets.analysis_context {
            context.push_str("... [Additional files truncated for context length] ...\n");
            listing.push(format!("... and {} more files", files.len() - i));
            break;
        }
        context.push_str(&entry);
        listing.push(format!("- {i}: {}", file.path));
    }

    (context, listing.join("\n"))
}

pub fn analysis_prompt(project: &str, files: &[SourceFile], budgets: PromptBudgets) -> String {
    let (context, listing) = analysis_context(files, budgets);
    format!(
        r#"You are an expert in Java, Spring Framework 5 and 6, Spring Boot 2 and 3, and Jakarta EE 9+.
Analyze project `{project}` for migration from Spring Framework 5.x / Spring Boot 2.x to
Spring Framework 6.x / Spring Boot 3.x on Java 17+ with the jakarta namespace.

Assess the framework and dependency versions, every javax.* usage that moves to jakarta.*,
Spring Security configuration (WebSecurityConfigurerAdapter removal), Spring Data / JPA /
Hibernate 6 impact, web layer changes, configuration property renames, and test impact.
Give realistic effort estimates for the size of this codebase.

## Codebase Context
{context}
## Available Files
{listing}

Respond with a single JSON object and nothing else:
{{
  "executive_summary": {{"migration_impact": "...", "key_blockers": ["..."], "recommended_approach": "..."}},
  "detailed_analysis": {{"<area>": {{"findings": ["..."], "required_changes": ["..."]}}}},
  "module_breakdown": [{{"module": "...", "complexity": "low|medium|high", "notes": "..."}}],
  "effort_estimation": {{"total_person_days": 0, "team_size": 0, "timeline": "..."}},
  "migration_roadmap": [{{"step": 1, "title": "...", "description": "..."}}]
}}
"#
    )
}

pub fn plan_prompt(project: &str, analysis: &AnalysisRecord, budgets: PromptBudgets) -> String {
    let json = serde_json::to_string_pretty(analysis).unwrap_or_default();
    let analysis_text = prefix(&json, budgets.analysis_context);
    format!(
        r#"Using the migration analysis below for project `{project}`, produce a phased plan for
moving from Spring 5 to Spring 6 and from javax to jakarta.

## Analysis
{analysis_text}

Respond with a single JSON object and nothing else, with exactly these keys:
{{
  "migration_strategy": {{"approach": "...", "rationale": "..."}},
  "phase_breakdown": [{{"phase": 1, "name": "...", "tasks": ["..."], "risks": ["..."]}}],
  "automation_recommendations": {{"automatic": ["..."], "manual": ["..."]}},
  "testing_strategy": {{"unit": "...", "integration": "...", "regression": "..."}}
}}
"#
    )
}

fn mapping_lines(table: &NamespaceTable) -> String {
    table
        .mappings()
        .iter()
        .map(|m| format!("- {} -> {}", m.from, m.to))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Per-file change-generation prompt. `content` must already be budgeted.
pub fn change_prompt(
    project: &str,
    analysis_summary: &str,
    path: &str,
    content: &str,
    table: &NamespaceTable,
) -> String {
    let buckets = ChangeCategory::ALL
        .iter()
        .map(|c| format!("  \"{}\": []", c.bucket()))
        .collect::<Vec<_>>()
        .join(",\n");
    let mappings = mapping_lines(table);
    format!(
        r#"You are migrating project `{project}` from Spring 5 to Spring 6 (javax -> jakarta).

## Project analysis summary
{analysis_summary}
## Namespace mappings
{mappings}

## File: {path}
```
{content}
```

List every concrete change this file needs. Use the exact text currently in the file for
"from" (it is matched literally) and the replacement for "to". For import renames give the
fully-qualified names. For configuration files set "property" to the key and "from"/"to" to
its old and new values. Leave "from"/"to" empty for changes that need a manual rewrite.

Respond with a single JSON object and nothing else, using these category keys:
{{
{buckets}
}}
Each entry: {{"file": "{path}", "type": "...", "from": "...", "to": "...", "property": null,
"description": "...", "explanation": "...", "line_numbers": [1], "automatic": true}}
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files() -> Vec<SourceFile> {
        vec![
            SourceFile::new("pom.xml", "<project><version>5.3.30</version></project>"),
            SourceFile::new(
                "src/main/java/com/acme/Util.java",
                "import javax.annotation.PostConstruct;\n@Component\nclass Util {}\n",
            ),
        ]
    }

    #[test]
    fn priority_files_get_content_others_structure() {
        let (ctx, listing) = analysis_context(&files(), PromptBudgets::default());
        assert!(ctx.contains("<version>5.3.30</version>"));
        assert!(ctx.contains("IMPORTS:\nimport javax.annotation.PostConstruct;"));
        assert!(ctx.contains("KEY ANNOTATIONS:\n@Component"));
        assert_eq!(listing, "- 0: pom.xml\n- 1: src/main/java/com/acme/Util.java");
    }

    #[test]
    fn context_budget_truncates_file_list() {
        let budgets = PromptBudgets {
            per_file: 5_000,
            analysis_context: 80,
        };
        let (ctx, listing) = analysis_context(&files(), budgets);
        assert!(ctx.ends_with("... [Additional files truncated for context length] ...\n"));
        assert!(listing.ends_with("... and 1 more files"));
    }

    #[test]
    fn change_prompt_is_deterministic_and_lists_buckets() {
        let t = NamespaceTable::default();
        let a = change_prompt("demo", "Impact: High\n", "A.java", "class A {}", &t);
        let b = change_prompt("demo", "Impact: High\n", "A.java", "class A {}", &t);
        assert_eq!(a, b);
        for c in ChangeCategory::ALL {
            assert!(a.contains(c.bucket()));
        }
        assert!(a.contains("- javax.persistence -> jakarta.persistence"));
    }

    #[test]
    fn plan_prompt_embeds_analysis() {
        let p = plan_prompt("demo", &AnalysisRecord::skeleton("x"), PromptBudgets::default());
        assert!(p.contains("Manual analysis required"));
        for k in migrafix_types::analysis::MigrationPlan::REQUIRED_KEYS {
            assert!(p.contains(k));
        }
    }
}
