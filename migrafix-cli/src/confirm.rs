//! Interactive confirmation on the terminal.

use anyhow::Context;
use migrafix_core::ports::ConfirmPort;
use migrafix_domain::Decision;
use migrafix_render::{render_changes_md, render_preview};
use migrafix_types::ToolInfo;
use migrafix_types::changeset::{ChangeSet, ChangeSetDocument};
use std::cell::RefCell;
use std::io::{BufRead, Write};

/// Asks once per run whether the automatic changes should be applied.
///
/// `y` confirms the automatic records, `n` (or an empty answer or end of
/// input) declines everything, `p` prints every record in full and asks
/// again.
pub struct ConsoleConfirm<R, W> {
    input: RefCell<R>,
    output: RefCell<W>,
    project: String,
}

impl<R: BufRead, W: Write> ConsoleConfirm<R, W> {
    pub fn new(input: R, output: W, project: impl Into<String>) -> Self {
        Self {
            input: RefCell::new(input),
            output: RefCell::new(output),
            project: project.into(),
        }
    }

    fn ask(&self) -> anyhow::Result<Option<String>> {
        let mut out = self.output.borrow_mut();
        write!(out, "Apply automatic changes? [y/N/p] ").context("write prompt")?;
        out.flush().context("flush prompt")?;
        let mut line = String::new();
        let n = self
            .input
            .borrow_mut()
            .read_line(&mut line)
            .context("read answer")?;
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_ascii_lowercase()))
    }
}

impl<R: BufRead, W: Write> ConfirmPort for ConsoleConfirm<R, W> {
    fn confirm(&self, changes: &ChangeSet) -> anyhow::Result<Decision> {
        let summary = changes.summary();
        {
            let mut out = self.output.borrow_mut();
            writeln!(
                out,
                "{} proposed changes ({} automatic, {} manual review, {} downgraded):",
                summary.total, summary.automatic, summary.manual, summary.downgraded
            )
            .context("write summary")?;
            write!(out, "{}", render_preview(changes)).context("write preview")?;
        }

        if summary.automatic == 0 {
            writeln!(self.output.borrow_mut(), "Nothing to apply automatically.")
                .context("write summary")?;
            return Ok(Decision::DeclineAll);
        }

        loop {
            match self.ask()?.as_deref() {
                Some("y") | Some("yes") => return Ok(Decision::AcceptAutomatic),
                Some("p") => {
                    let doc = ChangeSetDocument::new(
                        ToolInfo::migrafix(env!("CARGO_PKG_VERSION")),
                        self.project.clone(),
                        changes.clone(),
                    );
                    write!(self.output.borrow_mut(), "{}", render_changes_md(&doc))
                        .context("write details")?;
                }
                Some("") | Some("n") | Some("no") | None => return Ok(Decision::DeclineAll),
                Some(other) => {
                    writeln!(self.output.borrow_mut(), "Unrecognized answer `{other}`.")
                        .context("write prompt")?;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migrafix_domain::ChangeClassifier;
    use migrafix_types::change::ProposedChange;
    use migrafix_types::source::SourceFile;
    use std::io::Cursor;

    fn one_automatic_change() -> ChangeSet {
        let file = SourceFile::new("A.java", "import javax.persistence.Entity;\n");
        let record = ChangeClassifier::default().classify(
            &ProposedChange {
                from: "javax.persistence.Entity".into(),
                to: "jakarta.persistence.Entity".into(),
                ..Default::default()
            },
            &file,
            0,
        );
        let mut set = ChangeSet::default();
        set.push(record);
        set
    }

    fn answer(input: &str, set: &ChangeSet) -> (Decision, String) {
        let mut output = Vec::new();
        let decision = {
            let confirm = ConsoleConfirm::new(Cursor::new(input.to_string()), &mut output, "shop");
            confirm.confirm(set).unwrap()
        };
        (decision, String::from_utf8(output).unwrap())
    }

    #[test]
    fn yes_accepts_automatic_changes() {
        let (decision, out) = answer("y\n", &one_automatic_change());
        assert_eq!(decision, Decision::AcceptAutomatic);
        assert!(out.contains("javax.persistence.Entity -> jakarta.persistence.Entity"));
    }

    #[test]
    fn empty_answer_and_eof_decline() {
        assert_eq!(answer("\n", &one_automatic_change()).0, Decision::DeclineAll);
        assert_eq!(answer("", &one_automatic_change()).0, Decision::DeclineAll);
    }

    #[test]
    fn print_shows_details_then_asks_again() {
        let (decision, out) = answer("p\nwhat\nY\n", &one_automatic_change());
        assert_eq!(decision, Decision::AcceptAutomatic);
        assert!(out.contains("# migrafix changes: shop"));
        assert!(out.contains("Unrecognized answer `what`."));
        assert_eq!(out.matches("[y/N/p]").count(), 3);
    }

    #[test]
    fn nothing_automatic_declines_without_asking() {
        let (decision, out) = answer("y\n", &ChangeSet::default());
        assert_eq!(decision, Decision::DeclineAll);
        assert!(!out.contains("[y/N/p]"));
    }
}
