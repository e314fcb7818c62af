use std::fmt::Write;

use crate::model::{Category, Document};

/// Serialize a Document to its canonical markdown form: the four
/// headings in fixed order, one checkbox line per task, comments as
/// two-space-indented lines, a blank line between sections.
///
/// A task that came from a bare URL is emitted with its resolved title;
/// the raw URL only reappears when the resolver's final fallback made it
/// the title.
pub fn serialize_document(doc: &Document) -> String {
    let mut out = String::new();
    for (i, category) in Category::ALL.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = writeln!(out, "# {}", category.heading());
        for task in doc.tasks(*category) {
            let _ = writeln!(out, "- [{}] {}", task.checkbox_char(), task.text);
            for comment in &task.comments {
                let _ = writeln!(out, "  {}", comment);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::Task;

    #[test]
    fn empty_document_emits_all_headings() {
        let output = serialize_document(&Document::default());
        assert_eq!(
            output,
            "# Projects\n\n# Next Actions\n\n# Waiting For\n\n# Someday/Maybe\n"
        );
    }

    #[test]
    fn tasks_and_comments_emit_in_order() {
        let mut doc = Document::default();
        let mut done = Task::new("Ship release");
        done.completed = true;
        done.comments.push("tag v1.2".to_string());
        doc.projects.push(done);
        doc.next_actions.push(Task::new("Call dentist"));

        let output = serialize_document(&doc);
        assert_eq!(
            output,
            "# Projects\n- [x] Ship release\n  tag v1.2\n\n# Next Actions\n- [ ] Call dentist\n\n# Waiting For\n\n# Someday/Maybe\n"
        );
    }

    #[test]
    fn url_task_emits_resolved_title_only() {
        let mut doc = Document::default();
        let mut task = Task::new("Learn Rust");
        task.url = Some("https://example.com/learn-rust".to_string());
        doc.someday_maybe.push(task);

        let output = serialize_document(&doc);
        assert!(output.contains("- [ ] Learn Rust\n"));
        assert!(!output.contains("example.com"));
    }
}
