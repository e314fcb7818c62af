use std::sync::LazyLock;

use regex::Regex;

use crate::model::{Category, Document, Task};
use crate::title::{TitleResolver, is_bare_url};

/// Parse a markdown task file into a Document.
///
/// The parser never fails: unrecognized lines degrade by omission and are
/// returned in the `dropped` list so callers can report them. Every one
/// of the four categories is present in the result, even on empty input.
///
/// Attachment rule: indented non-checkbox lines under a task are its
/// comments; a blank line always ends the comment run and closes the
/// task.
pub fn parse_document(source: &str, resolver: &TitleResolver) -> (Document, Vec<String>) {
    let mut doc = Document::default();
    let mut dropped = Vec::new();
    let mut current_category: Option<Category> = None;
    let mut current_task: Option<Task> = None;

    for raw_line in source.lines() {
        let line = raw_line.trim_end();

        if line.trim().is_empty() {
            flush_task(&mut doc, current_category, &mut current_task);
            continue;
        }

        if let Some(heading) = heading_text(line) {
            flush_task(&mut doc, current_category, &mut current_task);
            current_category = Category::from_heading(heading);
            if current_category.is_none() {
                // Tasks under an unknown heading are dropped, not rescued
                dropped.push(line.to_string());
            }
            continue;
        }

        if let Some((completed, rest)) = checkbox_item(line) {
            flush_task(&mut doc, current_category, &mut current_task);
            if current_category.is_none() || rest.is_empty() {
                dropped.push(line.to_string());
                continue;
            }
            let mut task = Task::new(rest);
            task.completed = completed;
            if is_bare_url(rest) {
                task.url = Some(rest.to_string());
                task.text = resolver.resolve(rest);
            }
            current_task = Some(task);
            continue;
        }

        if line.starts_with(' ') || line.starts_with('\t') {
            match current_task.as_mut() {
                Some(task) => task.comments.push(comment_text(line)),
                None => dropped.push(line.to_string()),
            }
            continue;
        }

        // Non-indented line that is neither a heading nor a checkbox item
        flush_task(&mut doc, current_category, &mut current_task);
        dropped.push(line.to_string());
    }

    flush_task(&mut doc, current_category, &mut current_task);
    doc.assign_ids();
    (doc, dropped)
}

fn flush_task(doc: &mut Document, category: Option<Category>, task: &mut Option<Task>) {
    if let Some(task) = task.take()
        && let Some(category) = category
    {
        doc.tasks_mut(category).push(task);
    }
}

/// Heading text for a column-0 markdown heading (`# Projects`).
fn heading_text(line: &str) -> Option<&str> {
    if !line.starts_with('#') {
        return None;
    }
    let text = line.trim_start_matches('#').strip_prefix(' ')?;
    Some(text.trim())
}

/// Match a checkbox list item (`- [ ] text` / `- [x] text`, any indent,
/// case-insensitive `x`). Returns the completion flag and the trimmed
/// remainder.
fn checkbox_item(line: &str) -> Option<(bool, &str)> {
    let body = line.trim_start().strip_prefix("- ")?.trim_start();
    if let Some(rest) = body.strip_prefix("[x] ").or_else(|| body.strip_prefix("[X] ")) {
        Some((true, rest.trim()))
    } else {
        body.strip_prefix("[ ] ").map(|rest| (false, rest.trim()))
    }
}

static HTML_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<!--\s*Comment:\s*(.*?)\s*-->$").unwrap());

/// Normalize an indented comment line. Legacy spellings from older task
/// files (`<!-- Comment: x -->`, `• Comment: x`, `• Note: x`) reduce to
/// their payload; anything else is kept trimmed.
fn comment_text(line: &str) -> String {
    let trimmed = line.trim();
    if let Some(captures) = HTML_COMMENT.captures(trimmed) {
        return captures[1].to_string();
    }
    if let Some(rest) = trimmed.strip_prefix("• Comment:") {
        return rest.trim().to_string();
    }
    if let Some(rest) = trimmed.strip_prefix("• Note:") {
        return rest.trim().to_string();
    }
    trimmed.to_string()
}
