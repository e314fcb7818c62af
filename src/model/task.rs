use std::hash::{DefaultHasher, Hash, Hasher};

use serde::{Deserialize, Serialize};

/// A single list item within a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Synthetic stable identifier, assigned at parse time. Emitted in
    /// JSON so clients can address tasks; ignored on input and never
    /// written to the markdown file.
    #[serde(default)]
    pub id: String,
    /// Display text: the resolved title when the task came from a bare
    /// URL, otherwise the raw line remainder.
    pub text: String,
    /// Checkbox state.
    #[serde(default)]
    pub completed: bool,
    /// Source URL when the task line was a bare link.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Free-form comment lines attached under the task, in file order.
    #[serde(default)]
    pub comments: Vec<String>,
}

impl Task {
    pub fn new(text: impl Into<String>) -> Task {
        Task {
            id: String::new(),
            text: text.into(),
            completed: false,
            url: None,
            comments: Vec::new(),
        }
    }

    /// Assign the synthetic ID from category, text, and position.
    /// Deterministic for a given document, so re-parsing an unchanged
    /// file yields the same IDs.
    pub fn assign_id(&mut self, category: super::Category, index: usize) {
        let mut hasher = DefaultHasher::new();
        category.heading().hash(&mut hasher);
        self.text.hash(&mut hasher);
        index.hash(&mut hasher);
        self.id = format!("{:016x}", hasher.finish());
    }

    /// Checkbox marker for the markdown form.
    pub fn checkbox_char(&self) -> char {
        if self.completed { 'x' } else { ' ' }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Category;

    #[test]
    fn assign_id_is_deterministic() {
        let mut a = Task::new("Write report");
        let mut b = Task::new("Write report");
        a.assign_id(Category::Projects, 0);
        b.assign_id(Category::Projects, 0);
        assert_eq!(a.id, b.id);
        assert_eq!(a.id.len(), 16);
    }

    #[test]
    fn assign_id_varies_by_position_and_category() {
        let mut a = Task::new("Write report");
        let mut b = Task::new("Write report");
        a.assign_id(Category::Projects, 0);
        b.assign_id(Category::Projects, 1);
        assert_ne!(a.id, b.id);

        b.assign_id(Category::NextActions, 0);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn json_input_ignores_missing_optional_fields() {
        let task: Task = serde_json::from_str(r#"{"text":"Call bank"}"#).unwrap();
        assert_eq!(task.text, "Call bank");
        assert!(!task.completed);
        assert!(task.url.is_none());
        assert!(task.comments.is_empty());
        assert!(task.id.is_empty());
    }
}
