use serde::{Deserialize, Serialize};

use crate::model::task::Task;

/// The four fixed GTD categories, in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Projects,
    NextActions,
    WaitingFor,
    SomedayMaybe,
}

impl Category {
    /// All categories in their fixed document order.
    pub const ALL: [Category; 4] = [
        Category::Projects,
        Category::NextActions,
        Category::WaitingFor,
        Category::SomedayMaybe,
    ];

    /// The markdown heading text (without the `#` prefix).
    pub fn heading(self) -> &'static str {
        match self {
            Category::Projects => "Projects",
            Category::NextActions => "Next Actions",
            Category::WaitingFor => "Waiting For",
            Category::SomedayMaybe => "Someday/Maybe",
        }
    }

    /// Map heading text back to a category. Case-sensitive.
    pub fn from_heading(text: &str) -> Option<Category> {
        match text {
            "Projects" => Some(Category::Projects),
            "Next Actions" => Some(Category::NextActions),
            "Waiting For" => Some(Category::WaitingFor),
            "Someday/Maybe" => Some(Category::SomedayMaybe),
            _ => None,
        }
    }
}

/// The whole task file: every category is always present, even when
/// empty, and task order within a category is preserved exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub projects: Vec<Task>,
    #[serde(default)]
    pub next_actions: Vec<Task>,
    #[serde(default)]
    pub waiting_for: Vec<Task>,
    #[serde(default)]
    pub someday_maybe: Vec<Task>,
}

impl Document {
    pub fn tasks(&self, category: Category) -> &[Task] {
        match category {
            Category::Projects => &self.projects,
            Category::NextActions => &self.next_actions,
            Category::WaitingFor => &self.waiting_for,
            Category::SomedayMaybe => &self.someday_maybe,
        }
    }

    pub fn tasks_mut(&mut self, category: Category) -> &mut Vec<Task> {
        match category {
            Category::Projects => &mut self.projects,
            Category::NextActions => &mut self.next_actions,
            Category::WaitingFor => &mut self.waiting_for,
            Category::SomedayMaybe => &mut self.someday_maybe,
        }
    }

    pub fn is_empty(&self) -> bool {
        Category::ALL.iter().all(|c| self.tasks(*c).is_empty())
    }

    pub fn task_count(&self) -> usize {
        Category::ALL.iter().map(|c| self.tasks(*c).len()).sum()
    }

    /// Recompute every task's synthetic ID from its current position.
    pub fn assign_ids(&mut self) {
        for category in Category::ALL {
            for (index, task) in self.tasks_mut(category).iter_mut().enumerate() {
                task.assign_id(category, index);
            }
        }
    }
}
