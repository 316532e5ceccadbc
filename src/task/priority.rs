//! Task priority levels.

use serde::{Deserialize, Serialize};

/// Priority of a task. The raw value is what gets persisted and sorted on,
/// so `High` comes first in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    High = 1,
    Medium = 2,
    Low = 3,
}

impl TaskPriority {
    pub const ALL: [TaskPriority; 3] = [TaskPriority::High, TaskPriority::Medium, TaskPriority::Low];

    /// Map a raw stored value back to a priority. `0` and anything outside
    /// `1..=3` mean "not chosen".
    pub fn from_raw(raw: i16) -> Option<Self> {
        match raw {
            1 => Some(Self::High),
            2 => Some(Self::Medium),
            3 => Some(Self::Low),
            _ => None,
        }
    }

    pub fn raw(self) -> i16 {
        self as i16
    }

    /// Display title used by pickers.
    pub fn title(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }

    /// Short marker shown next to a task in the list.
    pub fn marker(self) -> &'static str {
        match self {
            Self::High => "!!",
            Self::Medium => "!",
            Self::Low => "",
        }
    }

    /// Map a three-way picker index (High, Medium, Low) to a priority.
    /// Out-of-range indices fall back to `Low`.
    pub fn from_segment_index(index: usize) -> Self {
        match index {
            0 => Self::High,
            1 => Self::Medium,
            _ => Self::Low,
        }
    }

    pub fn segment_index(self) -> usize {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }

    /// Parse from user input (`high`, `medium`/`med`, `low`, or `1`..`3`).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "high" | "h" | "1" => Some(Self::High),
            "medium" | "med" | "m" | "2" => Some(Self::Medium),
            "low" | "l" | "3" => Some(Self::Low),
            _ => None,
        }
    }
}

impl std::fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.title())
    }
}
