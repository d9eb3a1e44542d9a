//! Mitigation checklist ranking.
//!
//! Tri-state ordering over mitigation items: leave the caller's order
//! untouched, or sort by priority weight in either direction. Sorting is
//! stable, so items of equal priority keep their original relative order
//! across repeated toggles.

use serde::{Deserialize, Serialize};

/// Mitigation priority, mapped to a numeric weight for sorting only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Routine hygiene.
    Low,
    /// Should be scheduled.
    Medium,
    /// Needs prompt attention.
    High,
    /// Drop everything.
    Critical,
}

impl Priority {
    /// Numeric sort weight (`Low` = 1 … `Critical` = 4).
    #[must_use]
    pub const fn weight(self) -> u8 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
            Self::Critical => 4,
        }
    }
}

/// A single actionable item on a mitigation checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MitigationItem {
    /// Stable identifier.
    pub id: String,
    /// Short title.
    pub title: String,
    /// Recommended action.
    pub action: String,
    /// Priority; never mutated by ranking.
    pub priority: Priority,
    /// Whether the item has been completed.
    #[serde(default)]
    pub done: bool,
}

/// Ordering applied by [`rank`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Caller's original order, unchanged.
    #[default]
    Unsorted,
    /// Highest priority first.
    Descending,
    /// Lowest priority first.
    Ascending,
}

/// Returns the items in the requested order.
///
/// `Unsorted` preserves the input order exactly, so callers holding the
/// canonical list can toggle between orders and back without loss. The
/// directional orders use a stable sort: ties keep input order.
#[must_use]
pub fn rank(items: &[MitigationItem], order: SortOrder) -> Vec<MitigationItem> {
    let mut ranked = items.to_vec();
    match order {
        SortOrder::Unsorted => {}
        SortOrder::Descending => {
            ranked.sort_by(|a, b| b.priority.weight().cmp(&a.priority.weight()));
        }
        SortOrder::Ascending => {
            ranked.sort_by(|a, b| a.priority.weight().cmp(&b.priority.weight()));
        }
    }
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, priority: Priority) -> MitigationItem {
        MitigationItem {
            id: id.to_string(),
            title: format!("title {id}"),
            action: format!("action {id}"),
            priority,
            done: false,
        }
    }

    fn sample() -> Vec<MitigationItem> {
        vec![
            item("a", Priority::Low),
            item("b", Priority::Critical),
            item("c", Priority::Critical),
            item("d", Priority::Medium),
        ]
    }

    fn ids(items: &[MitigationItem]) -> Vec<&str> {
        items.iter().map(|i| i.id.as_str()).collect()
    }

    #[test]
    fn test_priority_weights() {
        assert_eq!(Priority::Low.weight(), 1);
        assert_eq!(Priority::Medium.weight(), 2);
        assert_eq!(Priority::High.weight(), 3);
        assert_eq!(Priority::Critical.weight(), 4);
    }

    #[test]
    fn test_unsorted_preserves_input_order() {
        let items = sample();
        let ranked = rank(&items, SortOrder::Unsorted);
        assert_eq!(ids(&ranked), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_descending_with_stable_ties() {
        let items = sample();
        let ranked = rank(&items, SortOrder::Descending);
        // b before c: equal priorities keep input order
        assert_eq!(ids(&ranked), vec!["b", "c", "d", "a"]);
    }

    #[test]
    fn test_ascending_with_stable_ties() {
        let items = sample();
        let ranked = rank(&items, SortOrder::Ascending);
        assert_eq!(ids(&ranked), vec!["a", "d", "b", "c"]);
    }

    #[test]
    fn test_toggle_back_to_unsorted_restores_input() {
        let items = sample();
        let _descending = rank(&items, SortOrder::Descending);
        let restored = rank(&items, SortOrder::Unsorted);
        assert_eq!(ids(&restored), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_ranking_does_not_mutate_priorities() {
        let items = sample();
        let ranked = rank(&items, SortOrder::Descending);
        for item in &ranked {
            let original = items.iter().find(|i| i.id == item.id).unwrap();
            assert_eq!(item.priority, original.priority);
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(rank(&[], SortOrder::Descending).is_empty());
    }

    #[test]
    fn test_repeated_toggles_stay_stable() {
        let items = sample();
        let once = rank(&items, SortOrder::Descending);
        let twice = rank(&once, SortOrder::Descending);
        assert_eq!(ids(&once), ids(&twice));
    }
}
