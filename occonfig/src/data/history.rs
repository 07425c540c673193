use serde_json::Value;

use crate::data::modification::Modification;

#[derive(Debug, Clone, PartialEq)]
struct Entry {
    modification: Modification,
    inverse: Modification,
}

/// Undo and redo stacks of applied modifications.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UndoHistory {
    undo: Vec<Entry>,
    redo: Vec<Entry>,
}

impl UndoHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember `modification`, which replaced `previous` (`None` if the key
    /// was absent). Clears the redo stack.
    pub fn record(&mut self, modification: Modification, previous: Option<Value>) {
        let inverse = Modification {
            path: modification.path.clone(),
            value: previous,
        };
        self.undo.push(Entry {
            modification,
            inverse,
        });
        self.redo.clear();
    }

    /// Pop the latest edit and return the modification that reverts it.
    pub fn undo(&mut self) -> Option<Modification> {
        let entry = self.undo.pop()?;
        let inverse = entry.inverse.clone();
        self.redo.push(entry);
        Some(inverse)
    }

    /// Pop the latest undone edit and return it for re-application.
    pub fn redo(&mut self) -> Option<Modification> {
        let entry = self.redo.pop()?;
        let modification = entry.modification.clone();
        self.undo.push(entry);
        Some(modification)
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_undo_redo() {
        let mut history = UndoHistory::new();
        assert_eq!(history.undo(), None);

        let set = Modification::from_dot_path("theme", Some(json!("dark")));
        history.record(set.clone(), Some(json!("nord")));
        assert!(history.can_undo());

        assert_eq!(
            history.undo(),
            Some(Modification::from_dot_path("theme", Some(json!("nord"))))
        );
        assert!(history.can_redo());
        assert_eq!(history.redo(), Some(set));
        assert!(!history.can_redo());
    }

    #[test]
    fn test_undo_of_new_key_deletes() {
        let mut history = UndoHistory::new();
        history.record(Modification::from_dot_path("model", Some(json!("a/b"))), None);
        let inverse = history.undo().expect("inverse");
        assert!(inverse.is_delete());
    }

    #[test]
    fn test_record_clears_redo() {
        let mut history = UndoHistory::new();
        history.record(Modification::from_dot_path("a", Some(json!(1))), None);
        history.undo();
        history.record(Modification::from_dot_path("b", Some(json!(2))), None);
        assert!(!history.can_redo());

        history.clear();
        assert!(!history.can_undo());
    }
}
