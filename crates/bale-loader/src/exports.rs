use serde_json::{Map, Value};
use std::cell::RefCell;
use std::rc::Rc;

/// A module's shared exports object.
///
/// Clones share storage, so a dependent that captured the exports of a module
/// still executing (an import cycle) sees whatever gets set later.
#[derive(Debug, Clone, Default)]
pub struct Exports(Rc<RefCell<Map<String, Value>>>);

impl Exports {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.0.borrow().get(key).cloned()
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.borrow_mut().insert(key.into(), value.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.borrow().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Copy of the current contents.
    pub fn snapshot(&self) -> Map<String, Value> {
        self.0.borrow().clone()
    }

    /// True when both handles point at the same exports object.
    pub fn same(&self, other: &Exports) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_storage() {
        let exports = Exports::new();
        let seen_early = exports.clone();
        assert!(seen_early.is_empty());

        exports.set("answer", 42);
        assert_eq!(seen_early.get("answer"), Some(Value::from(42)));
        assert!(seen_early.same(&exports));
        assert!(!Exports::new().same(&exports));
    }
}
