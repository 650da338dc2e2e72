use log::debug;
use serde::Serialize;

use crate::error::{ScriptError, ScriptResult};

pub const NUM_BAG_OBJECTS: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BagObject {
    pub name: String,
    /// Decoded inventory bitmap: 4 header bytes then `w * h` pixels.
    #[serde(skip)]
    pub data: Vec<u8>,
}

/// Player inventory.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Bag {
    objects: Vec<BagObject>,
    pub current: Option<usize>,
    pub current_action: i16,
}

impl Bag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.objects.len() >= NUM_BAG_OBJECTS
    }

    pub fn objects(&self) -> &[BagObject] {
        &self.objects
    }

    /// ASCII case-insensitive lookup.
    pub fn find(&self, name: &[u8]) -> Option<usize> {
        self.objects
            .iter()
            .position(|object| object.name.as_bytes().eq_ignore_ascii_case(name))
    }

    pub fn add(&mut self, name: impl Into<String>, data: Vec<u8>) -> ScriptResult<()> {
        if self.is_full() {
            return Err(ScriptError::BagFull(self.objects.len()));
        }
        let name = name.into();
        debug!("bag add '{}' ({} bytes)", name, data.len());
        self.objects.push(BagObject { name, data });
        if self.current.is_none() {
            self.current = Some(0);
        }
        Ok(())
    }

    /// Removes an entry. Removing the selected entry selects the first one,
    /// which can leave the selection past the end when the bag empties.
    pub fn remove(&mut self, index: usize) -> Option<BagObject> {
        if index >= self.objects.len() {
            return None;
        }
        match self.current {
            Some(current) if current == index => self.current = Some(0),
            Some(current) if current > index => self.current = Some(current - 1),
            _ => {}
        }
        let removed = self.objects.remove(index);
        debug!("bag remove '{}'", removed.name);
        Some(removed)
    }

    /// Selection rule applied on scene entry when nothing is selected.
    pub fn normalize_selection(&mut self) {
        if self.current.is_none() && !self.objects.is_empty() {
            self.current = Some(0);
        }
    }

    pub fn is_current(&self, name: &[u8]) -> bool {
        match self.find(name) {
            Some(index) => self.current == Some(index),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bag_with(names: &[&str]) -> Bag {
        let mut bag = Bag::new();
        for name in names {
            bag.add(*name, vec![0; 4]).unwrap();
        }
        bag
    }

    #[test]
    fn lookup_ignores_ascii_case() {
        let bag = bag_with(&["Rope", "KNIFE"]);
        assert_eq!(bag.find(b"rope"), Some(0));
        assert_eq!(bag.find(b"knife"), Some(1));
        assert_eq!(bag.find(b"gun"), None);
        assert!(bag.is_current(b"ROPE"));
    }

    #[test]
    fn removal_adjusts_selection() {
        let mut bag = bag_with(&["a", "b", "c"]);
        bag.current = Some(2);
        bag.remove(0);
        assert_eq!(bag.current, Some(1));

        bag.remove(1);
        assert_eq!(bag.current, Some(0));
        assert_eq!(bag.len(), 1);
    }

    #[test]
    fn removing_last_entry_keeps_stale_selection() {
        let mut bag = bag_with(&["only"]);
        bag.remove(0);
        assert!(bag.is_empty());
        assert_eq!(bag.current, Some(0));
    }

    #[test]
    fn full_bag_rejects_additions() {
        let names: Vec<String> = (0..NUM_BAG_OBJECTS).map(|i| format!("item{i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let mut bag = bag_with(&refs);
        assert!(matches!(
            bag.add("extra", Vec::new()),
            Err(ScriptError::BagFull(NUM_BAG_OBJECTS))
        ));
    }

    #[test]
    fn normalize_selects_first_item() {
        let mut bag = bag_with(&["x"]);
        bag.current = None;
        bag.normalize_selection();
        assert_eq!(bag.current, Some(0));

        let mut empty = Bag::new();
        empty.normalize_selection();
        assert_eq!(empty.current, None);
    }
}
