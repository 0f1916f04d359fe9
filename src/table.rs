//! Open-addressed hash table keyed by interned strings.
//!
//! Lookup compares keys by reference identity, which interning turns into
//! content identity. Deleted buckets become tombstones so probe chains stay
//! intact; tombstones keep counting against the load factor until the next
//! resize rebuilds the table without them.

use std::rc::Rc;

use crate::value::object::ObjString;
use crate::value::Value;

const TABLE_MAX_LOAD: f64 = 0.75;

/// A bucket. Three states:
/// - empty: `key == None`, `value == Nil`
/// - live: `key == Some`
/// - tombstone: `key == None`, `value == Bool(true)`
#[derive(Debug, Clone)]
struct Entry {
    key: Option<Rc<ObjString>>,
    value: Value,
}

impl Entry {
    fn empty() -> Self {
        Self {
            key: None,
            value: Value::Nil,
        }
    }
}

#[derive(Debug)]
pub struct Table {
    /// Live entries plus tombstones.
    count: usize,
    entries: Vec<Entry>,
}

impl Table {
    pub fn new() -> Self {
        Self {
            count: 0,
            entries: Vec::new(),
        }
    }

    /// Look up a value by key identity.
    pub fn get(&self, key: &Rc<ObjString>) -> Option<&Value> {
        if self.count == 0 {
            return None;
        }
        let index = Self::find_entry(&self.entries, key);
        let entry = &self.entries[index];
        entry.key.as_ref()?;
        Some(&entry.value)
    }

    /// Insert or overwrite. Returns true iff the key was newly inserted.
    pub fn set(&mut self, key: Rc<ObjString>, value: Value) -> bool {
        if (self.count + 1) as f64 > self.entries.len() as f64 * TABLE_MAX_LOAD {
            let capacity = grow_capacity(self.entries.len());
            self.adjust_capacity(capacity);
        }

        let index = Self::find_entry(&self.entries, &key);
        let entry = &mut self.entries[index];
        let is_new_key = entry.key.is_none();
        // Reusing a tombstone does not change count: it already pays for
        // its bucket until the next resize.
        if is_new_key && matches!(entry.value, Value::Nil) {
            self.count += 1;
        }

        entry.key = Some(key);
        entry.value = value;
        is_new_key
    }

    /// Replace the entry with a tombstone. Returns true iff the key was
    /// present. `count` stays unchanged.
    pub fn delete(&mut self, key: &Rc<ObjString>) -> bool {
        if self.count == 0 {
            return false;
        }
        let index = Self::find_entry(&self.entries, key);
        let entry = &mut self.entries[index];
        if entry.key.is_none() {
            return false;
        }
        entry.key = None;
        entry.value = Value::Bool(true);
        true
    }

    /// Copy every live entry from `from` into this table.
    pub fn add_all(&mut self, from: &Table) {
        for (key, value) in from.iter() {
            self.set(Rc::clone(key), value.clone());
        }
    }

    /// Content-based lookup used by the interner before an `ObjString`
    /// exists, so it cannot rely on reference identity.
    pub fn find_string(&self, chars: &str, hash: u32) -> Option<Rc<ObjString>> {
        if self.count == 0 {
            return None;
        }
        let capacity = self.entries.len();
        let mut index = hash as usize % capacity;
        loop {
            let entry = &self.entries[index];
            match &entry.key {
                None => {
                    // Stop at a truly empty bucket; skip tombstones.
                    if matches!(entry.value, Value::Nil) {
                        return None;
                    }
                }
                Some(key) if key.hash() == hash && key.as_str() == chars => {
                    return Some(Rc::clone(key));
                }
                Some(_) => {}
            }
            index = (index + 1) % capacity;
        }
    }

    /// Iterate over live entries.
    pub fn iter(&self) -> impl Iterator<Item = (&Rc<ObjString>, &Value)> {
        self.entries
            .iter()
            .filter_map(|entry| entry.key.as_ref().map(|key| (key, &entry.value)))
    }

    /// Live entries plus tombstones (the load-factor numerator).
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Probe from the key's ideal bucket. Returns the index of the key's
    /// entry, or of the bucket an insertion should use: the first tombstone
    /// passed, otherwise the terminating empty bucket. The load-factor cap
    /// guarantees an empty bucket exists, so the probe terminates.
    fn find_entry(entries: &[Entry], key: &Rc<ObjString>) -> usize {
        let capacity = entries.len();
        let mut index = key.hash() as usize % capacity;
        let mut tombstone = None;
        loop {
            let entry = &entries[index];
            match &entry.key {
                None => {
                    if matches!(entry.value, Value::Nil) {
                        return tombstone.unwrap_or(index);
                    }
                    if tombstone.is_none() {
                        tombstone = Some(index);
                    }
                }
                Some(existing) if Rc::ptr_eq(existing, key) => return index,
                Some(_) => {}
            }
            index = (index + 1) % capacity;
        }
    }

    /// Rebuild into a fresh bucket array. Probe chains do not survive a
    /// capacity change, so every live entry is reinserted; tombstones are
    /// dropped and `count` recomputed.
    fn adjust_capacity(&mut self, capacity: usize) {
        let mut entries = vec![Entry::empty(); capacity];
        self.count = 0;
        for entry in &self.entries {
            let Some(key) = &entry.key else { continue };
            let index = Self::find_entry(&entries, key);
            entries[index].key = Some(Rc::clone(key));
            entries[index].value = entry.value.clone();
            self.count += 1;
        }
        self.entries = entries;
    }
}

impl Default for Table {
    fn default() -> Self {
        Self::new()
    }
}

fn grow_capacity(capacity: usize) -> usize {
    if capacity < 8 {
        8
    } else {
        capacity * 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Heap;

    fn keys(heap: &mut Heap, count: usize) -> Vec<Rc<ObjString>> {
        (0..count)
            .map(|i| heap.copy_string(&format!("key{}", i)))
            .collect()
    }

    #[test]
    fn test_set_and_get() {
        let mut heap = Heap::new();
        let mut table = Table::new();
        let key = heap.copy_string("answer");

        assert!(table.set(Rc::clone(&key), Value::Number(42.0)));
        assert_eq!(table.get(&key), Some(&Value::Number(42.0)));
    }

    #[test]
    fn test_get_on_empty_table() {
        let mut heap = Heap::new();
        let table = Table::new();
        let key = heap.copy_string("missing");
        assert_eq!(table.get(&key), None);
    }

    #[test]
    fn test_overwrite_returns_false() {
        let mut heap = Heap::new();
        let mut table = Table::new();
        let key = heap.copy_string("x");

        assert!(table.set(Rc::clone(&key), Value::Number(1.0)));
        assert!(!table.set(Rc::clone(&key), Value::Number(2.0)));
        assert_eq!(table.get(&key), Some(&Value::Number(2.0)));
    }

    #[test]
    fn test_delete_then_set_then_get() {
        let mut heap = Heap::new();
        let mut table = Table::new();
        let key = heap.copy_string("k");

        table.set(Rc::clone(&key), Value::Number(1.0));
        assert!(table.delete(&key));
        assert_eq!(table.get(&key), None);
        assert!(table.set(Rc::clone(&key), Value::Number(2.0)));
        assert_eq!(table.get(&key), Some(&Value::Number(2.0)));
    }

    #[test]
    fn test_delete_missing_returns_false() {
        let mut heap = Heap::new();
        let mut table = Table::new();
        let present = heap.copy_string("present");
        let absent = heap.copy_string("absent");

        table.set(Rc::clone(&present), Value::Nil);
        assert!(!table.delete(&absent));
        assert!(!table.delete(&absent));
    }

    #[test]
    fn test_count_includes_tombstones() {
        let mut heap = Heap::new();
        let mut table = Table::new();
        let keys = keys(&mut heap, 4);
        for key in &keys {
            table.set(Rc::clone(key), Value::Nil);
        }
        assert_eq!(table.count(), 4);

        table.delete(&keys[0]);
        table.delete(&keys[1]);
        assert_eq!(table.count(), 4);
        assert_eq!(table.iter().count(), 2);
    }

    #[test]
    fn test_tombstone_reuse_keeps_count() {
        let mut heap = Heap::new();
        let mut table = Table::new();
        let key = heap.copy_string("churn");

        table.set(Rc::clone(&key), Value::Number(1.0));
        let count = table.count();
        table.delete(&key);
        table.set(Rc::clone(&key), Value::Number(2.0));
        assert_eq!(table.count(), count);
        assert_eq!(table.get(&key), Some(&Value::Number(2.0)));
    }

    #[test]
    fn test_delete_half_then_get_rest() {
        let mut heap = Heap::new();
        let mut table = Table::new();
        let keys = keys(&mut heap, 32);
        for (i, key) in keys.iter().enumerate() {
            table.set(Rc::clone(key), Value::Number(i as f64));
        }
        for key in keys.iter().step_by(2) {
            assert!(table.delete(key));
        }
        for (i, key) in keys.iter().enumerate() {
            if i % 2 == 0 {
                assert_eq!(table.get(key), None, "deleted key{} resurfaced", i);
            } else {
                assert_eq!(table.get(key), Some(&Value::Number(i as f64)));
            }
        }
    }

    #[test]
    fn test_resize_preserves_live_entries() {
        let mut heap = Heap::new();
        let mut table = Table::new();
        // 25 inserts cross the 0.75 threshold at capacities 8 and 16.
        let keys = keys(&mut heap, 25);
        for (i, key) in keys.iter().enumerate() {
            table.set(Rc::clone(key), Value::Number(i as f64));
        }
        assert!(table.capacity() >= 32);
        for (i, key) in keys.iter().enumerate() {
            assert_eq!(table.get(key), Some(&Value::Number(i as f64)));
        }
    }

    #[test]
    fn test_resize_drops_tombstones() {
        let mut heap = Heap::new();
        let mut table = Table::new();
        let keys = keys(&mut heap, 6);
        for key in &keys {
            table.set(Rc::clone(key), Value::Nil);
        }
        for key in &keys[..3] {
            table.delete(key);
        }
        assert_eq!(table.count(), 6);

        // Enough churn to trigger a resize and clear tombstones.
        let more = (0..8)
            .map(|i| heap.copy_string(&format!("more{}", i)))
            .collect::<Vec<_>>();
        for key in &more {
            table.set(Rc::clone(key), Value::Nil);
        }
        assert_eq!(table.count(), table.iter().count());
        for key in &keys[3..] {
            assert!(table.get(key).is_some());
        }
        for key in &more {
            assert!(table.get(key).is_some());
        }
    }

    #[test]
    fn test_load_factor_bound() {
        let mut heap = Heap::new();
        let mut table = Table::new();
        for key in keys(&mut heap, 100) {
            table.set(key, Value::Nil);
        }
        assert!(table.count() as f64 <= table.capacity() as f64 * 0.75);
    }

    #[test]
    fn test_add_all() {
        let mut heap = Heap::new();
        let mut from = Table::new();
        let mut to = Table::new();
        let keys = keys(&mut heap, 5);
        for (i, key) in keys.iter().enumerate() {
            from.set(Rc::clone(key), Value::Number(i as f64));
        }
        from.delete(&keys[0]);

        to.add_all(&from);
        assert_eq!(to.get(&keys[0]), None);
        for (i, key) in keys.iter().enumerate().skip(1) {
            assert_eq!(to.get(key), Some(&Value::Number(i as f64)));
        }
    }

    #[test]
    fn test_find_string_skips_tombstones() {
        let mut heap = Heap::new();
        // The interner itself exercises find_string across deletes.
        let keys = keys(&mut heap, 20);
        let mut table = Table::new();
        for key in &keys {
            table.set(Rc::clone(key), Value::Nil);
        }
        for key in &keys[..10] {
            table.delete(key);
        }
        for key in &keys[10..] {
            let found = table
                .find_string(key.as_str(), key.hash())
                .expect("live key not found by content");
            assert!(Rc::ptr_eq(&found, key));
        }
        assert!(table.find_string("key0", keys[0].hash()).is_none());
    }
}
