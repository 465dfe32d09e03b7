use shared::{domain::FoodId, protocol::FoodRecord};

/// Ordered in-memory mirror of the server's food collection.
///
/// Invariant: no two entries share an id. Entries keep insertion order; a
/// record updated in place keeps its position.
#[derive(Debug, Clone, Default)]
pub struct FoodStore {
    records: Vec<FoodRecord>,
}

impl FoodStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[FoodRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, id: FoodId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: FoodId) -> Option<&FoodRecord> {
        self.records.iter().find(|record| record.id == id)
    }

    /// Replaces the whole collection, e.g. after the initial fetch. Duplicate
    /// ids in the payload collapse onto the first occurrence's position, with
    /// the later payload winning.
    pub fn replace_all(&mut self, records: Vec<FoodRecord>) {
        self.records.clear();
        for record in records {
            self.upsert(record);
        }
    }

    /// Appends `record`, or replaces the existing entry in place when the id
    /// is already present.
    pub fn upsert(&mut self, record: FoodRecord) {
        match self.records.iter_mut().find(|entry| entry.id == record.id) {
            Some(entry) => *entry = record,
            None => self.records.push(record),
        }
    }

    /// Replaces the entry whose id matches `record.id`. Returns `false` and
    /// leaves the collection untouched when no entry matches.
    pub fn replace(&mut self, record: FoodRecord) -> bool {
        match self.records.iter_mut().find(|entry| entry.id == record.id) {
            Some(entry) => {
                *entry = record;
                true
            }
            None => false,
        }
    }

    /// Removes and returns the entry with `id`. Removing an absent id is a
    /// no-op returning `None`, so repeated deletes are harmless.
    pub fn remove(&mut self, id: FoodId) -> Option<FoodRecord> {
        let index = self.records.iter().position(|record| record.id == id)?;
        Some(self.records.remove(index))
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
