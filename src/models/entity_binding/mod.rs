// Entity binding model
// Ordered set of device ids (thermostats) driven by one schedule

use serde::{Deserialize, Serialize};

/// Devices bound to a whole schedule. Insertion order is kept and
/// duplicates are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct EntityBinding {
    entity_ids: Vec<String>,
}

impl EntityBinding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an id; returns `false` if it was already bound or blank.
    pub fn insert(&mut self, entity_id: impl Into<String>) -> bool {
        let entity_id = entity_id.into();
        let trimmed = entity_id.trim();
        if trimmed.is_empty() || self.contains(trimmed) {
            return false;
        }
        self.entity_ids.push(trimmed.to_string());
        true
    }

    pub fn remove(&mut self, entity_id: &str) -> bool {
        let before = self.entity_ids.len();
        self.entity_ids.retain(|id| id != entity_id);
        self.entity_ids.len() != before
    }

    pub fn contains(&self, entity_id: &str) -> bool {
        self.entity_ids.iter().any(|id| id == entity_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entity_ids.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entity_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entity_ids.is_empty()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.entity_ids.clone()
    }
}

impl<S: Into<String>> FromIterator<S> for EntityBinding {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut binding = Self::new();
        for entity_id in iter {
            binding.insert(entity_id);
        }
        binding
    }
}

impl From<Vec<String>> for EntityBinding {
    fn from(value: Vec<String>) -> Self {
        value.into_iter().collect()
    }
}

impl From<EntityBinding> for Vec<String> {
    fn from(value: EntityBinding) -> Self {
        value.entity_ids
    }
}
