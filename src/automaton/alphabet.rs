use crate::trace::EventType;
use serde::{Deserialize, Serialize};

/// Sorted, duplicate-free set of event types; symbol ids are positions
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Alphabet {
    symbols: Vec<EventType>,
}

impl Alphabet {
    pub fn new<I: IntoIterator<Item = EventType>>(symbols: I) -> Self {
        let mut symbols: Vec<EventType> = symbols.into_iter().collect();
        symbols.sort();
        symbols.dedup();
        Self { symbols }
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn symbols(&self) -> &[EventType] {
        &self.symbols
    }

    pub fn symbol(&self, id: usize) -> &EventType {
        &self.symbols[id]
    }

    pub fn index_of(&self, label: &EventType) -> Option<usize> {
        self.symbols.binary_search(label).ok()
    }
}
