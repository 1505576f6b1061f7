use std::collections::VecDeque;

use crate::model::PacketRecord;

/// Most packets kept while streaming live.
pub const LIVE_CAPACITY: usize = 500;

/// Newest-first packet list.
///
/// The capacity bounds live inserts only; `replace` installs an uploaded
/// dataset as-is.
#[derive(Debug, Clone)]
pub struct PacketBuffer {
    records: VecDeque<PacketRecord>,
    capacity: usize,
}

impl PacketBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Inserts the newest record and evicts the oldest ones over capacity.
    pub fn push_newest(&mut self, record: PacketRecord) {
        self.records.push_front(record);
        self.records.truncate(self.capacity);
    }

    pub fn replace(&mut self, records: Vec<PacketRecord>) {
        self.records = VecDeque::from(records);
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, index: usize) -> Option<&PacketRecord> {
        self.records.get(index)
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &PacketRecord> + '_ {
        self.records.iter()
    }
}

impl Default for PacketBuffer {
    fn default() -> Self {
        Self::new(LIVE_CAPACITY)
    }
}
