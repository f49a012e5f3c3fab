use parking_lot::Mutex;
use std::sync::Arc;

use zk_election::{ElectionError, RecordSink};

/// Keeps records in memory. Clones share the same records.
#[derive(Clone, Debug, Default)]
pub struct MemoryRecordSink {
    records: Arc<Mutex<Vec<String>>>,
}

impl MemoryRecordSink {
    pub fn new() -> MemoryRecordSink {
        MemoryRecordSink::default()
    }

    pub fn records(&self) -> Vec<String> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl RecordSink for MemoryRecordSink {
    fn append_record(&mut self, record: &str) -> Result<(), ElectionError> {
        trace!("Record appended: {}", record.trim_end());
        self.records.lock().push(record.to_string());

        Ok(())
    }
}
