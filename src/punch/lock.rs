use futures::lock::Mutex as AsyncMutex;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// One async mutex per employee so that "load today, validate, insert" runs
/// serially for a given employee within this process.
#[derive(Default)]
pub struct EmployeeLocks {
    inner: Mutex<HashMap<u64, Arc<AsyncMutex<()>>>>,
}

impl EmployeeLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self, employee_id: u64) -> Arc<AsyncMutex<()>> {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        map.entry(employee_id)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}
