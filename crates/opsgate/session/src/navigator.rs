use std::sync::Mutex;

/// Host routing surface.
pub trait Navigator: Send + Sync {
    /// Replace the current location with `path`.
    fn replace(&self, path: &str);
}

impl<F> Navigator for F
where
    F: Fn(&str) + Send + Sync,
{
    fn replace(&self, path: &str) {
        self(path)
    }
}

/// Navigator that records every call, for tests and headless hosts.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    calls: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<String> {
        match self.calls.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn last(&self) -> Option<String> {
        self.calls().pop()
    }
}

impl Navigator for RecordingNavigator {
    fn replace(&self, path: &str) {
        let mut guard = match self.calls.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.push(path.to_string());
    }
}
