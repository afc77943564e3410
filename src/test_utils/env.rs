//! Scoped environment overrides for configuration tests.

use std::collections::HashMap;
use std::env;
use std::sync::{Mutex, MutexGuard};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Applies variable overrides until dropped, then restores the previous values.
///
/// Holds a process-wide lock, so scopes in concurrently running tests are
/// entered one at a time.
pub struct EnvScope {
    original: HashMap<String, Option<String>>,
    _lock: MutexGuard<'static, ()>,
}

impl EnvScope {
    /// `None` removes the variable for the duration of the scope
    pub fn new(vars: &[(&str, Option<&str>)]) -> Self {
        let lock = ENV_LOCK
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut original = HashMap::new();
        for (key, value) in vars {
            original
                .entry(key.to_string())
                .or_insert_with(|| env::var(key).ok());
            set_env(key, *value);
        }
        Self {
            original,
            _lock: lock,
        }
    }
}

impl Drop for EnvScope {
    fn drop(&mut self) {
        for (key, value) in self.original.drain() {
            set_env(&key, value.as_deref());
        }
    }
}

fn set_env(key: &str, value: Option<&str>) {
    // SAFETY: every writer holds ENV_LOCK
    match value {
        Some(val) => unsafe { env::set_var(key, val) },
        None => unsafe { env::remove_var(key) },
    }
}
