use std::collections::HashMap;

/// Read-only view of the current request's query parameters, used to force a variant for manual
/// QA (e.g., `?abs_button-color=2`).
pub trait QuerySource {
    /// Get the parameter named `key`.
    fn get(&self, key: &str) -> Option<String>;
}

/// [`QuerySource`] with no parameters.
pub struct NoQuery;

impl QuerySource for NoQuery {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }
}

impl QuerySource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}
