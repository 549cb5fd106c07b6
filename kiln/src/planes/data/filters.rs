use crate::planes::data::operation::{Operation, Outcome};
use shared::Key;
use std::sync::Arc;
use tracing::debug;

/// What a filter decided to do with an operation on its way to the adapter.
#[derive(Debug)]
pub enum Intercept {
    /// Keep going, possibly with rewritten parameters.
    Proceed(Operation),
    /// Answer without touching the adapter.
    Respond(Outcome),
}

/// Hook around every operation the data plane executes.
pub trait Filter: Send + Sync + 'static {
    fn before(&self, _adapter: &str, operation: Operation) -> Intercept {
        Intercept::Proceed(operation)
    }

    fn after(&self, _adapter: &str, outcome: Outcome) -> Outcome {
        outcome
    }
}

/// Ordered filters. `before` hooks run first to last, `after` hooks last to first.
#[derive(Clone, Default)]
pub struct FilterChain {
    filters: Vec<Arc<dyn Filter>>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, filter: impl Filter) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Runs the `before` hooks. On a short-circuit, the `after` hooks of the filters
    /// that already ran still see the outcome.
    pub fn before(&self, adapter: &str, mut operation: Operation) -> Result<Operation, Outcome> {
        for (index, filter) in self.filters.iter().enumerate() {
            match filter.before(adapter, operation) {
                Intercept::Proceed(next) => operation = next,
                Intercept::Respond(outcome) => {
                    return Err(self.unwind(adapter, outcome, index));
                }
            }
        }
        Ok(operation)
    }

    pub fn after(&self, adapter: &str, outcome: Outcome) -> Outcome {
        self.unwind(adapter, outcome, self.filters.len())
    }

    fn unwind(&self, adapter: &str, outcome: Outcome, upto: usize) -> Outcome {
        self.filters[..upto]
            .iter()
            .rev()
            .fold(outcome, |outcome, filter| filter.after(adapter, outcome))
    }
}

impl std::fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterChain")
            .field("filters", &self.filters.len())
            .finish()
    }
}

/// Logs every operation and its outcome at debug level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingFilter;

impl Filter for TracingFilter {
    fn before(&self, adapter: &str, operation: Operation) -> Intercept {
        debug!(
            "{} on adapter '{}' for keys {:?}",
            operation.kind(),
            adapter,
            operation.keys()
        );
        Intercept::Proceed(operation)
    }

    fn after(&self, adapter: &str, outcome: Outcome) -> Outcome {
        debug!(
            "adapter '{}' finished with success={}",
            adapter,
            outcome.is_success()
        );
        outcome
    }
}

/// Scopes keys under a prefix: rewrites keys going in, strips the prefix from read
/// results coming out.
#[derive(Clone, Debug)]
pub struct KeyPrefix {
    prefix: String,
}

impl KeyPrefix {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn apply(&self, key: &str) -> Key {
        format!("{}{}", self.prefix, key)
    }
}

impl Filter for KeyPrefix {
    fn before(&self, _adapter: &str, operation: Operation) -> Intercept {
        Intercept::Proceed(operation.map_keys(|key| self.apply(key)))
    }

    fn after(&self, _adapter: &str, outcome: Outcome) -> Outcome {
        match outcome {
            Outcome::Values(values) => Outcome::Values(
                values
                    .into_iter()
                    .map(|(key, value)| match key.strip_prefix(&self.prefix) {
                        Some(stripped) => (stripped.to_string(), value),
                        None => (key, value),
                    })
                    .collect(),
            ),
            other => other,
        }
    }
}
