//! Per-target outcome record of a fan-out batch.
//!
//! The public contract of a batch call only says that the batch ran. The
//! outcomes are still collected so the service layer, logs and tests can
//! see which targets failed.

use serde::Serialize;

use crate::domain::PoolEndpointId;
use crate::error::EndpointError;

/// Outcome of one target invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetOutcome {
    /// The capability call returned normally.
    Succeeded,
    /// The capability call failed; the failure was discarded.
    Failed(EndpointError),
}

/// Result of dispatching one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    /// Operation name, for logs.
    pub operation: &'static str,
    /// Targets in caller-supplied order paired with their outcome.
    pub outcomes: Vec<(PoolEndpointId, TargetOutcome)>,
}

impl BatchReport {
    /// Creates an empty report for `operation`.
    #[must_use]
    pub fn new(operation: &'static str, capacity: usize) -> Self {
        Self {
            operation,
            outcomes: Vec::with_capacity(capacity),
        }
    }

    /// Appends one outcome.
    pub fn record(&mut self, target: PoolEndpointId, outcome: TargetOutcome) {
        self.outcomes.push((target, outcome));
    }

    /// Number of targets attempted.
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    /// Number of targets whose call succeeded.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| *o == TargetOutcome::Succeeded)
            .count()
    }

    /// Number of targets whose call failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.attempted().saturating_sub(self.succeeded())
    }

    /// Public view: only what ran, no per-target detail.
    #[must_use]
    pub fn receipt(&self) -> BatchReceipt {
        BatchReceipt {
            operation: self.operation,
            attempted: self.attempted(),
        }
    }
}

/// What a batch caller is told.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchReceipt {
    /// Operation name.
    pub operation: &'static str,
    /// Number of targets the batch was dispatched to.
    pub attempted: usize,
}
