//! Caller-owned run history.
//!
//! The engine keeps no history of its own. Callers that want one create an
//! [`ImputationSession`] and record each run into it; [`SharedSession`] wraps
//! it for use across threads.

use crate::decisions::ImputationPlan;
use crate::types::{ImputationLedger, QualityReport};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One completed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub recorded_at: DateTime<Utc>,
    pub plan: ImputationPlan,
    pub ledger: ImputationLedger,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<QualityReport>,
}

/// Append-only list of runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImputationSession {
    runs: Vec<RunRecord>,
}

impl ImputationSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, plan: ImputationPlan, ledger: ImputationLedger, quality: Option<QualityReport>) {
        self.runs.push(RunRecord {
            recorded_at: Utc::now(),
            plan,
            ledger,
            quality,
        });
    }

    pub fn runs(&self) -> &[RunRecord] {
        &self.runs
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn last(&self) -> Option<&RunRecord> {
        self.runs.last()
    }

    /// Cells filled across every recorded run.
    pub fn total_filled(&self) -> usize {
        self.runs.iter().map(|r| r.ledger.total_filled()).sum()
    }
}

/// Thread-safe handle to a session. Clones share the same history.
#[derive(Debug, Clone, Default)]
pub struct SharedSession {
    inner: Arc<Mutex<ImputationSession>>,
}

static_assertions::assert_impl_all!(SharedSession: Send, Sync);

impl SharedSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, plan: ImputationPlan, ledger: ImputationLedger, quality: Option<QualityReport>) {
        self.inner.lock().record(plan, ledger, quality);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Copy of the current history.
    pub fn snapshot(&self) -> ImputationSession {
        self.inner.lock().clone()
    }
}
