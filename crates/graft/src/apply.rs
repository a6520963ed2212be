//! Batch application — the orchestrator, the publisher, and the reports.

use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, error, info, warn};

use graft_value::Value;

use crate::descriptor::{PatchDescriptor, PatchTarget};
use crate::error::PatchError;
use crate::locate::{resolve_reference_attr, resolve_static, StaticPath, TargetLocation};
use crate::merge::{merge_keyed, merge_value};
use crate::store::Store;

// ── Reports ───────────────────────────────────────────────────────────────

/// Terminal state of one patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchStatus {
    Applied,
    SkippedWarning,
    Failed,
}

impl PatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatchStatus::Applied => "applied",
            PatchStatus::SkippedWarning => "skipped",
            PatchStatus::Failed => "failed",
        }
    }
}

/// Outcome of one resolved slot within a patch.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotOutcome {
    /// `label.attribute` address of the slot.
    pub target: String,
    pub error: Option<PatchError>,
}

impl SlotOutcome {
    pub fn applied(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcome of one patch: status, per-slot outcomes, and the patch-level
/// failure (locate failure or caught fault) when no slot was even attempted.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchReport {
    pub index: usize,
    pub target: String,
    pub status: PatchStatus,
    pub slots: Vec<SlotOutcome>,
    pub error: Option<PatchError>,
}

/// Every patch's outcome, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub patches: Vec<PatchReport>,
}

impl BatchReport {
    pub fn applied_count(&self) -> usize {
        self.count(PatchStatus::Applied)
    }

    pub fn skipped_count(&self) -> usize {
        self.count(PatchStatus::SkippedWarning)
    }

    pub fn failed_count(&self) -> usize {
        self.count(PatchStatus::Failed)
    }

    pub fn is_clean(&self) -> bool {
        self.failed_count() == 0
    }

    fn count(&self, status: PatchStatus) -> usize {
        self.patches
            .iter()
            .filter(|report| report.status == status)
            .count()
    }
}

// ── Orchestrator ──────────────────────────────────────────────────────────

/// Applies a batch of patches in declaration order.
///
/// Each patch is attempted exactly once; a failure never aborts the rest of
/// the batch. Declaration order matters: a later patch targeting a slot an
/// earlier patch rewrote observes the rewritten value. Unexpected panics
/// inside one patch's processing are caught here, logged, and recorded as
/// that patch's failure.
pub fn apply_batch<S: Store>(store: &mut S, batch: &[PatchDescriptor]) -> BatchReport {
    info!(patches = batch.len(), "applying patch batch");
    let mut reports = Vec::with_capacity(batch.len());
    for (index, patch) in batch.iter().enumerate() {
        let target = patch.target.to_string();
        let report = match panic::catch_unwind(AssertUnwindSafe(|| apply_patch(store, index, patch)))
        {
            Ok(report) => report,
            Err(payload) => {
                let message = panic_message(payload);
                error!(patch = index, target = %target, fault = %message, "patch panicked");
                PatchReport {
                    index,
                    target,
                    status: PatchStatus::Failed,
                    slots: Vec::new(),
                    error: Some(PatchError::Internal(message)),
                }
            }
        };
        reports.push(report);
    }
    let report = BatchReport { patches: reports };
    info!(
        applied = report.applied_count(),
        skipped = report.skipped_count(),
        failed = report.failed_count(),
        "batch complete"
    );
    report
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

fn apply_patch<S: Store>(store: &mut S, index: usize, patch: &PatchDescriptor) -> PatchReport {
    let target = patch.target.to_string();

    // An absent payload is preserved as a silent skip: recorded in the
    // report, no log line.
    if patch.payload.is_null() {
        return PatchReport {
            index,
            target,
            status: PatchStatus::SkippedWarning,
            slots: Vec::new(),
            error: None,
        };
    }

    let slots = match &patch.target {
        PatchTarget::Static { path } => {
            match StaticPath::parse(path).and_then(|parsed| resolve_static(store, &parsed)) {
                Ok(slot) => vec![slot],
                Err(err) => {
                    error!(
                        patch = index,
                        target = %target,
                        payload = %patch.payload.summary(),
                        reason = %err,
                        "target resolution failed"
                    );
                    return PatchReport {
                        index,
                        target,
                        status: PatchStatus::Failed,
                        slots: Vec::new(),
                        error: Some(err),
                    };
                }
            }
        }
        PatchTarget::ReferenceAttr {
            refs, attribute, ..
        } => {
            let slots = resolve_reference_attr(store, refs, attribute);
            if slots.is_empty() {
                warn!(
                    patch = index,
                    target = %target,
                    "no reference exposes the attribute, nothing to patch"
                );
                return PatchReport {
                    index,
                    target,
                    status: PatchStatus::SkippedWarning,
                    slots: Vec::new(),
                    error: None,
                };
            }
            slots
        }
    };

    let mut outcomes = Vec::with_capacity(slots.len());
    for slot in &slots {
        let outcome = apply_slot(store, patch, slot);
        if let Some(err) = &outcome.error {
            error!(
                patch = index,
                slot = %outcome.target,
                payload = %patch.payload.summary(),
                reason = %err,
                "slot merge failed"
            );
        }
        outcomes.push(outcome);
    }

    let any_failed = outcomes.iter().any(|outcome| !outcome.applied());
    let status = if any_failed {
        PatchStatus::Failed
    } else {
        PatchStatus::Applied
    };
    PatchReport {
        index,
        target,
        status,
        slots: outcomes,
        error: None,
    }
}

/// Classify + merge + publish for one slot.
///
/// The current value is re-read through the store here, not reused from
/// locate time: an earlier slot of the same patch (a reference list naming
/// one entity twice) may have rewritten it already.
fn apply_slot<S: Store>(
    store: &mut S,
    patch: &PatchDescriptor,
    slot: &TargetLocation,
) -> SlotOutcome {
    let target = slot.describe(store);
    let result = merge_slot(store, patch, slot);
    match result {
        Ok(merged) => {
            debug!(slot = %target, value = ?merged, "slot rewritten");
            match store.set_attribute(slot.entity, &slot.attribute, merged) {
                Ok(()) => SlotOutcome {
                    target,
                    error: None,
                },
                Err(err) => SlotOutcome {
                    target,
                    error: Some(PatchError::Internal(err.to_string())),
                },
            }
        }
        Err(err) => SlotOutcome {
            target,
            error: Some(err),
        },
    }
}

fn merge_slot<S: Store>(
    store: &S,
    patch: &PatchDescriptor,
    slot: &TargetLocation,
) -> Result<Value, PatchError> {
    let current = store
        .attribute(slot.entity, &slot.attribute)
        .ok_or_else(|| PatchError::UnresolvedAttribute(slot.attribute.clone()))?;
    match patch.key_lookup() {
        Some(key) => merge_keyed(current, &patch.payload, key),
        None => merge_value(current, &patch.payload),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────
