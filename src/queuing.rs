use std::cell::RefCell;
use std::mem;

use tracing::trace;

use crate::errors::{CircuitError, CircuitResult};
use crate::measurements::MeasurementRef;
use crate::operation::{OperatorRef, QueueCategory};
use crate::tape::{CopyMode, QuantumTape};
use crate::types::{Param, Wires};

thread_local! {
    static ACTIVE_TAPES: RefCell<Vec<QuantumTape>> = RefCell::new(Vec::new());
}

/// Something which can be recorded on a tape. Equality is identity of the underlying handle.
#[derive(Debug, Clone)]
pub enum QueueItem {
    /// A gate or observable.
    Operator(OperatorRef),
    /// A terminal or mid-circuit measurement.
    Measurement(MeasurementRef),
    /// A nested tape.
    Tape(QuantumTape),
}

impl QueueItem {
    /// Name of the item, the return type for measurements.
    pub fn name(&self) -> String {
        match self {
            QueueItem::Operator(op) => op.name(),
            QueueItem::Measurement(m) => m.return_type().to_string(),
            QueueItem::Tape(_) => "QuantumTape".to_string(),
        }
    }

    /// Wires acted on.
    pub fn wires(&self) -> Wires {
        match self {
            QueueItem::Operator(op) => op.wires(),
            QueueItem::Measurement(m) => m.wires(),
            QueueItem::Tape(t) => t.wires(),
        }
    }

    /// All parameters, for nested tapes every parameter of the tape.
    pub fn data(&self) -> Vec<Param> {
        match self {
            QueueItem::Operator(op) => op.data(),
            QueueItem::Measurement(m) => m.obs().map(OperatorRef::data).unwrap_or_default(),
            QueueItem::Tape(t) => t.get_parameters(false),
        }
    }

    /// Number of parameter slots.
    pub fn num_params(&self) -> usize {
        match self {
            QueueItem::Operator(op) => op.num_params(),
            QueueItem::Measurement(m) => m.obs().map(OperatorRef::num_params).unwrap_or(0),
            QueueItem::Tape(t) => t.num_params(),
        }
    }

    /// Overwrite a single parameter slot.
    pub fn set_parameter(&self, idx: usize, value: Param) -> CircuitResult<()> {
        match self {
            QueueItem::Operator(op) => op.set_parameter(idx, value),
            QueueItem::Measurement(m) => match m.obs() {
                Some(obs) => obs.set_parameter(idx, value),
                None => Err(CircuitError::new(format!("{} has no parameters.", m))),
            },
            QueueItem::Tape(t) => t.set_parameter_at(idx, value),
        }
    }

    /// Whether this item is inverted. Tapes and measurements never are.
    pub fn inverse(&self) -> bool {
        match self {
            QueueItem::Operator(op) => op.inverse(),
            _ => false,
        }
    }

    /// The operator, if this is one.
    pub fn as_operator(&self) -> Option<&OperatorRef> {
        match self {
            QueueItem::Operator(op) => Some(op),
            _ => None,
        }
    }

    /// The measurement, if this is one.
    pub fn as_measurement(&self) -> Option<&MeasurementRef> {
        match self {
            QueueItem::Measurement(m) => Some(m),
            _ => None,
        }
    }

    /// The nested tape, if this is one.
    pub fn as_tape(&self) -> Option<&QuantumTape> {
        match self {
            QueueItem::Tape(t) => Some(t),
            _ => None,
        }
    }

    /// Partition for a top-level item: tapes and mid-circuit measurements are operations.
    pub(crate) fn category(&self) -> Option<ItemCategory> {
        match self {
            QueueItem::Operator(op) => op.queue_category().map(|c| match c {
                QueueCategory::StatePrep => ItemCategory::Prep,
                QueueCategory::Operation => ItemCategory::Op,
            }),
            QueueItem::Measurement(m) if m.is_mid_measure() => Some(ItemCategory::Op),
            QueueItem::Measurement(_) => Some(ItemCategory::Measurement),
            QueueItem::Tape(_) => Some(ItemCategory::Op),
        }
    }

    /// A fresh handle. `deep` also copies the handles held inside.
    pub(crate) fn copy(&self, deep: bool) -> QueueItem {
        match (self, deep) {
            (QueueItem::Operator(op), false) => QueueItem::Operator(op.copy()),
            (QueueItem::Operator(op), true) => QueueItem::Operator(op.deep_copy()),
            (QueueItem::Measurement(m), false) => QueueItem::Measurement(m.copy()),
            (QueueItem::Measurement(m), true) => QueueItem::Measurement(m.deep_copy()),
            (QueueItem::Tape(t), false) => QueueItem::Tape(t.copy(CopyMode::Operations)),
            (QueueItem::Tape(t), true) => QueueItem::Tape(t.copy(CopyMode::Deep)),
        }
    }
}

impl PartialEq for QueueItem {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (QueueItem::Operator(a), QueueItem::Operator(b)) => a == b,
            (QueueItem::Measurement(a), QueueItem::Measurement(b)) => a == b,
            (QueueItem::Tape(a), QueueItem::Tape(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for QueueItem {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ItemCategory {
    Prep,
    Op,
    Measurement,
}

/// Metadata attached to a queued item.
#[derive(Debug, Clone, Default)]
pub struct Annotation {
    /// The item which owns this one, such as the measurement of an observable.
    pub owner: Option<QueueItem>,
    /// Items owned by this one, such as the factors of a tensor.
    pub owns: Vec<QueueItem>,
}

impl Annotation {
    /// An annotation marking the item as owned by `owner`.
    pub fn owned_by(owner: QueueItem) -> Self {
        Self {
            owner: Some(owner),
            owns: vec![],
        }
    }

    /// An annotation marking the item as owning `owns`.
    pub fn owning(owns: Vec<QueueItem>) -> Self {
        Self { owner: None, owns }
    }

    fn merge(&mut self, other: Annotation) {
        if other.owner.is_some() {
            self.owner = other.owner;
        }
        if !other.owns.is_empty() {
            self.owns = other.owns;
        }
    }
}

/// Items in recording order, each with its annotation. An item appears at most once.
#[derive(Debug, Clone, Default)]
pub struct AnnotatedQueue {
    items: Vec<(QueueItem, Annotation)>,
}

impl AnnotatedQueue {
    /// Append an item, or replace its annotation if already present.
    pub fn append(&mut self, item: QueueItem, info: Annotation) {
        match self.position(&item) {
            Some(i) => self.items[i].1 = info,
            None => self.items.push((item, info)),
        }
    }

    /// Merge `info` into the annotation of a queued item.
    pub fn update_info(&mut self, item: &QueueItem, info: Annotation) -> CircuitResult<()> {
        let i = self.position(item).ok_or_else(|| {
            CircuitError::Queuing(format!("Object {} not in the queue.", item.name()))
        })?;
        self.items[i].1.merge(info);
        Ok(())
    }

    /// Remove an item, returning whether it was present.
    pub fn remove(&mut self, item: &QueueItem) -> bool {
        match self.position(item) {
            Some(i) => {
                self.items.remove(i);
                true
            }
            None => false,
        }
    }

    /// The annotation of a queued item.
    pub fn get_info(&self, item: &QueueItem) -> Option<&Annotation> {
        self.position(item).map(|i| &self.items[i].1)
    }

    /// Whether the item is queued.
    pub fn contains(&self, item: &QueueItem) -> bool {
        self.position(item).is_some()
    }

    /// Items with their annotations, in recording order.
    pub fn iter(&self) -> impl Iterator<Item = &(QueueItem, Annotation)> {
        self.items.iter()
    }

    /// Items in recording order.
    pub fn queue(&self) -> Vec<QueueItem> {
        self.items.iter().map(|(item, _)| item.clone()).collect()
    }

    /// Number of queued items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn position(&self, item: &QueueItem) -> Option<usize> {
        self.items.iter().position(|(i, _)| i == item)
    }
}

/// Entry point to the active recording context of the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueuingContext;

impl QueuingContext {
    /// The innermost tape currently recording.
    pub fn active_context() -> Option<QuantumTape> {
        ACTIVE_TAPES.with(|stack| stack.borrow().last().cloned())
    }

    /// Whether some tape is recording.
    pub fn recording() -> bool {
        ACTIVE_TAPES.with(|stack| !stack.borrow().is_empty())
    }

    /// Append an item to the active tape. Does nothing when no tape is recording.
    pub fn append(item: QueueItem, owns: Vec<QueueItem>) -> CircuitResult<()> {
        if let Some(tape) = Self::active_context() {
            trace!(item = %item.name(), owns = owns.len(), "queuing item");
            tape.queue_mut().append(item, Annotation::owning(owns));
        }
        Ok(())
    }

    /// Merge metadata into an item already recorded on the active tape.
    pub fn update_info(item: &QueueItem, info: Annotation) -> CircuitResult<()> {
        let tape = Self::active_context()
            .ok_or_else(|| CircuitError::Queuing("No queuing context available to update.".into()))?;
        let result = tape.queue_mut().update_info(item, info);
        result
    }

    /// The annotation of an item recorded on the active tape.
    pub fn get_info(item: &QueueItem) -> CircuitResult<Annotation> {
        let tape = Self::active_context()
            .ok_or_else(|| CircuitError::Queuing("No queuing context available.".into()))?;
        let info = tape.queue_ref().get_info(item).cloned();
        info.ok_or_else(|| CircuitError::Queuing(format!("Object {} not in the queue.", item.name())))
    }

    /// Remove an item from the active tape, if it was recorded there.
    pub fn remove(item: &QueueItem) -> bool {
        match Self::active_context() {
            Some(tape) => {
                let removed = tape.queue_mut().remove(item);
                removed
            }
            None => false,
        }
    }

    /// Whether the item is recorded on the active tape.
    pub fn is_queued(item: &QueueItem) -> bool {
        match Self::active_context() {
            Some(tape) => {
                let queued = tape.queue_ref().contains(item);
                queued
            }
            None => false,
        }
    }

    pub(crate) fn enter(tape: QuantumTape) -> RecordingGuard {
        ACTIVE_TAPES.with(|stack| stack.borrow_mut().push(tape));
        RecordingGuard { _private: () }
    }

    pub(crate) fn suspend() -> SuspendGuard {
        let hidden = ACTIVE_TAPES.with(|stack| mem::take(&mut *stack.borrow_mut()));
        SuspendGuard { hidden }
    }
}

/// Pops the innermost recording tape when dropped, including during unwinding.
#[derive(Debug)]
pub(crate) struct RecordingGuard {
    _private: (),
}

impl Drop for RecordingGuard {
    fn drop(&mut self) {
        ACTIVE_TAPES.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Hides every recording tape until dropped.
#[derive(Debug)]
pub(crate) struct SuspendGuard {
    hidden: Vec<QuantumTape>,
}

impl Drop for SuspendGuard {
    fn drop(&mut self) {
        let hidden = mem::take(&mut self.hidden);
        ACTIVE_TAPES.with(|stack| *stack.borrow_mut() = hidden);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gates::{pauli_z, rx};

    #[test]
    fn test_nothing_recording() -> CircuitResult<()> {
        assert!(!QueuingContext::recording());
        assert!(QueuingContext::active_context().is_none());
        let op = rx(0.1, 0)?;
        let item = QueueItem::Operator(op);
        assert!(!QueuingContext::is_queued(&item));
        assert!(QueuingContext::update_info(&item, Annotation::default()).is_err());
        Ok(())
    }

    #[test]
    fn test_append_once() -> CircuitResult<()> {
        let tape = QuantumTape::new();
        tape.record(|| {
            let op = rx(0.1, 0)?;
            QueuingContext::append(QueueItem::Operator(op), vec![])?;
            Ok(())
        })?;
        assert_eq!(tape.queue_ref().len(), 1);
        Ok(())
    }

    #[test]
    fn test_update_unqueued_fails() -> CircuitResult<()> {
        let tape = QuantumTape::new();
        let outside = rx(0.1, 0)?;
        tape.record(|| {
            let err = QueuingContext::update_info(
                &QueueItem::Operator(outside.clone()),
                Annotation::default(),
            );
            assert!(matches!(err, Err(CircuitError::Queuing(_))));
            Ok(())
        })?;
        Ok(())
    }

    #[test]
    fn test_owner_annotation() -> CircuitResult<()> {
        let tape = QuantumTape::new();
        let (a, b) = tape.record(|| {
            let a = pauli_z(0)?;
            let b = pauli_z(1)?;
            QueuingContext::update_info(
                &QueueItem::Operator(a.clone()),
                Annotation::owned_by(QueueItem::Operator(b.clone())),
            )?;
            let info = QueuingContext::get_info(&QueueItem::Operator(a.clone()))?;
            assert_eq!(info.owner, Some(QueueItem::Operator(b.clone())));
            Ok((a, b))
        })?;
        assert_eq!(tape.operations(), vec![QueueItem::Operator(b)]);
        assert!(!tape.operations().contains(&QueueItem::Operator(a)));
        Ok(())
    }

    #[test]
    fn test_remove() -> CircuitResult<()> {
        let tape = QuantumTape::new();
        tape.record(|| {
            let op = rx(0.1, 0)?;
            assert!(QueuingContext::remove(&QueueItem::Operator(op.clone())));
            assert!(!QueuingContext::remove(&QueueItem::Operator(op)));
            Ok(())
        })?;
        assert!(tape.operations().is_empty());
        Ok(())
    }

    #[test]
    fn test_stack_restored_after_panic() {
        let tape = QuantumTape::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = tape.record(|| -> CircuitResult<()> { panic!("boom") });
        }));
        assert!(result.is_err());
        assert!(!QueuingContext::recording());
    }
}
