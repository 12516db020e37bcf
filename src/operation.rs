use std::cell::{Ref, RefCell, RefMut};
use std::fmt::{self, Debug, Display, Formatter};
use std::rc::Rc;

use crate::errors::{CircuitError, CircuitResult};
use crate::queuing::{Annotation, QueueItem, QueuingContext};
use crate::tape::QuantumTape;
use crate::types::{Param, Wire, Wires};

/// The tape partition an operator is recorded into when it is not owned by another item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueCategory {
    /// State preparation, must come before every other operation.
    StatePrep,
    /// A regular operation.
    Operation,
}

/// A single-qubit Pauli factor of a Pauli word. Identity factors are left out of words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[allow(missing_docs)]
pub enum Pauli {
    X,
    Y,
    Z,
}

/// The capabilities a tape needs from a gate or observable.
///
/// Only `base_name`, `wires`, `data`, `set_parameter`, the inverse flag and `clone_operator`
/// must be provided, everything else has a conservative default.
pub trait Operator: Debug {
    /// Name without the inverse suffix.
    fn base_name(&self) -> String;

    /// Name, suffixed with `.inv` if inverted.
    fn name(&self) -> String {
        if self.inverse() {
            format!("{}.inv", self.base_name())
        } else {
            self.base_name()
        }
    }

    /// The wires acted upon.
    fn wires(&self) -> Wires;

    /// Ordered parameter values.
    fn data(&self) -> Vec<Param>;

    /// Number of parameter slots.
    fn num_params(&self) -> usize {
        self.data().len()
    }

    /// Overwrite the parameter in slot `idx`.
    fn set_parameter(&mut self, idx: usize, value: Param) -> CircuitResult<()>;

    /// Whether the operator is inverted.
    fn inverse(&self) -> bool;

    /// Set the inverse flag.
    fn set_inverse(&mut self, inverse: bool);

    /// Partition to record into, `None` for items which only ever appear owned (observables).
    fn queue_category(&self) -> Option<QueueCategory> {
        Some(QueueCategory::Operation)
    }

    /// Whether this may be measured.
    fn is_observable(&self) -> bool {
        false
    }

    /// Whether this is a weighted sum of observables.
    fn is_hamiltonian(&self) -> bool {
        false
    }

    /// Simpler operators equivalent to this one, ignoring the inverse flag. Not queued.
    fn decomposition(&self) -> CircuitResult<Vec<OperatorRef>> {
        Err(CircuitError::DecompositionUndefined(self.name()))
    }

    /// Gates rotating this observable's eigenbasis onto the computational basis. Not queued.
    fn diagonalizing_gates(&self) -> CircuitResult<Vec<OperatorRef>> {
        Err(CircuitError::DiagonalizingGatesUndefined(self.name()))
    }

    /// Whether [`Operator::diagonalizing_gates`] succeeds.
    fn defines_diagonalizing_gates(&self) -> bool {
        self.diagonalizing_gates().is_ok()
    }

    /// Eigenvalues, in the order matching the diagonalizing gates.
    fn eigvals(&self) -> CircuitResult<Vec<f64>> {
        Err(CircuitError::EigvalsUndefined(self.name()))
    }

    /// Generator observable and its prefactor, for single-parameter rotations.
    fn generator(&self) -> Option<(OperatorRef, f64)> {
        None
    }

    /// Period of every parameter, if the operator is periodic in them.
    fn parameter_period(&self) -> Option<f64> {
        None
    }

    /// The operator as a Pauli word, if it is one.
    fn pauli_word(&self) -> Option<Vec<(Wire, Pauli)>> {
        None
    }

    /// Operators owned by this one, recorded before it.
    fn constituents(&self) -> Vec<OperatorRef> {
        vec![]
    }

    /// The factors, if this is a tensor product of observables.
    fn factors(&self) -> Option<Vec<OperatorRef>> {
        None
    }

    /// A new handle to a copy of this operator. Handles held inside are shared.
    fn clone_operator(&self) -> OperatorRef;

    /// A new handle to a copy which also copies the operators held inside.
    fn deep_clone_operator(&self) -> OperatorRef {
        self.clone_operator()
    }

    /// Human readable form such as `RX(0.5, wires=[0])`.
    fn describe(&self) -> String {
        let data = self.data();
        let mut s = format!("{}(", self.name());
        for p in &data {
            s.push_str(&format!("{}, ", p));
        }
        s.push_str(&format!("wires={})", self.wires()));
        s
    }
}

/// A shared handle to an operator. Equality is identity, two handles are equal only if they
/// point at the same operator.
#[derive(Debug, Clone)]
pub struct OperatorRef(Rc<RefCell<dyn Operator>>);

impl OperatorRef {
    /// Wrap an operator without queuing it.
    pub fn new<O>(op: O) -> Self
    where
        O: Operator + 'static,
    {
        Self(Rc::new(RefCell::new(op)))
    }

    /// Whether both handles point at the same operator.
    pub fn ptr_eq(&self, other: &OperatorRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Borrow the operator.
    pub fn borrow(&self) -> Ref<'_, dyn Operator> {
        self.0.borrow()
    }

    /// Mutably borrow the operator.
    pub fn borrow_mut(&self) -> RefMut<'_, dyn Operator> {
        self.0.borrow_mut()
    }

    /// Record this operator, and any constituents not yet recorded, on the active tape.
    /// A no-op when nothing is recording.
    pub fn queue(self) -> CircuitResult<Self> {
        let owned = self.borrow().constituents();
        queue_owning(&self, &owned)?;
        Ok(self)
    }

    /// Toggle the inverse flag, returning the same handle.
    pub fn inv(self) -> Self {
        let inverse = self.inverse();
        self.set_inverse(!inverse);
        self
    }

    /// See [`Operator::name`].
    pub fn name(&self) -> String {
        self.borrow().name()
    }

    /// See [`Operator::wires`].
    pub fn wires(&self) -> Wires {
        self.borrow().wires()
    }

    /// See [`Operator::data`].
    pub fn data(&self) -> Vec<Param> {
        self.borrow().data()
    }

    /// See [`Operator::num_params`].
    pub fn num_params(&self) -> usize {
        self.borrow().num_params()
    }

    /// See [`Operator::set_parameter`].
    pub fn set_parameter(&self, idx: usize, value: Param) -> CircuitResult<()> {
        self.borrow_mut().set_parameter(idx, value)
    }

    /// See [`Operator::inverse`].
    pub fn inverse(&self) -> bool {
        self.borrow().inverse()
    }

    /// See [`Operator::set_inverse`].
    pub fn set_inverse(&self, inverse: bool) {
        self.borrow_mut().set_inverse(inverse)
    }

    /// See [`Operator::queue_category`].
    pub fn queue_category(&self) -> Option<QueueCategory> {
        self.borrow().queue_category()
    }

    /// See [`Operator::is_observable`].
    pub fn is_observable(&self) -> bool {
        self.borrow().is_observable()
    }

    /// See [`Operator::is_hamiltonian`].
    pub fn is_hamiltonian(&self) -> bool {
        self.borrow().is_hamiltonian()
    }

    /// See [`Operator::decomposition`].
    pub fn decomposition(&self) -> CircuitResult<Vec<OperatorRef>> {
        self.borrow().decomposition()
    }

    /// See [`Operator::diagonalizing_gates`].
    pub fn diagonalizing_gates(&self) -> CircuitResult<Vec<OperatorRef>> {
        self.borrow().diagonalizing_gates()
    }

    /// See [`Operator::eigvals`].
    pub fn eigvals(&self) -> CircuitResult<Vec<f64>> {
        self.borrow().eigvals()
    }

    /// See [`Operator::generator`].
    pub fn generator(&self) -> Option<(OperatorRef, f64)> {
        self.borrow().generator()
    }

    /// See [`Operator::parameter_period`].
    pub fn parameter_period(&self) -> Option<f64> {
        self.borrow().parameter_period()
    }

    /// See [`Operator::pauli_word`].
    pub fn pauli_word(&self) -> Option<Vec<(Wire, Pauli)>> {
        self.borrow().pauli_word()
    }

    /// See [`Operator::factors`].
    pub fn factors(&self) -> Option<Vec<OperatorRef>> {
        self.borrow().factors()
    }

    /// A fresh handle to a copy, see [`Operator::clone_operator`].
    pub fn copy(&self) -> OperatorRef {
        self.borrow().clone_operator()
    }

    /// A fresh handle to a recursive copy, see [`Operator::deep_clone_operator`].
    pub fn deep_copy(&self) -> OperatorRef {
        self.borrow().deep_clone_operator()
    }

    /// A tape holding the decomposition. Inverted operators expand to the inverted
    /// decomposition.
    pub fn expand(&self) -> CircuitResult<QuantumTape> {
        let (ops, inverse) = {
            let op = self.borrow();
            (op.decomposition()?, op.inverse())
        };
        let tape = QuantumTape::from_parts(
            vec![],
            ops.into_iter().map(QueueItem::Operator).collect(),
            vec![],
        );
        if inverse {
            tape.inv()?;
        }
        Ok(tape)
    }
}

impl PartialEq for OperatorRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for OperatorRef {}

impl Display for OperatorRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.borrow().describe())
    }
}

/// Queue `op` as the owner of `owned`, queuing any of `owned` which were not yet recorded.
pub(crate) fn queue_owning(op: &OperatorRef, owned: &[OperatorRef]) -> CircuitResult<()> {
    if !QueuingContext::recording() {
        return Ok(());
    }
    for o in owned {
        if !QueuingContext::is_queued(&QueueItem::Operator(o.clone())) {
            o.clone().queue()?;
        }
    }
    let item = QueueItem::Operator(op.clone());
    QueuingContext::append(
        item.clone(),
        owned.iter().cloned().map(QueueItem::Operator).collect(),
    )?;
    for o in owned {
        QueuingContext::update_info(
            &QueueItem::Operator(o.clone()),
            Annotation::owned_by(item.clone()),
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gates::{pauli_x, rot, rx, Gate, GateKind};

    #[test]
    fn test_handles_compare_by_identity() -> CircuitResult<()> {
        let a = rx(0.5, 0)?;
        let b = rx(0.5, 0)?;
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
        assert_ne!(a, a.copy());
        Ok(())
    }

    #[test]
    fn test_inverse_name() -> CircuitResult<()> {
        let op = rx(0.5, 0)?.inv();
        assert_eq!(op.name(), "RX.inv");
        assert_eq!(op.inv().name(), "RX");
        Ok(())
    }

    #[test]
    fn test_describe() -> CircuitResult<()> {
        assert_eq!(rx(0.5, 0)?.to_string(), "RX(0.5, wires=[0])");
        assert_eq!(pauli_x("a")?.to_string(), "PauliX(wires=['a'])");
        Ok(())
    }

    #[test]
    fn test_expand_without_decomposition() -> CircuitResult<()> {
        let op = OperatorRef::new(Gate::new(GateKind::RX, Wires::single(0), vec![Param::from(0.1)])?);
        assert!(op.expand().unwrap_err().is_decomposition_undefined());
        Ok(())
    }

    #[test]
    fn test_expand_inverted() -> CircuitResult<()> {
        let op = rot(0.1, 0.2, 0.3, 0)?.inv();
        let tape = op.expand()?;
        let names = tape
            .operations()
            .iter()
            .map(|o| o.name())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["RZ.inv", "RY.inv", "RZ.inv"]);
        assert_eq!(
            tape.get_parameters(false),
            vec![Param::from(0.3), Param::from(0.2), Param::from(0.1)]
        );
        Ok(())
    }
}
