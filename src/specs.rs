use std::collections::BTreeMap;

use crate::tape::QuantumTape;

/// Resource summary of a tape.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Specs {
    /// Number of operations acting on each number of wires.
    pub gate_sizes: BTreeMap<usize, usize>,
    /// Number of operations of each name.
    pub gate_types: BTreeMap<String, usize>,
    /// Number of state preparations and operations.
    pub num_operations: usize,
    /// Number of measurements.
    pub num_observables: usize,
    /// Number of gates needed to rotate the observables into the computational basis.
    pub num_diagonalizing_gates: usize,
    /// Number of wires the tape touches.
    pub num_used_wires: usize,
    /// Number of trainable parameters.
    pub num_trainable_params: usize,
    /// Depth of the circuit graph.
    pub depth: usize,
}

impl Specs {
    pub(crate) fn from_tape(tape: &QuantumTape) -> Self {
        let operations = tape.operations();
        let mut gate_sizes = BTreeMap::new();
        let mut gate_types = BTreeMap::new();
        for op in &operations {
            *gate_sizes.entry(op.wires().len()).or_insert(0) += 1;
            *gate_types.entry(op.name()).or_insert(0) += 1;
        }
        Self {
            gate_sizes,
            gate_types,
            num_operations: operations.len(),
            num_observables: tape.measurements().len(),
            num_diagonalizing_gates: tape.diagonalizing_gates().len(),
            num_used_wires: tape.num_wires(),
            num_trainable_params: tape.num_trainable_params(),
            depth: tape.get_depth(),
        }
    }
}
