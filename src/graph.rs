use std::collections::HashMap;

use sha2::{Digest, Sha256};

use crate::measurements::MeasurementRef;
use crate::queuing::QueueItem;
use crate::types::{Wire, Wires};

/// Operations and measurements of a circuit, ordered per wire.
#[derive(Debug, Clone)]
pub struct CircuitGraph {
    operations: Vec<QueueItem>,
    observables: Vec<MeasurementRef>,
    wires: Wires,
    // circuit indices touching each wire, in order
    wire_map: HashMap<Wire, Vec<usize>>,
    layer_of: Vec<usize>,
}

impl CircuitGraph {
    /// Build the graph of `operations` followed by `measurements`, acting on `wires`.
    pub fn new(
        operations: Vec<QueueItem>,
        measurements: Vec<MeasurementRef>,
        wires: Wires,
    ) -> Self {
        let mut wire_map = HashMap::<Wire, Vec<usize>>::new();
        let item_wires = operations
            .iter()
            .map(QueueItem::wires)
            .chain(measurements.iter().map(|m| m.wires()));
        for (i, ws) in item_wires.enumerate() {
            for w in &ws {
                wire_map.entry(w.clone()).or_default().push(i);
            }
        }

        let mut front = HashMap::<Wire, usize>::new();
        let layer_of = operations
            .iter()
            .map(|op| {
                let ws = op.wires();
                let layer = 1 + ws
                    .iter()
                    .map(|w| front.get(w).copied().unwrap_or(0))
                    .max()
                    .unwrap_or(0);
                for w in &ws {
                    front.insert(w.clone(), layer);
                }
                layer
            })
            .collect();

        Self {
            operations,
            observables: measurements,
            wires,
            wire_map,
            layer_of,
        }
    }

    /// Operations in circuit order.
    pub fn operations(&self) -> &[QueueItem] {
        &self.operations
    }

    /// Measurements in circuit order.
    pub fn observables(&self) -> &[MeasurementRef] {
        &self.observables
    }

    /// Wires of the circuit.
    pub fn wires(&self) -> &Wires {
        &self.wires
    }

    /// Indices of the items acting on `wire`, counting operations first and then measurements.
    pub fn wire_indices(&self, wire: &Wire) -> Vec<usize> {
        self.wire_map.get(wire).cloned().unwrap_or_default()
    }

    /// Operation indices grouped into layers. Operations within a layer act on disjoint wires.
    pub fn layers(&self) -> Vec<Vec<usize>> {
        let mut layers = vec![vec![]; self.get_depth()];
        for (i, layer) in self.layer_of.iter().enumerate() {
            layers[layer - 1].push(i);
        }
        layers
    }

    /// Length of the longest chain of operations sharing wires.
    pub fn get_depth(&self) -> usize {
        self.layer_of.iter().copied().max().unwrap_or(0)
    }

    /// Structural serialization: names, wires, measurement return types and parameters
    /// reduced modulo their period.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for op in &self.operations {
            if let Some(nested) = op.as_tape() {
                out.push('{');
                out.push_str(&nested.graph().serialize());
                out.push('}');
                continue;
            }
            let period = op.as_operator().and_then(|o| o.parameter_period());
            out.push_str(&op.name());
            for p in op.data() {
                out.push('!');
                out.push_str(&p.canonical(period));
                out.push('!');
            }
            out.push_str(&op.wires().to_string());
        }
        out.push_str("|||");
        for m in &self.observables {
            out.push_str(m.return_type().value());
            out.push('!');
            match m.obs() {
                Some(obs) => {
                    out.push_str(&obs.name());
                    for p in obs.data() {
                        out.push('!');
                        out.push_str(&p.canonical(None));
                        out.push('!');
                    }
                }
                None => {
                    out.push_str("Identity");
                    if let Some(eigvals) = m.get_eigvals() {
                        out.push_str(&format!("{:?}", eigvals));
                    }
                }
            }
            out.push_str(&m.wires().to_string());
        }
        out
    }

    /// SHA-256 hex digest of [`CircuitGraph::serialize`].
    pub fn hash(&self) -> String {
        Sha256::digest(self.serialize().as_bytes())
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }
}
