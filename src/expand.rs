use std::f64::consts::FRAC_PI_2;
use std::fmt::{self, Debug, Formatter};
use std::rc::Rc;

use tracing::debug;

use crate::errors::{CircuitError, CircuitResult};
use crate::gates::{Gate, GateKind};
use crate::measurements::{MeasurementProcess, MeasurementRef};
use crate::observables::Tensor;
use crate::operation::{OperatorRef, Pauli, QueueCategory};
use crate::queuing::QueueItem;
use crate::tape::{CopyMode, QuantumTape};
use crate::types::{Param, Wire, Wires};

/// Predicate marking items which expansion should keep as they are.
pub type StopAt = Rc<dyn Fn(&QueueItem) -> bool>;

/// Options for [`QuantumTape::expand_with`].
///
/// # Example
/// ```
/// use qtape::prelude::*;
///
/// # fn main() -> CircuitResult<()> {
/// let tape = QuantumTape::build(|| {
///     pauli_x(0)?;
///     rot(0.1, 0.2, 0.3, 0)?;
///     Ok(())
/// })?;
/// let options = ExpandOptions::new()
///     .depth(2)
///     .stop_at(|item| item.name() == "Rot");
/// let expanded = tape.expand_with(&options)?;
/// assert_eq!(expanded.operations().len(), 4);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ExpandOptions {
    depth: usize,
    stop_at: Option<StopAt>,
    expand_measurements: bool,
}

impl Default for ExpandOptions {
    fn default() -> Self {
        Self {
            depth: 1,
            stop_at: None,
            expand_measurements: false,
        }
    }
}

impl Debug for ExpandOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpandOptions")
            .field("depth", &self.depth)
            .field("stop_at", &self.stop_at.as_ref().map(|_| "<fn>"))
            .field("expand_measurements", &self.expand_measurements)
            .finish()
    }
}

impl ExpandOptions {
    /// Depth one, nothing stopped, measurements kept.
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times decompositions are applied recursively.
    pub fn depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    /// Keep every item for which `f` holds. Nested tapes are flattened regardless.
    pub fn stop_at<F>(mut self, f: F) -> Self
    where
        F: Fn(&QueueItem) -> bool + 'static,
    {
        self.stop_at = Some(Rc::new(f));
        self
    }

    /// Replace measured observables by their diagonalizing gates and an eigenvalue measurement.
    pub fn expand_measurements(mut self, expand: bool) -> Self {
        self.expand_measurements = expand;
        self
    }

    fn stops(&self, item: &QueueItem) -> bool {
        self.stop_at.as_ref().map(|f| f(item)).unwrap_or(false)
    }
}

impl QuantumTape {
    /// Expand every operation by one level of decomposition.
    pub fn expand(&self) -> CircuitResult<QuantumTape> {
        self.expand_with(&ExpandOptions::default())
    }

    /// Expand with the given options. The new tape owns fresh parameter bookkeeping, every
    /// parameter trainable; this tape is left unchanged.
    pub fn expand_with(&self, options: &ExpandOptions) -> CircuitResult<QuantumTape> {
        let tape = expand_tape(self, options.depth, options)?;
        debug!(
            depth = options.depth,
            num_ops = tape.operations().len(),
            num_measurements = tape.measurements().len(),
            "expanded tape"
        );
        Ok(tape)
    }
}

#[derive(Default)]
struct Parts {
    prep: Vec<OperatorRef>,
    ops: Vec<QueueItem>,
    measurements: Vec<MeasurementRef>,
}

impl Parts {
    fn keep(&mut self, item: QueueItem) {
        match item {
            QueueItem::Operator(op) if op.queue_category() == Some(QueueCategory::StatePrep) => {
                self.prep.push(op)
            }
            QueueItem::Measurement(m) if !m.is_mid_measure() => self.measurements.push(m),
            item => self.ops.push(item),
        }
    }

    fn extend(&mut self, tape: &QuantumTape) {
        self.prep.extend(tape.prep());
        self.ops.extend(tape.ops());
        self.measurements.extend(tape.measurements());
    }
}

fn expand_tape(
    tape: &QuantumTape,
    depth: usize,
    options: &ExpandOptions,
) -> CircuitResult<QuantumTape> {
    if depth == 0 {
        return Ok(tape.copy(CopyMode::Shallow));
    }

    let mut ops = tape.ops();
    let mut measurements = tape.measurements();
    let sharing = tape.obs_sharing_wires();
    if !sharing.is_empty() {
        let observables = sharing
            .iter()
            .filter_map(|i| measurements[*i].obs().cloned())
            .collect::<Vec<_>>();
        let (rotations, diagonal) = diagonalize_qwc(&observables)?;
        debug!(
            rotations = rotations.len(),
            observables = observables.len(),
            "rotating qubit-wise commuting observables"
        );
        ops.extend(rotations.into_iter().map(QueueItem::Operator));
        for (i, obs) in sharing.iter().zip(diagonal) {
            let rt = measurements[*i].return_type();
            measurements[*i] =
                MeasurementRef::new(MeasurementProcess::new(rt, Some(obs), None, None, None)?);
        }
    }

    let mut out = Parts::default();
    let items = tape
        .prep()
        .into_iter()
        .map(QueueItem::Operator)
        .chain(ops)
        .chain(measurements.into_iter().map(QueueItem::Measurement));
    for item in items {
        let expanded = match &item {
            QueueItem::Tape(t) => Some(t.clone()),
            _ if options.stops(&item) => None,
            QueueItem::Operator(op) => skip_undefined(op.expand())?,
            QueueItem::Measurement(m) if options.expand_measurements => {
                skip_undefined(m.expand())?
            }
            QueueItem::Measurement(_) => None,
        };
        match expanded {
            Some(sub) => out.extend(&expand_tape(&sub, depth - 1, options)?),
            None => out.keep(item),
        }
    }
    Ok(QuantumTape::from_parts(out.prep, out.ops, out.measurements))
}

fn skip_undefined(result: CircuitResult<QuantumTape>) -> CircuitResult<Option<QuantumTape>> {
    match result {
        Ok(tape) => Ok(Some(tape)),
        Err(e) if e.is_decomposition_undefined() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Rotations taking qubit-wise commuting Pauli words into the computational basis, and the
/// equivalent PauliZ words.
fn diagonalize_qwc(
    observables: &[OperatorRef],
) -> CircuitResult<(Vec<OperatorRef>, Vec<OperatorRef>)> {
    let not_commuting = || {
        let wires = observables.iter().map(OperatorRef::wires).collect::<Vec<_>>();
        let shared = wires
            .iter()
            .flat_map(|ws| ws.iter())
            .filter(|w| wires.iter().filter(|ws| ws.contains(w)).count() > 1)
            .cloned()
            .map(Wires::single)
            .collect::<Vec<_>>();
        CircuitError::QuantumFunction(format!(
            "Only observables that are qubit-wise commuting Pauli words can be returned on the \
             same wire. Conflicting wires: {}.",
            Wires::all_wires(&shared)
        ))
    };

    let mut basis: Vec<(Wire, Pauli)> = vec![];
    let mut words = vec![];
    for obs in observables {
        let word = obs.pauli_word().ok_or_else(not_commuting)?;
        for (w, p) in &word {
            match basis.iter().find(|(bw, _)| bw == w) {
                Some((_, bp)) if bp != p => return Err(not_commuting()),
                Some(_) => {}
                None => basis.push((w.clone(), *p)),
            }
        }
        words.push((obs, word));
    }

    let rotations = basis
        .iter()
        .filter_map(|(w, p)| match p {
            Pauli::X => Some((GateKind::RY, -FRAC_PI_2, w)),
            Pauli::Y => Some((GateKind::RX, FRAC_PI_2, w)),
            Pauli::Z => None,
        })
        .map(|(kind, angle, w)| {
            Ok(OperatorRef::new(Gate::new(
                kind,
                Wires::single(w.clone()),
                vec![Param::from(angle)],
            )?))
        })
        .collect::<CircuitResult<Vec<_>>>()?;

    let diagonal = words
        .into_iter()
        .map(|(obs, word)| {
            let zs = word
                .into_iter()
                .map(|(w, _)| {
                    Gate::new(GateKind::PauliZ, Wires::single(w), vec![]).map(OperatorRef::new)
                })
                .collect::<CircuitResult<Vec<_>>>()?;
            // an empty word is already diagonal
            match zs.len() {
                0 => Ok(obs.clone()),
                1 => Ok(zs[0].clone()),
                _ => Ok(OperatorRef::new(Tensor::new(&zs)?)),
            }
        })
        .collect::<CircuitResult<Vec<_>>>()?;

    Ok((rotations, diagonal))
}
