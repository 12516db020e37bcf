use std::cell::{Ref, RefCell, RefMut};
use std::fmt::{self, Display, Formatter};
use std::rc::Rc;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::errors::{CircuitError, CircuitResult};
use crate::graph::CircuitGraph;
use crate::measurements::{MeasurementRef, ReturnType};
use crate::operation::OperatorRef;
use crate::queuing::{AnnotatedQueue, ItemCategory, QueueItem, QueuingContext};
use crate::specs::Specs;
use crate::types::{Param, Wire, Wires};
use crate::utils::basis_dim;

/// Where a parameter of the tape lives: the owning item and the index within its data.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamInfo {
    /// The operator, observable or nested tape holding the parameter.
    pub owner: QueueItem,
    /// Index into the owner's data.
    pub p_idx: usize,
}

/// How much of a tape [`QuantumTape::copy`] duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CopyMode {
    /// Share every operator and measurement with the original.
    #[default]
    Shallow,
    /// New handles for the top level operators and measurements, nested tapes copied the
    /// same way.
    Operations,
    /// New handles all the way down, including nested tapes and tensor factors.
    Deep,
}

#[derive(Debug, Default)]
struct TapeState {
    queue: AnnotatedQueue,
    prep: Vec<OperatorRef>,
    ops: Vec<QueueItem>,
    measurements: Vec<MeasurementRef>,
    par_info: Vec<ParamInfo>,
    trainable_params: Vec<usize>,
    wires: Wires,
    output_dim: usize,
    is_sampled: bool,
    obs_sharing_wires: Vec<usize>,
    graph: Option<Rc<CircuitGraph>>,
    specs: Option<Specs>,
}

impl TapeState {
    fn invalidate_caches(&mut self) {
        self.graph = None;
        self.specs = None;
    }
}

/// An ordered record of state preparations, operations and measurements.
///
/// `QuantumTape` is a handle: clones refer to the same tape, and equality is identity.
///
/// # Example
/// ```
/// use qtape::prelude::*;
///
/// # fn main() -> CircuitResult<()> {
/// let tape = QuantumTape::new();
/// tape.record(|| {
///     rx(0.432, 0)?;
///     rot(0.543, 0.2, 0.1, 0)?;
///     cnot(0, "a")?;
///     expval(&pauli_z("a")?)?;
///     Ok(())
/// })?;
///
/// assert_eq!(tape.num_params(), 4);
/// assert_eq!(tape.trainable_params(), vec![0, 1, 2, 3]);
///
/// tape.set_trainable_params([1, 3])?;
/// assert_eq!(tape.get_parameters(true), vec![Param::from(0.543), Param::from(0.1)]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct QuantumTape(Rc<RefCell<TapeState>>);

impl QuantumTape {
    /// An empty tape.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new tape by running `f`.
    pub fn build<F>(f: F) -> CircuitResult<Self>
    where
        F: FnOnce() -> CircuitResult<()>,
    {
        let tape = Self::new();
        tape.record(f)?;
        Ok(tape)
    }

    /// A tape made directly from its partitions, without recording.
    pub fn from_parts(
        prep: Vec<OperatorRef>,
        ops: Vec<QueueItem>,
        measurements: Vec<MeasurementRef>,
    ) -> Self {
        let tape = Self::new();
        {
            let mut s = tape.0.borrow_mut();
            prep.iter()
                .cloned()
                .map(QueueItem::Operator)
                .chain(ops.iter().cloned())
                .chain(measurements.iter().cloned().map(QueueItem::Measurement))
                .for_each(|item| s.queue.append(item, Default::default()));
            s.prep = prep;
            s.ops = ops;
            s.measurements = measurements;
        }
        tape.update();
        tape
    }

    /// Run `f` with this tape recording every operator and measurement constructed inside.
    ///
    /// If another tape is recording, this tape is recorded onto it as a nested tape. When `f`
    /// succeeds the queue is partitioned and parameters are indexed; every trainable index is
    /// reset. Re-entering a tape appends to its existing queue.
    pub fn record<T, F>(&self, f: F) -> CircuitResult<T>
    where
        F: FnOnce() -> CircuitResult<T>,
    {
        if let Some(parent) = QueuingContext::active_context() {
            if parent != *self {
                QueuingContext::append(QueueItem::Tape(self.clone()), vec![])?;
            }
        }
        let value = {
            let _guard = QueuingContext::enter(self.clone());
            f()
        }?;
        self.process_queue()?;
        Ok(value)
    }

    /// Run `f` with recording suspended. Fails unless this tape is the one recording.
    ///
    /// Every recording tape is hidden while `f` runs and restored afterwards, even if `f`
    /// fails or panics.
    pub fn stop_recording<T, F>(&self, f: F) -> CircuitResult<T>
    where
        F: FnOnce() -> CircuitResult<T>,
    {
        if QueuingContext::active_context().as_ref() != Some(self) {
            return Err(CircuitError::Queuing(
                "Cannot stop recording requested tape as it is not currently recording."
                    .to_string(),
            ));
        }
        let _guard = QueuingContext::suspend();
        f()
    }

    fn process_queue(&self) -> CircuitResult<()> {
        {
            let mut s = self.0.borrow_mut();
            let mut prep = vec![];
            let mut ops = vec![];
            let mut measurements = vec![];
            for (item, info) in s.queue.iter() {
                if info.owner.is_some() {
                    continue;
                }
                let category = item.category();
                if !measurements.is_empty()
                    && matches!(category, Some(ItemCategory::Prep) | Some(ItemCategory::Op))
                {
                    return Err(CircuitError::RecordingOrder(format!(
                        "Quantum operation {} must occur prior to any measurements.",
                        item.name()
                    )));
                }
                match (category, item) {
                    (Some(ItemCategory::Prep), QueueItem::Operator(op)) => {
                        if !ops.is_empty() {
                            return Err(CircuitError::RecordingOrder(format!(
                                "State preparation operation {} must occur prior to any quantum operations.",
                                op
                            )));
                        }
                        prep.push(op.clone());
                    }
                    (Some(ItemCategory::Op), _) => ops.push(item.clone()),
                    (Some(ItemCategory::Measurement), QueueItem::Measurement(m)) => {
                        measurements.push(m.clone())
                    }
                    _ => {}
                }
            }
            s.prep = prep;
            s.ops = ops;
            s.measurements = measurements;
        }
        self.update();
        Ok(())
    }

    fn update(&self) {
        self.update_par_info();
        let mut s = self.0.borrow_mut();
        s.trainable_params = (0..s.par_info.len()).collect();

        let wires = s
            .prep
            .iter()
            .map(OperatorRef::wires)
            .chain(s.ops.iter().map(QueueItem::wires))
            .chain(s.measurements.iter().map(|m| m.wires()))
            .collect::<Vec<_>>();
        s.wires = Wires::all_wires(&wires);

        s.output_dim = s
            .measurements
            .iter()
            .map(|m| match m.return_type() {
                ReturnType::Probability => basis_dim(m.wires().len()).unwrap_or(usize::MAX),
                ReturnType::State | ReturnType::MidMeasure => 0,
                _ => 1,
            })
            .fold(0, usize::saturating_add);
        s.is_sampled = s
            .measurements
            .iter()
            .any(|m| m.return_type() == ReturnType::Sample);

        let obs_wires = s
            .measurements
            .iter()
            .filter(|m| m.obs().is_some())
            .flat_map(|m| m.wires().labels().to_vec())
            .collect::<Vec<Wire>>();
        let repeated = obs_wires
            .iter()
            .filter(|w| obs_wires.iter().filter(|v| v == w).count() > 1)
            .cloned()
            .collect::<Vec<_>>();
        s.obs_sharing_wires = s
            .measurements
            .iter()
            .enumerate()
            .filter(|(_, m)| m.obs().is_some() && m.wires().iter().any(|w| repeated.contains(w)))
            .map(|(i, _)| i)
            .collect();

        s.invalidate_caches();
        debug!(
            num_prep = s.prep.len(),
            num_ops = s.ops.len(),
            num_measurements = s.measurements.len(),
            num_params = s.par_info.len(),
            "finalized tape"
        );
    }

    fn update_par_info(&self) {
        let mut s = self.0.borrow_mut();
        let owners = s
            .prep
            .iter()
            .cloned()
            .map(QueueItem::Operator)
            .chain(s.ops.iter().cloned())
            .chain(
                s.measurements
                    .iter()
                    .filter_map(|m| m.obs().cloned())
                    .map(QueueItem::Operator),
            )
            .collect::<Vec<_>>();
        s.par_info = owners
            .into_iter()
            .flat_map(|owner| {
                (0..owner.num_params()).map(move |p_idx| ParamInfo {
                    owner: owner.clone(),
                    p_idx,
                })
            })
            .collect();
    }

    pub(crate) fn queue_ref(&self) -> Ref<'_, AnnotatedQueue> {
        Ref::map(self.0.borrow(), |s| &s.queue)
    }

    pub(crate) fn queue_mut(&self) -> RefMut<'_, AnnotatedQueue> {
        RefMut::map(self.0.borrow_mut(), |s| &mut s.queue)
    }

    pub(crate) fn prep(&self) -> Vec<OperatorRef> {
        self.0.borrow().prep.clone()
    }

    pub(crate) fn ops(&self) -> Vec<QueueItem> {
        self.0.borrow().ops.clone()
    }

    /// Every recorded item in recording order, owned items included.
    pub fn queue(&self) -> Vec<QueueItem> {
        self.0.borrow().queue.queue()
    }

    /// State preparations followed by operations.
    pub fn operations(&self) -> Vec<QueueItem> {
        let s = self.0.borrow();
        s.prep
            .iter()
            .cloned()
            .map(QueueItem::Operator)
            .chain(s.ops.iter().cloned())
            .collect()
    }

    /// Terminal measurements.
    pub fn measurements(&self) -> Vec<MeasurementRef> {
        self.0.borrow().measurements.clone()
    }

    /// The measured observables, or the measurement itself when it has no observable.
    pub fn observables(&self) -> Vec<QueueItem> {
        self.0
            .borrow()
            .measurements
            .iter()
            .map(|m| match m.obs() {
                Some(obs) => QueueItem::Operator(obs.clone()),
                None => QueueItem::Measurement(m.clone()),
            })
            .collect()
    }

    /// Indices into [`QuantumTape::measurements`] of observables sharing a wire with another.
    pub fn obs_sharing_wires(&self) -> Vec<usize> {
        self.0.borrow().obs_sharing_wires.clone()
    }

    /// Gates rotating every measured observable into the computational basis.
    pub fn diagonalizing_gates(&self) -> Vec<OperatorRef> {
        self.measurements()
            .iter()
            .flat_map(|m| m.diagonalizing_gates())
            .collect()
    }

    /// Operations followed by measurements.
    pub fn circuit(&self) -> Vec<QueueItem> {
        let mut circuit = self.operations();
        circuit.extend(self.measurements().into_iter().map(QueueItem::Measurement));
        circuit
    }

    /// Iterate over operations followed by measurements.
    pub fn iter(&self) -> std::vec::IntoIter<QueueItem> {
        self.circuit().into_iter()
    }

    /// Number of operations and measurements.
    pub fn len(&self) -> usize {
        let s = self.0.borrow();
        s.prep.len() + s.ops.len() + s.measurements.len()
    }

    /// Whether the tape holds nothing.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The item at position `idx` of [`QuantumTape::circuit`].
    pub fn get(&self, idx: usize) -> Option<QueueItem> {
        self.circuit().into_iter().nth(idx)
    }

    /// Every wire used, in first-use order.
    pub fn wires(&self) -> Wires {
        self.0.borrow().wires.clone()
    }

    /// Number of wires used.
    pub fn num_wires(&self) -> usize {
        self.0.borrow().wires.len()
    }

    /// Size of the flattened output of every measurement.
    pub fn output_dim(&self) -> usize {
        self.0.borrow().output_dim
    }

    /// Whether some measurement returns samples.
    pub fn is_sampled(&self) -> bool {
        self.0.borrow().is_sampled
    }

    /// Where every parameter lives.
    pub fn par_info(&self) -> Vec<ParamInfo> {
        self.0.borrow().par_info.clone()
    }

    /// Total number of parameters.
    pub fn num_params(&self) -> usize {
        self.0.borrow().par_info.len()
    }

    /// Number of trainable parameters.
    pub fn num_trainable_params(&self) -> usize {
        self.0.borrow().trainable_params.len()
    }

    /// Indices of the trainable parameters, ascending.
    pub fn trainable_params(&self) -> Vec<usize> {
        self.0.borrow().trainable_params.clone()
    }

    /// Choose which parameters are trainable. Indices are sorted and deduplicated.
    pub fn set_trainable_params<I, T>(&self, params: I) -> CircuitResult<()>
    where
        I: IntoIterator<Item = T>,
        T: TryInto<usize>,
    {
        let mut indices = params
            .into_iter()
            .map(|p| {
                p.try_into().map_err(|_| {
                    CircuitError::TrainableParams(
                        "Argument indices must be non-negative integers.".to_string(),
                    )
                })
            })
            .collect::<CircuitResult<Vec<usize>>>()?;
        let num_params = self.num_params();
        if indices.iter().any(|i| *i >= num_params) {
            return Err(CircuitError::TrainableParams(format!(
                "Tape has at most {} parameters.",
                num_params
            )));
        }
        indices.sort_unstable();
        indices.dedup();
        let mut s = self.0.borrow_mut();
        s.trainable_params = indices;
        s.specs = None;
        Ok(())
    }

    /// Current parameter values, read from their owners.
    pub fn get_parameters(&self, trainable_only: bool) -> Vec<Param> {
        self.targets(trainable_only)
            .into_iter()
            .filter_map(|info| info.owner.data().get(info.p_idx).cloned())
            .collect()
    }

    /// Write parameter values to their owners, in the order of
    /// [`QuantumTape::get_parameters`].
    pub fn set_parameters<I>(&self, params: I, trainable_only: bool) -> CircuitResult<()>
    where
        I: IntoIterator,
        I::Item: Into<Param>,
    {
        let params = params.into_iter().map(Into::into).collect::<Vec<Param>>();
        let targets = self.targets(trainable_only);
        if targets.len() != params.len() {
            return Err(CircuitError::ParameterCount {
                expected: targets.len(),
                provided: params.len(),
            });
        }
        targets
            .into_iter()
            .zip(params)
            .try_for_each(|(info, p)| info.owner.set_parameter(info.p_idx, p))
    }

    /// Every parameter value.
    pub fn data(&self) -> Vec<Param> {
        self.get_parameters(false)
    }

    /// Write every parameter value.
    pub fn set_data<I>(&self, params: I) -> CircuitResult<()>
    where
        I: IntoIterator,
        I::Item: Into<Param>,
    {
        self.set_parameters(params, false)
    }

    /// Write the parameter with global index `idx`.
    pub fn set_parameter_at(&self, idx: usize, value: Param) -> CircuitResult<()> {
        let info = self.0.borrow().par_info.get(idx).cloned();
        let info = info.ok_or_else(|| {
            CircuitError::new(format!(
                "Parameter index {} out of range for a tape with {} parameters.",
                idx,
                self.num_params()
            ))
        })?;
        info.owner.set_parameter(info.p_idx, value)
    }

    /// The owner of the trainable parameter `idx` and the parameter's index within it.
    pub fn get_operation(&self, idx: usize) -> CircuitResult<(QueueItem, usize)> {
        let s = self.0.borrow();
        let info = s
            .trainable_params
            .get(idx)
            .and_then(|t| s.par_info.get(*t))
            .ok_or_else(|| {
                CircuitError::TrainableParams(format!(
                    "Tape has {} trainable parameters, index {} requested.",
                    s.trainable_params.len(),
                    idx
                ))
            })?;
        Ok((info.owner.clone(), info.p_idx))
    }

    fn targets(&self, trainable_only: bool) -> Vec<ParamInfo> {
        let s = self.0.borrow();
        if trainable_only {
            s.trainable_params
                .iter()
                .filter_map(|i| s.par_info.get(*i).cloned())
                .collect()
        } else {
            s.par_info.clone()
        }
    }

    /// Invert the tape in place: operations are reversed and each inverted, nested tapes
    /// recursively. Preparations and measurements stay. Trainable indices follow their
    /// parameters.
    ///
    /// Fails, leaving the tape untouched, if a mid-circuit measurement is recorded.
    pub fn inv(&self) -> CircuitResult<()> {
        if let Some(m) = self.find_mid_measure() {
            return Err(CircuitError::QuantumFunction(format!(
                "Cannot invert a tape containing the mid-circuit measurement {}.",
                m
            )));
        }
        self.invert();
        Ok(())
    }

    fn find_mid_measure(&self) -> Option<MeasurementRef> {
        let ops = self.0.borrow().ops.clone();
        ops.iter().find_map(|item| match item {
            QueueItem::Measurement(m) => Some(m.clone()),
            QueueItem::Tape(t) => t.find_mid_measure(),
            QueueItem::Operator(_) => None,
        })
    }

    /// Inverts and returns the new order of parameters: position `k` holds old index
    /// `order[k]`.
    fn invert(&self) -> Vec<usize> {
        let (prep_counts, ops, obs_counts) = {
            let s = self.0.borrow();
            (
                s.prep.iter().map(OperatorRef::num_params).collect::<Vec<_>>(),
                s.ops.clone(),
                s.measurements
                    .iter()
                    .map(|m| m.obs().map(OperatorRef::num_params).unwrap_or(0))
                    .collect::<Vec<_>>(),
            )
        };

        let mut start = 0;
        let mut blocks = vec![];
        for n in prep_counts {
            blocks.push((start..start + n).collect::<Vec<_>>());
            start += n;
        }
        let mut op_blocks = vec![];
        for item in &ops {
            let block = match item {
                QueueItem::Operator(op) => {
                    op.set_inverse(!op.inverse());
                    (start..start + op.num_params()).collect::<Vec<_>>()
                }
                QueueItem::Tape(t) => t.invert().into_iter().map(|i| start + i).collect(),
                QueueItem::Measurement(_) => vec![],
            };
            start += block.len();
            op_blocks.push(block);
        }
        op_blocks.reverse();
        blocks.extend(op_blocks);
        for n in obs_counts {
            blocks.push((start..start + n).collect());
            start += n;
        }
        let order = blocks.concat();

        {
            let mut s = self.0.borrow_mut();
            s.ops.reverse();
            let trainable = order
                .iter()
                .enumerate()
                .filter(|(_, old)| s.trainable_params.contains(*old))
                .map(|(k, _)| k)
                .collect();
            s.trainable_params = trainable;
        }
        self.update_par_info();
        self.0.borrow_mut().invalidate_caches();
        order
    }

    /// Copy the tape, see [`CopyMode`]. Trainable parameters are preserved.
    pub fn copy(&self, mode: CopyMode) -> QuantumTape {
        let (prep, ops, measurements, trainable) = {
            let s = self.0.borrow();
            let (prep, ops, measurements) = match mode {
                CopyMode::Shallow => (s.prep.clone(), s.ops.clone(), s.measurements.clone()),
                CopyMode::Operations => (
                    s.prep.iter().map(OperatorRef::copy).collect(),
                    s.ops.iter().map(|item| item.copy(false)).collect(),
                    s.measurements.iter().map(MeasurementRef::copy).collect(),
                ),
                CopyMode::Deep => (
                    s.prep.iter().map(OperatorRef::deep_copy).collect(),
                    s.ops.iter().map(|item| item.copy(true)).collect(),
                    s.measurements.iter().map(MeasurementRef::deep_copy).collect(),
                ),
            };
            (prep, ops, measurements, s.trainable_params.clone())
        };
        let tape = QuantumTape::from_parts(prep, ops, measurements);
        tape.0.borrow_mut().trainable_params = trainable;
        tape
    }

    /// The dependency graph of the tape, built on first use.
    pub fn graph(&self) -> Rc<CircuitGraph> {
        if let Some(graph) = self.0.borrow().graph.clone() {
            return graph;
        }
        let graph = Rc::new(CircuitGraph::new(
            self.operations(),
            self.measurements(),
            self.wires(),
        ));
        self.0.borrow_mut().graph = Some(graph.clone());
        graph
    }

    /// Length of the longest chain of operations sharing wires.
    pub fn get_depth(&self) -> usize {
        self.graph().get_depth()
    }

    /// Resource summary, cached until the tape or its trainable parameters change.
    pub fn specs(&self) -> Specs {
        if let Some(specs) = self.0.borrow().specs.clone() {
            return specs;
        }
        let specs = Specs::from_tape(self);
        self.0.borrow_mut().specs = Some(specs.clone());
        specs
    }

    /// SHA-256 hex digest of the structure, parameters modulo their period, and the
    /// trainable parameters.
    pub fn hash(&self) -> String {
        let serialized = format!(
            "{}|||{:?}",
            self.graph().serialize(),
            self.trainable_params()
        );
        let digest = Sha256::digest(serialized.as_bytes());
        digest.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl PartialEq for QuantumTape {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for QuantumTape {}

impl Display for QuantumTape {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<QuantumTape: wires={}, params={}>",
            self.wires(),
            self.num_params()
        )
    }
}

impl<'a> IntoIterator for &'a QuantumTape {
    type Item = QueueItem;
    type IntoIter = std::vec::IntoIter<QueueItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
