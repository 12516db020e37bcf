use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::fmt::{self, Debug, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::ops::{Deref, Not};
use std::rc::Rc;

use crate::errors::{CircuitError, CircuitResult};
use crate::operation::OperatorRef;
use crate::queuing::{Annotation, QueueItem, QueuingContext};
use crate::tape::QuantumTape;
use crate::types::Wires;

/// What a measurement returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ReturnType {
    /// Expectation value of an observable.
    Expectation,
    /// Variance of an observable.
    Variance,
    /// Samples of an observable or of the computational basis.
    Sample,
    /// Computational basis probabilities.
    Probability,
    /// The state or a reduced density matrix.
    State,
    /// A mid-circuit measurement.
    MidMeasure,
}

impl ReturnType {
    /// Short name used when printing measurements.
    pub fn value(&self) -> &'static str {
        match self {
            ReturnType::Expectation => "expval",
            ReturnType::Variance => "var",
            ReturnType::Sample => "sample",
            ReturnType::Probability => "probs",
            ReturnType::State => "state",
            ReturnType::MidMeasure => "measure",
        }
    }
}

impl Display for ReturnType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// A measurement of either an observable, or of wires in the computational basis with
/// optional eigenvalues.
#[derive(Debug)]
pub struct MeasurementProcess {
    return_type: ReturnType,
    obs: Option<OperatorRef>,
    wires: Wires,
    eigvals: Option<Vec<f64>>,
    id: Option<String>,
}

impl MeasurementProcess {
    /// Construct a measurement process without recording it. Wires and eigenvalues cannot
    /// be given together with an observable.
    pub fn new(
        return_type: ReturnType,
        obs: Option<OperatorRef>,
        wires: Option<Wires>,
        eigvals: Option<Vec<f64>>,
        id: Option<String>,
    ) -> CircuitResult<Self> {
        if obs.is_some() && wires.is_some() {
            return Err(CircuitError::InvalidArgument(
                "Cannot set the wires if an observable is provided.".to_string(),
            ));
        }
        if obs.is_some() && eigvals.is_some() {
            return Err(CircuitError::InvalidArgument(
                "Cannot set the eigenvalues if an observable is provided.".to_string(),
            ));
        }
        Ok(Self {
            return_type,
            obs,
            wires: wires.unwrap_or_default(),
            eigvals,
            id,
        })
    }

    /// What this measurement returns.
    pub fn return_type(&self) -> ReturnType {
        self.return_type
    }

    /// The measured observable, if any.
    pub fn obs(&self) -> Option<&OperatorRef> {
        self.obs.as_ref()
    }

    /// Identifier of a mid-circuit measurement.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Whether this is a mid-circuit measurement.
    pub fn is_mid_measure(&self) -> bool {
        self.return_type == ReturnType::MidMeasure
    }

    /// The observable's wires, or the wires given at construction.
    pub fn wires(&self) -> Wires {
        match &self.obs {
            Some(obs) => obs.wires(),
            None => self.wires.clone(),
        }
    }

    /// The observable's eigenvalues if it defines them, else the eigenvalues given at
    /// construction.
    pub fn get_eigvals(&self) -> Option<Vec<f64>> {
        self.obs
            .as_ref()
            .and_then(|obs| obs.eigvals().ok())
            .or_else(|| self.eigvals.clone())
    }

    /// A tape rotating the observable's eigenbasis onto the computational basis, followed by
    /// an observable-free measurement of the same kind carrying the eigenvalues.
    pub fn expand(&self) -> CircuitResult<QuantumTape> {
        let obs = self
            .obs
            .as_ref()
            .ok_or_else(|| CircuitError::DecompositionUndefined(self.to_string()))?;
        let gates = obs
            .diagonalizing_gates()
            .map_err(|_| CircuitError::DecompositionUndefined(self.to_string()))?;
        let measurement = MeasurementProcess::new(
            self.return_type,
            None,
            Some(obs.wires()),
            obs.eigvals().ok(),
            None,
        )?;
        Ok(QuantumTape::from_parts(
            vec![],
            gates.into_iter().map(QueueItem::Operator).collect(),
            vec![MeasurementRef::new(measurement)],
        ))
    }

    /// The gates of [`MeasurementProcess::expand`], or none.
    pub fn diagonalizing_gates(&self) -> Vec<OperatorRef> {
        self.expand()
            .map(|tape| {
                tape.operations()
                    .into_iter()
                    .filter_map(|item| item.as_operator().cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Structural fingerprint of observable name, wires, parameters and return type.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }

    /// A copy with a fresh handle to the observable.
    pub fn copy(&self) -> Self {
        Self {
            return_type: self.return_type,
            obs: self.obs.as_ref().map(OperatorRef::copy),
            wires: self.wires.clone(),
            eigvals: self.eigvals.clone(),
            id: self.id.clone(),
        }
    }

    /// A copy which also copies the operators inside the observable.
    pub fn deep_copy(&self) -> Self {
        Self {
            obs: self.obs.as_ref().map(OperatorRef::deep_copy),
            ..self.copy()
        }
    }
}

impl Hash for MeasurementProcess {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let (name, data) = match &self.obs {
            Some(obs) => (
                obs.name(),
                obs.data().iter().map(ToString::to_string).collect::<Vec<_>>(),
            ),
            None => ("Identity".to_string(), vec![]),
        };
        name.hash(state);
        self.wires().hash(state);
        data.hash(state);
        self.return_type.hash(state);
    }
}

impl Display for MeasurementProcess {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.obs {
            Some(obs) => write!(f, "{}({})", self.return_type, obs),
            None => write!(f, "{}(wires={})", self.return_type, self.wires),
        }
    }
}

/// A shared handle to a measurement process. Equality is identity.
#[derive(Debug, Clone)]
pub struct MeasurementRef(Rc<MeasurementProcess>);

impl MeasurementRef {
    /// Wrap a measurement process without recording it.
    pub fn new(mp: MeasurementProcess) -> Self {
        Self(Rc::new(mp))
    }

    /// Record the measurement on the active tape. The observable, recorded first if it was
    /// not yet, is marked as owned by the measurement.
    pub fn queue(self) -> CircuitResult<Self> {
        if !QueuingContext::recording() {
            return Ok(self);
        }
        let item = QueueItem::Measurement(self.clone());
        match self.obs() {
            Some(obs) => {
                let obs_item = QueueItem::Operator(obs.clone());
                if !QueuingContext::is_queued(&obs_item) {
                    obs.clone().queue()?;
                }
                QueuingContext::update_info(&obs_item, Annotation::owned_by(item.clone()))?;
                QueuingContext::append(item, vec![obs_item])?;
            }
            None => QueuingContext::append(item, vec![])?,
        }
        Ok(self)
    }

    /// A fresh handle to a copy, see [`MeasurementProcess::copy`].
    pub fn copy(&self) -> Self {
        Self::new(self.0.copy())
    }

    /// A fresh handle to a deep copy, see [`MeasurementProcess::deep_copy`].
    pub fn deep_copy(&self) -> Self {
        Self::new(self.0.deep_copy())
    }

    /// Whether both handles point at the same measurement.
    pub fn ptr_eq(&self, other: &MeasurementRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Deref for MeasurementRef {
    type Target = MeasurementProcess;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl PartialEq for MeasurementRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for MeasurementRef {}

impl Display for MeasurementRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self.0.as_ref(), f)
    }
}

fn record(
    return_type: ReturnType,
    obs: Option<&OperatorRef>,
    wires: Option<Wires>,
) -> CircuitResult<MeasurementRef> {
    MeasurementRef::new(MeasurementProcess::new(
        return_type,
        obs.cloned(),
        wires,
        None,
        None,
    )?)
    .queue()
}

/// Expectation value of an observable or Hamiltonian.
///
/// # Example
/// ```
/// use qtape::prelude::*;
///
/// # fn main() -> CircuitResult<()> {
/// let tape = QuantumTape::new();
/// tape.record(|| {
///     rx(0.5, 0)?;
///     expval(&pauli_z(0)?)?;
///     Ok(())
/// })?;
/// assert_eq!(tape.measurements()[0].to_string(), "expval(PauliZ(wires=[0]))");
/// # Ok(())
/// # }
/// ```
pub fn expval(op: &OperatorRef) -> CircuitResult<MeasurementRef> {
    if !op.is_observable() && !op.is_hamiltonian() {
        return Err(CircuitError::QuantumFunction(format!(
            "{} is not an observable: cannot be used with expval",
            op.name()
        )));
    }
    record(ReturnType::Expectation, Some(op), None)
}

/// Variance of an observable.
pub fn var(op: &OperatorRef) -> CircuitResult<MeasurementRef> {
    if !op.is_observable() || op.is_hamiltonian() {
        return Err(CircuitError::QuantumFunction(format!(
            "{} is not an observable: cannot be used with var",
            op.name()
        )));
    }
    record(ReturnType::Variance, Some(op), None)
}

/// Samples of an observable, or computational basis samples of `wires`. Neither given means
/// every wire of the device.
pub fn sample(op: Option<&OperatorRef>, wires: Option<Wires>) -> CircuitResult<MeasurementRef> {
    if let Some(op) = op {
        if !op.is_observable() {
            return Err(CircuitError::QuantumFunction(format!(
                "{} is not an observable: cannot be used with sample",
                op.name()
            )));
        }
        if wires.is_some() {
            return Err(CircuitError::InvalidArgument(
                "Cannot specify the wires to sample if an observable is provided. The wires to \
                 sample will be determined directly from the observable."
                    .to_string(),
            ));
        }
    }
    record(ReturnType::Sample, op, wires)
}

/// Computational basis probabilities of `wires`, or of the eigenbasis of `op`.
pub fn probs(wires: Option<Wires>, op: Option<&OperatorRef>) -> CircuitResult<MeasurementRef> {
    if let Some(op) = op {
        if op.is_hamiltonian() {
            return Err(CircuitError::QuantumFunction(
                "Hamiltonians are not supported for rotating probabilities.".to_string(),
            ));
        }
        if !op.borrow().defines_diagonalizing_gates() {
            return Err(CircuitError::QuantumFunction(format!(
                "{} does not define diagonalizing gates : cannot be used to rotate the probability",
                op
            )));
        }
        if wires.is_some() {
            return Err(CircuitError::QuantumFunction(
                "Cannot specify the wires to probs if an observable is provided. The wires for \
                 probs will be determined directly from the observable."
                    .to_string(),
            ));
        }
    }
    record(ReturnType::Probability, op, wires)
}

/// The full state.
pub fn state() -> CircuitResult<MeasurementRef> {
    record(ReturnType::State, None, None)
}

/// Reduced density matrix of `wires`.
pub fn density_matrix(wires: Wires) -> CircuitResult<MeasurementRef> {
    record(ReturnType::State, None, Some(wires))
}

/// Measure a single qubit in the middle of the circuit.
pub fn measure<W: Into<Wires>>(wires: W) -> CircuitResult<MeasurementValue> {
    let wires = wires.into();
    if wires.len() != 1 {
        return Err(CircuitError::QuantumFunction(
            "Only a single qubit can be measured in the middle of the circuit".to_string(),
        ));
    }
    let id = format!("{:08x}", rand::random::<u32>());
    MeasurementRef::new(MeasurementProcess::new(
        ReturnType::MidMeasure,
        None,
        Some(wires),
        None,
        Some(id.clone()),
    )?)
    .queue()?;
    Ok(MeasurementValue::new(id))
}

/// The unknown outcome of a mid-circuit measurement, to be used for classical control.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementValue<T = f64> {
    depends_on: String,
    zero_case: T,
    one_case: T,
    control_value: T,
}

impl MeasurementValue<f64> {
    /// Outcomes `0.0` and `1.0`, controlling on the one outcome.
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self::with_outcomes(id, 0.0, 1.0)
    }
}

impl<T> MeasurementValue<T>
where
    T: Clone + PartialEq + Debug,
{
    /// Custom outcome values, controlling on `one_case`.
    pub fn with_outcomes<S: Into<String>>(id: S, zero_case: T, one_case: T) -> Self {
        Self {
            depends_on: id.into(),
            control_value: one_case.clone(),
            zero_case,
            one_case,
        }
    }

    /// Every possible outcome, keyed by the measured bits.
    pub fn branches(&self) -> BTreeMap<Vec<u8>, T> {
        let mut branches = BTreeMap::new();
        branches.insert(vec![0], self.zero_case.clone());
        branches.insert(vec![1], self.one_case.clone());
        branches
    }

    /// A copy controlling on the other outcome.
    pub fn inverted(&self) -> Self {
        let control_value = if self.control_value == self.zero_case {
            self.one_case.clone()
        } else {
            self.zero_case.clone()
        };
        Self {
            control_value,
            ..self.clone()
        }
    }

    /// Control on the outcome `value`, which must be one of the two outcomes.
    pub fn assert_outcome(&mut self, value: T) -> CircuitResult<&mut Self> {
        if value != self.zero_case && value != self.one_case {
            return Err(CircuitError::MeasurementValue(format!(
                "Unknown measurement value asserted; the set of possible measurement outcomes \
                 is: {{{:?}, {:?}}}.",
                self.zero_case, self.one_case
            )));
        }
        self.control_value = value;
        Ok(self)
    }

    /// The outcome to control on.
    pub fn control_value(&self) -> &T {
        &self.control_value
    }

    /// Identifier of the measurement this depends on.
    pub fn depends_on(&self) -> &str {
        &self.depends_on
    }

    /// Identifiers of every measurement this depends on.
    pub fn measurements(&self) -> Vec<String> {
        vec![self.depends_on.clone()]
    }
}

impl<T> Not for MeasurementValue<T>
where
    T: Clone + PartialEq + Debug,
{
    type Output = Self;

    fn not(self) -> Self::Output {
        self.inverted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gates::{hermitian, pauli_x, pauli_z, rx};
    use crate::types::Param;

    #[test]
    fn test_obs_with_wires_rejected() -> CircuitResult<()> {
        let z = pauli_z(0)?;
        let err = MeasurementProcess::new(
            ReturnType::Expectation,
            Some(z.clone()),
            Some(Wires::single(0)),
            None,
            None,
        );
        assert!(matches!(err, Err(CircuitError::InvalidArgument(_))));
        let err = MeasurementProcess::new(
            ReturnType::Expectation,
            Some(z),
            None,
            Some(vec![1.0, -1.0]),
            None,
        );
        assert!(matches!(err, Err(CircuitError::InvalidArgument(_))));
        Ok(())
    }

    #[test]
    fn test_expval_requires_observable() -> CircuitResult<()> {
        let err = expval(&rx(0.1, 0)?).unwrap_err();
        assert_eq!(
            err.to_string(),
            "RX is not an observable: cannot be used with expval"
        );
        Ok(())
    }

    #[test]
    fn test_sample_and_probs_exclusive() -> CircuitResult<()> {
        let z = pauli_z(0)?;
        assert!(sample(Some(&z), Some(Wires::single(0))).is_err());
        assert!(probs(Some(Wires::single(0)), Some(&z)).is_err());
        let m = sample(None, None)?;
        assert!(m.wires().is_empty());
        Ok(())
    }

    #[test]
    fn test_wires_delegate_to_obs() -> CircuitResult<()> {
        let m = expval(&pauli_x("a")?)?;
        assert_eq!(m.wires(), Wires::single("a"));
        assert_eq!(m.get_eigvals(), Some(vec![1.0, -1.0]));
        Ok(())
    }

    #[test]
    fn test_expand_hermitian() -> CircuitResult<()> {
        let h = hermitian(Param::real_matrix(2, 2, &[1.0, 2.0, 2.0, 4.0]), Wires::single("a"))?;
        let m = MeasurementRef::new(MeasurementProcess::new(
            ReturnType::Expectation,
            Some(h),
            None,
            None,
            None,
        )?);
        let tape = m.expand()?;
        assert_eq!(tape.operations().len(), 1);
        assert_eq!(tape.operations()[0].name(), "QubitUnitary");
        let measurements = tape.measurements();
        let inner = &measurements[0];
        assert!(inner.obs().is_none());
        let eigvals = inner.get_eigvals().ok_or_else(|| CircuitError::new("no eigvals"))?;
        assert!(eigvals[0].abs() < 1e-10);
        assert!((eigvals[1] - 5.0).abs() < 1e-10);
        assert_eq!(m.diagonalizing_gates().len(), 1);
        Ok(())
    }

    #[test]
    fn test_expand_without_obs() -> CircuitResult<()> {
        let m = probs(Some(Wires::new([0, 1])?), None)?;
        assert!(m.expand().unwrap_err().is_decomposition_undefined());
        assert!(m.diagonalizing_gates().is_empty());
        Ok(())
    }

    #[test]
    fn test_display() -> CircuitResult<()> {
        assert_eq!(
            expval(&pauli_z(1)?)?.to_string(),
            "expval(PauliZ(wires=[1]))"
        );
        assert_eq!(
            probs(Some(crate::wires![0, "a"]?), None)?.to_string(),
            "probs(wires=[0, 'a'])"
        );
        Ok(())
    }

    #[test]
    fn test_fingerprint() -> CircuitResult<()> {
        let a = expval(&pauli_z(0)?)?;
        let b = expval(&pauli_z(0)?)?;
        let c = var(&pauli_z(0)?)?;
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        Ok(())
    }

    #[test]
    fn test_measure_single_wire() -> CircuitResult<()> {
        assert!(measure(Wires::new([0, 1])?).is_err());
        let m = measure(0)?;
        assert_eq!(m.depends_on().len(), 8);
        assert_eq!(*m.control_value(), 1.0);
        Ok(())
    }

    #[test]
    fn test_measurement_value_outcomes() -> CircuitResult<()> {
        let mut v = MeasurementValue::with_outcomes("abcd1234", 0, 1);
        assert_eq!(*v.inverted().control_value(), 0);
        assert_eq!(*(!v.clone()).inverted().control_value(), 1);
        v.assert_outcome(0)?;
        assert_eq!(*v.control_value(), 0);
        assert!(matches!(
            v.assert_outcome(3),
            Err(CircuitError::MeasurementValue(_))
        ));
        assert_eq!(v.branches().get(&vec![1]), Some(&1));
        assert_eq!(v.measurements(), vec!["abcd1234".to_string()]);
        Ok(())
    }
}
