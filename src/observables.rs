use crate::errors::{CircuitError, CircuitResult};
use crate::operation::{queue_owning, Operator, OperatorRef, Pauli, QueueCategory};
use crate::types::{Param, Wire, Wires};
use crate::utils::kron_eigvals;

/// Tensor product of observables acting on disjoint wires. Nested products are flattened.
#[derive(Debug, Clone)]
pub struct Tensor {
    obs: Vec<OperatorRef>,
}

impl Tensor {
    /// Construct the product of `factors`, flattening factors which are themselves tensors.
    pub fn new(factors: &[OperatorRef]) -> CircuitResult<Self> {
        let mut obs = vec![];
        for f in factors {
            if !f.is_observable() || f.is_hamiltonian() {
                return Err(CircuitError::QuantumFunction(format!(
                    "Can only perform tensor products between observables, got {}.",
                    f
                )));
            }
            match f.factors() {
                Some(inner) => obs.extend(inner),
                None => obs.push(f.clone()),
            }
        }
        let mut seen = Wires::empty();
        for o in &obs {
            let wires = o.wires();
            if !wires.is_disjoint(&seen) {
                return Err(CircuitError::Wires(format!(
                    "Tensor factors must act on disjoint wires, {} overlaps {}.",
                    o, seen
                )));
            }
            seen = Wires::all_wires([&seen, &wires]);
        }
        Ok(Self { obs })
    }

    /// The factors, in order.
    pub fn obs(&self) -> &[OperatorRef] {
        &self.obs
    }
}

impl Operator for Tensor {
    fn base_name(&self) -> String {
        self.obs
            .iter()
            .map(OperatorRef::name)
            .collect::<Vec<_>>()
            .join(" @ ")
    }

    fn wires(&self) -> Wires {
        let wires = self.obs.iter().map(OperatorRef::wires).collect::<Vec<_>>();
        Wires::all_wires(&wires)
    }

    fn data(&self) -> Vec<Param> {
        self.obs.iter().flat_map(OperatorRef::data).collect()
    }

    fn num_params(&self) -> usize {
        self.obs.iter().map(OperatorRef::num_params).sum()
    }

    fn set_parameter(&mut self, idx: usize, value: Param) -> CircuitResult<()> {
        let mut offset = idx;
        for o in &self.obs {
            let n = o.num_params();
            if offset < n {
                return o.set_parameter(offset, value);
            }
            offset -= n;
        }
        Err(CircuitError::new(format!(
            "{} has {} parameters, cannot set parameter {}.",
            self.base_name(),
            self.num_params(),
            idx
        )))
    }

    fn inverse(&self) -> bool {
        false
    }

    fn set_inverse(&mut self, _inverse: bool) {}

    fn queue_category(&self) -> Option<QueueCategory> {
        None
    }

    fn is_observable(&self) -> bool {
        true
    }

    fn diagonalizing_gates(&self) -> CircuitResult<Vec<OperatorRef>> {
        let mut gates = vec![];
        for o in &self.obs {
            gates.extend(o.diagonalizing_gates()?);
        }
        Ok(gates)
    }

    fn eigvals(&self) -> CircuitResult<Vec<f64>> {
        self.obs
            .iter()
            .try_fold(vec![1.0], |acc, o| Ok(kron_eigvals(&acc, &o.eigvals()?)))
    }

    fn pauli_word(&self) -> Option<Vec<(Wire, Pauli)>> {
        let mut word = vec![];
        for o in &self.obs {
            word.extend(o.pauli_word()?);
        }
        Some(word)
    }

    fn constituents(&self) -> Vec<OperatorRef> {
        self.obs.clone()
    }

    fn factors(&self) -> Option<Vec<OperatorRef>> {
        Some(self.obs.clone())
    }

    fn clone_operator(&self) -> OperatorRef {
        OperatorRef::new(self.clone())
    }

    fn deep_clone_operator(&self) -> OperatorRef {
        OperatorRef::new(Tensor {
            obs: self.obs.iter().map(OperatorRef::deep_copy).collect(),
        })
    }

    fn describe(&self) -> String {
        self.obs
            .iter()
            .map(|o| o.borrow().describe())
            .collect::<Vec<_>>()
            .join(" @ ")
    }
}

/// A weighted sum of observables.
#[derive(Debug, Clone)]
pub struct Hamiltonian {
    coeffs: Vec<f64>,
    ops: Vec<OperatorRef>,
}

impl Hamiltonian {
    /// Construct `sum_i coeffs[i] * ops[i]`.
    pub fn new(coeffs: Vec<f64>, ops: Vec<OperatorRef>) -> CircuitResult<Self> {
        if coeffs.len() != ops.len() {
            return Err(CircuitError::InvalidArgument(
                "Could not create valid Hamiltonian; number of coefficients and operators does not match."
                    .to_string(),
            ));
        }
        if let Some(op) = ops.iter().find(|o| !o.is_observable()) {
            return Err(CircuitError::QuantumFunction(format!(
                "Could not create a Hamiltonian, {} is not an observable.",
                op
            )));
        }
        Ok(Self { coeffs, ops })
    }

    /// Coefficients and observables of every term.
    pub fn terms(&self) -> (&[f64], &[OperatorRef]) {
        (&self.coeffs, &self.ops)
    }
}

impl Operator for Hamiltonian {
    fn base_name(&self) -> String {
        "Hamiltonian".to_string()
    }

    fn wires(&self) -> Wires {
        let wires = self.ops.iter().map(OperatorRef::wires).collect::<Vec<_>>();
        Wires::all_wires(&wires)
    }

    fn data(&self) -> Vec<Param> {
        self.coeffs.iter().copied().map(Param::Scalar).collect()
    }

    fn set_parameter(&mut self, idx: usize, value: Param) -> CircuitResult<()> {
        let coeff = self.coeffs.get_mut(idx).ok_or_else(|| {
            CircuitError::new(format!("Hamiltonian has no coefficient {}.", idx))
        })?;
        *coeff = value
            .as_scalar()
            .ok_or_else(|| CircuitError::new("Hamiltonian coefficients must be scalars."))?;
        Ok(())
    }

    fn inverse(&self) -> bool {
        false
    }

    fn set_inverse(&mut self, _inverse: bool) {}

    fn queue_category(&self) -> Option<QueueCategory> {
        None
    }

    fn is_observable(&self) -> bool {
        true
    }

    fn is_hamiltonian(&self) -> bool {
        true
    }

    fn constituents(&self) -> Vec<OperatorRef> {
        self.ops.clone()
    }

    fn clone_operator(&self) -> OperatorRef {
        OperatorRef::new(self.clone())
    }

    fn deep_clone_operator(&self) -> OperatorRef {
        OperatorRef::new(Hamiltonian {
            coeffs: self.coeffs.clone(),
            ops: self.ops.iter().map(OperatorRef::deep_copy).collect(),
        })
    }

    fn describe(&self) -> String {
        format!(
            "<Hamiltonian: terms={}, wires={}>",
            self.ops.len(),
            Operator::wires(self)
        )
    }
}

/// Tensor product of `factors`, recorded as the owner of each of them.
pub fn tensor<It>(factors: It) -> CircuitResult<OperatorRef>
where
    It: IntoIterator<Item = OperatorRef>,
{
    let args = factors.into_iter().collect::<Vec<_>>();
    let t = OperatorRef::new(Tensor::new(&args)?);
    queue_owning(&t, &args)?;
    Ok(t)
}

/// Tensor product of two observables, `a @ b`.
///
/// # Example
/// ```
/// use qtape::prelude::*;
///
/// # fn main() -> CircuitResult<()> {
/// let t = compose(&pauli_z(0)?, &hadamard(1)?)?;
/// assert_eq!(t.name(), "PauliZ @ Hadamard");
/// assert_eq!(t.eigvals()?, vec![1.0, -1.0, -1.0, 1.0]);
/// # Ok(())
/// # }
/// ```
pub fn compose(a: &OperatorRef, b: &OperatorRef) -> CircuitResult<OperatorRef> {
    tensor([a.clone(), b.clone()])
}

/// Weighted sum of observables, recorded as the owner of each term.
pub fn hamiltonian(coeffs: Vec<f64>, ops: Vec<OperatorRef>) -> CircuitResult<OperatorRef> {
    let h = OperatorRef::new(Hamiltonian::new(coeffs, ops.clone())?);
    queue_owning(&h, &ops)?;
    Ok(h)
}
