//! A reference set of gates and single-operator observables.
//!
//! The free functions construct an operator and record it on the active tape, if any. Use
//! [`Gate::new`] with [`OperatorRef::new`] to build one without recording it.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use nalgebra::{DMatrix, SymmetricEigen};
use num_complex::Complex64;
use num_traits::{One, Zero};

use crate::errors::{CircuitError, CircuitResult};
use crate::operation::{Operator, OperatorRef, Pauli, QueueCategory};
use crate::types::{Param, Wire, Wires};
use crate::utils::basis_dim;

const HERMITIAN_TOLERANCE: f64 = 1e-8;

/// The gates known to this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum GateKind {
    Identity,
    PauliX,
    PauliY,
    PauliZ,
    Hadamard,
    S,
    CNOT,
    RX,
    RY,
    RZ,
    PhaseShift,
    Rot,
    CRX,
    CRY,
    CRZ,
    QubitUnitary,
    Hermitian,
    BasisState,
    QubitStateVector,
}

impl GateKind {
    /// The gate's name as it appears on a tape.
    pub fn name(&self) -> &'static str {
        match self {
            GateKind::Identity => "Identity",
            GateKind::PauliX => "PauliX",
            GateKind::PauliY => "PauliY",
            GateKind::PauliZ => "PauliZ",
            GateKind::Hadamard => "Hadamard",
            GateKind::S => "S",
            GateKind::CNOT => "CNOT",
            GateKind::RX => "RX",
            GateKind::RY => "RY",
            GateKind::RZ => "RZ",
            GateKind::PhaseShift => "PhaseShift",
            GateKind::Rot => "Rot",
            GateKind::CRX => "CRX",
            GateKind::CRY => "CRY",
            GateKind::CRZ => "CRZ",
            GateKind::QubitUnitary => "QubitUnitary",
            GateKind::Hermitian => "Hermitian",
            GateKind::BasisState => "BasisState",
            GateKind::QubitStateVector => "QubitStateVector",
        }
    }

    /// Number of parameters the gate takes.
    pub fn num_params(&self) -> usize {
        match self {
            GateKind::Identity
            | GateKind::PauliX
            | GateKind::PauliY
            | GateKind::PauliZ
            | GateKind::Hadamard
            | GateKind::S
            | GateKind::CNOT => 0,
            GateKind::Rot => 3,
            _ => 1,
        }
    }

    /// Number of wires the gate acts on, `None` if any number is allowed.
    pub fn num_wires(&self) -> Option<usize> {
        match self {
            GateKind::CNOT | GateKind::CRX | GateKind::CRY | GateKind::CRZ => Some(2),
            GateKind::QubitUnitary
            | GateKind::Hermitian
            | GateKind::BasisState
            | GateKind::QubitStateVector => None,
            _ => Some(1),
        }
    }

    fn takes_array(&self) -> bool {
        matches!(
            self,
            GateKind::QubitUnitary
                | GateKind::Hermitian
                | GateKind::BasisState
                | GateKind::QubitStateVector
        )
    }

    fn is_observable(&self) -> bool {
        matches!(
            self,
            GateKind::Identity
                | GateKind::PauliX
                | GateKind::PauliY
                | GateKind::PauliZ
                | GateKind::Hadamard
                | GateKind::Hermitian
        )
    }
}

/// A gate from the reference set.
#[derive(Debug, Clone)]
pub struct Gate {
    kind: GateKind,
    wires: Wires,
    data: Vec<Param>,
    inverse: bool,
}

impl Gate {
    /// Construct a gate, checking parameter and wire counts.
    pub fn new(kind: GateKind, wires: Wires, data: Vec<Param>) -> CircuitResult<Self> {
        if data.len() != kind.num_params() {
            return Err(CircuitError::new(format!(
                "{}: wrong number of parameters. {} parameters passed, {} expected.",
                kind.name(),
                data.len(),
                kind.num_params()
            )));
        }
        match kind.num_wires() {
            Some(n) if n != wires.len() => {
                return Err(CircuitError::Wires(format!(
                    "{}: wrong number of wires. {} wires given, {} expected.",
                    kind.name(),
                    wires.len(),
                    n
                )))
            }
            None if wires.is_empty() => {
                return Err(CircuitError::Wires(format!(
                    "{}: must act on at least one wire.",
                    kind.name()
                )))
            }
            _ => {}
        }
        data.iter()
            .try_for_each(|p| check_param(kind, wires.len(), p))?;
        Ok(Self {
            kind,
            wires,
            data,
            inverse: false,
        })
    }

    /// The kind of gate.
    pub fn kind(&self) -> GateKind {
        self.kind
    }

    fn angle(&self, idx: usize) -> CircuitResult<f64> {
        self.data
            .get(idx)
            .and_then(Param::as_scalar)
            .ok_or_else(|| {
                CircuitError::new(format!("{}: parameter {} is not a scalar.", self.kind.name(), idx))
            })
    }

    fn matrix(&self) -> CircuitResult<&DMatrix<Complex64>> {
        self.data
            .first()
            .and_then(Param::as_array)
            .ok_or_else(|| CircuitError::new(format!("{}: missing array parameter.", self.kind.name())))
    }

    fn wire(&self, idx: usize) -> Wire {
        self.wires.labels()[idx].clone()
    }

    fn hermitian_eigen(&self) -> CircuitResult<(Vec<f64>, DMatrix<Complex64>)> {
        let m = self.matrix()?;
        let eigen = SymmetricEigen::new(m.clone());
        let mut order = (0..eigen.eigenvalues.len()).collect::<Vec<_>>();
        order.sort_by(|a, b| eigen.eigenvalues[*a].total_cmp(&eigen.eigenvalues[*b]));
        let eigvals = order.iter().map(|i| eigen.eigenvalues[*i]).collect();
        let columns = order
            .iter()
            .map(|i| eigen.eigenvectors.column(*i).into_owned())
            .collect::<Vec<_>>();
        Ok((eigvals, DMatrix::from_columns(&columns)))
    }
}

fn check_param(kind: GateKind, n_wires: usize, p: &Param) -> CircuitResult<()> {
    match (kind.takes_array(), p) {
        (false, Param::Scalar(_)) => Ok(()),
        (false, Param::Array(_)) => Err(CircuitError::new(format!(
            "{}: expected a scalar parameter.",
            kind.name()
        ))),
        (true, Param::Scalar(_)) => Err(CircuitError::new(format!(
            "{}: expected an array parameter.",
            kind.name()
        ))),
        (true, Param::Array(a)) => {
            let dim = basis_dim(n_wires).ok_or_else(|| {
                CircuitError::Wires(format!(
                    "{}: {} wires is too wide to represent.",
                    kind.name(),
                    n_wires
                ))
            })?;
            match kind {
                GateKind::QubitUnitary | GateKind::Hermitian => {
                    if a.nrows() != dim || a.ncols() != dim {
                        return Err(CircuitError::new(format!(
                            "{}: matrix must be of shape ({}, {}), got ({}, {}).",
                            kind.name(),
                            dim,
                            dim,
                            a.nrows(),
                            a.ncols()
                        )));
                    }
                    if kind == GateKind::Hermitian
                        && (a.as_ref() - a.adjoint()).camax() > HERMITIAN_TOLERANCE
                    {
                        return Err(CircuitError::new("Observable must be Hermitian."));
                    }
                    Ok(())
                }
                GateKind::BasisState => {
                    if a.len() != n_wires {
                        return Err(CircuitError::new(format!(
                            "BasisState parameter must be of length {}, got {}.",
                            n_wires,
                            a.len()
                        )));
                    }
                    if a.iter().any(|c| *c != Complex64::zero() && *c != Complex64::one()) {
                        return Err(CircuitError::new(
                            "BasisState parameter must consist of 0 or 1 integers.",
                        ));
                    }
                    Ok(())
                }
                _ => {
                    if a.len() != dim {
                        return Err(CircuitError::new(format!(
                            "State vector must be of length {}, got {}.",
                            dim,
                            a.len()
                        )));
                    }
                    Ok(())
                }
            }
        }
    }
}

fn make(kind: GateKind, wires: Wires, data: Vec<Param>) -> CircuitResult<OperatorRef> {
    Ok(OperatorRef::new(Gate::new(kind, wires, data)?))
}

fn make_single(kind: GateKind, wire: Wire, data: Vec<f64>) -> CircuitResult<OperatorRef> {
    make(
        kind,
        Wires::single(wire),
        data.into_iter().map(Param::Scalar).collect(),
    )
}

impl Operator for Gate {
    fn base_name(&self) -> String {
        self.kind.name().to_string()
    }

    fn wires(&self) -> Wires {
        self.wires.clone()
    }

    fn data(&self) -> Vec<Param> {
        self.data.clone()
    }

    fn num_params(&self) -> usize {
        self.data.len()
    }

    fn set_parameter(&mut self, idx: usize, value: Param) -> CircuitResult<()> {
        if idx >= self.data.len() {
            return Err(CircuitError::new(format!(
                "{} has {} parameters, cannot set parameter {}.",
                self.kind.name(),
                self.data.len(),
                idx
            )));
        }
        check_param(self.kind, self.wires.len(), &value)?;
        self.data[idx] = value;
        Ok(())
    }

    fn inverse(&self) -> bool {
        self.inverse
    }

    fn set_inverse(&mut self, inverse: bool) {
        self.inverse = inverse
    }

    fn queue_category(&self) -> Option<QueueCategory> {
        match self.kind {
            GateKind::Hermitian => None,
            GateKind::BasisState | GateKind::QubitStateVector => Some(QueueCategory::StatePrep),
            _ => Some(QueueCategory::Operation),
        }
    }

    fn is_observable(&self) -> bool {
        self.kind.is_observable()
    }

    fn decomposition(&self) -> CircuitResult<Vec<OperatorRef>> {
        let w = || self.wire(0);
        let ops = match self.kind {
            GateKind::PauliX => vec![
                make_single(GateKind::PhaseShift, w(), vec![FRAC_PI_2])?,
                make_single(GateKind::RX, w(), vec![PI])?,
                make_single(GateKind::PhaseShift, w(), vec![FRAC_PI_2])?,
            ],
            GateKind::PauliY => vec![
                make_single(GateKind::PhaseShift, w(), vec![FRAC_PI_2])?,
                make_single(GateKind::RY, w(), vec![PI])?,
                make_single(GateKind::PhaseShift, w(), vec![FRAC_PI_2])?,
            ],
            GateKind::PauliZ => vec![make_single(GateKind::PhaseShift, w(), vec![PI])?],
            GateKind::Hadamard => vec![
                make_single(GateKind::PhaseShift, w(), vec![FRAC_PI_2])?,
                make_single(GateKind::RX, w(), vec![FRAC_PI_2])?,
                make_single(GateKind::PhaseShift, w(), vec![FRAC_PI_2])?,
            ],
            GateKind::S => vec![make_single(GateKind::PhaseShift, w(), vec![FRAC_PI_2])?],
            GateKind::PhaseShift => vec![make_single(GateKind::RZ, w(), vec![self.angle(0)?])?],
            GateKind::Rot => vec![
                make_single(GateKind::RZ, w(), vec![self.angle(0)?])?,
                make_single(GateKind::RY, w(), vec![self.angle(1)?])?,
                make_single(GateKind::RZ, w(), vec![self.angle(2)?])?,
            ],
            GateKind::CRZ => {
                let phi = self.angle(0)?;
                let t = self.wire(1);
                vec![
                    make_single(GateKind::PhaseShift, t.clone(), vec![phi / 2.0])?,
                    make(GateKind::CNOT, self.wires.clone(), vec![])?,
                    make_single(GateKind::PhaseShift, t, vec![-phi / 2.0])?,
                    make(GateKind::CNOT, self.wires.clone(), vec![])?,
                ]
            }
            GateKind::CRX => {
                let phi = self.angle(0)?;
                let t = self.wire(1);
                vec![
                    make_single(GateKind::RZ, t.clone(), vec![FRAC_PI_2])?,
                    make_single(GateKind::RY, t.clone(), vec![phi / 2.0])?,
                    make(GateKind::CNOT, self.wires.clone(), vec![])?,
                    make_single(GateKind::RY, t.clone(), vec![-phi / 2.0])?,
                    make(GateKind::CNOT, self.wires.clone(), vec![])?,
                    make_single(GateKind::RZ, t, vec![-FRAC_PI_2])?,
                ]
            }
            GateKind::CRY => {
                let phi = self.angle(0)?;
                let t = self.wire(1);
                vec![
                    make_single(GateKind::RY, t.clone(), vec![phi / 2.0])?,
                    make(GateKind::CNOT, self.wires.clone(), vec![])?,
                    make_single(GateKind::RY, t, vec![-phi / 2.0])?,
                    make(GateKind::CNOT, self.wires.clone(), vec![])?,
                ]
            }
            GateKind::BasisState => {
                let bits = self.matrix()?;
                self.wires
                    .iter()
                    .zip(bits.iter())
                    .filter(|(_, b)| b.re != 0.0)
                    .map(|(w, _)| make(GateKind::PauliX, Wires::single(w.clone()), vec![]))
                    .collect::<CircuitResult<Vec<_>>>()?
            }
            _ => return Err(CircuitError::DecompositionUndefined(self.name())),
        };
        Ok(ops)
    }

    fn diagonalizing_gates(&self) -> CircuitResult<Vec<OperatorRef>> {
        let w = || self.wire(0);
        match self.kind {
            GateKind::PauliX => Ok(vec![make(GateKind::Hadamard, Wires::single(w()), vec![])?]),
            GateKind::PauliY => Ok(vec![
                make(GateKind::PauliZ, Wires::single(w()), vec![])?,
                make(GateKind::S, Wires::single(w()), vec![])?,
                make(GateKind::Hadamard, Wires::single(w()), vec![])?,
            ]),
            GateKind::PauliZ | GateKind::Identity => Ok(vec![]),
            GateKind::Hadamard => Ok(vec![make_single(GateKind::RY, w(), vec![-FRAC_PI_4])?]),
            GateKind::Hermitian => {
                let (_, u) = self.hermitian_eigen()?;
                Ok(vec![make(
                    GateKind::QubitUnitary,
                    self.wires.clone(),
                    vec![Param::array(u.adjoint())],
                )?])
            }
            _ => Err(CircuitError::DiagonalizingGatesUndefined(self.name())),
        }
    }

    fn eigvals(&self) -> CircuitResult<Vec<f64>> {
        match self.kind {
            GateKind::PauliX | GateKind::PauliY | GateKind::PauliZ | GateKind::Hadamard => {
                Ok(vec![1.0, -1.0])
            }
            GateKind::Identity => Ok(vec![1.0, 1.0]),
            GateKind::Hermitian => Ok(self.hermitian_eigen()?.0),
            _ => Err(CircuitError::EigvalsUndefined(self.name())),
        }
    }

    fn generator(&self) -> Option<(OperatorRef, f64)> {
        let single = |kind| make(kind, Wires::single(self.wire(0)), vec![]).ok();
        let controlled = |kind: GateKind| {
            let target = match kind {
                GateKind::PauliX => [0.0, 1.0, 1.0, 0.0],
                GateKind::PauliY => [0.0, 0.0, 0.0, 0.0],
                _ => [1.0, 0.0, 0.0, -1.0],
            };
            let mut m = DMatrix::<Complex64>::zeros(4, 4);
            for r in 0..2 {
                for c in 0..2 {
                    m[(2 + r, 2 + c)] = Complex64::new(target[2 * r + c], 0.0);
                }
            }
            if kind == GateKind::PauliY {
                m[(2, 3)] = Complex64::new(0.0, -1.0);
                m[(3, 2)] = Complex64::new(0.0, 1.0);
            }
            make(GateKind::Hermitian, self.wires.clone(), vec![Param::array(m)]).ok()
        };
        match self.kind {
            GateKind::RX => single(GateKind::PauliX).map(|g| (g, -0.5)),
            GateKind::RY => single(GateKind::PauliY).map(|g| (g, -0.5)),
            GateKind::RZ => single(GateKind::PauliZ).map(|g| (g, -0.5)),
            GateKind::PhaseShift => make(
                GateKind::Hermitian,
                Wires::single(self.wire(0)),
                vec![Param::real_matrix(2, 2, &[0.0, 0.0, 0.0, 1.0])],
            )
            .ok()
            .map(|g| (g, 1.0)),
            GateKind::CRX => controlled(GateKind::PauliX).map(|g| (g, -0.5)),
            GateKind::CRY => controlled(GateKind::PauliY).map(|g| (g, -0.5)),
            GateKind::CRZ => controlled(GateKind::PauliZ).map(|g| (g, -0.5)),
            _ => None,
        }
    }

    fn parameter_period(&self) -> Option<f64> {
        match self.kind {
            GateKind::RX | GateKind::RY | GateKind::RZ | GateKind::PhaseShift | GateKind::Rot => {
                Some(2.0 * PI)
            }
            GateKind::CRX | GateKind::CRY | GateKind::CRZ => Some(4.0 * PI),
            _ => None,
        }
    }

    fn pauli_word(&self) -> Option<Vec<(Wire, Pauli)>> {
        match self.kind {
            GateKind::Identity => Some(vec![]),
            GateKind::PauliX => Some(vec![(self.wire(0), Pauli::X)]),
            GateKind::PauliY => Some(vec![(self.wire(0), Pauli::Y)]),
            GateKind::PauliZ => Some(vec![(self.wire(0), Pauli::Z)]),
            _ => None,
        }
    }

    fn clone_operator(&self) -> OperatorRef {
        OperatorRef::new(self.clone())
    }
}

fn queued(kind: GateKind, wires: Wires, data: Vec<Param>) -> CircuitResult<OperatorRef> {
    make(kind, wires, data)?.queue()
}

/// The identity observable.
pub fn identity<W: Into<Wire>>(wire: W) -> CircuitResult<OperatorRef> {
    queued(GateKind::Identity, Wires::single(wire), vec![])
}

/// Pauli X gate and observable.
pub fn pauli_x<W: Into<Wire>>(wire: W) -> CircuitResult<OperatorRef> {
    queued(GateKind::PauliX, Wires::single(wire), vec![])
}

/// Pauli Y gate and observable.
pub fn pauli_y<W: Into<Wire>>(wire: W) -> CircuitResult<OperatorRef> {
    queued(GateKind::PauliY, Wires::single(wire), vec![])
}

/// Pauli Z gate and observable.
pub fn pauli_z<W: Into<Wire>>(wire: W) -> CircuitResult<OperatorRef> {
    queued(GateKind::PauliZ, Wires::single(wire), vec![])
}

/// Hadamard gate and observable.
pub fn hadamard<W: Into<Wire>>(wire: W) -> CircuitResult<OperatorRef> {
    queued(GateKind::Hadamard, Wires::single(wire), vec![])
}

/// The S (sqrt Z) gate.
pub fn s<W: Into<Wire>>(wire: W) -> CircuitResult<OperatorRef> {
    queued(GateKind::S, Wires::single(wire), vec![])
}

/// Controlled not.
pub fn cnot<C: Into<Wire>, T: Into<Wire>>(control: C, target: T) -> CircuitResult<OperatorRef> {
    queued(GateKind::CNOT, Wires::new([control.into(), target.into()])?, vec![])
}

/// Rotation about X.
pub fn rx<W: Into<Wire>>(theta: f64, wire: W) -> CircuitResult<OperatorRef> {
    queued(GateKind::RX, Wires::single(wire), vec![theta.into()])
}

/// Rotation about Y.
pub fn ry<W: Into<Wire>>(theta: f64, wire: W) -> CircuitResult<OperatorRef> {
    queued(GateKind::RY, Wires::single(wire), vec![theta.into()])
}

/// Rotation about Z.
pub fn rz<W: Into<Wire>>(theta: f64, wire: W) -> CircuitResult<OperatorRef> {
    queued(GateKind::RZ, Wires::single(wire), vec![theta.into()])
}

/// Phase shift of the one state.
pub fn phase_shift<W: Into<Wire>>(phi: f64, wire: W) -> CircuitResult<OperatorRef> {
    queued(GateKind::PhaseShift, Wires::single(wire), vec![phi.into()])
}

/// Arbitrary single qubit rotation `RZ(omega) RY(theta) RZ(phi)`.
pub fn rot<W: Into<Wire>>(phi: f64, theta: f64, omega: f64, wire: W) -> CircuitResult<OperatorRef> {
    queued(
        GateKind::Rot,
        Wires::single(wire),
        vec![phi.into(), theta.into(), omega.into()],
    )
}

/// Controlled X rotation.
pub fn crx<C: Into<Wire>, T: Into<Wire>>(phi: f64, control: C, target: T) -> CircuitResult<OperatorRef> {
    queued(
        GateKind::CRX,
        Wires::new([control.into(), target.into()])?,
        vec![phi.into()],
    )
}

/// Controlled Y rotation.
pub fn cry<C: Into<Wire>, T: Into<Wire>>(phi: f64, control: C, target: T) -> CircuitResult<OperatorRef> {
    queued(
        GateKind::CRY,
        Wires::new([control.into(), target.into()])?,
        vec![phi.into()],
    )
}

/// Controlled Z rotation.
pub fn crz<C: Into<Wire>, T: Into<Wire>>(phi: f64, control: C, target: T) -> CircuitResult<OperatorRef> {
    queued(
        GateKind::CRZ,
        Wires::new([control.into(), target.into()])?,
        vec![phi.into()],
    )
}

/// An arbitrary unitary given as a matrix.
pub fn qubit_unitary(u: Param, wires: Wires) -> CircuitResult<OperatorRef> {
    queued(GateKind::QubitUnitary, wires, vec![u])
}

/// An observable given as a Hermitian matrix.
pub fn hermitian(m: Param, wires: Wires) -> CircuitResult<OperatorRef> {
    queued(GateKind::Hermitian, wires, vec![m])
}

/// Prepare a computational basis state, one bit per wire.
pub fn basis_state(bits: &[u8], wires: Wires) -> CircuitResult<OperatorRef> {
    queued(
        GateKind::BasisState,
        wires,
        vec![Param::real_vector(bits.iter().map(|b| f64::from(*b)))],
    )
}

/// Prepare an arbitrary state vector.
pub fn qubit_state_vector(state: Param, wires: Wires) -> CircuitResult<OperatorRef> {
    queued(GateKind::QubitStateVector, wires, vec![state])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hermitian_eigvals() -> CircuitResult<()> {
        let h = hermitian(Param::real_matrix(2, 2, &[1.0, 2.0, 2.0, 4.0]), Wires::single("a"))?;
        let eigvals = h.eigvals()?;
        assert!(eigvals[0].abs() < 1e-10);
        assert!((eigvals[1] - 5.0).abs() < 1e-10);
        let diag = h.diagonalizing_gates()?;
        assert_eq!(diag.len(), 1);
        assert_eq!(diag[0].name(), "QubitUnitary");
        assert_eq!(diag[0].wires(), Wires::single("a"));
        Ok(())
    }

    #[test]
    fn test_non_hermitian_rejected() {
        let m = Param::real_matrix(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        assert!(hermitian(m, Wires::single(0)).is_err());
    }

    #[test]
    fn test_parameter_count_checked() {
        assert!(Gate::new(GateKind::Rot, Wires::single(0), vec![Param::from(0.1)]).is_err());
        assert!(Gate::new(GateKind::CNOT, Wires::single(0), vec![]).is_err());
        assert!(Gate::new(GateKind::RX, Wires::single(0), vec![Param::real_vector([1.0])]).is_err());
    }

    #[test]
    fn test_rot_decomposition() -> CircuitResult<()> {
        let ops = rot(0.1, 0.2, 0.3, 0)?.decomposition()?;
        let names = ops.iter().map(OperatorRef::name).collect::<Vec<_>>();
        assert_eq!(names, vec!["RZ", "RY", "RZ"]);
        assert_eq!(ops[1].data(), vec![Param::from(0.2)]);
        Ok(())
    }

    #[test]
    fn test_basis_state_decomposition() -> CircuitResult<()> {
        let ops = basis_state(&[1, 0, 1], Wires::new([0, 1, 2])?)?.decomposition()?;
        let wires = ops.iter().map(OperatorRef::wires).collect::<Vec<_>>();
        assert_eq!(wires, vec![Wires::single(0), Wires::single(2)]);
        assert!(ops.iter().all(|o| o.name() == "PauliX"));
        Ok(())
    }

    #[test]
    fn test_basis_state_bits_checked() -> CircuitResult<()> {
        assert!(basis_state(&[2], Wires::single(0)).is_err());
        assert!(basis_state(&[1], Wires::new([0, 1])?).is_err());
        Ok(())
    }

    #[test]
    fn test_crx_decomposition_wires() -> CircuitResult<()> {
        let ops = crx(0.4, 0, 1)?.decomposition()?;
        assert_eq!(ops.len(), 6);
        assert_eq!(ops[1].data(), vec![Param::from(0.2)]);
        assert_eq!(ops[2].wires(), Wires::new([0, 1])?);
        assert_eq!(ops[3].wires(), Wires::single(1));
        Ok(())
    }

    #[test]
    fn test_categories() -> CircuitResult<()> {
        assert_eq!(
            basis_state(&[1], Wires::single(0))?.queue_category(),
            Some(QueueCategory::StatePrep)
        );
        assert_eq!(
            hermitian(Param::real_matrix(2, 2, &[1.0, 0.0, 0.0, 1.0]), Wires::single(0))?
                .queue_category(),
            None
        );
        assert_eq!(pauli_z(0)?.queue_category(), Some(QueueCategory::Operation));
        assert!(pauli_z(0)?.is_observable());
        assert!(!rx(0.1, 0)?.is_observable());
        Ok(())
    }

    #[test]
    fn test_periods_and_generators() -> CircuitResult<()> {
        assert_eq!(rx(0.1, 0)?.parameter_period(), Some(2.0 * PI));
        assert_eq!(crz(0.1, 0, 1)?.parameter_period(), Some(4.0 * PI));
        assert_eq!(cnot(0, 1)?.parameter_period(), None);
        let (g, coeff) = ry(0.3, 2)?.generator().ok_or_else(|| CircuitError::new("none"))?;
        assert_eq!(g.name(), "PauliY");
        assert_eq!(coeff, -0.5);
        let (g, _) = crx(0.3, 0, 1)?.generator().ok_or_else(|| CircuitError::new("none"))?;
        assert_eq!(g.eigvals()?.len(), 4);
        Ok(())
    }
}
