use num_complex::Complex64;

const SNAP_TOLERANCE: f64 = 1e-10;

/// Kronecker product of two eigenvalue spectra, the spectrum of a tensor product of observables.
///
/// # Example
/// ```
/// use qtape::utils::kron_eigvals;
///
/// let z = [1.0, -1.0];
/// assert_eq!(kron_eigvals(&z, &z), vec![1.0, -1.0, -1.0, 1.0]);
/// ```
pub fn kron_eigvals(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter()
        .flat_map(|x| b.iter().map(move |y| x * y))
        .collect()
}

/// Number of computational basis states of `n_wires` qubits, or `None` when it overflows a
/// `usize`.
pub fn basis_dim(n_wires: usize) -> Option<usize> {
    u32::try_from(n_wires)
        .ok()
        .and_then(|n| 1usize.checked_shl(n))
}

/// Format a float so that values equal up to `period` (and up to rounding noise) print the
/// same way. Negative zero is normalized.
///
/// # Example
/// ```
/// use qtape::utils::canonical_float;
/// use std::f64::consts::PI;
///
/// assert_eq!(canonical_float(-PI, Some(2.0 * PI)), canonical_float(PI, Some(2.0 * PI)));
/// assert_eq!(canonical_float(-0.0, None), "0.000000000000");
/// ```
pub fn canonical_float(x: f64, period: Option<f64>) -> String {
    let mut v = match period {
        Some(p) if p > 0.0 => x.rem_euclid(p),
        _ => x,
    };
    if let Some(p) = period {
        if (p - v).abs() < SNAP_TOLERANCE {
            v = 0.0;
        }
    }
    if v.abs() < SNAP_TOLERANCE {
        v = 0.0;
    }
    // Adding positive zero turns -0.0 into 0.0.
    format!("{:.12}", v + 0.0)
}

/// Canonical text for a complex entry, see [`canonical_float`].
pub fn canonical_complex(c: &Complex64) -> String {
    format!(
        "({},{})",
        canonical_float(c.re, None),
        canonical_float(c.im, None)
    )
}
