use std::fmt::{self, Display, Formatter};
use std::rc::Rc;

use nalgebra::DMatrix;
use num_complex::Complex64;
use smallvec::SmallVec;

use crate::errors::{CircuitError, CircuitResult};
use crate::utils::{canonical_complex, canonical_float};

/// A label addressing a single subsystem. Wires need not be numeric.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Wire {
    /// An integer wire label.
    Index(i64),
    /// A string wire label.
    Label(String),
}

impl From<i32> for Wire {
    fn from(i: i32) -> Self {
        Self::Index(i64::from(i))
    }
}

impl From<i64> for Wire {
    fn from(i: i64) -> Self {
        Self::Index(i)
    }
}

impl From<u32> for Wire {
    fn from(i: u32) -> Self {
        Self::Index(i64::from(i))
    }
}

impl From<usize> for Wire {
    fn from(i: usize) -> Self {
        Self::Index(i as i64)
    }
}

impl From<&str> for Wire {
    fn from(s: &str) -> Self {
        Self::Label(s.to_string())
    }
}

impl From<String> for Wire {
    fn from(s: String) -> Self {
        Self::Label(s)
    }
}

impl Display for Wire {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "{}", i),
            Self::Label(s) => write!(f, "'{}'", s),
        }
    }
}

/// An ordered collection of distinct wires.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Wires(SmallVec<[Wire; 2]>);

impl Wires {
    /// Construct wires from labels, failing on duplicates.
    pub fn new<It, W>(wires: It) -> CircuitResult<Self>
    where
        It: IntoIterator<Item = W>,
        W: Into<Wire>,
    {
        let mut out = SmallVec::<[Wire; 2]>::new();
        for w in wires {
            let w = w.into();
            if out.contains(&w) {
                return Err(CircuitError::Wires(format!(
                    "Wires must be unique; got duplicate wire {}.",
                    w
                )));
            }
            out.push(w);
        }
        Ok(Self(out))
    }

    /// No wires.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A single wire.
    pub fn single<W: Into<Wire>>(w: W) -> Self {
        let mut out = SmallVec::new();
        out.push(w.into());
        Self(out)
    }

    /// Ordered union of several wire collections, keeping first-seen order.
    pub fn all_wires<'a, It>(wires: It) -> Self
    where
        It: IntoIterator<Item = &'a Wires>,
    {
        let mut out = SmallVec::<[Wire; 2]>::new();
        wires.into_iter().flat_map(|ws| ws.iter()).for_each(|w| {
            if !out.contains(w) {
                out.push(w.clone())
            }
        });
        Self(out)
    }

    /// Number of wires.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if there are no wires.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the wires in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Wire> {
        self.0.iter()
    }

    /// The wires as a slice.
    pub fn labels(&self) -> &[Wire] {
        self.0.as_slice()
    }

    /// True if `w` is one of these wires.
    pub fn contains(&self, w: &Wire) -> bool {
        self.0.contains(w)
    }

    /// True if no wire is shared with `other`.
    pub fn is_disjoint(&self, other: &Wires) -> bool {
        self.iter().all(|w| !other.contains(w))
    }

    /// Wires present in both, in the order of `self`.
    pub fn shared_wires(&self, other: &Wires) -> Wires {
        Self(self.iter().filter(|w| other.contains(w)).cloned().collect())
    }
}

impl From<Wire> for Wires {
    fn from(w: Wire) -> Self {
        Self::single(w)
    }
}

impl From<i32> for Wires {
    fn from(i: i32) -> Self {
        Self::single(i)
    }
}

impl From<usize> for Wires {
    fn from(i: usize) -> Self {
        Self::single(i)
    }
}

impl From<&str> for Wires {
    fn from(s: &str) -> Self {
        Self::single(s)
    }
}

impl<'a> IntoIterator for &'a Wires {
    type Item = &'a Wire;
    type IntoIter = std::slice::Iter<'a, Wire>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Display for Wires {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, w) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", w)?;
        }
        write!(f, "]")
    }
}

/// Build [`Wires`] from a mix of integer and string labels.
///
/// # Example
/// ```
/// use qtape::wires;
///
/// let ws = wires![0, "a", 4].unwrap();
/// assert_eq!(ws.to_string(), "[0, 'a', 4]");
/// assert!(wires![1, 1].is_err());
/// ```
#[macro_export]
macro_rules! wires {
    ($($w:expr),* $(,)?) => {
        $crate::types::Wires::new([$($crate::types::Wire::from($w)),*])
    };
}

/// A single parameter slot of an operator.
///
/// Array values are reference counted, cloning a `Param` shares its storage with the
/// original. Use [`Param::deep_clone`] to break the aliasing.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    /// A real scalar such as a rotation angle.
    Scalar(f64),
    /// A complex matrix or column vector.
    Array(Rc<DMatrix<Complex64>>),
}

impl Param {
    /// Wrap a complex matrix.
    pub fn array(m: DMatrix<Complex64>) -> Self {
        Self::Array(Rc::new(m))
    }

    /// A real column vector.
    pub fn real_vector<It>(values: It) -> Self
    where
        It: IntoIterator<Item = f64>,
    {
        let values = values
            .into_iter()
            .map(|v| Complex64::new(v, 0.0))
            .collect::<Vec<_>>();
        Self::array(DMatrix::from_vec(values.len(), 1, values))
    }

    /// A real matrix given in row-major order.
    pub fn real_matrix(rows: usize, cols: usize, values: &[f64]) -> Self {
        Self::array(DMatrix::from_row_iterator(
            rows,
            cols,
            values.iter().map(|v| Complex64::new(*v, 0.0)),
        ))
    }

    /// The scalar value, if this is a scalar.
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Self::Scalar(x) => Some(*x),
            Self::Array(_) => None,
        }
    }

    /// The array value, if this is an array.
    pub fn as_array(&self) -> Option<&DMatrix<Complex64>> {
        match self {
            Self::Scalar(_) => None,
            Self::Array(a) => Some(a.as_ref()),
        }
    }

    /// True if both are arrays backed by the same storage.
    pub fn shares_storage(&self, other: &Param) -> bool {
        match (self, other) {
            (Self::Array(a), Self::Array(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// A copy which owns independent array storage.
    pub fn deep_clone(&self) -> Self {
        match self {
            Self::Scalar(x) => Self::Scalar(*x),
            Self::Array(a) => Self::Array(Rc::new(a.as_ref().clone())),
        }
    }

    /// Negated copy.
    pub fn negated(&self) -> Self {
        match self {
            Self::Scalar(x) => Self::Scalar(-x),
            Self::Array(a) => Self::Array(Rc::new(-a.as_ref().clone())),
        }
    }

    /// Stable text form used for fingerprints. Scalars are reduced modulo `period` if given.
    pub(crate) fn canonical(&self, period: Option<f64>) -> String {
        match self {
            Self::Scalar(x) => canonical_float(*x, period),
            Self::Array(a) => {
                let entries = a.iter().map(canonical_complex).collect::<Vec<_>>();
                format!("{}x{}[{}]", a.nrows(), a.ncols(), entries.join(","))
            }
        }
    }
}

impl From<f64> for Param {
    fn from(x: f64) -> Self {
        Self::Scalar(x)
    }
}

impl Display for Param {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(x) => write!(f, "{}", x),
            Self::Array(a) => {
                write!(f, "[")?;
                for r in 0..a.nrows() {
                    if r > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "[")?;
                    for c in 0..a.ncols() {
                        if c > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{}", a[(r, c)])?;
                    }
                    write!(f, "]")?;
                }
                write!(f, "]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wires_union_order() -> CircuitResult<()> {
        let a = wires![0, "a"]?;
        let b = wires!["a", 4, 0]?;
        let all = Wires::all_wires([&a, &b]);
        assert_eq!(all, wires![0, "a", 4]?);
        assert_eq!(a.shared_wires(&b), a);
        assert!(!a.is_disjoint(&b));
        Ok(())
    }

    #[test]
    fn test_duplicate_wires() {
        assert!(Wires::new([0, 1, 0]).is_err());
    }

    #[test]
    fn test_param_aliasing() {
        let p = Param::real_vector([1.0, 0.0]);
        let shared = p.clone();
        let owned = p.deep_clone();
        assert!(p.shares_storage(&shared));
        assert!(!p.shares_storage(&owned));
        assert_eq!(p, owned);
    }

    #[test]
    fn test_canonical_periodic() {
        let period = 2.0 * std::f64::consts::PI;
        let a = Param::Scalar(std::f64::consts::FRAC_PI_2);
        let b = Param::Scalar(std::f64::consts::FRAC_PI_2 - period);
        assert_eq!(a.canonical(Some(period)), b.canonical(Some(period)));
        assert_ne!(a.canonical(None), b.canonical(None));
    }
}
