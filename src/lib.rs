#![forbid(unsafe_code)]
#![deny(
    unreachable_pub,
    missing_debug_implementations,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces,
    unused_qualifications,
    missing_docs
)]

//! Recording quantum circuits onto tapes.
//!
//! Operators and measurements constructed while a [`QuantumTape`](tape::QuantumTape) is
//! recording are appended to it. Once recording ends the tape sorts its contents into state
//! preparations, operations and measurements, and indexes every parameter so a backend or a
//! gradient transform can read and rewrite them in a fixed order.
//!
//! # Example
//! Record a small circuit, then restrict and update the trainable parameters.
//! ```
//! use qtape::prelude::*;
//!
//! # fn main() -> CircuitResult<()> {
//! let tape = QuantumTape::new();
//! tape.record(|| {
//!     rx(0.432, 0)?;
//!     rot(0.543, 0.2, 0.1, 0)?;
//!     cnot(0, "a")?;
//!     expval(&compose(&pauli_z(0)?, &hadamard("a")?)?)?;
//!     Ok(())
//! })?;
//!
//! assert_eq!(tape.operations().len(), 3);
//! assert_eq!(tape.measurements().len(), 1);
//! assert_eq!(tape.num_params(), 4);
//!
//! tape.set_trainable_params([0, 2])?;
//! tape.set_parameters([1.0, 2.0], true)?;
//! assert_eq!(
//!     tape.get_parameters(false),
//!     vec![Param::from(1.0), Param::from(0.543), Param::from(2.0), Param::from(0.1)]
//! );
//! # Ok(())
//! # }
//! ```
//!
//! # Expansion
//! Operators which define a decomposition can be rewritten in terms of simpler operators.
//! ```
//! use qtape::prelude::*;
//!
//! # fn main() -> CircuitResult<()> {
//! let tape = QuantumTape::build(|| {
//!     rot(0.1, 0.2, 0.3, 0)?.inv();
//!     probs(Some(Wires::single(0)), None)?;
//!     Ok(())
//! })?;
//! let expanded = tape.expand()?;
//! let names = expanded.operations().iter().map(QueueItem::name).collect::<Vec<_>>();
//! assert_eq!(names, vec!["RZ.inv", "RY.inv", "RZ.inv"]);
//! # Ok(())
//! # }
//! ```

/// Circuit error types.
pub mod errors;
/// Rewriting a tape into simpler operations.
pub mod expand;
pub mod gates;
/// Wire-dependency structure of a tape.
pub mod graph;
/// Measurement processes and the constructors which record them.
pub mod measurements;
/// Composite observables built from other observables.
pub mod observables;
/// The operator interface shared by gates and observables.
pub mod operation;
/// The thread-local stack of tapes which record newly constructed operators and measurements.
pub mod queuing;
/// Resource accounting.
pub mod specs;
/// The quantum tape.
pub mod tape;
/// Wires and parameters.
pub mod types;
/// Utility functions for eigenvalues and parameter formatting.
pub mod utils;

pub use num_complex::Complex64;
pub use types::*;

/// Commonly used types, traits and constructors.
/// ```
/// use qtape::prelude::*;
/// ```
pub mod prelude {
    pub use super::*;
    pub use crate::errors::*;
    pub use crate::expand::ExpandOptions;
    pub use crate::gates::*;
    pub use crate::graph::CircuitGraph;
    pub use crate::measurements::*;
    pub use crate::observables::*;
    pub use crate::operation::{Operator, OperatorRef};
    pub use crate::queuing::{QueueItem, QueuingContext};
    pub use crate::specs::Specs;
    pub use crate::tape::{CopyMode, QuantumTape};
}
