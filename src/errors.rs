use thiserror::Error;

/// An error from recording, inspecting or expanding a tape.
#[derive(Debug, Error)]
pub enum CircuitError {
    /// A generic error.
    #[error("{0}")]
    Generic(String),
    /// The queuing context was misused.
    #[error("{0}")]
    Queuing(String),
    /// A measurement or observable was used in a way the circuit does not support.
    #[error("{0}")]
    QuantumFunction(String),
    /// Mutually exclusive arguments were given together.
    #[error("{0}")]
    InvalidArgument(String),
    /// An item was queued out of order.
    #[error("{0}")]
    RecordingOrder(String),
    /// Trainable parameter indices were invalid.
    #[error("{0}")]
    TrainableParams(String),
    /// The wrong number of parameter values was provided.
    #[error("Number of provided parameters does not match ({provided} provided, {expected} expected).")]
    ParameterCount {
        /// Number of parameter slots being written.
        expected: usize,
        /// Number of values supplied.
        provided: usize,
    },
    /// The operator defines no decomposition.
    #[error("{0} does not define a decomposition.")]
    DecompositionUndefined(String),
    /// The operator defines no eigenvalues.
    #[error("{0} does not define eigenvalues.")]
    EigvalsUndefined(String),
    /// The operator defines no diagonalizing gates.
    #[error("{0} does not define diagonalizing gates.")]
    DiagonalizingGatesUndefined(String),
    /// An unknown outcome was asserted on a measurement value.
    #[error("{0}")]
    MeasurementValue(String),
    /// Wires were malformed.
    #[error("{0}")]
    Wires(String),
}

impl CircuitError {
    /// Construct a new error.
    pub fn new<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::Generic(msg.into())
    }

    /// Whether this error signals a missing decomposition rather than a real failure.
    pub fn is_decomposition_undefined(&self) -> bool {
        matches!(self, Self::DecompositionUndefined(_))
    }
}

/// A result which may contain a circuit error.
pub type CircuitResult<T> = Result<T, CircuitError>;
