use thiserror::Error;

/// Error types for the mrkmeans library
#[derive(Error, Debug)]
pub enum KMeansError {
    /// Invalid generation parameters (zero dimensions, zero fragment size, ...)
    #[error("Generation error: {0}")]
    Generation(String),

    /// A map task could not compute its partial result
    #[error("Worker compute error: {0}")]
    WorkerCompute(String),

    /// Partial results could not be combined into new centroids
    #[error("Aggregation error: {0}")]
    Aggregation(String),

    /// The execution substrate reported a failed task
    #[error("Substrate error: {0}")]
    Substrate(String),

    /// A failure raised while running a specific iteration
    #[error("Iteration {iteration} failed: {source}")]
    Iteration {
        iteration: usize,
        #[source]
        source: Box<KMeansError>,
    },

    /// Model has not been fitted yet
    #[error("Model has not been fitted. Call train() first.")]
    NotFitted,

    /// Dimension mismatch between data and model
    #[error("Dimension mismatch: {0}")]
    InvalidDimensions(String),

    /// Reading or parsing a run configuration failed
    #[error("Config error: {0}")]
    Config(String),
}

impl KMeansError {
    /// Attach the index of the iteration in which this error was raised.
    pub fn in_iteration(self, iteration: usize) -> Self {
        match self {
            already @ KMeansError::Iteration { .. } => already,
            other => KMeansError::Iteration {
                iteration,
                source: Box::new(other),
            },
        }
    }

    /// The iteration index, if this error was raised inside the iteration loop.
    pub fn iteration(&self) -> Option<usize> {
        match self {
            KMeansError::Iteration { iteration, .. } => Some(*iteration),
            _ => None,
        }
    }

    /// The innermost error, with any iteration wrapper removed.
    pub fn root_cause(&self) -> &KMeansError {
        match self {
            KMeansError::Iteration { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl From<std::io::Error> for KMeansError {
    fn from(err: std::io::Error) -> Self {
        KMeansError::Config(err.to_string())
    }
}

impl From<serde_yaml::Error> for KMeansError {
    fn from(err: serde_yaml::Error) -> Self {
        KMeansError::Config(err.to_string())
    }
}

/// Convenient alias for results produced by this crate.
pub type Result<T> = std::result::Result<T, KMeansError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_iteration_wraps_once() {
        let err = KMeansError::Substrate("boom".to_string())
            .in_iteration(3)
            .in_iteration(7);

        assert_eq!(err.iteration(), Some(3));
        assert!(matches!(err.root_cause(), KMeansError::Substrate(_)));
        assert_eq!(err.to_string(), "Iteration 3 failed: Substrate error: boom");
    }
}
