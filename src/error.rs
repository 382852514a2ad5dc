use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy for grid construction and optimisation.
///
/// Every check fails at the smallest scope that can observe the violation,
/// so an invalid entity is never observably constructed. There is no
/// recovery path inside the crate; the caller decides whether to retry
/// with adjusted inputs.
#[derive(Debug, Error)]
pub enum Error {
    /// A magnitude is outside its allowed range: a negative length, area,
    /// rating or power draw, a panel outgrowing its roof, or a time of day
    /// outside 0..=24.
    #[error("value out of range: {0}")]
    Range(String),

    /// The network structure is inconsistent: a line with identical
    /// endpoints, a broken or circular path chain, duplicate buses or
    /// lines, endpoints that are not grid members, or a slack bus that
    /// carries a demand series.
    #[error("invalid topology: {0}")]
    Topology(String),

    /// A write-once field was assigned a second time.
    #[error("immutable once set: {0}")]
    Immutability(String),

    /// The external solver reported that no feasible or optimal point
    /// exists. Terminal; never retried internally.
    #[error("solver found no feasible optimum: {0}")]
    SolverInfeasible(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_context() {
        let err = Error::Range("panel size 120 exceeds roof size 100".to_string());
        assert!(err.to_string().contains("out of range"));
        assert!(err.to_string().contains("exceeds roof"));
    }
}
