//! Domain error types.
//!
//! These errors represent validation failures and illegal state changes
//! in the domain layer. They are distinct from API/IO errors.

/// Domain-level errors for validation and lifecycle rules.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// A record was asked to move to a state its lifecycle forbids
    #[error("invalid {entity} transition: {from} -> {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    /// A watch task needs at least one preferred train
    #[error("watch task must name at least one preferred train")]
    NoPreferredTrain,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = DomainError::InvalidTransition {
            entity: "watch task",
            from: "Stopped".into(),
            to: "Completed".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid watch task transition: Stopped -> Completed"
        );

        let err = DomainError::NoPreferredTrain;
        assert_eq!(
            err.to_string(),
            "watch task must name at least one preferred train"
        );
    }
}
