use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ContextError {
    #[error("template recursion limit ({0}) exceeded; descriptions refer to themselves")]
    RecursionLimit(usize),

    #[error("cannot interpolate non-scalar value '{0}' into a string")]
    NonScalarInterpolation(String),

    #[error("behaviour '{0}' is not registered or is not callable")]
    InvalidBehaviour(String),

    #[error("behaviour '{0}' did not construct a value of the requested type")]
    ConstructMismatch(String),
}
