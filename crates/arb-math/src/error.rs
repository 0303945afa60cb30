use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathError {
    #[error("arithmetic overflow")]
    Overflow,
    #[error("division by zero")]
    DivisionByZero,
    #[error("value out of the valid tick range")]
    TickOutOfRange,
    #[error("value out of the valid sqrt-price range")]
    SqrtPriceOutOfRange,
}

pub type MathResult<T> = Result<T, MathError>;
