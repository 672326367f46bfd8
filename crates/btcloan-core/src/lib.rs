pub mod error;
pub mod repayment;
pub mod schedule;
pub mod status;
pub mod types;
pub mod validation;

pub use error::LoanError;
pub use types::*;

/// Standard result type for all loan-engine operations
pub type LoanResult<T> = Result<T, LoanError>;
