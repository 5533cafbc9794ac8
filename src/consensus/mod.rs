// Consensus: proof-of-work and validation

pub mod pow;
pub mod validation;

pub use pow::{MiningResult, ProofOfWork, Target};
pub use validation::{BlockValidator, referenced_output, verify_digest, verify_transaction};
