pub mod attestation;
pub mod intake;
pub mod netschool;
