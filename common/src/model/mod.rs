pub mod prescription;
pub mod share;
