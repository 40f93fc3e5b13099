pub mod ascode;
pub mod workflow;
