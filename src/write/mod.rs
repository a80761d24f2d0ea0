pub mod binder;
pub mod mutation;

pub use binder::{ValueBinder, WriteBuilder};
pub use mutation::{Mutation, MutationOp};
