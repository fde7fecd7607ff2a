pub mod dag_builder;
pub mod traversal;
pub mod validator;

pub use dag_builder::{Dag, DagBuilder};
pub use validator::{PredicateRegistry, Predicate};
