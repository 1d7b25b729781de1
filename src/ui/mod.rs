pub mod operator;
pub mod style;

pub use operator::{ConsoleOperator, Operator};
