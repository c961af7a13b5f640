pub mod ast;
pub mod optimizer;
pub mod parser;

pub use ast::{Comparison, Names, Query, RangeTerm, Term};
pub use optimizer::{OptimizationRule, QueryOptimizer};
pub use parser::{parse_query, ExpressionParser};
