pub mod engine;
pub mod parser;
pub mod parsetree;
pub mod setops;

pub use engine::{TextEngine, TextEngineData};
pub use parser::QueryParser;
pub use parsetree::ParseTree;
