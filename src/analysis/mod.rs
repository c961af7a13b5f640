pub mod filter;
pub mod filters;
pub mod lexicon;
pub mod pipeline;
pub mod tokenizer;

pub use lexicon::{Lexicon, Wid, OOV};
pub use pipeline::Pipeline;
