pub mod widcode;

pub use widcode::WidCode;
