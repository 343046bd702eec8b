pub mod config;
pub mod value;

pub use config::{Outputter, Settings};
pub use value::{GrainMap, GrainValue};
