mod permits;

pub use permits::*;
