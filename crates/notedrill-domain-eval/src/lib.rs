pub mod phrase;
pub mod practice;
pub mod random;

pub use phrase::*;
pub use practice::*;
pub use random::*;
