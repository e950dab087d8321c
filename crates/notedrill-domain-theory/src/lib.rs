pub mod model;
pub mod notation;

pub use model::*;
pub use notation::*;
