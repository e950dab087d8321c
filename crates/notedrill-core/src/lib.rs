pub mod app;
pub mod diagnostics;
pub mod ipc;

pub use app::*;
pub use diagnostics::*;
pub use ipc::*;
