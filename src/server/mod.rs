pub mod diagnostics;
pub mod gate;
pub mod proxy;
pub mod server;
