//! Code quality rules

pub mod eqeqeq;
pub mod no_console;

pub use eqeqeq::Eqeqeq;
pub use no_console::NoConsole;
