pub mod action;
pub mod cancel;
pub mod cli;
pub mod config;
pub mod console;
pub mod device;
pub mod drivers;
pub mod error;
pub mod paths;
pub mod session;
pub mod shell;
pub mod tool;
pub mod worker;
