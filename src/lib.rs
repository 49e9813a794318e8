pub mod checkout;
pub mod cli;
pub mod cmd;
pub mod config;
pub mod delegate;
pub mod logging;
pub mod paths;
pub mod session;
pub mod stubgen;
pub mod util;
