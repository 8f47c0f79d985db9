pub mod report;
pub mod runtime;
pub mod session;
pub mod watch;
