//! hacfg CLI: provision a dynamic HAProxy sidecar workspace and hold it until
//! the process is told to stop.

pub mod cli;
pub mod error;
pub mod run;
