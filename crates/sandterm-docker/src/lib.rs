//! Sandbox backend that runs each session's shell in a throwaway container,
//! attached to a native pseudo-terminal.

mod launcher;
mod pty;

pub use launcher::{DockerLauncher, LaunchConfig};
