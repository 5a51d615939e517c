use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;
use sandterm_docker::LaunchConfig;

/// Command-line and environment settings for `sandtermd`.
#[derive(Debug, Parser)]
#[command(name = "sandtermd", about = "Sandboxed terminal gateway")]
pub struct Args {
    /// Address the WebSocket listener binds to.
    #[arg(long, env = "SANDTERM_LISTEN", default_value = "0.0.0.0:3001")]
    pub listen: SocketAddr,
    /// Shell used to launch the container runtime.
    #[arg(long, env = "SHELL_PATH", default_value = "/bin/bash")]
    pub shell_path: PathBuf,
    /// Container runtime executable.
    #[arg(long, env = "DOCKER_PATH", default_value = "/usr/bin/docker")]
    pub runtime_path: PathBuf,
    /// Working directory of the launching shell.
    #[arg(long, env = "HOME")]
    pub home_dir: Option<PathBuf>,
    /// Image each sandbox is created from.
    #[arg(long, env = "SANDTERM_IMAGE", default_value = "sandterm-shell")]
    pub image: String,
}

/// Resolved daemon configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub listen: SocketAddr,
    pub launch: LaunchConfig,
}

impl From<Args> for GatewayConfig {
    fn from(args: Args) -> Self {
        Self {
            listen: args.listen,
            launch: LaunchConfig {
                shell_path: args.shell_path,
                runtime_path: args.runtime_path,
                home_dir: args.home_dir,
                image: args.image,
            },
        }
    }
}
