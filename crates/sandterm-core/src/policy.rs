use std::time::Duration;

use crate::TerminalSize;

/// Idle period after the last inbound client activity that ends a session.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Resource and isolation limits applied to every sandbox.
///
/// These are operational policy. Clients cannot influence them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SandboxPolicy {
    /// Terminal type advertised inside the sandbox.
    pub term: &'static str,
    /// Pseudo-terminal size used until the client reports its own.
    pub initial_size: TerminalSize,
    /// Memory ceiling in MiB.
    pub memory_mib: u32,
    /// CPU share, in cores, formatted the way container runtimes expect it.
    pub cpus: &'static str,
    /// Maximum number of processes inside the sandbox.
    pub pids_limit: u32,
    /// Network mode; `none` leaves only loopback.
    pub network: &'static str,
    /// Working directory of the shell inside the sandbox.
    pub workdir: &'static str,
    /// Remove the sandbox's backing resources when its process exits.
    pub auto_remove: bool,
}

/// The policy every session is provisioned with.
pub const SANDBOX_POLICY: SandboxPolicy = SandboxPolicy {
    term: "xterm-256color",
    initial_size: TerminalSize::new(80, 24),
    memory_mib: 512,
    cpus: "1.0",
    pids_limit: 64,
    network: "none",
    workdir: "/home/dev/.dotfiles",
    auto_remove: true,
};

impl SandboxPolicy {
    /// Renders the limit and isolation flags for a `run` invocation.
    pub fn run_flags(&self) -> Vec<String> {
        let mut flags = vec!["-it".to_string()];
        if self.auto_remove {
            flags.push("--rm".to_string());
        }
        flags.extend([
            "--net".to_string(),
            self.network.to_string(),
            "-e".to_string(),
            format!("TERM={}", self.term),
            "-w".to_string(),
            self.workdir.to_string(),
            format!("--memory={}m", self.memory_mib),
            format!("--cpus={}", self.cpus),
            format!("--pids-limit={}", self.pids_limit),
        ]);
        flags
    }
}

#[cfg(test)]
mod tests {
    use super::SANDBOX_POLICY;

    #[test]
    fn run_flags_carry_fixed_limits() {
        let flags = SANDBOX_POLICY.run_flags();
        assert_eq!(flags[0], "-it");
        assert!(flags.contains(&"--rm".to_string()));
        assert!(flags.windows(2).any(|pair| pair == ["--net", "none"]));
        assert!(flags.contains(&"TERM=xterm-256color".to_string()));
        assert!(flags.windows(2).any(|pair| pair == ["-w", "/home/dev/.dotfiles"]));
        assert!(flags.contains(&"--memory=512m".to_string()));
        assert!(flags.contains(&"--cpus=1.0".to_string()));
        assert!(flags.contains(&"--pids-limit=64".to_string()));
    }
}
