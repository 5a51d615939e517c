use std::{
    fs,
    path::{Path, PathBuf},
};

use portable_pty::{CommandBuilder, native_pty_system};
use sandterm_core::{SANDBOX_POLICY, SandboxPolicy, SessionId, TerminalSize};
use sandterm_platform::{SandboxLauncher, SandboxProcess, SpawnError};

use crate::pty::{self, PtyControl};

/// Operator-supplied settings for invoking the container runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchConfig {
    /// Shell used to run the runtime command line.
    pub shell_path: PathBuf,
    /// Container runtime executable.
    pub runtime_path: PathBuf,
    /// Working directory of the launching shell; inherits the daemon's when unset.
    pub home_dir: Option<PathBuf>,
    /// Image every sandbox is created from.
    pub image: String,
}

/// Launches one container per session under [`SANDBOX_POLICY`].
pub struct DockerLauncher {
    config: LaunchConfig,
    policy: SandboxPolicy,
}

impl DockerLauncher {
    pub fn new(config: LaunchConfig) -> Self {
        Self {
            config,
            policy: SANDBOX_POLICY,
        }
    }

    /// Builds the command line handed to the launching shell.
    pub fn launch_command(&self, container: &str) -> String {
        let mut parts = vec![
            shell_quote(&self.config.runtime_path.to_string_lossy()),
            "run".to_string(),
        ];
        parts.extend(self.policy.run_flags().iter().map(|flag| shell_quote(flag)));
        parts.push("--name".to_string());
        parts.push(shell_quote(container));
        parts.push(shell_quote(&self.config.image));
        parts.join(" ")
    }
}

impl SandboxLauncher for DockerLauncher {
    fn spawn(
        &self,
        session_id: SessionId,
        size: TerminalSize,
    ) -> Result<SandboxProcess, SpawnError> {
        validate_executable(&self.config.runtime_path).map_err(|reason| {
            SpawnError::RuntimeUnavailable {
                path: self.config.runtime_path.clone(),
                reason,
            }
        })?;
        validate_executable(&self.config.shell_path).map_err(|reason| {
            SpawnError::ShellUnavailable {
                path: self.config.shell_path.clone(),
                reason,
            }
        })?;

        let container = container_name(session_id);
        let pair = native_pty_system()
            .openpty(pty::pty_size(size))
            .map_err(|err| launch_error("open pty", err.to_string()))?;

        let mut command = CommandBuilder::new(&self.config.shell_path);
        command.arg("-c");
        command.arg(self.launch_command(&container));
        if let Some(home_dir) = &self.config.home_dir {
            command.cwd(home_dir);
        }
        command.env("TERM", self.policy.term);

        let child = pair
            .slave
            .spawn_command(command)
            .map_err(|err| launch_error("spawn sandbox shell", err.to_string()))?;
        // The reader only sees EOF once every slave handle is closed.
        drop(pair.slave);
        let pid = child.process_id();

        tracing::debug!(
            session_id = session_id.0,
            pid = ?pid,
            container = %container,
            "sandbox shell started"
        );

        let (control, events) = PtyControl::start(
            session_id,
            pair.master,
            child,
            self.config.runtime_path.clone(),
            container,
        )?;

        Ok(SandboxProcess {
            pid,
            control: Box::new(control),
            events,
        })
    }
}

fn container_name(session_id: SessionId) -> String {
    format!("sandterm-{}-{}", std::process::id(), session_id.0)
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r#"'\''"#))
}

fn validate_executable(path: &Path) -> Result<(), String> {
    if !path.is_absolute() {
        return Ok(());
    }

    let metadata = fs::metadata(path).map_err(|err| err.to_string())?;
    if !metadata.is_file() {
        return Err("not a regular file".to_string());
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        if metadata.permissions().mode() & 0o111 == 0 {
            return Err("not executable".to_string());
        }
    }

    Ok(())
}

pub(crate) fn launch_error(action: &'static str, detail: String) -> SpawnError {
    SpawnError::Launch { action, detail }
}
