//! Process control - spawning and terminating app processes

use std::path::Path;
use std::process::{Child, Command, Stdio};

use tracing::{info, warn};

use crate::error::Result;

/// Spawn an app process detached from our process group, stdio discarded.
/// The working directory defaults to the executable's parent.
pub fn spawn_detached(executable: &Path, args: &[String]) -> Result<Child> {
    info!("spawning {:?} with {} arguments", executable, args.len());

    let mut cmd = Command::new(executable);
    cmd.args(args);

    if let Some(parent) = executable.parent() {
        if parent.as_os_str().len() > 0 {
            cmd.current_dir(parent);
        }
    }

    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        cmd.creation_flags(0x00000008); // DETACHED_PROCESS
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    let child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;

    info!("spawned {:?} with pid {}", executable, child.id());
    Ok(child)
}

/// Spawn an app process, elevated through the Windows shell when requested.
/// Elevation does not exist as a launch concept elsewhere. An elevated
/// child handle is the shell wrapper, not the app itself; `terminate`
/// cannot reach past it.
pub fn spawn_app(executable: &Path, args: &[String], elevated: bool) -> Result<Child> {
    #[cfg(windows)]
    if elevated {
        return spawn_elevated(executable, args);
    }
    #[cfg(not(windows))]
    let _ = elevated;
    spawn_detached(executable, args)
}

/// Quote arguments for PowerShell's `-ArgumentList`: each element
/// single-quoted with embedded quotes doubled, joined by commas. Spaces and
/// commas inside an argument survive the shell this way.
#[cfg_attr(not(windows), allow(dead_code))]
fn quote_for_powershell(args: &[String]) -> String {
    args.iter()
        .map(|a| format!("'{}'", a.replace('\'', "''")))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(windows)]
fn spawn_elevated(executable: &Path, args: &[String]) -> Result<Child> {
    info!("spawning {:?} elevated", executable);
    let mut cmd = Command::new("powershell");
    cmd.args(["-NoProfile", "-Command", "Start-Process", "-Verb", "RunAs", "-FilePath"])
        .arg(executable);
    if !args.is_empty() {
        cmd.arg("-ArgumentList").arg(quote_for_powershell(args));
    }
    let child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    Ok(child)
}

/// Run an installer to completion. On Windows the process can be elevated
/// through the shell; `service` installers get no console window either way.
pub async fn run_installer(executable: &Path, elevated: bool) -> Result<std::process::ExitStatus> {
    let mut cmd = installer_command(executable, elevated);
    let status = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await?;
    Ok(status)
}

#[cfg(windows)]
fn installer_command(executable: &Path, elevated: bool) -> tokio::process::Command {
    if elevated {
        let mut cmd = tokio::process::Command::new("powershell");
        cmd.args(["-NoProfile", "-Command", "Start-Process", "-Wait", "-Verb", "RunAs", "-FilePath"])
            .arg(executable);
        cmd
    } else {
        tokio::process::Command::new(executable)
    }
}

#[cfg(not(windows))]
fn installer_command(executable: &Path, _elevated: bool) -> tokio::process::Command {
    // Elevation is a Windows concern; elsewhere installers run as the user.
    tokio::process::Command::new(executable)
}

/// Terminate an owned child process. Tolerant of a process that already
/// exited on its own.
pub fn terminate(child: &mut Child) -> Result<()> {
    match child.try_wait()? {
        Some(status) => {
            info!("process {} already exited with {}", child.id(), status);
            Ok(())
        }
        None => {
            if let Err(e) = child.kill() {
                warn!("killing process {} failed: {}", child.id(), e);
                return Err(e.into());
            }
            // Reap it so no zombie lingers
            let _ = child.wait();
            Ok(())
        }
    }
}

/// Whether the child has exited, without blocking
pub fn has_exited(child: &mut Child) -> bool {
    matches!(child.try_wait(), Ok(Some(_)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn spawn_and_terminate_short_lived_process() {
        let mut child = spawn_detached(Path::new("/bin/sleep"), &["30".to_string()]).unwrap();
        assert!(!has_exited(&mut child));
        terminate(&mut child).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn terminate_tolerates_already_exited_process() {
        let mut child = spawn_detached(Path::new("/bin/true"), &[]).unwrap();
        let _ = child.wait();
        terminate(&mut child).unwrap();
    }

    #[test]
    fn spawn_missing_executable_fails() {
        assert!(spawn_detached(Path::new("/nonexistent/definitely-not-here"), &[]).is_err());
    }

    #[test]
    fn powershell_argument_list_quotes_commas_and_quotes() {
        let args = vec![
            "-M".to_string(),
            r"C:\sounds, extra".to_string(),
            "it's".to_string(),
        ];
        assert_eq!(
            quote_for_powershell(&args),
            r"'-M','C:\sounds, extra','it''s'"
        );
    }
}
