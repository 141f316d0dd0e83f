use crate::cancel::Cancellation;
use std::env;
use std::ffi::OsStr;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Runs `command` to completion, killing it if `cancel` fires first.
///
/// On unix the child leads its own process group, so helpers it spawns (such
/// as `git-remote-https` or `ssh`) are killed along with it.
///
/// Returns `Ok(None)` when the child was killed because of cancellation.
pub fn run_cancellable(command: &mut Command, cancel: &Cancellation) -> io::Result<Option<Output>> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    let mut child = command.spawn()?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let stdout_reader = thread::spawn(move || drain(stdout));
    let stderr_reader = thread::spawn(move || drain(stderr));

    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if cancel.is_cancelled() {
            kill_tree(&mut child);
            // Readers are detached: a process that escaped the group may still
            // hold the pipes open.
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    };

    let stdout = stdout_reader.join().unwrap_or_default();
    let stderr = stderr_reader.join().unwrap_or_default();

    Ok(Some(Output {
        status,
        stdout,
        stderr,
    }))
}

#[cfg(unix)]
fn kill_tree(child: &mut Child) {
    if let Ok(pid) = libc::pid_t::try_from(child.id()) {
        // SAFETY: signals the process group led by our own child.
        unsafe {
            libc::kill(-pid, libc::SIGKILL);
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(not(unix))]
fn kill_tree(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn drain<R: Read>(stream: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut stream) = stream {
        let _ = stream.read_to_end(&mut buf);
    }
    buf
}

/// Resolves `program` to an executable on `PATH`.
pub fn find_program(program: &str) -> Option<PathBuf> {
    let paths = env::var_os("PATH")?;
    let cwd = env::current_dir().ok()?;
    find_program_in(program, paths, &cwd)
}

/// Resolves `program` to an executable on the given search path.
pub fn find_program_in(program: &str, paths: impl AsRef<OsStr>, cwd: &Path) -> Option<PathBuf> {
    which::which_in(program, Some(paths), cwd).ok()
}
