//! Clipboard sharing through the external `uniclip` binary.
//!
//! logiflow does not sync clipboards itself. It starts `uniclip` either as a
//! server (reporting the address peers should connect to) or as a client of
//! another machine's server, and stops those processes on request.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};
use tracing::{debug, info, warn};

pub mod error;

pub use error::ClipboardError;

/// How many stdout lines to scan for the server's listen address.
const SERVER_BANNER_LINES: usize = 50;

/// Upper bound on waiting for uniclip to print anything.
const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Owns at most one uniclip server and one uniclip client process.
#[derive(Debug)]
pub struct Uniclip {
    executable: PathBuf,
    server: Option<Child>,
    client: Option<Child>,
}

impl Uniclip {
    /// Use an explicit executable path.
    pub fn from_path(executable: impl Into<PathBuf>) -> Result<Self, ClipboardError> {
        let executable = executable.into();
        if !executable.is_file() {
            return Err(ClipboardError::NotFound(executable));
        }
        Ok(Self {
            executable,
            server: None,
            client: None,
        })
    }

    /// Find the bundled executable for this host inside `dir`.
    pub fn locate(dir: &Path) -> Result<Self, ClipboardError> {
        let os = std::env::consts::OS;
        let arch = std::env::consts::ARCH;
        let name = bundled_name(os, arch).ok_or_else(|| ClipboardError::Unsupported {
            os: os.to_string(),
            arch: arch.to_string(),
        })?;
        Self::from_path(dir.join(name))
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn is_server_running(&self) -> bool {
        self.server.is_some()
    }

    pub fn is_client_running(&self) -> bool {
        self.client.is_some()
    }

    /// Start `uniclip --secure` and return the address it listens on.
    ///
    /// Any running server is stopped first. Returns `Ok(None)` when the
    /// process started but never printed an address; it is left running.
    pub async fn start_server(&mut self) -> Result<Option<String>, ClipboardError> {
        self.stop_server().await;

        let mut child = self.spawn(&["--secure"])?;
        let mut lines = take_stdout(&mut child)?;

        let mut address = None;
        for _ in 0..SERVER_BANNER_LINES {
            let Some(line) = next_line(&mut lines).await else {
                break;
            };
            debug!(line = %line, "uniclip server");
            if let Some(found) = parse_server_address(&line) {
                address = Some(found);
                break;
            }
        }

        match &address {
            Some(addr) => info!(address = %addr, "clipboard server started"),
            None => warn!("clipboard server did not report an address"),
        }
        drain(lines, "uniclip server");
        self.server = Some(child);
        Ok(address)
    }

    /// Connect to a uniclip server at `address` (`IP:port`).
    ///
    /// The password is written to the client's stdin after its prompt.
    /// Any running client is stopped first.
    pub async fn start_client(
        &mut self,
        address: &str,
        password: &str,
    ) -> Result<(), ClipboardError> {
        validate_address(address)?;
        self.stop_client().await;

        let mut child = self.spawn(&["--secure", address])?;
        let mut lines = take_stdout(&mut child)?;

        if let Some(prompt) = next_line(&mut lines).await {
            debug!(line = %prompt, "uniclip client");
        }
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(password.as_bytes()).await?;
            stdin.write_all(b"\n").await?;
            stdin.flush().await?;
        }
        if let Some(reply) = next_line(&mut lines).await {
            debug!(line = %reply, "uniclip client");
        }

        info!(address = %address, "clipboard client started");
        drain(lines, "uniclip client");
        self.client = Some(child);
        Ok(())
    }

    pub async fn stop_server(&mut self) {
        if let Some(child) = self.server.take() {
            terminate(child, "server").await;
        }
    }

    pub async fn stop_client(&mut self) {
        if let Some(child) = self.client.take() {
            terminate(child, "client").await;
        }
    }

    pub async fn stop_all(&mut self) {
        self.stop_server().await;
        self.stop_client().await;
    }

    fn spawn(&self, args: &[&str]) -> Result<Child, ClipboardError> {
        let mut command = Command::new(&self.executable);
        command
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        #[cfg(windows)]
        {
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            command.creation_flags(CREATE_NO_WINDOW);
        }

        Ok(command.spawn()?)
    }
}

fn take_stdout(child: &mut Child) -> Result<Lines<BufReader<ChildStdout>>, ClipboardError> {
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow::anyhow!("uniclip stdout was not captured"))?;
    Ok(BufReader::new(stdout).lines())
}

/// Next stdout line, or `None` on EOF, read error, or timeout.
async fn next_line(lines: &mut Lines<BufReader<ChildStdout>>) -> Option<String> {
    match tokio::time::timeout(READ_TIMEOUT, lines.next_line()).await {
        Ok(Ok(line)) => line,
        Ok(Err(e)) => {
            debug!(error = %e, "uniclip stdout read failed");
            None
        }
        Err(_) => None,
    }
}

/// Keep reading stdout so the child never blocks on a full pipe.
fn drain(mut lines: Lines<BufReader<ChildStdout>>, source: &'static str) {
    tokio::spawn(async move {
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(line = %line, "{source}");
        }
    });
}

async fn terminate(mut child: Child, role: &str) {
    if let Err(e) = child.kill().await {
        warn!(role, error = %e, "failed to stop uniclip");
    } else {
        info!(role, "clipboard process stopped");
    }
}

/// Extract `IP:port` from a `uniclip a.b.c.d:port` banner line.
#[must_use]
pub fn parse_server_address(line: &str) -> Option<String> {
    line.split("uniclip ").skip(1).find_map(|rest| {
        let candidate: String = rest
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == ':')
            .collect();
        let (ip, port) = candidate.split_once(':')?;
        ip.parse::<std::net::Ipv4Addr>().ok()?;
        if port.is_empty() || !port.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        Some(format!("{ip}:{port}"))
    })
}

/// Check that `address` has the form `host:port` with a numeric port.
pub fn validate_address(address: &str) -> Result<(), ClipboardError> {
    let invalid = || ClipboardError::InvalidAddress(address.to_string());
    let (host, port) = address.split_once(':').ok_or_else(invalid)?;
    if host.is_empty() || port.contains(':') {
        return Err(invalid());
    }
    port.parse::<u16>().map_err(|_| invalid())?;
    Ok(())
}

/// File name of the bundled `uniclip` build for an OS/arch pair, using
/// `std::env::consts` naming.
#[must_use]
pub fn bundled_name(os: &str, arch: &str) -> Option<&'static str> {
    match (os, arch) {
        ("windows", "x86_64") => Some("uniclip-windows-x86_64.exe"),
        ("windows", "x86") => Some("uniclip-windows-x86.exe"),
        ("linux", "x86_64") => Some("uniclip-linux-x86_64"),
        ("linux", "x86") => Some("uniclip-linux-x86"),
        ("linux", "aarch64") => Some("uniclip-linux-arm64"),
        ("linux", "arm") => Some("uniclip-linux-armv6"),
        ("macos", "x86_64") => Some("uniclip-macos-x86_64"),
        ("macos", "aarch64") => Some("uniclip-macos-arm64"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_address_in_banner() {
        assert_eq!(
            parse_server_address("Run `uniclip 192.168.1.20:53701` to join this clipboard"),
            Some("192.168.1.20:53701".to_string())
        );
        assert_eq!(parse_server_address("Starting a new clipboard"), None);
        assert_eq!(parse_server_address("uniclip 999.1.1.1:80"), None);
        assert_eq!(parse_server_address("uniclip 10.0.0.1:"), None);
    }

    #[test]
    fn address_validation() {
        assert!(validate_address("192.168.50.50:53701").is_ok());
        assert!(validate_address("desk.local:8080").is_ok());
        assert!(matches!(
            validate_address("192.168.50.50"),
            Err(ClipboardError::InvalidAddress(_))
        ));
        assert!(validate_address("192.168.50.50:port").is_err());
        assert!(validate_address(":80").is_err());
        assert!(validate_address("10.0.0.1:99999").is_err());
    }

    #[test]
    fn bundled_names() {
        assert_eq!(bundled_name("linux", "aarch64"), Some("uniclip-linux-arm64"));
        assert_eq!(bundled_name("windows", "x86"), Some("uniclip-windows-x86.exe"));
        assert_eq!(bundled_name("macos", "aarch64"), Some("uniclip-macos-arm64"));
        assert_eq!(bundled_name("freebsd", "x86_64"), None);
    }

    #[test]
    fn missing_executable() {
        assert!(matches!(
            Uniclip::from_path("/no/such/uniclip"),
            Err(ClipboardError::NotFound(_))
        ));
    }
}
