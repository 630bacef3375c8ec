//! HID transport boundary.
//!
//! Writes go through the external `hidapitester` executable rather than a
//! linked HID library. The only contract relied upon is its command line
//! and the `wrote <N> bytes` status line it prints on success.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use logiflow_types::ReceiverProfile;
use tokio::process::Command;
use tracing::debug;

use crate::encode::{usage, SwitchCommand, USAGE_PAGE};
use crate::error::TransportError;

/// One transport invocation: a report written twice to one HID interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRequest {
    /// `VVVV:PPPP` device selector.
    pub vidpid: String,
    pub usage: u16,
    pub usage_page: u16,
    pub command: SwitchCommand,
}

impl WriteRequest {
    #[must_use]
    pub fn new(profile: &ReceiverProfile, command: SwitchCommand) -> Self {
        Self {
            vidpid: profile.vidpid(),
            usage: usage(profile.protocol),
            usage_page: USAGE_PAGE,
            command,
        }
    }

    /// Status text the transport prints once the report has been written.
    #[must_use]
    pub fn acknowledgement(&self) -> String {
        format!("wrote {} bytes", self.command.len())
    }

    /// Command-line arguments for `hidapitester`.
    ///
    /// The report is sent twice in the same invocation. Change-host is
    /// idempotent, and the tool occasionally drops a single write.
    #[must_use]
    pub fn args(&self) -> Vec<String> {
        let length = self.command.len().to_string();
        let payload = self.command.hex_list();
        let mut args = vec![
            "--vidpid".to_string(),
            self.vidpid.clone(),
            "--usage".to_string(),
            self.usage.to_string(),
            "--usagePage".to_string(),
            format!("0x{:04X}", self.usage_page),
            "--open".to_string(),
        ];
        for _ in 0..2 {
            args.extend([
                "--length".to_string(),
                length.clone(),
                "--send-output".to_string(),
                payload.clone(),
            ]);
        }
        args
    }
}

/// Something that can push a raw report to the receiver.
#[async_trait]
pub trait HidTransport: Send + Sync + 'static {
    /// Perform one write and return the transport's textual output.
    async fn write(&self, request: &WriteRequest) -> Result<String, TransportError>;
}

/// `hidapitester` driven as a child process.
#[derive(Debug, Clone)]
pub struct HidapiTester {
    executable: PathBuf,
}

impl HidapiTester {
    /// Use an explicit executable path.
    pub fn from_path(executable: impl Into<PathBuf>) -> Result<Self, TransportError> {
        let executable = executable.into();
        if !executable.is_file() {
            return Err(TransportError::NotFound(executable));
        }
        Ok(Self { executable })
    }

    /// Find the bundled executable for this host inside `dir`.
    pub fn locate(dir: &Path) -> Result<Self, TransportError> {
        let os = std::env::consts::OS;
        let arch = std::env::consts::ARCH;
        let name = bundled_name(os, arch).ok_or_else(|| TransportError::Unsupported {
            os: os.to_string(),
            arch: arch.to_string(),
        })?;
        Self::from_path(dir.join(name))
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }
}

#[async_trait]
impl HidTransport for HidapiTester {
    async fn write(&self, request: &WriteRequest) -> Result<String, TransportError> {
        let mut command = Command::new(&self.executable);
        command
            .args(request.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(windows)]
        {
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            command.creation_flags(CREATE_NO_WINDOW);
        }

        let output = command.output().await?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!(
            status = %output.status,
            stdout = %stdout.trim(),
            stderr = %stderr.trim(),
            "hidapitester finished"
        );

        if stdout.trim().is_empty() {
            return Err(TransportError::NoOutput);
        }
        Ok(stdout)
    }
}

/// File name of the bundled `hidapitester` build for an OS/arch pair, using
/// `std::env::consts` naming.
#[must_use]
pub fn bundled_name(os: &str, arch: &str) -> Option<&'static str> {
    match (os, arch) {
        ("windows", "x86_64") => Some("hidapitester-windows-x86_64.exe"),
        ("linux", "x86_64") => Some("hidapitester-linux-x86_64"),
        ("linux", "arm") => Some("hidapitester-linux-armv7l"),
        ("macos", "aarch64") => Some("hidapitester-macos-arm64"),
        ("macos", "x86_64") => Some("hidapitester-macos-x86_64"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::encode_switch;
    use logiflow_types::{Channel, DeviceKind, Protocol};

    fn bolt_mouse_request() -> WriteRequest {
        let profile = ReceiverProfile::default();
        let cmd = encode_switch(&profile, DeviceKind::Mouse, Channel::new(1).unwrap());
        WriteRequest::new(&profile, cmd)
    }

    #[test]
    fn args_send_payload_twice() {
        let request = bolt_mouse_request();
        let args = request.args();
        assert_eq!(
            &args[..7],
            &["--vidpid", "046D:C548", "--usage", "2", "--usagePage", "0xFF00", "--open"]
        );
        let sends = args.iter().filter(|a| *a == "--send-output").count();
        assert_eq!(sends, 2);
        let lengths: Vec<_> = args
            .windows(2)
            .filter(|w| w[0] == "--length")
            .map(|w| w[1].as_str())
            .collect();
        assert_eq!(lengths, ["20", "20"]);
        assert!(args.last().unwrap().starts_with("0x11,0x02,0x0A,0x1E,0x00,0x00"));
    }

    #[test]
    fn unifying_uses_usage_one() {
        let profile = ReceiverProfile {
            protocol: Protocol::Unifying,
            ..ReceiverProfile::default()
        };
        let cmd = encode_switch(&profile, DeviceKind::Keyboard, Channel::new(2).unwrap());
        let request = WriteRequest::new(&profile, cmd);
        assert_eq!(request.usage, 1);
        assert_eq!(request.acknowledgement(), "wrote 7 bytes");
    }

    #[test]
    fn bundled_names() {
        assert_eq!(bundled_name("linux", "x86_64"), Some("hidapitester-linux-x86_64"));
        assert_eq!(bundled_name("macos", "aarch64"), Some("hidapitester-macos-arm64"));
        assert_eq!(bundled_name("windows", "x86_64"), Some("hidapitester-windows-x86_64.exe"));
        assert_eq!(bundled_name("linux", "riscv64"), None);
    }

    #[test]
    fn missing_executable_is_unavailable() {
        let err = HidapiTester::from_path("/definitely/not/here/hidapitester").unwrap_err();
        assert!(err.is_unavailable());
    }
}
