//! # Serial Provisioning
//!
//! Line-oriented exchange for entering WiFi credentials over a serial link:
//!
//! ```text
//! > SSID lab-network
//! OK ssid set
//! > PASS hunter22
//! OK password set
//! > CONNECT
//! OK connecting to lab-network
//! ```
//!
//! Accepted credentials are published on a `watch` channel; the password is
//! never written back to the link or the log.

use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;
use tracing::{info, warn};

pub const MAX_SSID_BYTES: usize = 32;
pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 63;

#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct WifiCredentials {
    pub ssid: String,
    #[serde(skip_serializing)]
    pub password: String,
}

impl std::fmt::Debug for WifiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WifiCredentials")
            .field("ssid", &self.ssid)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProvisioningError {
    #[error("empty command")]
    Empty,
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    #[error("{0} requires an argument")]
    MissingArgument(&'static str),
    #[error("ssid is longer than {} bytes", MAX_SSID_BYTES)]
    SsidTooLong,
    #[error("password must be empty or {}-{} characters", MIN_PASSWORD_LEN, MAX_PASSWORD_LEN)]
    InvalidPasswordLength,
    #[error("no ssid set")]
    MissingSsid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningCommand {
    Ssid(String),
    Pass(String),
    Show,
    Connect,
    Clear,
    Help,
}

impl FromStr for ProvisioningCommand {
    type Err = ProvisioningError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        if line.is_empty() {
            return Err(ProvisioningError::Empty);
        }
        let (verb, arg) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        match verb.to_ascii_uppercase().as_str() {
            "SSID" if arg.is_empty() => Err(ProvisioningError::MissingArgument("SSID")),
            "SSID" if arg.len() > MAX_SSID_BYTES => Err(ProvisioningError::SsidTooLong),
            "SSID" => Ok(ProvisioningCommand::Ssid(arg.to_string())),
            "PASS" => {
                let len = arg.chars().count();
                if len == 0 || (MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&len) {
                    Ok(ProvisioningCommand::Pass(arg.to_string()))
                } else {
                    Err(ProvisioningError::InvalidPasswordLength)
                }
            }
            "SHOW" => Ok(ProvisioningCommand::Show),
            "CONNECT" => Ok(ProvisioningCommand::Connect),
            "CLEAR" => Ok(ProvisioningCommand::Clear),
            "HELP" | "?" => Ok(ProvisioningCommand::Help),
            other => Err(ProvisioningError::UnknownCommand(other.to_string())),
        }
    }
}

pub struct Provisioner {
    ssid: Option<String>,
    password: String,
    publisher: Arc<watch::Sender<Option<WifiCredentials>>>,
}

impl Provisioner {
    pub fn new(publisher: Arc<watch::Sender<Option<WifiCredentials>>>) -> Self {
        Self {
            ssid: None,
            password: String::new(),
            publisher,
        }
    }

    pub fn apply(&mut self, command: ProvisioningCommand) -> Result<String, ProvisioningError> {
        match command {
            ProvisioningCommand::Ssid(ssid) => {
                self.ssid = Some(ssid);
                Ok("OK ssid set".to_string())
            }
            ProvisioningCommand::Pass(password) => {
                self.password = password;
                Ok("OK password set".to_string())
            }
            ProvisioningCommand::Show => {
                let active = self.publisher.borrow().as_ref().map(|c| c.ssid.clone());
                Ok(format!(
                    "ssid={} password={} active={}",
                    self.ssid.as_deref().unwrap_or("-"),
                    if self.password.is_empty() { "unset" } else { "set" },
                    active.as_deref().unwrap_or("-"),
                ))
            }
            ProvisioningCommand::Connect => {
                let ssid = self.ssid.clone().ok_or(ProvisioningError::MissingSsid)?;
                let credentials = WifiCredentials {
                    ssid: ssid.clone(),
                    password: self.password.clone(),
                };
                self.publisher.send_replace(Some(credentials));
                info!(%ssid, "wifi credentials accepted");
                Ok(format!("OK connecting to {ssid}"))
            }
            ProvisioningCommand::Clear => {
                self.ssid = None;
                self.password.clear();
                Ok("OK cleared".to_string())
            }
            ProvisioningCommand::Help => {
                Ok("commands: SSID <name>, PASS <secret>, SHOW, CONNECT, CLEAR, HELP".to_string())
            }
        }
    }

    /// Parse and apply one line, producing the reply to send back
    pub fn handle_line(&mut self, line: &str) -> String {
        match line
            .parse::<ProvisioningCommand>()
            .and_then(|command| self.apply(command))
        {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "provisioning command rejected");
                format!("ERR {e}")
            }
        }
    }

    /// Serve the exchange until the link closes
    pub async fn run<R, W>(mut self, reader: R, mut writer: W) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let reply = self.handle_line(&line);
            writer.write_all(reply.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
        info!("provisioning link closed");
        Ok(())
    }
}
