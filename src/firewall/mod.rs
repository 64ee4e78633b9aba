//! Firewall rule toggling for the server port via `netsh advfirewall`.
//! Windows-only; requires elevation at runtime.

use thiserror::Error;

pub const DEFAULT_RULE_NAME: &str = "Minecraft";
pub const DEFAULT_SERVER_PORT: u16 = 25565;

#[derive(Error, Debug)]
pub enum FirewallError {
    #[error("netsh failed: {0}")]
    CommandFailed(String),

    #[error("failed to run netsh: {0}")]
    Io(#[from] std::io::Error),

    #[error("firewall control is only supported on Windows")]
    Unsupported,
}

/// Add an inbound TCP allow rule for `port`.
#[cfg(windows)]
pub fn open_port(port: u16, name: &str) -> Result<(), FirewallError> {
    let output = std::process::Command::new("netsh")
        .args([
            "advfirewall",
            "firewall",
            "add",
            "rule",
            &format!("name={}", name),
            "dir=in",
            "action=allow",
            "protocol=TCP",
            &format!("localport={}", port),
        ])
        .output()?;
    if !output.status.success() {
        return Err(FirewallError::CommandFailed(
            String::from_utf8_lossy(&output.stderr).into_owned(),
        ));
    }
    tracing::info!("Firewall rule '{}' added for port {}", name, port);
    Ok(())
}

/// Delete a previously created rule by name.
#[cfg(windows)]
pub fn delete_rule(name: &str) -> Result<(), FirewallError> {
    let output = std::process::Command::new("netsh")
        .args(["advfirewall", "firewall", "delete", "rule", &format!("name={}", name)])
        .output()?;
    if !output.status.success() {
        return Err(FirewallError::CommandFailed(
            String::from_utf8_lossy(&output.stderr).into_owned(),
        ));
    }
    tracing::info!("Firewall rule '{}' removed", name);
    Ok(())
}

#[cfg(not(windows))]
pub fn open_port(_port: u16, _name: &str) -> Result<(), FirewallError> {
    Err(FirewallError::Unsupported)
}

#[cfg(not(windows))]
pub fn delete_rule(_name: &str) -> Result<(), FirewallError> {
    Err(FirewallError::Unsupported)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(windows))]
    #[test]
    fn unsupported_off_windows() {
        assert!(matches!(
            open_port(DEFAULT_SERVER_PORT, DEFAULT_RULE_NAME),
            Err(FirewallError::Unsupported)
        ));
        assert!(matches!(
            delete_rule(DEFAULT_RULE_NAME),
            Err(FirewallError::Unsupported)
        ));
    }
}
