//! # Platform-specific utilities
//!
//! Questo modulo centralizza la gestione cross-platform dei comandi esterni
//! (oggenc, lame, flac) e la verifica della loro presenza nel `PATH`.

use std::collections::HashMap;
use std::sync::OnceLock;

/// Platform-specific command manager
pub struct PlatformCommands {
    commands: HashMap<&'static str, &'static str>,
    which_command: &'static str,
}

impl PlatformCommands {
    /// Get the singleton instance
    pub fn instance() -> &'static Self {
        static INSTANCE: OnceLock<PlatformCommands> = OnceLock::new();
        INSTANCE.get_or_init(Self::new)
    }

    fn new() -> Self {
        let mut commands = HashMap::new();
        let which_command = if cfg!(windows) {
            commands.insert("oggenc", "oggenc.exe");
            commands.insert("lame", "lame.exe");
            commands.insert("flac", "flac.exe");
            "where"
        } else {
            commands.insert("oggenc", "oggenc");
            commands.insert("lame", "lame");
            commands.insert("flac", "flac");
            "which"
        };

        Self {
            commands,
            which_command,
        }
    }

    /// Get the platform-specific command name
    pub fn get_command<'a>(&self, base_name: &'a str) -> &'a str {
        self.commands.get(base_name).copied().unwrap_or(base_name)
    }

    /// Get the command used to check if a program exists
    pub fn which_command(&self) -> &str {
        self.which_command
    }

    /// Check if a command is available on the system
    pub async fn is_command_available(&self, base_name: &str) -> bool {
        let command_name = self.get_command(base_name);

        let result = tokio::process::Command::new(self.which_command)
            .arg(command_name)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .await;

        matches!(result, Ok(status) if status.success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_commands() {
        let platform = PlatformCommands::instance();

        assert!(platform.get_command("oggenc").starts_with("oggenc"));
        assert_eq!(platform.get_command("unknown-tool"), "unknown-tool");
        assert!(!platform.which_command().is_empty());
    }

    #[tokio::test]
    async fn test_missing_command_is_unavailable() {
        let platform = PlatformCommands::instance();
        assert!(
            !platform
                .is_command_available("audiotree-definitely-not-installed")
                .await
        );
    }
}
