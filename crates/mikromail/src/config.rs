//! Client configuration: programmatic defaults, JSON file, CLI overrides.
//!
//! Three source layers merge, lowest to highest precedence: values set on
//! the builder, the JSON configuration file, and command-line override
//! tokens. Validation happens once, at `build()`.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Default configuration file, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "mikromail.config.json";

/// Submission port used with implicit TLS.
const SMTPS_PORT: u16 = 465;
/// Submission port used for cleartext/STARTTLS sessions.
const SUBMISSION_PORT: u16 = 587;

/// Resolved client configuration, immutable after construction.
#[derive(Debug, Clone)]
pub struct ClientConfiguration {
    /// Submission server host name.
    pub host: String,
    /// Submission server port.
    pub port: u16,
    /// Account name, also the default envelope sender.
    pub user: String,
    /// Account password; may be empty with `skip_authentication`.
    pub password: String,
    /// Implicit TLS from the first byte.
    pub secure: bool,
    /// Connection and per-command timeout.
    pub timeout: Duration,
    /// Name announced in EHLO.
    pub client_name: String,
    /// Additional delivery attempts after the first.
    pub max_retries: u32,
    /// Pause between attempts.
    pub retry_delay: Duration,
    /// Bypass authentication regardless of server capability.
    pub skip_authentication: bool,
    /// Log the session dialogue at debug level (credentials redacted).
    pub debug: bool,
}

impl ClientConfiguration {
    /// Starts a configuration builder.
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Configuration validation error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No submission host was configured by any source layer.
    #[error("no submission host configured")]
    MissingHost,

    /// The configured port was zero.
    #[error("port must be between 1 and 65535")]
    InvalidPort,

    /// The configured timeout was zero.
    #[error("timeout must be positive")]
    InvalidTimeout,
}

/// Layered configuration builder.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    host: Option<String>,
    port: Option<u16>,
    user: Option<String>,
    password: Option<String>,
    secure: Option<bool>,
    timeout: Option<Duration>,
    client_name: Option<String>,
    max_retries: Option<u32>,
    retry_delay: Option<Duration>,
    skip_authentication: Option<bool>,
    debug: Option<bool>,
}

/// Shape of the JSON configuration file. Every field is optional; unknown
/// fields are ignored.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct FileConfig {
    host: Option<String>,
    port: Option<u16>,
    user: Option<String>,
    password: Option<String>,
    secure: Option<bool>,
    timeout_ms: Option<u64>,
    client_name: Option<String>,
    max_retries: Option<u32>,
    retry_delay_ms: Option<u64>,
    skip_authentication: Option<bool>,
    debug: Option<bool>,
}

impl ConfigBuilder {
    /// Sets the submission server host.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the submission server port.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the account name.
    #[must_use]
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Sets the account password.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Enables or disables implicit TLS.
    #[must_use]
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = Some(secure);
        self
    }

    /// Sets the connection and per-command timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the EHLO client name.
    #[must_use]
    pub fn client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = Some(name.into());
        self
    }

    /// Sets the number of additional delivery attempts.
    #[must_use]
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    /// Sets the pause between delivery attempts.
    #[must_use]
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = Some(delay);
        self
    }

    /// Bypasses authentication entirely.
    #[must_use]
    pub fn skip_authentication(mut self, skip: bool) -> Self {
        self.skip_authentication = Some(skip);
        self
    }

    /// Enables dialogue logging at debug level.
    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = Some(debug);
        self
    }

    /// Overlays [`DEFAULT_CONFIG_FILE`] from the working directory.
    #[must_use]
    pub fn merge_default_file(self) -> Self {
        self.merge_file(DEFAULT_CONFIG_FILE)
    }

    /// Overlays values from a JSON configuration file. An absent file is
    /// not an error; malformed JSON is logged and ignored.
    #[must_use]
    pub fn merge_file(mut self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let Ok(raw) = std::fs::read_to_string(path) else {
            return self;
        };

        let file: FileConfig = match serde_json::from_str(&raw) {
            Ok(parsed) => parsed,
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "ignoring malformed config file");
                return self;
            }
        };

        self.host = file.host.or(self.host);
        self.port = file.port.or(self.port);
        self.user = file.user.or(self.user);
        self.password = file.password.or(self.password);
        self.secure = file.secure.or(self.secure);
        self.timeout = file.timeout_ms.map(Duration::from_millis).or(self.timeout);
        self.client_name = file.client_name.or(self.client_name);
        self.max_retries = file.max_retries.or(self.max_retries);
        self.retry_delay = file
            .retry_delay_ms
            .map(Duration::from_millis)
            .or(self.retry_delay);
        self.skip_authentication = file.skip_authentication.or(self.skip_authentication);
        self.debug = file.debug.or(self.debug);
        self
    }

    /// Applies command-line override tokens.
    ///
    /// Recognized flags: `--host`, `--user`, `--password`, `--port`,
    /// `--retries`, `--secure`, `--debug`. A value flag with no following
    /// token is silently ignored, as is a numeric flag with a
    /// non-numeric value.
    #[must_use]
    pub fn merge_args<S: AsRef<str>>(mut self, args: &[S]) -> Self {
        let mut index = 0;
        while index < args.len() {
            let flag = args[index].as_ref();
            let value: Option<&str> = args.get(index + 1).map(AsRef::as_ref);
            match flag {
                "--host" | "--user" | "--password" => {
                    if let Some(value) = value {
                        match flag {
                            "--host" => self.host = Some(value.to_string()),
                            "--user" => self.user = Some(value.to_string()),
                            _ => self.password = Some(value.to_string()),
                        }
                        index += 1;
                    }
                }
                "--port" => {
                    if let Some(port) = value.and_then(|v| v.parse::<u16>().ok()) {
                        self.port = Some(port);
                    }
                    if value.is_some() {
                        index += 1;
                    }
                }
                "--retries" => {
                    if let Some(retries) = value.and_then(|v| v.parse::<u32>().ok()) {
                        self.max_retries = Some(retries);
                    }
                    if value.is_some() {
                        index += 1;
                    }
                }
                "--secure" => self.secure = Some(true),
                "--debug" => self.debug = Some(true),
                _ => {}
            }
            index += 1;
        }
        self
    }

    /// Validates and resolves the configuration.
    ///
    /// # Errors
    ///
    /// Fails when no host is configured, or the port or timeout is
    /// out of range.
    pub fn build(self) -> Result<ClientConfiguration, ConfigError> {
        let host = self.host.filter(|h| !h.is_empty()).ok_or(ConfigError::MissingHost)?;

        let secure = self.secure.unwrap_or(false);
        let port = self
            .port
            .unwrap_or(if secure { SMTPS_PORT } else { SUBMISSION_PORT });
        if port == 0 {
            return Err(ConfigError::InvalidPort);
        }

        let timeout = self.timeout.unwrap_or(Duration::from_secs(10));
        if timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout);
        }

        Ok(ClientConfiguration {
            host,
            port,
            user: self.user.unwrap_or_default(),
            password: self.password.unwrap_or_default(),
            secure,
            timeout,
            client_name: self.client_name.unwrap_or_else(machine_name),
            max_retries: self.max_retries.unwrap_or(3),
            retry_delay: self.retry_delay.unwrap_or(Duration::from_secs(1)),
            skip_authentication: self.skip_authentication.unwrap_or(false),
            debug: self.debug.unwrap_or(false),
        })
    }
}

/// Best-effort machine host name for the EHLO greeting.
fn machine_name() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn args(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn defaults_for_cleartext() {
        let config = ClientConfiguration::builder()
            .host("smtp.example.com")
            .build()
            .unwrap();
        assert_eq!(config.port, 587);
        assert!(!config.secure);
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_delay, Duration::from_secs(1));
        assert!(!config.skip_authentication);
        assert!(!config.debug);
    }

    #[test]
    fn defaults_for_implicit_tls() {
        let config = ClientConfiguration::builder()
            .host("smtp.example.com")
            .secure(true)
            .build()
            .unwrap();
        assert_eq!(config.port, 465);
        assert!(config.secure);
    }

    #[test]
    fn explicit_port_wins_over_mode_default() {
        let config = ClientConfiguration::builder()
            .host("smtp.example.com")
            .secure(true)
            .port(2525)
            .build()
            .unwrap();
        assert_eq!(config.port, 2525);
    }

    #[test]
    fn missing_host_fails_validation() {
        assert!(matches!(
            ClientConfiguration::builder().build(),
            Err(ConfigError::MissingHost)
        ));
        assert!(matches!(
            ClientConfiguration::builder().host("").build(),
            Err(ConfigError::MissingHost)
        ));
    }

    #[test]
    fn zero_port_and_timeout_fail_validation() {
        assert!(matches!(
            ClientConfiguration::builder()
                .host("h.example.com")
                .port(0)
                .build(),
            Err(ConfigError::InvalidPort)
        ));
        assert!(matches!(
            ClientConfiguration::builder()
                .host("h.example.com")
                .timeout(Duration::ZERO)
                .build(),
            Err(ConfigError::InvalidTimeout)
        ));
    }

    #[test]
    fn cli_overrides_take_highest_precedence() {
        let config = ClientConfiguration::builder()
            .host("low.example.com")
            .port(1111)
            .merge_args(&args(&[
                "--host",
                "high.example.com",
                "--port",
                "2222",
                "--secure",
                "--debug",
                "--retries",
                "7",
            ]))
            .build()
            .unwrap();
        assert_eq!(config.host, "high.example.com");
        assert_eq!(config.port, 2222);
        assert!(config.secure);
        assert!(config.debug);
        assert_eq!(config.max_retries, 7);
    }

    #[test]
    fn dangling_value_flag_is_ignored() {
        let config = ClientConfiguration::builder()
            .host("smtp.example.com")
            .merge_args(&args(&["--port"]))
            .build()
            .unwrap();
        assert_eq!(config.port, 587);

        let config = ClientConfiguration::builder()
            .merge_args(&args(&["--host"]))
            .build();
        assert!(matches!(config, Err(ConfigError::MissingHost)));
    }

    #[test]
    fn non_numeric_value_is_ignored() {
        let config = ClientConfiguration::builder()
            .host("smtp.example.com")
            .merge_args(&args(&["--port", "not-a-port", "--retries", "many"]))
            .build()
            .unwrap();
        assert_eq!(config.port, 587);
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn unknown_flags_are_skipped() {
        let config = ClientConfiguration::builder()
            .host("smtp.example.com")
            .merge_args(&args(&["--frobnicate", "--port", "2525"]))
            .build()
            .unwrap();
        assert_eq!(config.port, 2525);
    }

    #[test]
    fn file_layer_sits_between_programmatic_and_cli() {
        let dir = std::env::temp_dir().join("mikromail-config-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("layered.config.json");
        std::fs::write(
            &path,
            r#"{"host": "file.example.com", "port": 1025, "debug": true}"#,
        )
        .unwrap();

        let config = ClientConfiguration::builder()
            .host("code.example.com")
            .user("code-user@example.com")
            .merge_file(&path)
            .merge_args(&args(&["--port", "2525"]))
            .build()
            .unwrap();

        // File overrides code, CLI overrides file; untouched fields survive.
        assert_eq!(config.host, "file.example.com");
        assert_eq!(config.port, 2525);
        assert!(config.debug);
        assert_eq!(config.user, "code-user@example.com");

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn absent_file_is_not_an_error() {
        let config = ClientConfiguration::builder()
            .host("smtp.example.com")
            .merge_file("does-not-exist.config.json")
            .build()
            .unwrap();
        assert_eq!(config.host, "smtp.example.com");
    }

    #[test]
    fn default_file_lookup_tolerates_absence() {
        let config = ClientConfiguration::builder()
            .host("smtp.example.com")
            .merge_default_file()
            .build()
            .unwrap();
        assert_eq!(config.host, "smtp.example.com");
    }

    #[test]
    fn malformed_file_is_ignored() {
        let dir = std::env::temp_dir().join("mikromail-config-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("broken.config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let config = ClientConfiguration::builder()
            .host("smtp.example.com")
            .merge_file(&path)
            .build()
            .unwrap();
        assert_eq!(config.host, "smtp.example.com");

        std::fs::remove_file(&path).unwrap();
    }
}
