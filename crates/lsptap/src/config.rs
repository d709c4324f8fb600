//! Command-line flags and their validation.
//!
//! Most invocations give only ports or a command; the operating mode and
//! protocol are inferred from what was provided. Explicit `--mode` and
//! `--protocol` override the inference, after which the combination is
//! cross-checked (a tcp client needs its port, a subprocess server needs
//! its command) so problems surface at startup rather than mid-session.

use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use lsptap_trace::{FileSinkOptions, TraceFormat, TraceOptions};
use thiserror::Error;
use tracing::warn;

#[derive(Parser, Debug)]
#[command(
    name = "lsptap",
    version,
    about = "Interactive tester and pass-through proxy for LSP servers"
)]
pub struct Cli {
    /// Operating mode (inferred from the ports when omitted)
    #[arg(long, value_enum)]
    pub mode: Option<Mode>,

    /// Communication protocol (inferred when omitted)
    #[arg(long, value_enum)]
    pub protocol: Option<Protocol>,

    /// Host address of the language server
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on for editor connections
    #[arg(long, default_value_t = 0)]
    pub client_port: u16,

    /// Port to dial when contacting the language server
    #[arg(long, default_value_t = 0)]
    pub server_port: u16,

    /// HTTP admin port (0 disables the console)
    #[arg(long, default_value_t = 0)]
    pub web_port: u16,

    /// Language server command line to run as a child process
    #[arg(long)]
    pub command: Option<String>,

    /// Message file to inject at startup
    #[arg(long)]
    pub request: Option<PathBuf>,

    /// Directory of injectable message files
    #[arg(long)]
    pub messages: Option<PathBuf>,

    /// Truncation length for keyword-format fields
    #[arg(long, default_value_t = 32)]
    pub max_field_len: usize,

    /// Log level
    #[arg(long, default_value = "info", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    /// Console traffic format
    #[arg(long, default_value = "default", value_parser = parse_trace_format)]
    pub log_format: TraceFormat,

    /// Secondary traffic log file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Traffic format for the log file
    #[arg(long, default_value = "default", value_parser = parse_trace_format)]
    pub file_format: TraceFormat,

    /// Append to a pre-existing log file
    #[arg(long)]
    pub file_append: bool,

    /// Log pass-through traffic twice with the tester in the middle
    #[arg(long)]
    pub log_msg_twice: bool,
}

fn parse_trace_format(s: &str) -> Result<TraceFormat, String> {
    TraceFormat::parse(s).ok_or_else(|| format!("unrecognized format '{s}'"))
}

/// The operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Accept editor connections, pretending to be the language server.
    Client,
    /// Pass traffic through between an editor and a real server.
    Nexus,
    /// Dial the language server, pretending to be the editor.
    Server,
}

impl Mode {
    /// Does this mode accept editor connections?
    pub fn client_connection(&self) -> bool {
        matches!(self, Mode::Client | Mode::Nexus)
    }

    /// Does this mode talk to a real language server?
    pub fn server_connection(&self) -> bool {
        matches!(self, Mode::Nexus | Mode::Server)
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Mode::Client => "client",
            Mode::Nexus => "nexus",
            Mode::Server => "server",
        })
    }
}

/// How the language server is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Protocol {
    /// TCP ports.
    Tcp,
    /// A child process, over its stdin/stdout.
    Sub,
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Protocol::Tcp => "tcp",
            Protocol::Sub => "sub",
        })
    }
}

/// Flag validation failures; any of these aborts startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("can't guess --mode")]
    NoMode,

    #[error("can't guess --protocol")]
    NoProtocol,

    #[error("no --client-port for tcp/{0}")]
    MissingClientPort(Mode),

    #[error("no --server-port for tcp/{0}")]
    MissingServerPort(Mode),

    #[error("no --command for sub/{0}")]
    MissingCommand(Mode),

    #[error("--command is empty")]
    EmptyCommand,

    #[error("command {0} not found or not executable")]
    CommandNotFound(String),

    #[error("--messages {0} is not a directory")]
    BadMessageDir(PathBuf),

    #[error("request path {0} not found")]
    RequestNotFound(PathBuf),

    #[error("log file directory {0} does not exist")]
    BadLogFileDir(PathBuf),
}

/// Validated runtime configuration.
#[derive(Debug)]
pub struct Config {
    pub mode: Mode,
    pub protocol: Protocol,
    pub host: String,
    pub client_port: u16,
    pub server_port: u16,
    pub web_port: u16,
    /// Resolved command path and its arguments.
    pub command: Option<(String, Vec<String>)>,
    pub message_dir: Option<PathBuf>,
    pub request_path: Option<PathBuf>,
    pub log_msg_twice: bool,
    pub log_level: String,
    pub trace: TraceOptions,
}

impl Config {
    /// Validate flags into a runnable configuration.
    pub fn resolve(cli: &Cli) -> Result<Self, ConfigError> {
        let mode = check_mode(cli)?;
        let protocol = check_protocol(cli, mode)?;

        let command = match &cli.command {
            Some(command) => Some(resolve_command(command)?),
            None => None,
        };

        let message_dir = match &cli.messages {
            Some(dir) => {
                let dir = fix_home_path(dir);
                if !dir.is_dir() {
                    return Err(ConfigError::BadMessageDir(dir));
                }
                Some(dir)
            }
            None => None,
        };

        let request_path = match &cli.request {
            Some(request) => Some(resolve_request_path(request, message_dir.as_deref())?),
            None => None,
        };

        let file = match &cli.log_file {
            Some(path) => {
                let path = fix_home_path(path);
                let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
                if let Some(dir) = dir {
                    if !dir.is_dir() {
                        return Err(ConfigError::BadLogFileDir(dir.to_path_buf()));
                    }
                }
                Some(FileSinkOptions {
                    path,
                    format: cli.file_format,
                    append: cli.file_append,
                })
            }
            None => None,
        };

        Ok(Config {
            mode,
            protocol,
            host: cli.host.clone(),
            client_port: cli.client_port,
            server_port: cli.server_port,
            web_port: cli.web_port,
            command,
            message_dir,
            request_path,
            log_msg_twice: cli.log_msg_twice,
            log_level: cli.log_level.clone(),
            trace: TraceOptions {
                console_format: cli.log_format,
                file,
                max_field_len: cli.max_field_len,
            },
        })
    }
}

fn check_mode(cli: &Cli) -> Result<Mode, ConfigError> {
    if let Some(mode) = cli.mode {
        return Ok(mode);
    }
    if cli.server_port != 0 && cli.client_port != 0 {
        Ok(Mode::Nexus)
    } else if cli.client_port != 0 {
        Ok(Mode::Client)
    } else if cli.server_port != 0 {
        Ok(Mode::Server)
    } else {
        Err(ConfigError::NoMode)
    }
}

fn check_protocol(cli: &Cli, mode: Mode) -> Result<Protocol, ConfigError> {
    let protocol = match cli.protocol {
        Some(protocol) => protocol,
        None => {
            if cli.command.is_some() {
                Protocol::Sub
            } else if cli.server_port != 0 || cli.client_port != 0 {
                Protocol::Tcp
            } else {
                return Err(ConfigError::NoProtocol);
            }
        }
    };

    match protocol {
        Protocol::Sub => {
            if mode.server_connection() && cli.command.is_none() {
                return Err(ConfigError::MissingCommand(mode));
            }
            if cli.client_port != 0 {
                warn!("--client-port will be ignored in sub protocol");
            }
            if cli.server_port != 0 {
                warn!("--server-port will be ignored in sub protocol");
            }
        }
        Protocol::Tcp => {
            if mode.client_connection() && cli.client_port == 0 {
                return Err(ConfigError::MissingClientPort(mode));
            }
            if mode.server_connection() && cli.server_port == 0 {
                return Err(ConfigError::MissingServerPort(mode));
            }
            if cli.command.is_some() {
                warn!("--command will be ignored in tcp protocol");
            }
        }
    }
    Ok(protocol)
}

/// Split the command line and resolve its program on the PATH.
fn resolve_command(command: &str) -> Result<(String, Vec<String>), ConfigError> {
    let mut parts = command.split_whitespace();
    let program = parts.next().ok_or(ConfigError::EmptyCommand)?;
    let args: Vec<String> = parts.map(str::to_string).collect();
    let path =
        lookup_path(program).ok_or_else(|| ConfigError::CommandNotFound(program.to_string()))?;
    Ok((path, args))
}

fn lookup_path(program: &str) -> Option<String> {
    let direct = Path::new(program);
    if direct.components().count() > 1 {
        return is_executable(direct).then(|| program.to_string());
    }
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths).find_map(|dir| {
        let candidate = dir.join(program);
        is_executable(&candidate).then(|| candidate.to_string_lossy().into_owned())
    })
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Expand a leading `~` component to the user's home directory.
fn fix_home_path(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}

/// Resolve the request flag against its possible interpretations: under the
/// home directory for a `~/` path, else relative to the messages directory,
/// as an absolute path, or as given. The first existing non-directory wins.
fn resolve_request_path(
    request: &Path,
    message_dir: Option<&Path>,
) -> Result<PathBuf, ConfigError> {
    if request.starts_with("~") {
        let expanded = fix_home_path(request);
        if expanded.is_file() {
            return Ok(expanded);
        }
        return Err(ConfigError::RequestNotFound(request.to_path_buf()));
    }

    let mut candidates = Vec::with_capacity(3);
    if let Some(dir) = message_dir {
        candidates.push(dir.join(request));
    }
    if let Ok(abs) = std::path::absolute(request) {
        candidates.push(abs);
    }
    candidates.push(request.to_path_buf());

    candidates
        .into_iter()
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| ConfigError::RequestNotFound(request.to_path_buf()))
}
