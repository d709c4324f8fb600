//! Traffic logging for lsptap.
//!
//! Every payload a receiver sends or receives goes through [`MessageLog`],
//! which infers the message direction from its endpoint labels and renders
//! the payload in the configured [`TraceFormat`]. The console sink emits
//! through `tracing` under the `lsptap::traffic` target; an optional file
//! sink writes timestamped lines directly. Either sink's format can be
//! switched at runtime from the admin console.

pub mod correlate;
pub mod format;
pub mod render;

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use serde_json::{json, Value};
use thiserror::Error;
use tracing::{info, warn};

pub use correlate::{CorrelationCache, ID_EXPIRATION};
pub use format::TraceFormat;
pub use render::{direction, render_keyword};

/// Whether a payload was sent by the tester or received off the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceKind {
    Send,
    Rcvd,
}

impl TraceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TraceKind::Send => "Send",
            TraceKind::Rcvd => "Rcvd",
        }
    }
}

/// Errors configuring the traffic logger.
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("open log file {path}: {source}")]
    OpenFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Secondary sink configuration.
#[derive(Debug, Clone)]
pub struct FileSinkOptions {
    pub path: PathBuf,
    pub format: TraceFormat,
    pub append: bool,
}

/// Traffic logger options.
#[derive(Debug, Clone)]
pub struct TraceOptions {
    pub console_format: TraceFormat,
    pub file: Option<FileSinkOptions>,
    pub max_field_len: usize,
}

impl Default for TraceOptions {
    fn default() -> Self {
        Self {
            console_format: TraceFormat::Default,
            file: None,
            max_field_len: 32,
        }
    }
}

struct FileSink {
    format: RwLock<TraceFormat>,
    writer: Mutex<File>,
}

/// Renders and emits traffic lines for every observed payload.
pub struct MessageLog {
    max_field_len: usize,
    console_format: RwLock<TraceFormat>,
    file: Option<FileSink>,
    cache: CorrelationCache,
}

impl MessageLog {
    pub fn new(options: TraceOptions) -> Result<Self, TraceError> {
        let file = match options.file {
            Some(opts) => Some(FileSink {
                format: RwLock::new(opts.format),
                writer: Mutex::new(open_sink_file(&opts.path, opts.append)?),
            }),
            None => None,
        };
        Ok(Self {
            max_field_len: options.max_field_len,
            console_format: RwLock::new(options.console_format),
            file,
            cache: CorrelationCache::new(),
        })
    }

    /// Log one payload flowing `from` → `to`.
    pub fn message(&self, from: &str, to: &str, kind: TraceKind, payload: &[u8]) {
        let (direction, certain) = direction(from, to);
        if !certain {
            warn!(from, to, "uncertain direction");
        }

        let line = self.render(&direction, kind, payload, self.console_format());
        info!(target: "lsptap::traffic", "{line}");

        if let Some(sink) = &self.file {
            let format = *sink.format.read().unwrap();
            let line = self.render(&direction, kind, payload, format);
            let stamped = format!("{} {line}\n", chrono::Local::now().format("%H:%M:%S"));
            let mut writer = sink.writer.lock().unwrap();
            if let Err(error) = writer.write_all(stamped.as_bytes()) {
                warn!(%error, "write traffic line to log file");
            }
        }
    }

    /// Render one traffic line in the given format.
    pub fn render(&self, direction: &str, kind: TraceKind, payload: &[u8], format: TraceFormat) -> String {
        let size = payload.len();
        match format {
            TraceFormat::Default => {
                format!(
                    "{} !={direction} #size={size} msg={}",
                    kind.as_str(),
                    String::from_utf8_lossy(payload)
                )
            }
            TraceFormat::Expand => {
                let pretty = serde_json::from_slice::<Value>(payload)
                    .and_then(|v| serde_json::to_string_pretty(&v))
                    .unwrap_or_else(|_| String::from_utf8_lossy(payload).into_owned());
                format!("{} !={direction} #size={size}\n{pretty}", kind.as_str())
            }
            TraceFormat::Json => {
                let msg = serde_json::from_slice::<Value>(payload)
                    .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(payload).into_owned()));
                json!({
                    "!": direction,
                    "#size": size,
                    "msg": msg,
                    "message": kind.as_str(),
                })
                .to_string()
            }
            TraceFormat::Keyword => match serde_json::from_slice(payload) {
                Ok(envelope) => {
                    let fields = render_keyword(&envelope, &self.cache, self.max_field_len);
                    format!("{} !={direction} #size={size} {fields}", kind.as_str())
                }
                Err(error) => {
                    // Unparseable payloads fall back to the raw rendering.
                    warn!(%error, "unmarshal traffic payload");
                    self.render(direction, kind, payload, TraceFormat::Default)
                }
            },
        }
    }

    pub fn console_format(&self) -> TraceFormat {
        *self.console_format.read().unwrap()
    }

    pub fn set_console_format(&self, format: TraceFormat) {
        *self.console_format.write().unwrap() = format;
    }

    pub fn has_file(&self) -> bool {
        self.file.is_some()
    }

    /// The file sink format, if a file sink is configured.
    pub fn file_format(&self) -> Option<TraceFormat> {
        self.file.as_ref().map(|sink| *sink.format.read().unwrap())
    }

    pub fn set_file_format(&self, format: TraceFormat) {
        if let Some(sink) = &self.file {
            *sink.format.write().unwrap() = format;
        }
    }
}

/// Open the secondary sink, separating runs with a blank line when
/// appending to an existing file.
fn open_sink_file(path: &Path, append: bool) -> Result<File, TraceError> {
    let mut options = OpenOptions::new();
    options.create(true).write(true);
    if append {
        options.append(true);
    } else {
        options.truncate(true);
    }
    let mut file = options.open(path).map_err(|source| TraceError::OpenFile {
        path: path.to_path_buf(),
        source,
    })?;
    if append {
        if let Ok(meta) = file.metadata() {
            if meta.len() > 0 {
                let _ = writeln!(file);
            }
        }
    }
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log() -> MessageLog {
        MessageLog::new(TraceOptions::default()).unwrap()
    }

    #[test]
    fn default_format_carries_raw_payload() {
        let payload = br#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#;
        let line = log().render("client-1-->server", TraceKind::Send, payload, TraceFormat::Default);
        assert!(line.starts_with("Send !=client-1-->server #size=46 msg="));
        assert!(line.ends_with(r#"msg={"jsonrpc":"2.0","id":1,"method":"initialize"}"#));
    }

    #[test]
    fn expand_format_pretty_prints_payload() {
        let line = log().render(
            "client-1-->server",
            TraceKind::Rcvd,
            br#"{"id":1}"#,
            TraceFormat::Expand,
        );
        assert!(line.starts_with("Rcvd !=client-1-->server #size=8\n"));
        assert!(line.contains("{\n  \"id\": 1\n}"));
    }

    #[test]
    fn json_format_is_machine_readable() {
        let line = log().render(
            "server<--client-1",
            TraceKind::Send,
            br#"{"id":2,"result":true}"#,
            TraceFormat::Json,
        );
        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["!"], "server<--client-1");
        assert_eq!(parsed["#size"], 22);
        assert_eq!(parsed["msg"]["result"], true);
        assert_eq!(parsed["message"], "Send");
    }

    #[test]
    fn default_and_json_formats_agree_on_payload() {
        let payload = br#"{"id":7,"method":"shutdown"}"#;
        let raw = log().render("a", TraceKind::Send, payload, TraceFormat::Default);
        let json_line = log().render("a", TraceKind::Send, payload, TraceFormat::Json);

        let raw_msg: Value =
            serde_json::from_str(raw.split_once("msg=").unwrap().1).unwrap();
        let json_msg: Value = serde_json::from_str(&json_line).unwrap();
        assert_eq!(raw_msg, json_msg["msg"]);
    }

    #[test]
    fn keyword_format_falls_back_on_garbage() {
        let line = log().render("d", TraceKind::Rcvd, b"not json", TraceFormat::Keyword);
        assert!(line.contains("msg=not json"), "{line}");
    }

    #[test]
    fn keyword_format_renders_envelope_fields() {
        let payload = br#"{"id":3,"method":"textDocument/hover","params":{"uri":"file:///a"}}"#;
        let line = log().render("x", TraceKind::Send, payload, TraceFormat::Keyword);
        assert!(line.contains("%method=textDocument/hover"), "{line}");
        assert!(line.contains("$Type=request"), "{line}");
    }

    #[test]
    fn file_sink_receives_stamped_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("traffic.log");
        let log = MessageLog::new(TraceOptions {
            console_format: TraceFormat::Default,
            file: Some(FileSinkOptions {
                path: path.clone(),
                format: TraceFormat::Default,
                append: false,
            }),
            max_field_len: 32,
        })
        .unwrap();

        log.message("client-1", "server", TraceKind::Send, br#"{"id":1}"#);

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("Send !=client-1-->server #size=8"), "{content}");
    }

    #[test]
    fn formats_switch_at_runtime() {
        let log = log();
        assert_eq!(log.console_format(), TraceFormat::Default);
        log.set_console_format(TraceFormat::Keyword);
        assert_eq!(log.console_format(), TraceFormat::Keyword);
        assert_eq!(log.file_format(), None);
    }
}
