//! Traffic rendering formats.

/// How a traffic line is rendered on a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TraceFormat {
    /// One line with the raw payload appended.
    #[default]
    Default,
    /// Like `Default` but the payload is pretty-printed on following lines.
    Expand,
    /// Compact key=value line built from the JSON-RPC envelope fields.
    Keyword,
    /// A machine-readable JSON object per message.
    Json,
}

impl TraceFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            TraceFormat::Default => "default",
            TraceFormat::Expand => "expand",
            TraceFormat::Keyword => "keyword",
            TraceFormat::Json => "json",
        }
    }

    /// Parse a format name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "default" => Some(TraceFormat::Default),
            "expand" => Some(TraceFormat::Expand),
            "keyword" => Some(TraceFormat::Keyword),
            "json" => Some(TraceFormat::Json),
            _ => None,
        }
    }

    /// Every format, for UI pickers.
    pub fn all() -> &'static [TraceFormat] {
        &[
            TraceFormat::Default,
            TraceFormat::Expand,
            TraceFormat::Keyword,
            TraceFormat::Json,
        ]
    }
}

impl std::fmt::Display for TraceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
