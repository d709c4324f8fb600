//! HTML rendering for the admin pages.

use std::fmt::Write;

use lsptap_trace::TraceFormat;

use crate::state::AdminState;

const STYLE: &str = "\
body { font-family: sans-serif; margin: 2em; } \
h1 { font-size: 1.4em; } h2 { font-size: 1.1em; margin-top: 1.5em; } \
.err { color: #a00; } .ok { color: #070; } \
table { border-collapse: collapse; } td, th { padding: 0.2em 0.8em; text-align: left; }";

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn format_options(selected: TraceFormat) -> String {
    let mut out = String::new();
    for format in TraceFormat::all() {
        let marker = if *format == selected { " selected" } else { "" };
        let _ = write!(out, "<option value=\"{format}\"{marker}>{format}</option>");
    }
    out
}

/// Render the main console page with any results or errors from the last
/// form submission.
pub fn render(state: &AdminState, results: &[String], errors: &[String]) -> String {
    let last = state.last();
    let mut body = String::new();

    let _ = write!(body, "<html><head><title>lsptap</title><style>{STYLE}</style></head><body>");
    let _ = write!(body, "<h1>lsptap</h1>");

    for error in errors {
        let _ = write!(body, "<p class=\"err\">{}</p>", escape(error));
    }
    for result in results {
        let _ = write!(body, "<p class=\"ok\">{}</p>", escape(result));
    }

    let _ = write!(body, "<h2>Receivers</h2><ul>");
    let names = state.registry.names();
    if names.is_empty() {
        let _ = write!(body, "<li><i>none</i></li>");
    }
    for name in &names {
        let _ = write!(body, "<li>{}</li>", escape(name));
    }
    let _ = write!(body, "</ul>");

    let _ = write!(body, "<h2>Send message</h2>");
    let _ = write!(body, "<form method=\"post\" action=\"/send\">");
    let _ = write!(body, "Target: <select name=\"target\">");
    for name in &names {
        let marker = if *name == last.target { " selected" } else { "" };
        let _ = write!(body, "<option value=\"{0}\"{marker}>{0}</option>", escape(name));
    }
    let _ = write!(body, "</select> Message: <select name=\"message\">");
    for message in state.store.names() {
        let marker = if *message == last.message { " selected" } else { "" };
        let _ = write!(body, "<option value=\"{0}\"{marker}>{0}</option>", escape(message));
    }
    let _ = write!(body, "</select> <input type=\"submit\" value=\"Send\"/></form>");

    let _ = write!(body, "<h2>Log formats</h2>");
    let _ = write!(body, "<form method=\"post\" action=\"/format\">");
    let _ = write!(
        body,
        "Console: <select name=\"format\">{}</select>",
        format_options(state.trace.console_format())
    );
    let _ = write!(body, "<input type=\"hidden\" name=\"sink\" value=\"console\"/>");
    let _ = write!(body, " <input type=\"submit\" value=\"Set\"/></form>");
    if let Some(file_format) = state.trace.file_format() {
        let _ = write!(body, "<form method=\"post\" action=\"/format\">");
        let _ = write!(
            body,
            "File: <select name=\"format\">{}</select>",
            format_options(file_format)
        );
        let _ = write!(body, "<input type=\"hidden\" name=\"sink\" value=\"file\"/>");
        let _ = write!(body, " <input type=\"submit\" value=\"Set\"/></form>");
    }

    let _ = write!(body, "<p><a href=\"/exit\">Exit lsptap</a></p>");
    let _ = write!(body, "</body></html>");
    body
}

/// The farewell page shown while shutdown runs.
pub fn render_exit() -> String {
    format!(
        "<html><head><title>lsptap</title><style>{STYLE}</style></head>\
         <body><h1>lsptap</h1><p>Shutting down.</p></body></html>"
    )
}
