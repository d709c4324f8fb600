//! Admin routes.

use axum::{
    extract::{Form, State},
    response::Html,
    routing::{get, post},
    Router,
};
use lsptap_trace::TraceFormat;
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::error;

use crate::page;
use crate::state::AdminState;

/// Create the router with all admin routes.
pub fn create_router(state: AdminState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(main_page))
        .route("/send", post(send_message))
        .route("/format", post(set_format))
        .route("/exit", get(exit))
        .layer(cors)
        .with_state(state)
}

async fn main_page(State(state): State<AdminState>) -> Html<String> {
    Html(page::render(&state, &[], &[]))
}

#[derive(Deserialize)]
struct SendForm {
    #[serde(default)]
    target: String,
    #[serde(default)]
    message: String,
}

/// Inject a canned message at a named receiver. Failures are collected and
/// rendered in the page, not returned as HTTP errors.
async fn send_message(State(state): State<AdminState>, Form(form): Form<SendForm>) -> Html<String> {
    let mut errors = Vec::new();

    let receiver = if form.target.is_empty() {
        errors.push("No target specified".to_string());
        None
    } else {
        match state.registry.get(&form.target) {
            Some(receiver) => {
                state.remember_target(&form.target);
                Some(receiver)
            }
            None => {
                errors.push("No such receiver".to_string());
                None
            }
        }
    };

    if form.message.is_empty() {
        errors.push("No message specified".to_string());
    } else {
        match state.store.load(&form.message).await {
            Err(err) => {
                errors.push(format!("Load request from file {}: {err}", form.message));
            }
            Ok(envelope) => {
                state.remember_message(&form.message);
                if let Some(receiver) = receiver {
                    if let Err(err) = receiver.send_message(&form.target, envelope).await {
                        errors.push(format!("Send msg to {}: {err}", form.target));
                    }
                }
            }
        }
    }

    if errors.is_empty() {
        Html(page::render(&state, &["Message sent".to_string()], &[]))
    } else {
        Html(page::render(&state, &[], &errors))
    }
}

#[derive(Deserialize)]
struct FormatForm {
    #[serde(default)]
    sink: String,
    #[serde(default)]
    format: String,
}

/// Switch the console or file traffic format at runtime.
async fn set_format(State(state): State<AdminState>, Form(form): Form<FormatForm>) -> Html<String> {
    let Some(format) = TraceFormat::parse(&form.format) else {
        return Html(page::render(
            &state,
            &[],
            &[format!("Unknown log format: {}", form.format)],
        ));
    };

    let result = match form.sink.as_str() {
        "console" => {
            state.trace.set_console_format(format);
            format!("Console log format now {format}")
        }
        "file" => {
            if state.trace.has_file() {
                state.trace.set_file_format(format);
                format!("Log file format now {format}")
            } else {
                return Html(page::render(&state, &[], &["No log file configured".to_string()]));
            }
        }
        other => {
            error!(sink = other, "unknown format sink");
            return Html(page::render(&state, &[], &[format!("Unknown sink: {other}")]));
        }
    };

    Html(page::render(&state, &[result], &[]))
}

/// Shut the whole tester down.
async fn exit(State(state): State<AdminState>) -> Html<String> {
    let terminator = state.terminator.clone();
    tokio::spawn(async move {
        if let Err(error) = terminator.shutdown().await {
            error!(%error, "terminating");
        }
    });
    Html(page::render_exit())
}
