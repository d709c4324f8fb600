//! Wiring the configured pieces together and running until shutdown.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use lsptap_core::{
    cross_wire, CallerHandler, Handler, Listener, ProcessHandler, Receiver, Registry,
    SocketHandler, Terminator, SERVER_NAME,
};
use lsptap_protocol::{load_message, MessageStore};
use lsptap_trace::MessageLog;
use lsptap_web::AdminServer;
use tokio::net::TcpStream;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

use crate::config::{Config, Protocol};

/// Run the tester until every long-lived task has finished or a shutdown
/// signal arrives.
pub async fn run(config: Config) -> anyhow::Result<()> {
    info!("lsptap starting");

    let registry = Registry::new();
    let trace = Arc::new(MessageLog::new(config.trace.clone()).context("traffic log setup")?);
    let tasks = TaskTracker::new();
    let terminator = Terminator::new();

    // Upstream connection to the real language server, dialed or spawned.
    let server = if config.mode.server_connection() {
        let receiver = start_server_receiver(&config, &registry, &trace, &tasks).await?;
        inject_startup_request(&config, &receiver).await;
        Some(receiver)
    } else {
        None
    };

    // Client-facing side: a TCP listener, or the parent's own stdio when
    // lsptap was spawned as the language server.
    if config.mode.client_connection() {
        match config.protocol {
            Protocol::Tcp => {
                let listener = Listener::bind(
                    config.client_port,
                    registry.clone(),
                    Arc::clone(&trace),
                    tasks.clone(),
                    config.log_msg_twice,
                )
                .await
                .with_context(|| format!("listen on port {}", config.client_port))?;
                Arc::clone(&listener).spawn();
                terminator.register(listener);
            }
            Protocol::Sub => {
                let caller = Receiver::new(
                    "client",
                    Arc::new(CallerHandler::new()),
                    Arc::clone(&trace),
                    registry.clone(),
                    config.log_msg_twice,
                );
                if let Some(server) = &server {
                    info!("configuring pass-through operation");
                    cross_wire(&caller, server);
                }
                caller.start(&tasks).await?;
            }
        }
    }

    terminator.register(Arc::new(registry.clone()));

    if config.web_port > 0 {
        let store = Arc::new(load_store(&config).await);
        let admin = AdminServer::new(
            config.web_port,
            registry.clone(),
            Arc::clone(&trace),
            store,
            terminator.clone(),
        );
        admin.serve(&tasks).await.context("start admin server")?;
        terminator.register(admin);
    }

    tasks.close();
    tokio::select! {
        _ = shutdown_signal() => {
            info!("signal received, shutting down");
            if let Err(error) = terminator.shutdown().await {
                error!(%error, "terminating");
            }
        }
        _ = tasks.wait() => {}
    }

    // Give reader loops a moment to observe closed streams and exit.
    let _ = tokio::time::timeout(Duration::from_secs(5), tasks.wait()).await;

    info!("lsptap finished");
    Ok(())
}

/// Connect the `"server"` receiver over the configured transport.
async fn start_server_receiver(
    config: &Config,
    registry: &Registry,
    trace: &Arc<MessageLog>,
    tasks: &TaskTracker,
) -> anyhow::Result<Arc<Receiver>> {
    let handler: Arc<dyn Handler> = match config.protocol {
        Protocol::Tcp => {
            let address = format!("{}:{}", config.host, config.server_port);
            let stream = TcpStream::connect(&address)
                .await
                .with_context(|| format!("connect to LSP at {address}"))?;
            info!(%address, "connected to LSP server");
            Arc::new(SocketHandler::new(stream))
        }
        Protocol::Sub => {
            let (program, args) = config
                .command
                .as_ref()
                .context("sub protocol without a command")?;
            Arc::new(ProcessHandler::spawn(program, args)?)
        }
    };

    let receiver = Receiver::new(
        SERVER_NAME,
        handler,
        Arc::clone(trace),
        registry.clone(),
        config.log_msg_twice,
    );
    Arc::clone(&receiver).start(tasks).await?;
    Ok(receiver)
}

/// Send the `--request` payload, if one was given. Failures are logged,
/// not fatal: the session is still useful without the injection.
async fn inject_startup_request(config: &Config, receiver: &Arc<Receiver>) {
    let Some(path) = &config.request_path else {
        return;
    };
    match load_message(path).await {
        Ok(envelope) => {
            if let Err(error) = receiver.send_message(SERVER_NAME, envelope).await {
                error!(%error, path = %path.display(), "send message from file");
            }
        }
        Err(error) => error!(%error, path = %path.display(), "load request from file"),
    }
}

/// Scan the messages directory for the admin console.
async fn load_store(config: &Config) -> MessageStore {
    match &config.message_dir {
        Some(dir) => match MessageStore::scan(dir).await {
            Ok(store) => store,
            Err(error) => {
                warn!(%error, dir = %dir.display(), "unable to read message directory");
                MessageStore::empty()
            }
        },
        None => MessageStore::empty(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
