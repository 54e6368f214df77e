//! Server acceptor: owns the listening socket, fans accepted connections
//! out as tasks, and drains them on shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;

use methq_index::IndexSet;

use crate::config::ServerConfig;
use crate::connection::{ServerContext, handle_connection};
use crate::errors::ServerError;
use crate::methylome_set::MethylomeSet;

pub struct Server {
    listener: TcpListener,
    ctx: Arc<ServerContext>,
}

impl Server {
    /// Bind the configured endpoint and assemble the shared context. The
    /// index directory is loaded here, once; it is immutable afterwards.
    pub async fn bind(config: &ServerConfig) -> Result<Self, ServerError> {
        let indexes = IndexSet::load_dir(&config.index_dir)?;
        if indexes.is_empty() {
            return Err(ServerError::Config(format!(
                "no genome indexes found in {}",
                config.index_dir.display()
            )));
        }
        tracing::info!(
            assemblies = ?indexes.assemblies(),
            "loaded genome indexes"
        );

        let ctx = Arc::new(ServerContext {
            indexes,
            methylomes: MethylomeSet::new(&config.methylome_dir, config.max_resident),
            min_bin_size: config.min_bin_size,
            max_intervals: config.max_intervals,
            idle_timeout: Duration::from_secs(config.idle_timeout_secs),
        });

        let listener = TcpListener::bind((config.hostname.as_str(), config.port)).await?;
        tracing::info!(addr = %listener.local_addr()?, "listening");
        Ok(Server { listener, ctx })
    }

    /// The bound address; useful when the configured port was 0.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    pub fn context(&self) -> Arc<ServerContext> {
        self.ctx.clone()
    }

    /// Accept until `shutdown` fires, then stop accepting, cancel in-flight
    /// connections and drain their tasks.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<(), ServerError> {
        let mut connections = JoinSet::new();
        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            tracing::debug!(%peer, "accepted connection");
                            connections.spawn(handle_connection(stream, peer, self.ctx.clone()));
                        }
                        Err(error) => {
                            tracing::warn!(%error, "accept failed");
                        }
                    }
                }
                _ = shutdown.changed() => {
                    tracing::info!("shutdown requested");
                    break;
                }
            }
            // reap whatever finished without blocking the accept loop
            while connections.try_join_next().is_some() {}
        }

        drop(self.listener);
        connections.abort_all();
        while connections.join_next().await.is_some() {}
        tracing::info!("server drained");
        Ok(())
    }
}

/// Channel used to ask a running server to stop.
pub fn shutdown_channel() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

/// Resolve on SIGINT, SIGTERM or SIGQUIT and flip the shutdown switch.
pub async fn shutdown_on_signal(trigger: watch::Sender<bool>) {
    use tokio::signal::unix::{SignalKind, signal};

    let mut interrupt = match signal(SignalKind::interrupt()) {
        Ok(s) => s,
        Err(error) => {
            tracing::error!(%error, "failed to install SIGINT handler");
            return;
        }
    };
    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(error) => {
            tracing::error!(%error, "failed to install SIGTERM handler");
            return;
        }
    };
    let mut quit = match signal(SignalKind::quit()) {
        Ok(s) => s,
        Err(error) => {
            tracing::error!(%error, "failed to install SIGQUIT handler");
            return;
        }
    };

    tokio::select! {
        _ = interrupt.recv() => tracing::info!("caught SIGINT"),
        _ = terminate.recv() => tracing::info!("caught SIGTERM"),
        _ = quit.recv() => tracing::info!("caught SIGQUIT"),
    }
    let _ = trigger.send(true);
}

/// Write the daemon pid with exclusive create, failing when a previous
/// instance left its file behind.
pub fn write_pid_file(path: &std::path::Path) -> Result<(), ServerError> {
    use std::io::Write;

    let mut file = std::fs::File::create_new(path).map_err(|error| {
        ServerError::Config(format!("pid file {}: {}", path.display(), error))
    })?;
    writeln!(file, "{}", std::process::id())?;
    Ok(())
}
