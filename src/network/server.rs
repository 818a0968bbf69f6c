//! TCP Server
//!
//! Accepts connections and dispatches them to worker threads.

use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, TrySendError};

use crate::config::Config;
use crate::error::{PoolError, Result};
use crate::service::PoolService;

use super::Connection;

/// How long the acceptor sleeps when no connection is pending
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// TCP server for RankPool
///
/// One acceptor (the thread calling `run`) hands sockets to a fixed pool of
/// workers over a bounded channel. When the channel is full new connections
/// are refused.
pub struct Server {
    config: Config,
    service: PoolService,
    listener: TcpListener,
    shutdown: Arc<AtomicBool>,
}

impl Server {
    /// Bind the listen address from `config`
    pub fn bind(config: Config, service: PoolService) -> Result<Self> {
        if config.worker_threads == 0 {
            return Err(PoolError::Config(
                "worker_threads must be at least 1".to_string(),
            ));
        }
        if config.max_connections == 0 {
            return Err(PoolError::Config(
                "max_connections must be at least 1".to_string(),
            ));
        }

        let listener = TcpListener::bind(&config.listen_addr).map_err(|e| {
            PoolError::Network(format!("Failed to bind {}: {}", config.listen_addr, e))
        })?;
        listener.set_nonblocking(true)?;

        Ok(Self {
            config,
            service,
            listener,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// The address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Flag that stops the server once set
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Start the server (blocking until shutdown)
    ///
    /// Workers finish the connections they are serving before `run` returns.
    pub fn run(&self) -> Result<()> {
        let (sender, receiver) = channel::bounded::<TcpStream>(self.config.max_connections);

        let mut workers = Vec::with_capacity(self.config.worker_threads);
        for id in 0..self.config.worker_threads {
            workers.push(self.spawn_worker(id, receiver.clone())?);
        }
        drop(receiver);

        let addr = self.local_addr()?;
        tracing::info!(workers = self.config.worker_threads, "Listening on {}", addr);

        while !self.shutdown.load(Ordering::SeqCst) {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    if let Err(e) = stream.set_nonblocking(false) {
                        tracing::warn!("Dropping connection from {}: {}", peer, e);
                        continue;
                    }

                    match sender.try_send(stream) {
                        Ok(()) => tracing::trace!("Queued connection from {}", peer),
                        Err(TrySendError::Full(_)) => {
                            tracing::warn!("Connection limit reached, refusing {}", peer);
                        }
                        Err(TrySendError::Disconnected(_)) => {
                            tracing::error!("All workers have exited, stopping acceptor");
                            break;
                        }
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
            }
        }

        tracing::info!("Shutting down, waiting for workers");
        drop(sender);

        for worker in workers {
            if worker.join().is_err() {
                tracing::error!("Worker thread panicked");
            }
        }

        Ok(())
    }

    fn spawn_worker(&self, id: usize, receiver: Receiver<TcpStream>) -> Result<JoinHandle<()>> {
        let service = self.service.clone();
        let shutdown = Arc::clone(&self.shutdown);
        let read_timeout_ms = self.config.read_timeout_ms;
        let write_timeout_ms = self.config.write_timeout_ms;

        let handle = thread::Builder::new()
            .name(format!("rankpool-worker-{}", id))
            .spawn(move || {
                for stream in receiver.iter() {
                    let mut connection =
                        match Connection::new(stream, service.clone(), Arc::clone(&shutdown)) {
                            Ok(c) => c,
                            Err(e) => {
                                tracing::warn!("Failed to set up connection: {}", e);
                                continue;
                            }
                        };

                    if let Err(e) = connection.set_timeouts(read_timeout_ms, write_timeout_ms) {
                        tracing::warn!(
                            "Failed to set timeouts for {}: {}",
                            connection.peer_addr(),
                            e
                        );
                        continue;
                    }

                    if let Err(e) = connection.handle() {
                        tracing::debug!("Connection {} closed with error: {}", connection.peer_addr(), e);
                    }
                }
            })?;

        Ok(handle)
    }
}
