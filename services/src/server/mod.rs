//! The connection server: accepts clients, reads framed requests, queues
//! them onto a bounded worker pool and writes framed responses.
//!
//! Guarantees: requests of one connection are processed strictly in order
//! (the next frame is only read after the previous response was written);
//! at most `workers` evaluations run concurrently; on shutdown, in-flight
//! evaluations complete while queued ones are dropped and the workers are
//! joined.

pub mod protocol;

use std::net::SocketAddr;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use log::{debug, info, warn};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;

use geoproc_datatypes::primitives::QueryRectangle;
use geoproc_datatypes::raster::GenericRaster;
use geoproc_datatypes::results::TypedQueryResult;
use geoproc_operators::cache::CacheManager;
use geoproc_operators::engine::{OperatorNode, OperatorRegistry, QueryContext, QueryProfiler};

use crate::error::{self, Result};
use crate::util::config;

use self::protocol::{CacheRequest, CacheResponse, ProtocolCodec};

use snafu::ResultExt;

struct Job {
    request: CacheRequest,
    reply: oneshot::Sender<CacheResponse>,
}

pub struct CacheServer {
    config: config::Server,
    registry: Arc<OperatorRegistry>,
    cache: Arc<CacheManager>,
}

impl CacheServer {
    pub fn new(config: config::Server, registry: OperatorRegistry, cache: CacheManager) -> Self {
        Self {
            config,
            registry: Arc::new(registry),
            cache: Arc::new(cache),
        }
    }

    /// Binds the listener and spawns the accept loop and the worker pool.
    pub async fn start(self) -> Result<ServerHandle> {
        let listener = TcpListener::bind(&self.config.bind).await?;
        let local_addr = listener.local_addr()?;
        info!("cache-server: listening on {}", local_addr);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (job_tx, job_rx) = mpsc::channel::<Job>(self.config.queue_size.max(1));
        let job_rx = Arc::new(Mutex::new(job_rx));

        info!("Firing up {} worker tasks", self.config.workers);
        let workers = (0..self.config.workers.max(1))
            .map(|id| {
                tokio::spawn(worker_loop(
                    id,
                    Arc::clone(&job_rx),
                    shutdown_rx.clone(),
                    Arc::clone(&self.registry),
                    Arc::clone(&self.cache),
                ))
            })
            .collect();

        let accept_task = tokio::spawn(accept_loop(listener, job_tx, shutdown_rx));

        Ok(ServerHandle {
            local_addr,
            shutdown: shutdown_tx,
            accept_task,
            workers,
        })
    }
}

/// Controls a started server: its address and its shutdown
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    accept_task: JoinHandle<()>,
    workers: Vec<JoinHandle<()>>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops accepting, lets in-flight evaluations finish, drops queued
    /// requests and joins the workers.
    pub async fn stop(self) -> Result<()> {
        info!("Shutting down workers");
        let _ = self.shutdown.send(true);
        self.accept_task.await.context(error::TokioJoin)?;
        for worker in self.workers {
            worker.await.context(error::TokioJoin)?;
        }
        info!("Shutdown complete");
        Ok(())
    }
}

async fn accept_loop(
    listener: TcpListener,
    job_tx: mpsc::Sender<Job>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!("New connection from {}", peer);
                    tokio::spawn(handle_connection(stream, job_tx.clone(), shutdown.clone()));
                }
                Err(error) => warn!("accept failed: {}", error),
            }
        }
    }
    info!("Accept loop stopped");
}

async fn handle_connection(
    stream: TcpStream,
    job_tx: mpsc::Sender<Job>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut framed = Framed::new(stream, ProtocolCodec);

    loop {
        let request = tokio::select! {
            _ = shutdown.changed() => break,
            next = framed.next() => match next {
                None => {
                    debug!("Connection closed by peer");
                    break;
                }
                Some(Ok(request)) => request,
                Some(Err(error)) => {
                    warn!("Protocol error, dropping connection: {}", error);
                    let _ = framed
                        .send(CacheResponse::Error(error.to_string()))
                        .await;
                    break;
                }
            }
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        if job_tx
            .send(Job {
                request,
                reply: reply_tx,
            })
            .await
            .is_err()
        {
            break;
        }

        match reply_rx.await {
            Ok(response) => {
                if framed.send(response).await.is_err() {
                    break;
                }
            }
            // the job was dropped during shutdown
            Err(_) => break,
        }
    }
}

async fn worker_loop(
    id: usize,
    jobs: Arc<Mutex<mpsc::Receiver<Job>>>,
    mut shutdown: watch::Receiver<bool>,
    registry: Arc<OperatorRegistry>,
    cache: Arc<CacheManager>,
) {
    loop {
        let job = {
            let mut jobs = jobs.lock().await;
            tokio::select! {
                _ = shutdown.changed() => break,
                job = jobs.recv() => job,
            }
        };

        match job {
            None => break,
            Some(job) => {
                debug!("Worker {} processing request", id);
                let response = execute(job.request, &registry, &cache).await;
                let _ = job.reply.send(response);
            }
        }
    }
    info!("Worker {} stopped", id);
}

async fn execute(
    request: CacheRequest,
    registry: &OperatorRegistry,
    cache: &Arc<CacheManager>,
) -> CacheResponse {
    match request {
        CacheRequest::GetRaster {
            query,
            graph_json,
            query_mode: _,
        } => {
            let node = match registry.from_json(&graph_json) {
                Ok(node) => node,
                Err(error) => {
                    warn!("Graph parse failed: {}", error);
                    return CacheResponse::Error(error.to_string());
                }
            };

            match evaluate_raster(&node, &query, cache).await {
                Ok(raster) => CacheResponse::Ok(TypedQueryResult::Raster(raster)),
                Err(error) => {
                    warn!("Evaluation failed: {}", error);
                    CacheResponse::Error(error.to_string())
                }
            }
        }
    }
}

async fn evaluate_raster(
    node: &OperatorNode,
    query: &QueryRectangle,
    cache: &Arc<CacheManager>,
) -> Result<GenericRaster, geoproc_operators::Error> {
    let ctx = QueryContext::new(Arc::clone(cache));
    let mut profiler = QueryProfiler::new();
    profiler.start_timer()?;
    let result = node.cached_raster(query, &mut profiler, &ctx).await;
    profiler.stop_timer()?;
    info!(
        "Query finished. CPU: {:.4}/{:.4} I/O: {}/{}",
        profiler.self_cpu, profiler.all_cpu, profiler.self_io, profiler.all_io
    );
    result
}
