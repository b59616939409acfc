//! Event-loop pool and server front end.
//!
//! [`Engines`] runs one single-threaded runtime per worker thread.
//! Accepted sockets are handed over as blocking-mode std streams and
//! re-registered on the receiving loop, which then owns the connection
//! for its whole life; nothing about a connection ever migrates.
//!
//! [`Server`] couples the pool with an accept loop and the routing
//! table. Sockets are pinned round-robin.

use std::future::Future;
use std::sync::Arc;
use std::thread;

use log::{debug, error, info, trace, warn};
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime;
use tokio::sync::{mpsc, watch};

use crate::conn::{Connection, Handler, HandlerTable};
use crate::error::Result;
use crate::router::{HandlerId, Priority};

/// A pool of event loops, one per worker thread.
pub struct Engines {
    senders: Vec<mpsc::UnboundedSender<std::net::TcpStream>>,
    threads: Vec<thread::JoinHandle<()>>,
    next: usize,
}

impl Engines {
    /// Spawn `workers` loops sharing one routing table.
    pub fn new(workers: usize, router: Arc<HandlerTable>) -> Result<Self> {
        let workers = workers.max(1);
        let mut senders = Vec::with_capacity(workers);
        let mut threads = Vec::with_capacity(workers);

        for i in 0..workers {
            let (tx, rx) = mpsc::unbounded_channel();
            let router = router.clone();
            let thread = thread::Builder::new()
                .name(format!("weft-loop-{}", i))
                .spawn(move || event_loop(rx, router))?;
            senders.push(tx);
            threads.push(thread);
        }

        Ok(Self {
            senders,
            threads,
            next: 0,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.senders.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }

    /// Pin a socket to the next loop, round-robin. Loops that have
    /// gone away are dropped from the rotation.
    pub fn dispatch(&mut self, stream: std::net::TcpStream) {
        let mut stream = stream;
        while !self.senders.is_empty() {
            let i = self.next % self.senders.len();
            match self.senders[i].send(stream) {
                Ok(()) => {
                    self.next = (i + 1) % self.senders.len();
                    return;
                }
                Err(back) => {
                    warn!("loop {} is gone", i);
                    self.senders.remove(i);
                    stream = back.0;
                }
            }
        }
        warn!("no event loops left, dropping socket");
    }

    /// Stop accepting handoffs and wait for the loops to drain.
    pub fn shutdown(mut self) {
        self.senders.clear();
        for thread in self.threads.drain(..) {
            if thread.join().is_err() {
                error!("event loop panicked");
            }
        }
    }
}

fn event_loop(mut rx: mpsc::UnboundedReceiver<std::net::TcpStream>, router: Arc<HandlerTable>) {
    let rt = match runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            error!("runtime build failed: {}", e);
            return;
        }
    };

    rt.block_on(async move {
        let (stop_tx, stop_rx) = watch::channel(());
        let mut conns = tokio::task::JoinSet::new();
        loop {
            tokio::select! {
                accepted = rx.recv() => {
                    let stream = match accepted {
                        Some(stream) => stream,
                        None => break,
                    };
                    let io = match TcpStream::from_std(stream) {
                        Ok(io) => io,
                        Err(e) => {
                            warn!("socket handoff failed: {}", e);
                            continue;
                        }
                    };
                    let router = router.clone();
                    let mut stop = stop_rx.clone();
                    conns.spawn(async move {
                        let stopped = async move {
                            let _ = stop.changed().await;
                        };
                        if let Err(e) = Connection::new(io, router).serve_until(stopped).await {
                            debug!("connection ended: {}", e);
                        }
                    });
                }
                Some(_) = conns.join_next(), if !conns.is_empty() => {}
            }
        }
        // handoff channel closed; stop idle connections, answer the
        // in-flight ones, then drain
        drop(stop_tx);
        while conns.join_next().await.is_some() {}
    });
}

/// Builder for the routing table plus the listening front end.
pub struct Server {
    router: HandlerTable,
    workers: usize,
}

impl Default for Server {
    fn default() -> Self {
        Self::new()
    }
}

impl Server {
    pub fn new() -> Self {
        let workers = thread::available_parallelism().map(usize::from).unwrap_or(1);
        Self {
            router: HandlerTable::new(),
            workers,
        }
    }

    /// Override the loop count (defaults to the core count).
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Register a handler, see [`Router::add`](crate::router::Router::add).
    pub fn route(
        &mut self,
        methods: &[&str],
        pattern: &str,
        priority: Priority,
        handler: impl Handler + 'static,
    ) -> HandlerId {
        self.router.add(methods, pattern, priority, Box::new(handler))
    }

    /// Unregister a handler; ids above it shift down by one.
    pub fn remove(&mut self, id: HandlerId) {
        self.router.remove(id);
    }

    /// Handler for requests no route matches (otherwise a bare `404`).
    pub fn fallback(&mut self, handler: impl Handler + 'static) {
        self.router.set_fallback(Box::new(handler));
    }

    /// Bind and run until the process ends.
    pub async fn serve(self, addr: &str) -> Result<()> {
        let listener = TcpListener::bind(addr).await?;
        self.run_until(listener, std::future::pending::<()>()).await
    }

    /// Run the accept loop over an already-bound listener.
    pub async fn run(self, listener: TcpListener) -> Result<()> {
        self.run_until(listener, std::future::pending::<()>()).await
    }

    /// Run until `shutdown` resolves, then stop accepting and drain
    /// the pool.
    pub async fn run_until<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future,
    {
        let router = Arc::new(self.router);
        let mut engines = Engines::new(self.workers, router)?;

        if let Ok(addr) = listener.local_addr() {
            info!("listening on {} with {} loops", addr, engines.len());
        }

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        trace!("accept {}", peer);
                        match stream.into_std() {
                            Ok(stream) => engines.dispatch(stream),
                            Err(e) => warn!("socket detach failed: {}", e),
                        }
                    }
                    Err(e) => {
                        // transient accept failures (EMFILE etc.)
                        warn!("accept error: {}", e);
                    }
                },
            }
        }

        info!("shutting down");
        engines.shutdown();
        Ok(())
    }
}
