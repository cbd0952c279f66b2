use crate::{
    data::{RecordedRequest, UnmatchedRequest},
    error::Error,
    interaction::Interaction,
    matching::Pattern,
    registry::{MatchOutcome, Registry},
    util,
};
use futures::channel::oneshot;
use hyper::{
    body, header, rt,
    service::{make_service_fn, service_fn},
    Body, Request, Response, Server, StatusCode,
};
use serde_json::{json, Value};
use std::{
    convert::Infallible,
    future::Future,
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ServerState {
    Stopped,
    Starting,
    Listening,
    Draining,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DrainOutcome {
    Drained,
    TimedOut,
}

#[derive(Debug)]
pub struct MockServer {
    shared: Arc<ServerShared>,
    state: ServerState,
    local_addr: Option<SocketAddr>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    join_handle: Option<JoinHandle<()>>,
    connections: Arc<Mutex<Vec<JoinHandle<()>>>>,
    drain_timeout: Duration,
}

#[derive(Debug)]
struct ServerShared {
    registry: Arc<Registry>,
    unmatched: Mutex<Vec<UnmatchedRequest>>,
    error: Mutex<Option<Error>>,
}

impl ServerShared {
    fn record_error(&self, error: Error) {
        if let Ok(mut slot) = self.error.lock() {
            if slot.is_none() {
                *slot = Some(error);
            }
        }
    }
}

// hyper runs each accepted connection as its own task, so aborting the
// serve task leaves in-flight requests running; the handles recorded here
// reach those tasks
#[derive(Clone)]
struct ConnectionExecutor {
    connections: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl<F> rt::Executor<F> for ConnectionExecutor
where
    F: Future<Output = ()> + Send + 'static,
{
    fn execute(&self, future: F) {
        let handle = tokio::spawn(future);
        if let Ok(mut connections) = self.connections.lock() {
            connections.push(handle);
        }
    }
}

impl MockServer {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            shared: Arc::new(ServerShared {
                registry,
                unmatched: Mutex::new(Vec::new()),
                error: Mutex::new(None),
            }),
            state: ServerState::Stopped,
            local_addr: None,
            shutdown_tx: None,
            join_handle: None,
            connections: Arc::new(Mutex::new(Vec::new())),
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }

    pub fn set_drain_timeout(&mut self, drain_timeout: Duration) {
        self.drain_timeout = drain_timeout;
    }

    pub fn state(&self) -> ServerState {
        self.state
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn base_url(&self) -> Option<String> {
        self.local_addr.map(|addr| format!("http://{}", addr))
    }

    // the listener is bound and accepting by the time this returns;
    // starting an already listening server returns the existing address
    pub async fn start(&mut self) -> Result<SocketAddr, Error> {
        if let Some(addr) = self.local_addr {
            return Ok(addr);
        }

        self.state = ServerState::Starting;

        let shared = self.shared.clone();
        let make_service = make_service_fn(move |_| {
            let shared = shared.clone();
            async move {
                Ok::<_, Infallible>(service_fn(move |request| {
                    let shared = shared.clone();
                    async move {
                        match handle_request(shared.clone(), request).await {
                            Ok(response) => Ok::<_, Infallible>(response),
                            Err(error) => {
                                shared.record_error(error);

                                let mut response = Response::new(Body::empty());
                                *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                                Ok(response)
                            }
                        }
                    }
                }))
            }
        });

        let executor = ConnectionExecutor {
            connections: self.connections.clone(),
        };

        let addr = SocketAddr::from(([127, 0, 0, 1], 0));
        let server = match Server::try_bind(&addr) {
            Ok(builder) => builder.executor(executor).serve(make_service),
            Err(e) => {
                self.state = ServerState::Stopped;
                return Err(Error::Bind(e));
            }
        };
        let local_addr = server.local_addr();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let graceful = server.with_graceful_shutdown(async {
            shutdown_rx.await.ok();
        });

        self.join_handle = Some(tokio::spawn(async move {
            if let Err(e) = graceful.await {
                warn!("mock server error: {}", e);
            }
        }));
        self.shutdown_tx = Some(shutdown_tx);
        self.local_addr = Some(local_addr);
        self.state = ServerState::Listening;
        debug!("mock server listening on {}", local_addr);

        Ok(local_addr)
    }

    // waits for in-flight requests up to the drain timeout, then cuts off
    // the remaining connections; stopping a stopped server is a no-op
    pub async fn stop(&mut self) -> DrainOutcome {
        let mut join_handle = match self.join_handle.take() {
            Some(join_handle) => join_handle,
            None => {
                self.state = ServerState::Stopped;
                return DrainOutcome::Drained;
            }
        };

        self.state = ServerState::Draining;

        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }

        let outcome = match tokio::time::timeout(self.drain_timeout, &mut join_handle).await {
            Ok(joined) => {
                if let Err(e) = joined {
                    warn!("mock server task failed during drain: {}", e);
                }
                DrainOutcome::Drained
            }
            Err(_) => {
                join_handle.abort();
                // settle the aborted task so no handle lands behind the sweep
                let _ = (&mut join_handle).await;
                warn!(
                    "mock server still had requests in flight after {:?}",
                    self.drain_timeout
                );
                DrainOutcome::TimedOut
            }
        };

        if let Ok(mut connections) = self.connections.lock() {
            for connection in connections.drain(..) {
                connection.abort();
            }
        }

        self.state = ServerState::Stopped;
        self.local_addr = None;

        outcome
    }

    pub fn unmatched(&self) -> Result<Vec<UnmatchedRequest>, Error> {
        Ok(self.shared.unmatched.lock()?.clone())
    }

    pub fn take_error(&self) -> Result<Option<Error>, Error> {
        Ok(self.shared.error.lock()?.take())
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }

        if let Some(join_handle) = self.join_handle.take() {
            join_handle.abort();
        }

        if let Ok(mut connections) = self.connections.lock() {
            for connection in connections.drain(..) {
                connection.abort();
            }
        }
    }
}

async fn handle_request(
    shared: Arc<ServerShared>,
    mut request: Request<Body>,
) -> Result<Response<Body>, Error> {
    let recorded = read_request(&mut request).await?;

    match shared.registry.match_request(&recorded)? {
        MatchOutcome::Matched(interaction) => {
            debug!("request matched {:?}", interaction.description);
            respond(interaction).await
        }
        MatchOutcome::NoMatch(closest) => {
            warn!(
                "no interaction matched {} {}",
                recorded.method, recorded.path
            );

            let diagnostic = json!({
                "message": "the request did not match any registered interaction",
                "request": &recorded,
                "closestInteraction": &closest,
            });
            shared.unmatched.lock()?.push(UnmatchedRequest {
                request: recorded,
                closest,
            });

            Ok(Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&diagnostic)?))?)
        }
    }
}

async fn respond(interaction: &Interaction) -> Result<Response<Body>, Error> {
    let template = &interaction.response;

    // the interaction was marked invoked before any delay
    if let Some(delay) = template.delay {
        tokio::time::sleep(delay).await;
    }

    let rendered = template.body.as_ref().map(Pattern::render);
    let mut builder = Response::builder().status(template.status);

    if let Some(header_map) = builder.headers_mut() {
        util::put_headers(header_map, &template.headers)?;

        if rendered.is_some() && !header_map.contains_key(header::CONTENT_TYPE) {
            header_map.insert(
                header::CONTENT_TYPE,
                header::HeaderValue::from_static("application/json"),
            );
        }
    }

    let body = match &rendered {
        Some(value) => Body::from(serde_json::to_vec(value)?),
        None => Body::empty(),
    };

    Ok(builder.body(body)?)
}

async fn read_request(request: &mut Request<Body>) -> Result<RecordedRequest, Error> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let query = request
        .uri()
        .query()
        .map(util::parse_query)
        .unwrap_or_default();
    let headers = util::extract_headers(request.headers());

    let bytes = body::to_bytes(request.body_mut())
        .await
        .map_err(|_| Error::InvalidBody)?;
    let body = if bytes.is_empty() {
        None
    } else {
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(_) => Some(Value::String(String::from_utf8_lossy(&bytes).into())),
        }
    };

    Ok(RecordedRequest {
        method,
        path,
        query,
        headers,
        body,
    })
}
