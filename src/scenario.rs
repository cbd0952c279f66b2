use crate::{
    contract::ContractArtifact,
    contract_sink::{ContractSink, JsonFileSink},
    error::Error,
    interaction::{Interaction, RequestMatcher, ResponseTemplate},
    mock_server::{DrainOutcome, MockServer, DEFAULT_DRAIN_TIMEOUT},
    registry::Registry,
};
use std::{future::Future, path::Path, sync::Arc, time::Duration};
use tokio::runtime::Runtime;
use tracing::warn;

const DEFAULT_OUTPUT_DIR: &str = "contracts";

#[derive(Debug, Clone)]
pub struct MockServerHandle {
    base_url: String,
}

impl MockServerHandle {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url<S: AsRef<str>>(&self, path: S) -> String {
        format!("{}{}", self.base_url, path.as_ref())
    }
}

// every run builds a fresh registry and binds a fresh OS-assigned port
#[derive(Debug)]
pub struct ContractScenario {
    consumer: String,
    provider: String,
    declarations: Vec<PendingInteraction>,
    sink: Arc<dyn ContractSink + Send + Sync>,
    drain_timeout: Duration,
    fail_on_drain_timeout: bool,
}

#[derive(Debug, Default)]
struct PendingInteraction {
    provider_state: Option<String>,
    description: Option<String>,
    request: Option<RequestMatcher>,
    response: Option<ResponseTemplate>,
}

impl PendingInteraction {
    fn is_complete(&self) -> bool {
        self.description.is_some() && self.request.is_some() && self.response.is_some()
    }
}

impl ContractScenario {
    pub fn new<C: Into<String>, P: Into<String>>(consumer: C, provider: P) -> Self {
        Self {
            consumer: consumer.into(),
            provider: provider.into(),
            declarations: Vec::new(),
            sink: Arc::new(JsonFileSink::new(DEFAULT_OUTPUT_DIR)),
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            fail_on_drain_timeout: false,
        }
    }

    pub fn consumer(&self) -> &str {
        &self.consumer
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn set_output_dir<P: AsRef<Path>>(&mut self, output_dir: P) {
        self.sink = Arc::new(JsonFileSink::new(output_dir));
    }

    pub fn set_contract_sink(&mut self, sink: Arc<dyn ContractSink + Send + Sync>) {
        self.sink = sink;
    }

    pub fn set_drain_timeout(&mut self, drain_timeout: Duration) {
        self.drain_timeout = drain_timeout;
    }

    pub fn drain_timeout(&self) -> Duration {
        self.drain_timeout
    }

    pub fn set_fail_on_drain_timeout(&mut self, value: bool) {
        self.fail_on_drain_timeout = value;
    }

    pub fn fail_on_drain_timeout(&self) -> bool {
        self.fail_on_drain_timeout
    }

    pub fn given<S: Into<String>>(&mut self, provider_state: S) -> &mut Self {
        let needs_new = self
            .declarations
            .last()
            .map_or(true, PendingInteraction::is_complete);
        if needs_new {
            self.declarations.push(PendingInteraction::default());
        }

        let index = self.declarations.len() - 1;
        self.declarations[index].provider_state = Some(provider_state.into());
        self
    }

    pub fn upon_receiving<S: Into<String>>(&mut self, description: S) -> &mut Self {
        let needs_new = self
            .declarations
            .last()
            .map_or(true, |pending| pending.description.is_some());
        if needs_new {
            self.declarations.push(PendingInteraction::default());
        }

        let index = self.declarations.len() - 1;
        self.declarations[index].description = Some(description.into());
        self
    }

    pub fn with_request(&mut self, request: RequestMatcher) -> &mut Self {
        self.last_declaration().request = Some(request);
        self
    }

    pub fn will_respond_with(&mut self, response: ResponseTemplate) -> &mut Self {
        self.last_declaration().response = Some(response);
        self
    }

    // failures are reported in priority order: the callback's own error,
    // an internal handler error, unmatched requests, interactions never
    // invoked, then a timed-out drain when the policy treats it as fatal;
    // the artifact is written only when nothing failed
    pub async fn execute<F, Fut, T, E>(&self, callback: F) -> Result<T, Error>
    where
        F: FnOnce(MockServerHandle) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let registry = Arc::new(self.build_registry()?);
        let mut server = MockServer::new(registry.clone());
        server.set_drain_timeout(self.drain_timeout);

        let addr = server.start().await?;
        let handle = MockServerHandle {
            base_url: format!("http://{}", addr),
        };

        let callback_result = callback(handle).await;
        let drain = server.stop().await;

        let handler_error = server.take_error()?;
        let unmatched = server.unmatched()?;

        let value = match callback_result {
            Ok(value) => value,
            Err(error) => return Err(Error::Callback(error.into())),
        };

        if let Some(error) = handler_error {
            return Err(error);
        }

        if !unmatched.is_empty() {
            return Err(Error::NoMatch(unmatched));
        }

        let artifact =
            ContractArtifact::from_registry(&registry, self.consumer.as_str(), self.provider.as_str())?;

        if drain == DrainOutcome::TimedOut {
            if self.fail_on_drain_timeout {
                return Err(Error::DrainTimeout);
            }

            warn!(
                "mock server drain timed out after {:?}; contract written anyway",
                self.drain_timeout
            );
        }

        self.sink.write_contract(&artifact).map_err(Error::SinkError)?;

        Ok(value)
    }

    pub fn execute_blocking<F, Fut, T, E>(&self, callback: F) -> Result<T, Error>
    where
        F: FnOnce(MockServerHandle) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Runtime::new()?.block_on(self.execute(callback))
    }

    fn build_registry(&self) -> Result<Registry, Error> {
        if self.declarations.is_empty() {
            return Err(Error::IncompleteDeclaration(String::from(
                "no interactions declared",
            )));
        }

        let mut registry = Registry::new();

        for (index, pending) in self.declarations.iter().enumerate() {
            let description = pending.description.clone().ok_or_else(|| {
                Error::IncompleteDeclaration(format!("interaction {} has no description", index + 1))
            })?;
            let request = pending.request.clone().ok_or_else(|| {
                Error::IncompleteDeclaration(format!("{:?} has no request", description))
            })?;
            let response = pending.response.clone().ok_or_else(|| {
                Error::IncompleteDeclaration(format!("{:?} has no response", description))
            })?;

            registry.register(Interaction {
                description,
                provider_state: pending.provider_state.clone(),
                request,
                response,
            });
        }

        Ok(registry)
    }

    fn last_declaration(&mut self) -> &mut PendingInteraction {
        if self.declarations.is_empty() {
            self.declarations.push(PendingInteraction::default());
        }

        let index = self.declarations.len() - 1;
        &mut self.declarations[index]
    }
}
