mod contract;
mod contract_sink;
mod data;
mod error;
mod interaction;
mod matching;
mod mock_server;
mod registry;
mod scenario;
mod util;

pub use contract::{
    ContractArtifact, ContractInteraction, ContractRequest, ContractResponse, Metadata,
    Participant, FORMAT_VERSION,
};
pub use contract_sink::{ContractSink, JsonFileSink};
pub use data::{ClosestMatch, Method, Mismatch, RecordedRequest, UnmatchedRequest};
pub use error::Error;
pub use interaction::{Interaction, RequestMatcher, ResponseTemplate};
pub use matching::{each_like, each_like_min, like, literal, term, Pattern};
pub use mock_server::{DrainOutcome, MockServer, ServerState, DEFAULT_DRAIN_TIMEOUT};
pub use registry::{CapturedInteraction, MatchOutcome, Registry};
pub use scenario::{ContractScenario, MockServerHandle};
