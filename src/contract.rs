use crate::{
    error::Error,
    matching::Pattern,
    registry::{CapturedInteraction, Registry},
    util,
};
use serde::Serialize;
use std::collections::BTreeMap;

pub const FORMAT_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Serialize)]
pub struct Participant {
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContractRequest {
    pub method: String,
    pub path: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub query: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContractResponse {
    pub status: u16,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Pattern>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractInteraction {
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_state: Option<String>,
    pub request: ContractRequest,
    pub response: ContractResponse,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub format_version: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContractArtifact {
    pub consumer: Participant,
    pub provider: Participant,
    pub interactions: Vec<ContractInteraction>,
    pub metadata: Metadata,
}

impl ContractArtifact {
    // the request side is the captured literal, the response side keeps
    // the declared matchers
    pub fn from_registry<C: Into<String>, P: Into<String>>(
        registry: &Registry,
        consumer: C,
        provider: P,
    ) -> Result<Self, Error> {
        let missing = registry.missing()?;
        if !missing.is_empty() {
            return Err(Error::IncompleteContract(missing));
        }

        let mut interactions = Vec::new();
        for captured in registry.snapshot()? {
            interactions.push(contract_interaction(captured)?);
        }

        Ok(ContractArtifact {
            consumer: Participant {
                name: consumer.into(),
            },
            provider: Participant {
                name: provider.into(),
            },
            interactions,
            metadata: Metadata {
                format_version: String::from(FORMAT_VERSION),
            },
        })
    }

    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn contract_interaction(captured: CapturedInteraction) -> Result<ContractInteraction, Error> {
    let CapturedInteraction {
        interaction,
        request,
    } = captured;
    let request =
        request.ok_or_else(|| Error::IncompleteContract(vec![interaction.description.clone()]))?;

    Ok(ContractInteraction {
        description: interaction.description,
        provider_state: interaction.provider_state,
        request: ContractRequest {
            method: request.method,
            path: request.path,
            headers: util::filter_transport_headers(&request.headers),
            query: request.query,
            body: request.body,
        },
        response: ContractResponse {
            status: interaction.response.status,
            headers: interaction.response.headers,
            body: interaction.response.body,
        },
    })
}
