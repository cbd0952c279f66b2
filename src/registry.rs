use crate::{
    data::{ClosestMatch, RecordedRequest},
    error::Error,
    interaction::Interaction,
};
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct Registry {
    entries: Vec<RegistryEntry>,
}

#[derive(Debug)]
struct RegistryEntry {
    interaction: Interaction,
    state: Mutex<InvocationState>,
}

#[derive(Debug, Default)]
struct InvocationState {
    invoked: bool,
    last_request: Option<RecordedRequest>,
}

#[derive(Debug)]
pub enum MatchOutcome<'a> {
    Matched(&'a Interaction),
    NoMatch(Option<ClosestMatch>),
}

#[derive(Debug, Clone)]
pub struct CapturedInteraction {
    pub interaction: Interaction,
    pub request: Option<RecordedRequest>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, interaction: Interaction) {
        self.entries.push(RegistryEntry {
            interaction,
            state: Mutex::new(InvocationState::default()),
        });
    }

    // first match in declaration order wins; a miss reports the nearest
    // interaction by mismatch count, earliest declaration breaking ties
    pub fn match_request(&self, request: &RecordedRequest) -> Result<MatchOutcome<'_>, Error> {
        let mut closest: Option<(usize, ClosestMatch)> = None;

        for entry in &self.entries {
            let mismatches = entry.interaction.request.mismatches(request);

            if mismatches.is_empty() {
                let mut state = entry.state.lock()?;
                state.invoked = true;
                state.last_request = Some(request.clone());

                return Ok(MatchOutcome::Matched(&entry.interaction));
            }

            let nearer = closest
                .as_ref()
                .map_or(true, |(count, _)| mismatches.len() < *count);
            if nearer {
                closest = Some((
                    mismatches.len(),
                    ClosestMatch {
                        description: entry.interaction.description.clone(),
                        mismatches,
                    },
                ));
            }
        }

        Ok(MatchOutcome::NoMatch(closest.map(|(_, nearest)| nearest)))
    }

    // coverage, not call count
    pub fn all_invoked(&self) -> Result<bool, Error> {
        for entry in &self.entries {
            if !entry.state.lock()?.invoked {
                return Ok(false);
            }
        }

        Ok(true)
    }

    pub fn missing(&self) -> Result<Vec<String>, Error> {
        let mut missing = Vec::new();

        for entry in &self.entries {
            if !entry.state.lock()?.invoked {
                missing.push(entry.interaction.description.clone());
            }
        }

        Ok(missing)
    }

    pub fn snapshot(&self) -> Result<Vec<CapturedInteraction>, Error> {
        let mut snapshot = Vec::new();

        for entry in &self.entries {
            let state = entry.state.lock()?;
            snapshot.push(CapturedInteraction {
                interaction: entry.interaction.clone(),
                request: state.last_request.clone(),
            });
        }

        Ok(snapshot)
    }
}
