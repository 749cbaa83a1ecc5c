//! Brief and studio fixtures.

use std::sync::Arc;

use super::mocks::{RecordingSleeper, ScriptedClient};
use crate::config::{PollConfig, RetryConfig};
use crate::core::DesignBrief;
use crate::events::CollectingEventSink;
use crate::jobs::RetryingJobRunner;
use crate::pipeline::DesignPipeline;
use crate::studio::DesignStudio;

/// A representative brief.
#[must_use]
pub fn sample_brief() -> DesignBrief {
    DesignBrief::new("Oversized double-breasted overcoat with dropped shoulders")
        .with_garment_type("coat")
        .with_gender("Women")
        .with_colors(["camel", "black"])
        .with_attribute("fabric", "wool")
        .with_attribute("pockets", "No pockets")
}

/// A studio wired to a scripted client, a recording clock and a collecting
/// event sink, with the default retry and poll configuration.
#[derive(Debug, Clone)]
pub struct StudioFixture {
    /// The studio under test.
    pub studio: Arc<DesignStudio>,
    /// The scripted provider behind it.
    pub client: Arc<ScriptedClient>,
    /// The clock used for polling and backoff.
    pub sleeper: Arc<RecordingSleeper>,
    /// Every event emitted by the runner, fan-out and pipelines.
    pub events: Arc<CollectingEventSink>,
}

impl StudioFixture {
    /// Starts a pipeline for `brief` on this studio.
    #[must_use]
    pub fn pipeline(&self, brief: DesignBrief) -> DesignPipeline {
        DesignPipeline::new(brief, self.studio.clone())
    }
}

/// Builds a `StudioFixture` around `client`.
#[must_use]
pub fn studio_with(client: ScriptedClient) -> StudioFixture {
    let client = Arc::new(client);
    let sleeper = Arc::new(RecordingSleeper::new());
    let events = Arc::new(CollectingEventSink::new());

    let runner = RetryingJobRunner::new(client.clone(), RetryConfig::default(), PollConfig::default())
        .with_sleeper(sleeper.clone())
        .with_event_sink(events.clone());

    StudioFixture {
        studio: Arc::new(DesignStudio::new(Arc::new(runner))),
        client,
        sleeper,
        events,
    }
}
