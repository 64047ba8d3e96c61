use async_trait::async_trait;
use bytes::Bytes;
use integration_test_utils::{broker_uri, MemoryNetwork, RecordingListener};
use mal_core::{
    BrokerConfig, Interaction, InteractionConfig, InvokeInteraction, MalBroker, MalEndpoint,
    MalErrorCode, MalStatus, MessageBody, OperationId, ProgressInteraction, ProviderHandler,
    RequestInteraction, SubmitInteraction, Subscription, Uri,
};
use std::sync::Arc;
use tokio::sync::Mutex;

pub(crate) const SYNC_TIMEOUT_MS: u64 = 2_000;

/// Body that makes the control provider fail the terminal stage.
pub(crate) const FAIL_PAYLOAD: &[u8] = b"fail";

pub(crate) fn interaction_config() -> InteractionConfig {
    InteractionConfig {
        sync_timeout_ms: Some(SYNC_TIMEOUT_MS),
    }
}

pub(crate) async fn make_endpoint(network: &MemoryNetwork, uri: Uri) -> MalEndpoint {
    MalEndpoint::new(uri, network.transport(), interaction_config())
        .await
        .expect("endpoint creation should succeed")
}

pub(crate) async fn start_broker(network: &MemoryNetwork) -> (MalEndpoint, Arc<MalBroker>) {
    let endpoint = make_endpoint(network, broker_uri()).await;
    let broker =
        MalBroker::start(&endpoint, BrokerConfig::default()).expect("broker should start");
    (endpoint, broker)
}

pub(crate) fn encoded(payload: &'static [u8]) -> MessageBody {
    MessageBody::Encoded(Bytes::from_static(payload))
}

fn wants_failure(interaction: &Interaction) -> bool {
    matches!(interaction.body(), MessageBody::Encoded(payload) if payload.as_ref() == FAIL_PAYLOAD)
}

/// Operation number the control provider accepts without ever replying.
#[allow(dead_code)]
pub(crate) fn silent_operation() -> OperationId {
    OperationId::new(4, 1, 7, 9)
}

/// Provider answering every pattern except PROGRESS.
///
/// Echoes the initiating body on the terminal stage, or sends INTERNAL when the body is
/// [`FAIL_PAYLOAD`].
#[derive(Default)]
pub(crate) struct ControlProvider {
    pub(crate) sends: Mutex<Vec<MessageBody>>,
}

#[async_trait]
impl ProviderHandler for ControlProvider {
    async fn handle_send(&self, interaction: Interaction) -> Result<(), MalStatus> {
        self.sends.lock().await.push(interaction.body().clone());
        Ok(())
    }

    async fn handle_submit(&self, interaction: SubmitInteraction) -> Result<(), MalStatus> {
        if wants_failure(interaction.interaction()) {
            return interaction
                .error(MalStatus::fail_with_code(MalErrorCode::Internal, "submit refused"))
                .await;
        }
        interaction.ack().await
    }

    async fn handle_request(&self, interaction: RequestInteraction) -> Result<(), MalStatus> {
        if interaction.interaction().header().operation == silent_operation() {
            return Ok(());
        }
        let body = interaction.interaction().body().clone();
        interaction.reply(body).await
    }

    async fn handle_invoke(&self, interaction: InvokeInteraction) -> Result<(), MalStatus> {
        let fail = wants_failure(interaction.interaction());
        let body = interaction.interaction().body().clone();
        let acknowledged = interaction.ack(MessageBody::Empty).await?;
        if fail {
            return acknowledged
                .error(MalStatus::fail_with_code(
                    MalErrorCode::Internal,
                    "invocation failed",
                ))
                .await;
        }
        acknowledged.response(body).await
    }
}

/// Provider that streams `updates` progress updates before the response.
pub(crate) struct ProgressProvider {
    pub(crate) updates: usize,
}

#[async_trait]
impl ProviderHandler for ProgressProvider {
    async fn handle_progress(&self, interaction: ProgressInteraction) -> Result<(), MalStatus> {
        let acknowledged = interaction.ack(MessageBody::Empty).await?;
        for _ in 0..self.updates {
            acknowledged.update(encoded(b"step")).await?;
        }
        acknowledged.response(encoded(b"done")).await
    }
}

/// Registers `subscription` through a fresh consumer of `endpoint` and returns its listener.
#[allow(dead_code)]
pub(crate) async fn subscribe(
    endpoint: &MalEndpoint,
    operation: OperationId,
    subscription: Subscription,
) -> RecordingListener {
    let listener = RecordingListener::new();
    endpoint
        .create_consumer(broker_uri())
        .register(operation, subscription, Arc::new(listener.clone()))
        .await
        .expect("register should be acknowledged");
    listener
}
