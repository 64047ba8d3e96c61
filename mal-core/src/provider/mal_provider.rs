/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

use crate::endpoint::MessageSender;
use crate::message::{
    first_reply_stage, InteractionStage, InteractionType, MalErrorCode, MalMessage, MalStatus,
    Uri,
};
use crate::observability::{events, fields};
use crate::provider::interaction::Interaction;
use crate::provider::typed::{
    InvokeInteraction, ProgressInteraction, RequestInteraction, SubmitInteraction,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

const COMPONENT: &str = "mal_provider";

fn unsupported(interaction_type: InteractionType) -> MalStatus {
    MalStatus::fail_with_code(
        MalErrorCode::UnsupportedOperation,
        format!("{} not supported by this provider", interaction_type),
    )
}

/// Application side of a provider.
///
/// Returning `Err` before the terminal reply was sent makes the dispatcher send that
/// error on the stage still owed to the consumer.
#[async_trait]
pub trait ProviderHandler: Send + Sync {
    async fn handle_send(&self, _interaction: Interaction) -> Result<(), MalStatus> {
        Err(unsupported(InteractionType::Send))
    }

    async fn handle_submit(&self, _interaction: SubmitInteraction) -> Result<(), MalStatus> {
        Err(unsupported(InteractionType::Submit))
    }

    async fn handle_request(&self, _interaction: RequestInteraction) -> Result<(), MalStatus> {
        Err(unsupported(InteractionType::Request))
    }

    async fn handle_invoke(&self, _interaction: InvokeInteraction) -> Result<(), MalStatus> {
        Err(unsupported(InteractionType::Invoke))
    }

    async fn handle_progress(&self, _interaction: ProgressInteraction) -> Result<(), MalStatus> {
        Err(unsupported(InteractionType::Progress))
    }
}

/// Initiating stage of a provider pattern.
fn initiating_stage(interaction_type: InteractionType) -> Option<InteractionStage> {
    match interaction_type {
        InteractionType::Send => Some(InteractionStage::Send),
        InteractionType::Submit => Some(InteractionStage::Submit),
        InteractionType::Request => Some(InteractionStage::Request),
        InteractionType::Invoke => Some(InteractionStage::Invoke),
        InteractionType::Progress => Some(InteractionStage::Progress),
        InteractionType::PubSub => None,
    }
}

/// Dispatches initiating messages to a [`ProviderHandler`].
pub struct MalProvider {
    sender: Arc<dyn MessageSender>,
    handler: Arc<dyn ProviderHandler>,
}

impl MalProvider {
    pub fn new(sender: Arc<dyn MessageSender>, handler: Arc<dyn ProviderHandler>) -> Self {
        Self { sender, handler }
    }

    pub async fn dispatch(&self, message: MalMessage) {
        let header = message.header.clone();
        let expected = initiating_stage(header.interaction_type);

        if expected != Some(header.stage) {
            warn!(
                event = events::PROVIDER_REJECT_STAGE,
                component = COMPONENT,
                transaction_id = header.transaction_id,
                stage = %fields::format_stage(&header),
                src = %header.from,
                "initiating message carries a stage foreign to its pattern"
            );
            if let Some(reply_stage) = expected.and_then(first_reply_stage) {
                let error = MalStatus::fail_with_code(
                    MalErrorCode::IncorrectState,
                    format!(
                        "{} is not the initiating stage of {}",
                        header.stage, header.interaction_type
                    ),
                );
                if let Err(err) = self.sender.send_error(&header, reply_stage, error).await {
                    self.log_reply_failure(&header.from, header.transaction_id, &err);
                }
            }
            return;
        }

        debug!(
            event = events::PROVIDER_DISPATCH,
            component = COMPONENT,
            transaction_id = header.transaction_id,
            stage = %fields::format_stage(&header),
            src = %header.from,
            operation = %header.operation,
            "dispatching to provider handler"
        );

        let interaction = Interaction::new(self.sender.clone(), message);
        let result = match header.interaction_type {
            InteractionType::Send => self.handler.handle_send(interaction.clone()).await,
            InteractionType::Submit => {
                self.handler
                    .handle_submit(SubmitInteraction(interaction.clone()))
                    .await
            }
            InteractionType::Request => {
                self.handler
                    .handle_request(RequestInteraction(interaction.clone()))
                    .await
            }
            InteractionType::Invoke => {
                self.handler
                    .handle_invoke(InvokeInteraction(interaction.clone()))
                    .await
            }
            InteractionType::Progress => {
                self.handler
                    .handle_progress(ProgressInteraction(interaction.clone()))
                    .await
            }
            InteractionType::PubSub => return,
        };

        if let Err(error) = result {
            self.report_failure(&interaction, error).await;
        }
    }

    async fn report_failure(&self, interaction: &Interaction, error: MalStatus) {
        let header = interaction.header();
        let pending = interaction.pending_error_stage().await;
        warn!(
            event = events::PROVIDER_HANDLER_FAILED,
            component = COMPONENT,
            transaction_id = header.transaction_id,
            stage = %fields::format_stage(header),
            err = %error,
            reply_stage = ?pending,
            "provider handler failed"
        );

        if let Some(stage) = pending {
            if let Err(err) = interaction.return_error(stage, error).await {
                self.log_reply_failure(&header.from, header.transaction_id, &err);
            }
        }
    }

    fn log_reply_failure(&self, consumer: &Uri, transaction_id: u64, err: &MalStatus) {
        warn!(
            event = events::PROVIDER_REPLY_FAILED,
            component = COMPONENT,
            transaction_id,
            dst = %consumer,
            err = %err,
            "failed to send provider error reply"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::{MalProvider, ProviderHandler};
    use crate::message::{InteractionStage, InteractionType, MalErrorCode, MalStatus, MessageBody};
    use crate::provider::typed::tests::{inbound, RecordingSender};
    use crate::provider::{InvokeInteraction, ProgressInteraction};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct FailingAfterAck;

    #[async_trait]
    impl ProviderHandler for FailingAfterAck {
        async fn handle_invoke(&self, interaction: InvokeInteraction) -> Result<(), MalStatus> {
            let _acknowledged = interaction.ack(MessageBody::Empty).await?;
            Err(MalStatus::fail_with_code(MalErrorCode::Internal, "worker crashed"))
        }

        async fn handle_progress(&self, interaction: ProgressInteraction) -> Result<(), MalStatus> {
            let acknowledged = interaction.ack(MessageBody::Empty).await?;
            acknowledged.response(MessageBody::Empty).await?;
            Err(MalStatus::from_code(MalErrorCode::Internal))
        }
    }

    struct Nothing;

    impl ProviderHandler for Nothing {}

    fn sent_stages(sender: &RecordingSender) -> Vec<(InteractionStage, bool)> {
        sender
            .sent()
            .iter()
            .map(|message| (message.header.stage, message.header.is_error))
            .collect()
    }

    #[tokio::test]
    async fn default_handler_rejects_with_unsupported_operation() {
        let sender = RecordingSender::new("provider");
        let provider = MalProvider::new(sender.clone(), Arc::new(Nothing));

        provider.dispatch(inbound(InteractionStage::Request)).await;
        provider.dispatch(inbound(InteractionStage::Send)).await;

        let sent = sender.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].header.stage, InteractionStage::RequestResponse);
        assert_eq!(
            sent[0].body.error_status().code,
            MalErrorCode::UnsupportedOperation
        );
    }

    #[tokio::test]
    async fn failure_after_ack_is_sent_on_response_stage() {
        let sender = RecordingSender::new("provider");
        let provider = MalProvider::new(sender.clone(), Arc::new(FailingAfterAck));

        provider.dispatch(inbound(InteractionStage::Invoke)).await;

        assert_eq!(
            sent_stages(&sender),
            vec![
                (InteractionStage::InvokeAck, false),
                (InteractionStage::InvokeResponse, true)
            ]
        );
    }

    #[tokio::test]
    async fn failure_after_terminal_reply_sends_nothing_more() {
        let sender = RecordingSender::new("provider");
        let provider = MalProvider::new(sender.clone(), Arc::new(FailingAfterAck));

        provider.dispatch(inbound(InteractionStage::Progress)).await;

        assert_eq!(
            sent_stages(&sender),
            vec![
                (InteractionStage::ProgressAck, false),
                (InteractionStage::ProgressResponse, false)
            ]
        );
    }

    #[tokio::test]
    async fn stage_foreign_to_pattern_gets_incorrect_state() {
        let sender = RecordingSender::new("provider");
        let provider = MalProvider::new(sender.clone(), Arc::new(Nothing));
        let mut message = inbound(InteractionStage::Submit);
        message.header.interaction_type = InteractionType::Invoke;

        provider.dispatch(message).await;

        let sent = sender.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].header.stage, InteractionStage::InvokeAck);
        assert_eq!(sent[0].body.error_status().code, MalErrorCode::IncorrectState);
    }
}
