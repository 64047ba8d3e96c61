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

//! Provider side of one received transaction.

use crate::endpoint::MessageSender;
use crate::message::{
    expected_next_stage, first_reply_stage, InteractionStage, MalErrorCode, MalMessage,
    MalStatus, MessageBody, MessageHeader, QosProperties,
};
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct SentStage {
    stage: InteractionStage,
    terminal: bool,
}

struct InteractionState {
    sender: Arc<dyn MessageSender>,
    request: MalMessage,
    last_sent: Mutex<Option<SentStage>>,
}

/// Reply surface for one initiating message.
///
/// Every reply mirrors the initiating header: addresses swapped, transaction id and
/// operation copied. Stages must belong to the interaction's pattern, but ordering and
/// the number of terminal replies are left to the caller; the typed wrappers in this
/// module enforce both.
#[derive(Clone)]
pub struct Interaction {
    state: Arc<InteractionState>,
}

impl Interaction {
    pub(crate) fn new(sender: Arc<dyn MessageSender>, request: MalMessage) -> Self {
        Self {
            state: Arc::new(InteractionState {
                sender,
                request,
                last_sent: Mutex::new(None),
            }),
        }
    }

    pub fn header(&self) -> &MessageHeader {
        &self.state.request.header
    }

    pub fn body(&self) -> &MessageBody {
        &self.state.request.body
    }

    pub fn qos(&self) -> &QosProperties {
        &self.state.request.qos
    }

    pub async fn return_response(
        &self,
        stage: InteractionStage,
        body: MessageBody,
    ) -> Result<MalMessage, MalStatus> {
        self.reply(stage, false, body).await
    }

    /// Same as [`Interaction::return_response`] for a body already encoded by the caller.
    pub async fn return_encoded_response(
        &self,
        stage: InteractionStage,
        encoded: Bytes,
    ) -> Result<MalMessage, MalStatus> {
        self.reply(stage, false, MessageBody::Encoded(encoded))
            .await
    }

    pub async fn return_error(
        &self,
        stage: InteractionStage,
        error: MalStatus,
    ) -> Result<MalMessage, MalStatus> {
        self.reply(stage, true, MessageBody::Error(error)).await
    }

    /// Last reply stage handed to the sender, if any.
    pub async fn last_stage_sent(&self) -> Option<InteractionStage> {
        self.state.last_sent.lock().await.map(|sent| sent.stage)
    }

    /// Stage a failure must be reported on, or `None` when the transaction already ended.
    pub(crate) async fn pending_error_stage(&self) -> Option<InteractionStage> {
        let initiating = self.header().stage;
        match *self.state.last_sent.lock().await {
            None => first_reply_stage(initiating),
            Some(SentStage { terminal: true, .. }) => None,
            Some(SentStage { stage, .. }) => match stage {
                InteractionStage::InvokeAck => Some(InteractionStage::InvokeResponse),
                InteractionStage::ProgressAck | InteractionStage::ProgressUpdate => {
                    Some(InteractionStage::ProgressResponse)
                }
                _ => None,
            },
        }
    }

    async fn reply(
        &self,
        stage: InteractionStage,
        is_error: bool,
        body: MessageBody,
    ) -> Result<MalMessage, MalStatus> {
        let header = self.header();
        if !stage.is_valid_for(header.interaction_type) || stage.is_initiating() {
            return Err(MalStatus::fail_with_code(
                MalErrorCode::IncorrectState,
                format!(
                    "{} is not a reply stage of {}",
                    stage, header.interaction_type
                ),
            ));
        }

        let sent = self
            .state
            .sender
            .send_message(header.reply(stage, is_error), body, QosProperties::new())
            .await?;

        let terminal = (is_error && stage != InteractionStage::ProgressUpdate)
            || expected_next_stage(header.interaction_type, stage).is_none();
        *self.state.last_sent.lock().await = Some(SentStage { stage, terminal });
        Ok(sent)
    }
}
