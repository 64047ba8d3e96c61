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

//! Per-pattern provider interactions. Terminal replies take `self`, so a second terminal
//! reply does not compile.

use crate::message::{InteractionStage, MalStatus, MessageBody};
use crate::provider::interaction::Interaction;

macro_rules! interaction_accessor {
    ($name:ident) => {
        impl $name {
            pub fn interaction(&self) -> &Interaction {
                &self.0
            }
        }
    };
}

pub struct SubmitInteraction(pub(crate) Interaction);
interaction_accessor!(SubmitInteraction);

impl SubmitInteraction {
    pub async fn ack(self) -> Result<(), MalStatus> {
        self.0
            .return_response(InteractionStage::SubmitAck, MessageBody::Empty)
            .await
            .map(|_| ())
    }

    pub async fn error(self, error: MalStatus) -> Result<(), MalStatus> {
        self.0
            .return_error(InteractionStage::SubmitAck, error)
            .await
            .map(|_| ())
    }
}

pub struct RequestInteraction(pub(crate) Interaction);
interaction_accessor!(RequestInteraction);

impl RequestInteraction {
    pub async fn reply(self, body: MessageBody) -> Result<(), MalStatus> {
        self.0
            .return_response(InteractionStage::RequestResponse, body)
            .await
            .map(|_| ())
    }

    pub async fn error(self, error: MalStatus) -> Result<(), MalStatus> {
        self.0
            .return_error(InteractionStage::RequestResponse, error)
            .await
            .map(|_| ())
    }
}

pub struct InvokeInteraction(pub(crate) Interaction);
interaction_accessor!(InvokeInteraction);

impl InvokeInteraction {
    pub async fn ack(self, body: MessageBody) -> Result<InvokeAcknowledged, MalStatus> {
        self.0
            .return_response(InteractionStage::InvokeAck, body)
            .await?;
        Ok(InvokeAcknowledged(self.0))
    }

    /// Rejects the invocation; no RESPONSE follows.
    pub async fn ack_error(self, error: MalStatus) -> Result<(), MalStatus> {
        self.0
            .return_error(InteractionStage::InvokeAck, error)
            .await
            .map(|_| ())
    }
}

/// INVOKE after a successful ACK.
pub struct InvokeAcknowledged(Interaction);
interaction_accessor!(InvokeAcknowledged);

impl InvokeAcknowledged {
    pub async fn response(self, body: MessageBody) -> Result<(), MalStatus> {
        self.0
            .return_response(InteractionStage::InvokeResponse, body)
            .await
            .map(|_| ())
    }

    pub async fn error(self, error: MalStatus) -> Result<(), MalStatus> {
        self.0
            .return_error(InteractionStage::InvokeResponse, error)
            .await
            .map(|_| ())
    }
}

pub struct ProgressInteraction(pub(crate) Interaction);
interaction_accessor!(ProgressInteraction);

impl ProgressInteraction {
    pub async fn ack(self, body: MessageBody) -> Result<ProgressAcknowledged, MalStatus> {
        self.0
            .return_response(InteractionStage::ProgressAck, body)
            .await?;
        Ok(ProgressAcknowledged(self.0))
    }

    pub async fn ack_error(self, error: MalStatus) -> Result<(), MalStatus> {
        self.0
            .return_error(InteractionStage::ProgressAck, error)
            .await
            .map(|_| ())
    }
}

/// PROGRESS after a successful ACK: any number of updates, then one response.
pub struct ProgressAcknowledged(Interaction);
interaction_accessor!(ProgressAcknowledged);

impl ProgressAcknowledged {
    pub async fn update(&self, body: MessageBody) -> Result<(), MalStatus> {
        self.0
            .return_response(InteractionStage::ProgressUpdate, body)
            .await
            .map(|_| ())
    }

    pub async fn update_error(&self, error: MalStatus) -> Result<(), MalStatus> {
        self.0
            .return_error(InteractionStage::ProgressUpdate, error)
            .await
            .map(|_| ())
    }

    pub async fn response(self, body: MessageBody) -> Result<(), MalStatus> {
        self.0
            .return_response(InteractionStage::ProgressResponse, body)
            .await
            .map(|_| ())
    }

    pub async fn response_error(self, error: MalStatus) -> Result<(), MalStatus> {
        self.0
            .return_error(InteractionStage::ProgressResponse, error)
            .await
            .map(|_| ())
    }
}
