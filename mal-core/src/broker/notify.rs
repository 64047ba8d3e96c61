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

use crate::message::{
    InteractionStage, MalMessage, MessageBody, MessageHeader, NotifiedUpdate, NotifyBody,
    OperationId, QosProperties, Uri,
};

/// Updates matched by one subscription, answered on its REGISTER transaction.
#[derive(Clone, Debug, PartialEq)]
pub struct NotifyMessage {
    pub subscription_id: String,
    pub transaction_id: u64,
    pub operation: OperationId,
    pub updates: Vec<NotifiedUpdate>,
}

/// Everything one PUBLISH produced for a single consumer.
#[derive(Clone, Debug, PartialEq)]
pub struct NotifyMessageSet {
    pub consumer: Uri,
    pub messages: Vec<NotifyMessage>,
}

impl NotifyMessageSet {
    pub fn update_count(&self) -> usize {
        self.messages
            .iter()
            .map(|message| message.updates.len())
            .sum()
    }

    /// REGISTER transaction the batch is answered on: the earliest one among the
    /// matching subscriptions.
    pub fn transaction_id(&self) -> u64 {
        self.messages
            .iter()
            .map(|message| message.transaction_id)
            .min()
            .unwrap_or_default()
    }

    /// The single NOTIFY for this consumer, with one section per matching subscription.
    pub(crate) fn into_message(
        self,
        broker: &Uri,
        operation: OperationId,
        qos: &QosProperties,
    ) -> MalMessage {
        let header = MessageHeader::initiating(
            broker.clone(),
            self.consumer.clone(),
            InteractionStage::Notify,
            self.transaction_id(),
            operation,
        );
        let sections = self
            .messages
            .into_iter()
            .map(|message| NotifyBody {
                subscription_id: message.subscription_id,
                updates: message.updates,
            })
            .collect();
        MalMessage::new(header, MessageBody::Notify(sections)).with_qos(qos.clone())
    }
}
