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

//! Message identity: addressing, operation identity, and the per-message header.

use crate::message::body::MessageBody;
use crate::message::interaction::{InteractionStage, InteractionType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::time::SystemTime;

/// Quality-of-service and other supplementary metadata attached to a message.
pub type QosProperties = BTreeMap<String, String>;

/// Opaque endpoint address understood by the transport.
#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uri(String);

impl Uri {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Uri {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Uri {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Uri {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Area/service/operation triple used to scope subscriptions and updates.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct OperationKey {
    pub area: u16,
    pub service: u16,
    pub operation: u16,
}

/// Full operation identity carried in every header.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct OperationId {
    pub area: u16,
    pub area_version: u8,
    pub service: u16,
    pub operation: u16,
}

impl OperationId {
    pub fn new(area: u16, area_version: u8, service: u16, operation: u16) -> Self {
        Self {
            area,
            area_version,
            service,
            operation,
        }
    }

    pub fn key(&self) -> OperationKey {
        OperationKey {
            area: self.area,
            service: self.service,
            operation: self.operation,
        }
    }
}

impl Display for OperationId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}/{}/{}",
            self.area, self.area_version, self.service, self.operation
        )
    }
}

/// Immutable identity of one message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MessageHeader {
    pub from: Uri,
    pub to: Uri,
    pub timestamp: SystemTime,
    pub interaction_type: InteractionType,
    pub stage: InteractionStage,
    pub transaction_id: u64,
    pub operation: OperationId,
    pub is_error: bool,
    #[serde(default)]
    pub supplements: BTreeMap<String, String>,
}

impl MessageHeader {
    /// Header for the first message of a transaction.
    pub fn initiating(
        from: Uri,
        to: Uri,
        stage: InteractionStage,
        transaction_id: u64,
        operation: OperationId,
    ) -> Self {
        Self {
            from,
            to,
            timestamp: SystemTime::now(),
            interaction_type: stage.interaction_type(),
            stage,
            transaction_id,
            operation,
            is_error: false,
            supplements: BTreeMap::new(),
        }
    }

    /// Header answering this one: addresses swapped, transaction and operation copied.
    pub fn reply(&self, stage: InteractionStage, is_error: bool) -> Self {
        Self {
            from: self.to.clone(),
            to: self.from.clone(),
            timestamp: SystemTime::now(),
            interaction_type: self.interaction_type,
            stage,
            transaction_id: self.transaction_id,
            operation: self.operation,
            is_error,
            supplements: self.supplements.clone(),
        }
    }

    pub fn has_consistent_stage(&self) -> bool {
        self.stage.is_valid_for(self.interaction_type)
    }
}

/// Header plus body plus QoS metadata, as handed to and received from the transport.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MalMessage {
    pub header: MessageHeader,
    pub body: MessageBody,
    #[serde(default)]
    pub qos: QosProperties,
}

impl MalMessage {
    pub fn new(header: MessageHeader, body: MessageBody) -> Self {
        Self {
            header,
            body,
            qos: QosProperties::new(),
        }
    }

    pub fn with_qos(mut self, qos: QosProperties) -> Self {
        self.qos = qos;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::{MessageHeader, OperationId, Uri};
    use crate::message::interaction::{InteractionStage, InteractionType};

    #[test]
    fn reply_mirrors_addresses_and_keeps_transaction() {
        let request = MessageHeader::initiating(
            Uri::new("consumer"),
            Uri::new("provider"),
            InteractionStage::Invoke,
            42,
            OperationId::new(4, 1, 2, 3),
        );

        let ack = request.reply(InteractionStage::InvokeAck, true);

        assert_eq!(ack.from, Uri::new("provider"));
        assert_eq!(ack.to, Uri::new("consumer"));
        assert_eq!(ack.transaction_id, 42);
        assert_eq!(ack.interaction_type, InteractionType::Invoke);
        assert_eq!(ack.operation, request.operation);
        assert!(ack.is_error);
        assert!(ack.has_consistent_stage());
    }

    #[test]
    fn operation_key_drops_area_version() {
        let operation = OperationId::new(4, 2, 7, 9);
        let key = operation.key();
        assert_eq!((key.area, key.service, key.operation), (4, 7, 9));
        assert_eq!(operation.to_string(), "4.2/7/9");
    }
}
