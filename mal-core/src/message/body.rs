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

//! Message bodies and the publish/subscribe data model.

use crate::message::status::{MalErrorCode, MalStatus};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Value of a named key attached to a published update, or accepted by a filter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Boolean(bool),
    Integer(i64),
    UInteger(u64),
    Double(f64),
    String(String),
    Identifier(String),
    Blob(Bytes),
    Time(u64),
}

impl AttributeValue {
    pub fn identifier(value: impl Into<String>) -> Self {
        AttributeValue::Identifier(value.into())
    }
}

/// One filter of a subscription: the update's value for `name` must be one of `values`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionFilter {
    pub name: String,
    pub values: Vec<AttributeValue>,
}

impl SubscriptionFilter {
    pub fn new(name: impl Into<String>, values: Vec<AttributeValue>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// Subscription as exchanged during REGISTER.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub subscription_id: String,
    pub domain: Option<Vec<String>>,
    pub filters: Option<Vec<SubscriptionFilter>>,
    pub selected_keys: Option<Vec<String>>,
}

impl Subscription {
    pub fn new(subscription_id: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            domain: None,
            filters: None,
            selected_keys: None,
        }
    }

    pub fn with_domain<I, S>(mut self, domain: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.domain = Some(domain.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_filter(mut self, filter: SubscriptionFilter) -> Self {
        self.filters.get_or_insert_with(Vec::new).push(filter);
        self
    }

    pub fn with_selected_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected_keys = Some(keys.into_iter().map(Into::into).collect());
        self
    }
}

/// Header of one published update. Key values are positional and are named by the
/// publisher's PUBLISH_REGISTER key names.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpdateHeader {
    pub domain: Vec<String>,
    pub key_values: Vec<Option<AttributeValue>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Update {
    pub header: UpdateHeader,
    pub value: Bytes,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PublishBody {
    pub updates: Vec<Update>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NamedValue {
    pub name: String,
    pub value: Option<AttributeValue>,
}

/// Update header as delivered in a NOTIFY, restricted to the subscription's selected keys.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NotifiedUpdateHeader {
    pub domain: Vec<String>,
    pub key_values: Vec<NamedValue>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NotifiedUpdate {
    pub header: NotifiedUpdateHeader,
    pub value: Bytes,
}

/// Updates matched by one subscription. A NOTIFY carries one of these per matching
/// subscription of the consumer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NotifyBody {
    pub subscription_id: String,
    pub updates: Vec<NotifiedUpdate>,
}

/// Body of a message. Application payloads stay opaque; encoding them is the job of the
/// encoding layer in front of the transport.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum MessageBody {
    #[default]
    Empty,
    Encoded(Bytes),
    Error(MalStatus),
    Register(Subscription),
    Deregister(Vec<String>),
    PublishRegister(Vec<String>),
    PublishDeregister,
    Publish(PublishBody),
    Notify(Vec<NotifyBody>),
}

impl MessageBody {
    /// Status carried by an error-stage body. Peers that send an error flag without a
    /// status body are reported as UNKNOWN.
    pub fn error_status(&self) -> MalStatus {
        match self {
            MessageBody::Error(status) => status.clone(),
            _ => MalStatus::fail_with_code(
                MalErrorCode::Unknown,
                "error stage received without an error body",
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AttributeValue, MessageBody, Subscription, SubscriptionFilter};
    use crate::message::status::MalErrorCode;

    #[test]
    fn subscription_round_trips_through_serde() {
        let subscription = Subscription::new("S1")
            .with_domain(["esa", "*"])
            .with_filter(SubscriptionFilter::new(
                "mode",
                vec![
                    AttributeValue::identifier("SAFE"),
                    AttributeValue::identifier("NOMINAL"),
                ],
            ))
            .with_filter(SubscriptionFilter::new(
                "apid",
                vec![AttributeValue::UInteger(17)],
            ))
            .with_selected_keys(["mode"]);

        let encoded = serde_json::to_string(&MessageBody::Register(subscription.clone()))
            .expect("subscription should encode");
        let decoded: MessageBody =
            serde_json::from_str(&encoded).expect("subscription should decode");

        assert_eq!(decoded, MessageBody::Register(subscription));
    }

    #[test]
    fn error_status_falls_back_to_unknown() {
        assert_eq!(MessageBody::Empty.error_status().code, MalErrorCode::Unknown);
    }
}
