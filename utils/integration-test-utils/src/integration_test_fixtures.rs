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

use bytes::Bytes;
use mal_core::{AttributeValue, OperationId, Update, UpdateHeader, Uri};

pub fn broker_uri() -> Uri {
    Uri::new("ground/broker")
}

pub fn provider_uri() -> Uri {
    Uri::new("ground/provider")
}

pub fn consumer_uri() -> Uri {
    Uri::new("ground/consumer")
}

pub fn second_consumer_uri() -> Uri {
    Uri::new("ground/consumer-b")
}

/// PubSub operation used for telemetry parameters.
pub fn parameter_operation() -> OperationId {
    OperationId::new(4, 1, 2, 1)
}

/// Operation used for the request/response family of tests.
pub fn control_operation() -> OperationId {
    OperationId::new(4, 1, 7, 3)
}

/// Key names announced by the parameter publisher, in positional order.
pub fn parameter_key_names() -> Vec<String> {
    vec!["mode".to_string(), "apid".to_string()]
}

/// Update for `domain` carrying `mode` as the first key and `apid` as the second.
pub fn parameter_update(domain: &[&str], mode: &str, apid: u64, payload: &'static [u8]) -> Update {
    Update {
        header: UpdateHeader {
            domain: domain.iter().map(|segment| segment.to_string()).collect(),
            key_values: vec![
                Some(AttributeValue::identifier(mode)),
                Some(AttributeValue::UInteger(apid)),
            ],
        },
        value: Bytes::from_static(payload),
    }
}
