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

mod memory_network;
pub use memory_network::MemoryNetwork;
mod recording_listener;
pub use recording_listener::{ListenerCall, RecordingListener};
mod integration_test_utils;
pub use integration_test_utils::{init_logging, wait_until};
mod integration_test_fixtures;

pub use integration_test_fixtures::{
    broker_uri, consumer_uri, control_operation, parameter_key_names, parameter_operation,
    parameter_update, provider_uri, second_consumer_uri,
};
