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

use crate::message::{MalErrorCode, MalStatus, OperationKey, PublishBody, Uri};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq)]
struct PublisherRegistration {
    key_names: Arc<[String]>,
    transaction_id: u64,
}

/// Key-name allow-list of one publisher endpoint, per operation.
#[derive(Clone, Debug)]
pub(crate) struct PublisherSource {
    publisher: Uri,
    registrations: HashMap<OperationKey, PublisherRegistration>,
}

impl PublisherSource {
    pub(crate) fn new(publisher: Uri) -> Self {
        Self {
            publisher,
            registrations: HashMap::new(),
        }
    }

    pub(crate) fn publisher(&self) -> &Uri {
        &self.publisher
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Records the key names a PUBLISH on `operation` will carry.
    ///
    /// Repeating an identical registration is accepted and adopts the new transaction id.
    pub(crate) fn register(
        &mut self,
        operation: OperationKey,
        transaction_id: u64,
        key_names: Vec<String>,
    ) -> Result<(), MalStatus> {
        if key_names.iter().any(|name| name.is_empty()) {
            return Err(rejected("publisher key names must not be empty"));
        }

        let mut seen = HashSet::new();
        if !key_names.iter().all(|name| seen.insert(name.as_str())) {
            return Err(rejected("publisher key names repeat"));
        }

        if let Some(existing) = self.registrations.get(&operation) {
            if existing.key_names.as_ref() != key_names.as_slice() {
                return Err(rejected(
                    "publisher already registered with different key names",
                ));
            }
        }

        self.registrations.insert(
            operation,
            PublisherRegistration {
                key_names: key_names.into(),
                transaction_id,
            },
        );
        Ok(())
    }

    pub(crate) fn deregister(&mut self, operation: OperationKey) -> bool {
        self.registrations.remove(&operation).is_some()
    }

    /// Checks `body` against the registration for `operation` and returns its key names.
    pub(crate) fn validate_publish(
        &self,
        operation: OperationKey,
        body: &PublishBody,
    ) -> Result<Arc<[String]>, MalStatus> {
        let registration = self
            .registrations
            .get(&operation)
            .ok_or_else(|| rejected("publisher is not registered for this operation"))?;

        let expected = registration.key_names.len();
        if body
            .updates
            .iter()
            .any(|update| update.header.key_values.len() != expected)
        {
            return Err(rejected(
                "update key value count differs from registered key names",
            ));
        }

        Ok(registration.key_names.clone())
    }

    pub(crate) fn transaction_id(&self, operation: OperationKey) -> Option<u64> {
        self.registrations
            .get(&operation)
            .map(|registration| registration.transaction_id)
    }
}

fn rejected(reason: &str) -> MalStatus {
    MalStatus::fail_with_code(MalErrorCode::Unknown, reason)
}
