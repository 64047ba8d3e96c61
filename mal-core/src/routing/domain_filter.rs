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

//! Domain wildcard matching for subscriptions.

pub(crate) const DOMAIN_WILDCARD: &str = "*";

/// Whether an update published in `update` falls under the subscription domain `pattern`.
///
/// `*` matches exactly one segment. A trailing `*` also matches any non-empty tail, so
/// `esa.*` covers `esa.mission` and `esa.mission.ops` but not `esa`.
pub(crate) fn domain_matches(pattern: &[String], update: &[String]) -> bool {
    for (index, segment) in pattern.iter().enumerate() {
        let Some(update_segment) = update.get(index) else {
            return false;
        };

        if segment == DOMAIN_WILDCARD {
            if index + 1 == pattern.len() {
                return true;
            }
        } else if segment != update_segment {
            return false;
        }
    }

    pattern.len() == update.len()
}
