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

use crate::message::{NamedValue, OperationKey, UpdateHeader};

/// Matchable projection of one published update, built per PUBLISH and then dropped.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct UpdateKeyValues {
    pub(crate) domain: Vec<String>,
    pub(crate) operation: OperationKey,
    pub(crate) keys: Vec<NamedValue>,
}

impl UpdateKeyValues {
    /// Names the positional key values of `header` with the publisher's registered names.
    pub(crate) fn new(operation: OperationKey, key_names: &[String], header: &UpdateHeader) -> Self {
        let keys = key_names
            .iter()
            .zip(header.key_values.iter())
            .map(|(name, value)| NamedValue {
                name: name.clone(),
                value: value.clone(),
            })
            .collect();

        Self {
            domain: header.domain.clone(),
            operation,
            keys,
        }
    }

    /// Key values restricted to `selected`, in selection order. `None` keeps all of them.
    pub(crate) fn selected(&self, selected: Option<&[String]>) -> Vec<NamedValue> {
        match selected {
            None => self.keys.clone(),
            Some(names) => names
                .iter()
                .filter_map(|name| self.keys.iter().find(|key| &key.name == name))
                .cloned()
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::UpdateKeyValues;
    use crate::message::{AttributeValue, OperationKey, UpdateHeader};

    fn header() -> UpdateHeader {
        UpdateHeader {
            domain: vec!["esa".to_string()],
            key_values: vec![
                Some(AttributeValue::identifier("SAFE")),
                None,
                Some(AttributeValue::UInteger(4)),
            ],
        }
    }

    fn names() -> Vec<String> {
        ["mode", "phase", "apid"].iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn key_names_are_zipped_with_positional_values() {
        let operation = OperationKey {
            area: 1,
            service: 2,
            operation: 3,
        };
        let view = UpdateKeyValues::new(operation, &names(), &header());

        assert_eq!(view.keys.len(), 3);
        assert_eq!(view.keys[0].name, "mode");
        assert_eq!(view.keys[1].value, None);
        assert_eq!(view.keys[2].value, Some(AttributeValue::UInteger(4)));
    }

    #[test]
    fn selection_follows_requested_order_and_skips_unknown_names() {
        let operation = OperationKey {
            area: 1,
            service: 2,
            operation: 3,
        };
        let view = UpdateKeyValues::new(operation, &names(), &header());
        let selection = vec!["apid".to_string(), "missing".to_string(), "mode".to_string()];

        let selected = view.selected(Some(&selection));
        let selected_names: Vec<&str> = selected.iter().map(|key| key.name.as_str()).collect();
        assert_eq!(selected_names, vec!["apid", "mode"]);
        assert_eq!(view.selected(None).len(), 3);
    }
}
