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

//! Status and standard error codes carried by error stages and local failures.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::fmt::{Display, Formatter};

/// Standard MAL error numbers.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MalErrorCode {
    DeliveryFailed,
    DeliveryTimedout,
    DeliveryDelayed,
    DestinationUnknown,
    DestinationTransient,
    DestinationLost,
    AuthenticationFail,
    AuthorisationFail,
    EncryptionFail,
    UnsupportedArea,
    UnsupportedAreaVersion,
    UnsupportedService,
    UnsupportedOperation,
    BadEncoding,
    Internal,
    Unknown,
    IncorrectState,
    TooMany,
    Shutdown,
    TransactionTimeout,
}

const ALL_CODES: [MalErrorCode; 20] = [
    MalErrorCode::DeliveryFailed,
    MalErrorCode::DeliveryTimedout,
    MalErrorCode::DeliveryDelayed,
    MalErrorCode::DestinationUnknown,
    MalErrorCode::DestinationTransient,
    MalErrorCode::DestinationLost,
    MalErrorCode::AuthenticationFail,
    MalErrorCode::AuthorisationFail,
    MalErrorCode::EncryptionFail,
    MalErrorCode::UnsupportedArea,
    MalErrorCode::UnsupportedAreaVersion,
    MalErrorCode::UnsupportedService,
    MalErrorCode::UnsupportedOperation,
    MalErrorCode::BadEncoding,
    MalErrorCode::Internal,
    MalErrorCode::Unknown,
    MalErrorCode::IncorrectState,
    MalErrorCode::TooMany,
    MalErrorCode::Shutdown,
    MalErrorCode::TransactionTimeout,
];

const ERROR_CODE_BASE: u32 = 65536;

impl MalErrorCode {
    /// Wire number of the error.
    pub fn number(self) -> u32 {
        ERROR_CODE_BASE + self as u32
    }

    pub fn from_number(number: u32) -> Option<Self> {
        let offset = number.checked_sub(ERROR_CODE_BASE)?;
        ALL_CODES.get(offset as usize).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            MalErrorCode::DeliveryFailed => "DELIVERY_FAILED",
            MalErrorCode::DeliveryTimedout => "DELIVERY_TIMEDOUT",
            MalErrorCode::DeliveryDelayed => "DELIVERY_DELAYED",
            MalErrorCode::DestinationUnknown => "DESTINATION_UNKNOWN",
            MalErrorCode::DestinationTransient => "DESTINATION_TRANSIENT",
            MalErrorCode::DestinationLost => "DESTINATION_LOST",
            MalErrorCode::AuthenticationFail => "AUTHENTICATION_FAIL",
            MalErrorCode::AuthorisationFail => "AUTHORISATION_FAIL",
            MalErrorCode::EncryptionFail => "ENCRYPTION_FAIL",
            MalErrorCode::UnsupportedArea => "UNSUPPORTED_AREA",
            MalErrorCode::UnsupportedAreaVersion => "UNSUPPORTED_AREA_VERSION",
            MalErrorCode::UnsupportedService => "UNSUPPORTED_SERVICE",
            MalErrorCode::UnsupportedOperation => "UNSUPPORTED_OPERATION",
            MalErrorCode::BadEncoding => "BAD_ENCODING",
            MalErrorCode::Internal => "INTERNAL",
            MalErrorCode::Unknown => "UNKNOWN",
            MalErrorCode::IncorrectState => "INCORRECT_STATE",
            MalErrorCode::TooMany => "TOO_MANY",
            MalErrorCode::Shutdown => "SHUTDOWN",
            MalErrorCode::TransactionTimeout => "TRANSACTION_TIMEOUT",
        }
    }
}

impl Display for MalErrorCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.number())
    }
}

/// Failure description used both for local errors and for error stages sent by a peer.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct MalStatus {
    pub code: MalErrorCode,
    pub message: Option<String>,
}

impl MalStatus {
    pub fn fail_with_code(code: MalErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: Some(message.into()),
        }
    }

    pub fn from_code(code: MalErrorCode) -> Self {
        Self {
            code,
            message: None,
        }
    }

    pub fn code(&self) -> MalErrorCode {
        self.code
    }

    pub fn get_message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl Display for MalStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.message.as_deref() {
            Some(message) => write!(f, "{}: {}", self.code, message),
            None => write!(f, "{}", self.code),
        }
    }
}

impl Error for MalStatus {}

#[cfg(test)]
mod tests {
    use super::{MalErrorCode, MalStatus};

    #[test]
    fn error_numbers_follow_standard_table() {
        assert_eq!(MalErrorCode::DeliveryFailed.number(), 65536);
        assert_eq!(MalErrorCode::DestinationUnknown.number(), 65539);
        assert_eq!(MalErrorCode::UnsupportedOperation.number(), 65548);
        assert_eq!(MalErrorCode::IncorrectState.number(), 65552);
        assert_eq!(MalErrorCode::TransactionTimeout.number(), 65555);
    }

    #[test]
    fn from_number_rejects_values_outside_table() {
        assert_eq!(
            MalErrorCode::from_number(65552),
            Some(MalErrorCode::IncorrectState)
        );
        assert_eq!(MalErrorCode::from_number(65535), None);
        assert_eq!(MalErrorCode::from_number(65556), None);
    }

    #[test]
    fn display_includes_code_and_message() {
        let status = MalStatus::fail_with_code(MalErrorCode::Unknown, "key not registered");
        assert_eq!(status.to_string(), "UNKNOWN(65551): key not registered");
        assert_eq!(
            MalStatus::from_code(MalErrorCode::Shutdown).to_string(),
            "SHUTDOWN(65554)"
        );
    }
}
