// SPDX-License-Identifier: Apache-2.0
// SPDX-FileCopyrightText: Copyright The Lloyd Authors

use arrow_schema::ArrowError;
use snafu::{location, Location, Snafu};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// A construction parameter is out of its valid range.
    #[snafu(display("Invalid parameter: {message}, {location}"))]
    InvalidParameter { message: String, location: Location },
    /// The data handed to the engine can not be clustered.
    #[snafu(display("Invalid input: {message}, {location}"))]
    InvalidInput { message: String, location: Location },
    #[snafu(display("KMeans model is not fitted: {message}, {location}"))]
    NotFitted { message: String, location: Location },
    #[snafu(display("LloydError(Arrow): {message}, {location}"))]
    Arrow { message: String, location: Location },
}

impl Error {
    #[track_caller]
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        let location = std::panic::Location::caller();
        Self::InvalidParameter {
            message: message.into(),
            location: Location::new(location.file(), location.line(), location.column()),
        }
    }

    #[track_caller]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        let location = std::panic::Location::caller();
        Self::InvalidInput {
            message: message.into(),
            location: Location::new(location.file(), location.line(), location.column()),
        }
    }

    #[track_caller]
    pub fn not_fitted(message: impl Into<String>) -> Self {
        let location = std::panic::Location::caller();
        Self::NotFitted {
            message: message.into(),
            location: Location::new(location.file(), location.line(), location.column()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<ArrowError> for Error {
    fn from(e: ArrowError) -> Self {
        Self::Arrow {
            message: e.to_string(),
            location: location!(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_carries_location() {
        let err = Error::invalid_input("dataset is empty");
        let msg = err.to_string();
        assert!(msg.starts_with("Invalid input: dataset is empty"));
        assert!(msg.contains("error.rs"));
    }

    #[test]
    fn test_arrow_error_conversion() {
        let err: Error = ArrowError::InvalidArgumentError("bad length".to_string()).into();
        assert!(matches!(err, Error::Arrow { .. }));
        assert!(err.to_string().contains("bad length"));
    }

    #[test]
    fn test_error_kinds_are_distinct() {
        assert!(matches!(
            Error::invalid_parameter("k"),
            Error::InvalidParameter { .. }
        ));
        assert!(matches!(Error::not_fitted("labels"), Error::NotFitted { .. }));
    }
}
