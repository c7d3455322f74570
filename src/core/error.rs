// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core error types for schemacodec.
//!
//! Provides the error taxonomy shared by every component:
//! - Catalog and per-schema load failures (raised while building a generation)
//! - Lookup failures (unknown schema, format or message name)
//! - Conversion failures (malformed input, I/O on the caller's streams)
//!
//! Transport layers only need [`RegistryError::category`] to decide between
//! a "not found" and a "bad request" style response.

use std::fmt;
use std::io;

/// Coarse classification used by front ends to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The schema ID does not exist in the current generation
    NotFound,
    /// The request could not be served as given
    CallerError,
    /// Catalog and registry disagree, or a build step failed
    Internal,
}

/// Errors raised by the catalog, the loaders, the strategies and the filters.
#[derive(Debug, Clone)]
pub enum RegistryError {
    /// Schema ID absent from the catalog, or present but never loaded
    UnknownSchema {
        /// Requested schema ID
        schema_id: String,
    },

    /// Catalog entry names a format with no registered strategy
    UnknownFormat {
        /// Schema ID
        schema_id: String,
        /// Raw format tag from the catalog
        format: String,
    },

    /// Message name missing (and no default) or not defined by the schema
    UnknownMessage {
        /// Schema ID
        schema_id: String,
        /// Requested name, empty when the default was asked for
        requested: String,
        /// Message names the schema does define, sorted
        known: Vec<String>,
    },

    /// One schema could not be loaded; the rest of the generation is unaffected
    LoadFailure {
        /// Schema ID
        schema_id: String,
        /// What went wrong
        reason: String,
    },

    /// The catalog document itself could not be read or parsed
    CatalogBuild {
        /// Where the catalog came from
        source: String,
        /// What went wrong
        reason: String,
    },

    /// Malformed text, malformed binary, or an invalid parameter
    InvalidInput {
        /// What was being processed (e.g. "avro", "protobuf", "filter")
        context: String,
        /// Error message
        message: String,
    },

    /// Read or write failure on the caller's source or sink
    Io {
        /// Underlying I/O error kind
        kind: io::ErrorKind,
        /// Error message
        message: String,
    },
}

impl RegistryError {
    /// Create an "unknown schema" error.
    pub fn unknown_schema(schema_id: impl Into<String>) -> Self {
        RegistryError::UnknownSchema {
            schema_id: schema_id.into(),
        }
    }

    /// Create an "unknown format" error.
    pub fn unknown_format(schema_id: impl Into<String>, format: impl Into<String>) -> Self {
        RegistryError::UnknownFormat {
            schema_id: schema_id.into(),
            format: format.into(),
        }
    }

    /// Create an "unknown message" error listing the names the schema does know.
    pub fn unknown_message<I, S>(
        schema_id: impl Into<String>,
        requested: impl Into<String>,
        known: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut known: Vec<String> = known.into_iter().map(Into::into).collect();
        known.sort();
        RegistryError::UnknownMessage {
            schema_id: schema_id.into(),
            requested: requested.into(),
            known,
        }
    }

    /// Create a per-schema load failure.
    pub fn load_failure(schema_id: impl Into<String>, reason: impl Into<String>) -> Self {
        RegistryError::LoadFailure {
            schema_id: schema_id.into(),
            reason: reason.into(),
        }
    }

    /// Create a catalog build failure.
    pub fn catalog_build(source: impl Into<String>, reason: impl Into<String>) -> Self {
        RegistryError::CatalogBuild {
            source: source.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(context: impl Into<String>, message: impl Into<String>) -> Self {
        RegistryError::InvalidInput {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Classify this error for transport-level status mapping.
    pub fn category(&self) -> ErrorCategory {
        match self {
            RegistryError::UnknownSchema { .. } => ErrorCategory::NotFound,
            RegistryError::UnknownFormat { .. }
            | RegistryError::LoadFailure { .. }
            | RegistryError::CatalogBuild { .. } => ErrorCategory::Internal,
            RegistryError::UnknownMessage { .. }
            | RegistryError::InvalidInput { .. }
            | RegistryError::Io { .. } => ErrorCategory::CallerError,
        }
    }

    /// Check if this error means the schema could not be found.
    pub fn is_not_found(&self) -> bool {
        self.category() == ErrorCategory::NotFound
    }

    /// Get structured fields for logging.
    pub fn log_fields(&self) -> Vec<(&'static str, String)> {
        match self {
            RegistryError::UnknownSchema { schema_id } => vec![("schema", schema_id.clone())],
            RegistryError::UnknownFormat { schema_id, format } => {
                vec![("schema", schema_id.clone()), ("format", format.clone())]
            }
            RegistryError::UnknownMessage {
                schema_id,
                requested,
                known,
            } => vec![
                ("schema", schema_id.clone()),
                ("requested", requested.clone()),
                ("known", known.join(", ")),
            ],
            RegistryError::LoadFailure { schema_id, reason } => {
                vec![("schema", schema_id.clone()), ("reason", reason.clone())]
            }
            RegistryError::CatalogBuild { source, reason } => {
                vec![("source", source.clone()), ("reason", reason.clone())]
            }
            RegistryError::InvalidInput { context, message } => {
                vec![("context", context.clone()), ("message", message.clone())]
            }
            RegistryError::Io { kind, message } => {
                vec![("kind", format!("{kind:?}")), ("message", message.clone())]
            }
        }
    }
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::UnknownSchema { schema_id } => {
                write!(f, "unknown schema '{schema_id}'")
            }
            RegistryError::UnknownFormat { schema_id, format } => {
                write!(f, "unknown schema type '{format}' for schema '{schema_id}'")
            }
            RegistryError::UnknownMessage {
                schema_id,
                requested,
                known,
            } => {
                if requested.is_empty() {
                    write!(f, "no default message for schema '{schema_id}'")?;
                } else {
                    write!(
                        f,
                        "unknown message name '{requested}' for schema '{schema_id}'"
                    )?;
                }
                write!(f, ", known names are: {}", known.join(", "))
            }
            RegistryError::LoadFailure { schema_id, reason } => {
                write!(f, "failed to load schema '{schema_id}': {reason}")
            }
            RegistryError::CatalogBuild { source, reason } => {
                write!(f, "failed to build catalog from {source}: {reason}")
            }
            RegistryError::InvalidInput { context, message } => {
                write!(f, "invalid {context} input: {message}")
            }
            RegistryError::Io { message, .. } => write!(f, "I/O error: {message}"),
        }
    }
}

impl std::error::Error for RegistryError {}

impl From<io::Error> for RegistryError {
    fn from(err: io::Error) -> Self {
        // data a reader could not decode is the caller's input, not the stream
        if err.kind() == io::ErrorKind::InvalidData {
            return RegistryError::invalid_input("stream", err.to_string());
        }
        RegistryError::Io {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Result type for schemacodec operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_schema_error() {
        let err = RegistryError::unknown_schema("does-not-exist");
        assert!(matches!(err, RegistryError::UnknownSchema { .. }));
        assert_eq!(err.to_string(), "unknown schema 'does-not-exist'");
        assert_eq!(err.category(), ErrorCategory::NotFound);
        assert!(err.is_not_found());
    }

    #[test]
    fn test_unknown_message_lists_sorted_names() {
        let err = RegistryError::unknown_message("addr-book", "Nope", ["Person", "AddressBook"]);
        assert_eq!(
            err.to_string(),
            "unknown message name 'Nope' for schema 'addr-book', known names are: AddressBook, Person"
        );
        assert_eq!(err.category(), ErrorCategory::CallerError);
    }

    #[test]
    fn test_missing_default_message() {
        let err = RegistryError::unknown_message("svc", "", ["A", "B"]);
        assert_eq!(
            err.to_string(),
            "no default message for schema 'svc', known names are: A, B"
        );
    }

    #[test]
    fn test_unknown_format_error() {
        let err = RegistryError::unknown_format("s1", "json");
        assert_eq!(err.to_string(), "unknown schema type 'json' for schema 's1'");
        assert_eq!(err.category(), ErrorCategory::Internal);
    }

    #[test]
    fn test_load_and_catalog_errors_are_internal() {
        let load = RegistryError::load_failure("s1", "no message definitions");
        assert_eq!(
            load.to_string(),
            "failed to load schema 's1': no message definitions"
        );
        assert_eq!(load.category(), ErrorCategory::Internal);

        let build = RegistryError::catalog_build("catalog.json", "missing field `type`");
        assert_eq!(
            build.to_string(),
            "failed to build catalog from catalog.json: missing field `type`"
        );
        assert_eq!(build.category(), ErrorCategory::Internal);
    }

    #[test]
    fn test_invalid_input_error() {
        let err = RegistryError::invalid_input("filter", "unknown filter rot13");
        assert_eq!(err.to_string(), "invalid filter input: unknown filter rot13");
        assert_eq!(err.category(), ErrorCategory::CallerError);
    }

    #[test]
    fn test_from_io_error() {
        let io_err = io::Error::new(io::ErrorKind::BrokenPipe, "sink closed");
        let err: RegistryError = io_err.into();
        assert!(matches!(
            err,
            RegistryError::Io {
                kind: io::ErrorKind::BrokenPipe,
                ..
            }
        ));
        assert_eq!(err.to_string(), "I/O error: sink closed");
        assert_eq!(err.category(), ErrorCategory::CallerError);
    }

    #[test]
    fn test_invalid_data_is_invalid_input() {
        let err: RegistryError =
            io::Error::new(io::ErrorKind::InvalidData, "corrupt gzip data").into();
        assert!(matches!(err, RegistryError::InvalidInput { .. }));
        assert_eq!(err.to_string(), "invalid stream input: corrupt gzip data");
    }

    #[test]
    fn test_log_fields_unknown_message() {
        let err = RegistryError::unknown_message("s", "X", ["B", "A"]);
        let fields = err.log_fields();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0], ("schema", "s".to_string()));
        assert_eq!(fields[1], ("requested", "X".to_string()));
        assert_eq!(fields[2], ("known", "A, B".to_string()));
    }

    #[test]
    fn test_log_fields_io() {
        let err: RegistryError = io::Error::new(io::ErrorKind::UnexpectedEof, "eof").into();
        let fields = err.log_fields();
        assert_eq!(fields[0], ("kind", "UnexpectedEof".to_string()));
        assert_eq!(fields[1], ("message", "eof".to_string()));
    }
}
