use core_types::FieldErrors;
use mongodb::bson::{Bson, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use thiserror::Error;

/// Server error code for a write rejected by the collection's `$jsonSchema` validator.
const DOCUMENT_VALIDATION_FAILURE: i32 = 121;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Invalid database connection settings: {0}")]
    ConnectionConfigError(String),

    #[error("Failed to connect to the database: {0}")]
    ConnectionError(#[source] mongodb::error::Error),

    #[error("All {attempts} connection attempts failed: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<DbError>,
    },

    #[error("The database is not connected.")]
    NotConnected,

    #[error("Document failed validation: {0}")]
    ValidationError(FieldErrors),

    #[error("Database operation failed: {0}")]
    QueryError(#[source] mongodb::error::Error),

    #[error("A stored document could not be read: {0}")]
    MalformedDocument(String),
}

impl From<mongodb::error::Error> for DbError {
    fn from(err: mongodb::error::Error) -> Self {
        if let ErrorKind::Write(WriteFailure::WriteError(write_error)) = err.kind.as_ref() {
            if write_error.code == DOCUMENT_VALIDATION_FAILURE {
                let mut details = write_error
                    .details
                    .as_ref()
                    .map(schema_violations)
                    .unwrap_or_default();
                if details.is_empty() {
                    details.insert("document", write_error.message.clone());
                }
                return DbError::ValidationError(details);
            }
        }
        DbError::QueryError(err)
    }
}

impl DbError {
    /// Short error kind, surfaced to clients as `error.name`.
    pub fn name(&self) -> &'static str {
        match self {
            DbError::ConnectionConfigError(_) => "MongoParseError",
            DbError::ConnectionError(_) | DbError::RetriesExhausted { .. } => "MongoNetworkError",
            DbError::NotConnected => "MongoNotConnectedError",
            DbError::ValidationError(_) => "ValidationError",
            DbError::QueryError(_) => "MongoServerError",
            DbError::MalformedDocument(_) => "MongoDecodeError",
        }
    }

    /// Field-level detail, when the store rejected specific fields.
    pub fn details(&self) -> Option<&FieldErrors> {
        match self {
            DbError::ValidationError(details) => Some(details),
            _ => None,
        }
    }
}

/// Extracts per-property failures from a document validation `errInfo`.
///
/// The server reports them under
/// `details.schemaRulesNotSatisfied[].{propertiesNotSatisfied[].propertyName, missingProperties[]}`.
fn schema_violations(err_info: &Document) -> FieldErrors {
    let mut details = FieldErrors::new();
    let Ok(rules) = err_info
        .get_document("details")
        .and_then(|d| d.get_array("schemaRulesNotSatisfied"))
    else {
        return details;
    };

    for rule in rules.iter().filter_map(Bson::as_document) {
        if let Ok(properties) = rule.get_array("propertiesNotSatisfied") {
            for property in properties.iter().filter_map(Bson::as_document) {
                if let Ok(name) = property.get_str("propertyName") {
                    let message = property
                        .get_str("description")
                        .unwrap_or("does not satisfy the collection schema");
                    details.insert(name, message);
                }
            }
        }
        if let Ok(missing) = rule.get_array("missingProperties") {
            for name in missing.iter().filter_map(Bson::as_str) {
                details.insert(name, format!("Path `{name}` is required."));
            }
        }
    }
    details
}
