use serde_json::{Map, Value};
use thiserror::Error;
use warp::{http::StatusCode, reject::Reject};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    InvalidRequest,
    Conflict,
    SelfReference,
    NotFound,
    Unauthorized,
    InvalidSession,
    Forbidden,
    InternalServerError,
}

impl ErrorKind {
    pub fn new(self, info: &str) -> Error {
        Error {
            kind: self,
            field: None,
            info: info.to_owned(),
        }
    }

    pub fn default(self) -> Error {
        let info = match self {
            ErrorKind::Validation => "Invalid input",
            ErrorKind::InvalidRequest => "Invalid request",
            ErrorKind::Conflict => "Object already exists",
            ErrorKind::SelfReference => "Operation is not allowed on yourself",
            ErrorKind::NotFound => "Not found.",
            ErrorKind::Unauthorized => "Authentication credentials were not provided.",
            ErrorKind::InvalidSession => "Invalid session",
            ErrorKind::Forbidden => "You do not have permission to perform this action.",
            ErrorKind::InternalServerError => "Internal server error",
        };
        self.new(info)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ErrorKind::Validation
            | ErrorKind::InvalidRequest
            | ErrorKind::Conflict
            | ErrorKind::SelfReference => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Unauthorized | ErrorKind::InvalidSession => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error surfaced to the caller of any action. `field` names the offending
/// input for validation failures.
#[derive(Debug, Error)]
#[error("{info}")]
pub struct Error {
    pub kind: ErrorKind,
    pub field: Option<String>,
    pub info: String,
}

impl Error {
    pub fn field(field: &str, info: &str) -> Self {
        Self {
            kind: ErrorKind::Validation,
            field: Some(field.to_owned()),
            info: info.to_owned(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.kind.status()
    }

    pub fn body(&self) -> Value {
        let mut body = Map::new();
        match &self.field {
            Some(field) => {
                body.insert(
                    field.to_owned(),
                    Value::Array(vec![Value::String(self.info.to_owned())]),
                );
            }
            None => {
                body.insert("detail".to_owned(), Value::String(self.info.to_owned()));
            }
        }
        Value::Object(body)
    }
}

impl Reject for Error {}

#[derive(Debug)]
pub struct QueryError {
    kind: ErrorKind,
    info: String,
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self {
            kind: ErrorKind::InternalServerError,
            info,
        }
    }

    /// Replaces the message of a constraint conflict with one the caller understands.
    pub fn on_conflict(mut self, info: &str) -> Self {
        if self.kind == ErrorKind::Conflict {
            self.info = info.to_owned();
        }
        self
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Database(e) if e.is_unique_violation() => Self {
                kind: ErrorKind::Conflict,
                info: String::from("Object already exists"),
            },
            sqlx::Error::Database(e) if e.is_check_violation() => Self {
                kind: ErrorKind::Conflict,
                info: String::from("Constraint violated"),
            },
            sqlx::Error::Database(e) if e.is_foreign_key_violation() => Self {
                kind: ErrorKind::InvalidRequest,
                info: String::from("Referenced object does not exist"),
            },
            sqlx::Error::Database(e) => Self::new(format!("{e}")),
            sqlx::Error::RowNotFound => Self {
                kind: ErrorKind::NotFound,
                info: String::from("Not found."),
            },
            sqlx::Error::PoolTimedOut => Self::new(String::from("Pool timed out")),
            sqlx::Error::PoolClosed => Self::new(String::from("Pool closed")),
            e => Self::new(format!("{e}")),
        }
    }
}

impl From<QueryError> for Error {
    fn from(value: QueryError) -> Self {
        if value.kind == ErrorKind::InternalServerError {
            log::error!("Query failed: {}", value.info);
            return ErrorKind::InternalServerError.default();
        }

        Error {
            kind: value.kind,
            field: None,
            info: value.info,
        }
    }
}
