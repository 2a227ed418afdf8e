//! Error types surfaced by the public API.
//!
//! Only data loading can fail with an `Err`. Everything that goes wrong while the
//! simulation is running (no route, no feasible vehicle, stale plans) is an expected
//! outcome and is reported through metrics and `log` lines instead.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed {document} document: {source}")]
    Json {
        document: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("duplicate node name '{0}'")]
    DuplicateNode(String),

    #[error("edge '{edge}' references unknown node '{node}'")]
    UnknownNode { edge: String, node: String },

    #[error("{entity} '{id}': {field} must be {expected} (got {value})")]
    InvalidField {
        entity: &'static str,
        id: String,
        field: &'static str,
        expected: &'static str,
        value: f64,
    },

    #[error("unknown traffic level '{0}'")]
    UnknownTrafficLevel(String),

    #[error("unknown node type '{0}'")]
    UnknownNodeKind(String),

    #[error("unknown vehicle type '{0}'")]
    UnknownVehicleKind(String),

    #[error("unknown vehicle state '{0}'")]
    UnknownVehicleState(String),

    #[error("vehicle '{vehicle}' starts at unknown node '{node}'")]
    UnknownStartLocation { vehicle: String, node: String },

    #[error("request {request} references unknown node '{node}'")]
    UnknownRequestNode { request: u64, node: String },

    #[error("request {request} has invalid timestamp '{value}'")]
    BadTimestamp { request: u64, value: String },

    #[error("duplicate {entity} id '{id}'")]
    DuplicateId { entity: &'static str, id: String },
}
