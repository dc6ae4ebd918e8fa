//! Connection status models.

use serde::Serialize;

/// Where the pool points, without credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionTarget {
    pub host: String,
    pub port: u16,
    pub database: String,
}

/// Outcome of a connectivity round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connected {
        version: String,
        database: String,
        user: String,
        connection_info: ConnectionTarget,
    },
    Failed {
        error: String,
    },
}

impl ConnectionStatus {
    pub fn failed(error: impl Into<String>) -> Self {
        Self::Failed {
            error: error.into(),
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }
}
