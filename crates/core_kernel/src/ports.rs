//! Ports and request context
//!
//! Domain services never reach for an ambient "current user" or "current
//! branch". Every entry point receives an [`ActorContext`] built by the
//! request handler, and infrastructure is reached through port traits
//! defined next to the domain that needs them.
//!
//! ```text
//!   request handler ──ActorContext──▶ domain service ──port trait──▶ adapter
//!                                                                  (PostgreSQL,
//!                                                                   in-memory)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::identifiers::{BranchId, UserId};

/// Error type for port operations
#[derive(Debug, Error)]
pub enum PortError {
    /// The requested entity was not found
    #[error("Not found: {entity_type} with id {id}")]
    NotFound {
        entity_type: String,
        id: String,
    },

    /// Connection to the underlying system failed
    #[error("Connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The downstream consumer refused the message
    #[error("Rejected: {message}")]
    Rejected {
        message: String,
    },
}

impl PortError {
    pub fn not_found(entity_type: impl Into<String>, id: impl fmt::Display) -> Self {
        PortError::NotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        PortError::Connection {
            message: message.into(),
            source: None,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        PortError::Rejected {
            message: message.into(),
        }
    }

    /// Returns true if this error indicates a transient failure that may succeed on retry
    pub fn is_transient(&self) -> bool {
        matches!(self, PortError::Connection { .. })
    }
}

/// Health status for an adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterHealth {
    Healthy,
    Unhealthy,
}

/// Health check result for an adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub adapter_id: String,
    pub status: AdapterHealth,
    pub latency_ms: u64,
    pub message: Option<String>,
    pub checked_at: DateTime<Utc>,
}

/// Trait for adapters that support health checks
#[async_trait::async_trait]
pub trait HealthCheckable: Send + Sync {
    async fn health_check(&self) -> HealthCheckResult;
}

/// Who is acting, where, and when
///
/// Threaded explicitly through every ledger and checkout entry point; the
/// audit fields of everything they write come from here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorContext {
    pub user_id: UserId,
    pub branch_id: BranchId,
    /// Opaque POS terminal/session token supplied by the client, if any
    pub session_token: Option<String>,
    /// Correlation ID for tracing across systems
    pub correlation_id: Option<String>,
    /// The instant the request is evaluated at
    pub requested_at: DateTime<Utc>,
}

impl ActorContext {
    /// Creates a context evaluated at the current instant
    pub fn new(user_id: UserId, branch_id: BranchId) -> Self {
        Self {
            user_id,
            branch_id,
            session_token: None,
            correlation_id: None,
            requested_at: Utc::now(),
        }
    }

    /// Pins the evaluation instant (reference numbers and "today" derive from it)
    pub fn at(mut self, requested_at: DateTime<Utc>) -> Self {
        self.requested_at = requested_at;
        self
    }

    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }
}
