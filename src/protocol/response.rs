//! Response definitions
//!
//! Represents responses to clients.

use crate::error::{PoolError, Result};
use crate::percentile::Quantile;
use crate::store::{AppendKind, DeleteResult};

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Ok = 0x00,
    NotFound = 0x01,
    InvalidInput = 0x02,
    Error = 0x03,
}

/// Payload byte of an ADD response
const ADD_CREATED: u8 = 0x01;
const ADD_EXTENDED: u8 = 0x02;

/// A response to send to client
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Status code
    pub status: Status,

    /// Optional payload (result for OK, message otherwise)
    pub payload: Option<Vec<u8>>,
}

impl Response {
    /// Create an OK response with optional payload
    pub fn ok(payload: Option<Vec<u8>>) -> Self {
        Self {
            status: Status::Ok,
            payload,
        }
    }

    /// OK response to an ADD
    pub fn added(kind: AppendKind) -> Self {
        let byte = match kind {
            AppendKind::Created => ADD_CREATED,
            AppendKind::Extended => ADD_EXTENDED,
        };
        Self::ok(Some(vec![byte]))
    }

    /// OK response to a QUERY: quantile (8) + total (8)
    pub fn quantile(q: Quantile) -> Self {
        let mut payload = Vec::with_capacity(16);
        payload.extend_from_slice(&q.quantile.to_be_bytes());
        payload.extend_from_slice(&q.total.to_be_bytes());
        Self::ok(Some(payload))
    }

    /// Response to a DELETE
    pub fn deleted(result: DeleteResult) -> Self {
        match result {
            DeleteResult::Deleted => Self::ok(None),
            DeleteResult::NotFound => Self::not_found("pool does not exist"),
        }
    }

    /// Create a NOT_FOUND response
    pub fn not_found(message: &str) -> Self {
        Self {
            status: Status::NotFound,
            payload: Some(message.as_bytes().to_vec()),
        }
    }

    /// Create an INVALID_INPUT response
    pub fn invalid_input(message: &str) -> Self {
        Self {
            status: Status::InvalidInput,
            payload: Some(message.as_bytes().to_vec()),
        }
    }

    /// Create an ERROR response
    pub fn error(message: &str) -> Self {
        Self {
            status: Status::Error,
            payload: Some(message.as_bytes().to_vec()),
        }
    }

    /// Map an error to its response status
    pub fn from_error(error: &PoolError) -> Self {
        let message = error.to_string();
        match error {
            PoolError::PoolNotFound(_) => Self::not_found(&message),
            PoolError::InvalidInput(_) => Self::invalid_input(&message),
            _ => Self::error(&message),
        }
    }

    // -------------------------------------------------------------------------
    // Client-side payload interpretation
    // -------------------------------------------------------------------------

    /// Payload as text (error messages, PONG)
    pub fn message(&self) -> String {
        self.payload
            .as_deref()
            .map(|p| String::from_utf8_lossy(p).into_owned())
            .unwrap_or_default()
    }

    /// Turn a non-OK response back into an error
    pub fn into_result(self) -> Result<Self> {
        match self.status {
            Status::Ok => Ok(self),
            Status::NotFound => Err(PoolError::Network(format!("not found: {}", self.message()))),
            Status::InvalidInput => Err(PoolError::InvalidInput(self.message())),
            Status::Error => Err(PoolError::Network(format!("server error: {}", self.message()))),
        }
    }

    /// Read the payload of an ADD response
    pub fn as_append_kind(&self) -> Result<AppendKind> {
        match self.payload.as_deref() {
            Some([ADD_CREATED]) => Ok(AppendKind::Created),
            Some([ADD_EXTENDED]) => Ok(AppendKind::Extended),
            other => Err(PoolError::Protocol(format!(
                "ADD response: unexpected payload {:?}",
                other
            ))),
        }
    }

    /// Read the payload of a QUERY response
    pub fn as_quantile(&self) -> Result<Quantile> {
        match self.payload.as_deref() {
            Some(p) if p.len() == 16 => {
                let quantile = i64::from_be_bytes(p[0..8].try_into().map_err(|_| {
                    PoolError::Protocol("QUERY response: bad quantile".to_string())
                })?);
                let total = u64::from_be_bytes(p[8..16].try_into().map_err(|_| {
                    PoolError::Protocol("QUERY response: bad total".to_string())
                })?);
                Ok(Quantile { quantile, total })
            }
            other => Err(PoolError::Protocol(format!(
                "QUERY response: expected 16 bytes, got {}",
                other.map(|p| p.len()).unwrap_or(0)
            ))),
        }
    }
}
