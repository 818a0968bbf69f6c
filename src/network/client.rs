//! Blocking TCP client

use std::io::{BufReader, BufWriter};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::error::{PoolError, Result};
use crate::percentile::Quantile;
use crate::protocol::{read_response, write_command, Command, Response, Status};
use crate::store::{AppendKind, DeleteResult};
use crate::types::{Percentile, PoolId};

/// Client for a RankPool server, one request at a time
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    /// Connect to a server
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .map_err(|e| PoolError::Network(format!("Failed to connect: {}", e)))?;
        stream.set_nodelay(true)?;

        Ok(Self {
            reader: BufReader::new(stream.try_clone()?),
            writer: BufWriter::new(stream),
        })
    }

    /// Set a read timeout for responses
    pub fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.reader.get_ref().set_read_timeout(timeout)?;
        Ok(())
    }

    /// Append values to a pool
    pub fn add(&mut self, pool_id: PoolId, values: &[f64]) -> Result<AppendKind> {
        let response = self.call(&Command::Add {
            pool_id,
            values: values.to_vec(),
        })?;
        response.into_result()?.as_append_kind()
    }

    /// Query a percentile of a pool
    pub fn query(&mut self, pool_id: PoolId, percentile: Percentile) -> Result<Quantile> {
        let response = self.call(&Command::Query { pool_id, percentile })?;
        if response.status == Status::NotFound {
            return Err(PoolError::PoolNotFound(pool_id));
        }
        response.into_result()?.as_quantile()
    }

    /// Delete a pool
    pub fn delete(&mut self, pool_id: PoolId) -> Result<DeleteResult> {
        let response = self.call(&Command::Delete { pool_id })?;
        match response.status {
            Status::NotFound => Ok(DeleteResult::NotFound),
            _ => response.into_result().map(|_| DeleteResult::Deleted),
        }
    }

    /// Health check
    pub fn ping(&mut self) -> Result<()> {
        let response = self.call(&Command::Ping)?.into_result()?;
        match response.message().as_str() {
            "PONG" => Ok(()),
            other => Err(PoolError::Protocol(format!("unexpected PING reply {:?}", other))),
        }
    }

    fn call(&mut self, command: &Command) -> Result<Response> {
        write_command(&mut self.writer, command)?;
        read_response(&mut self.reader)
    }
}
