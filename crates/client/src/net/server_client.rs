//! Client for a single USB server
//!
//! One TCP connection per request, mirroring the server's one-shot request
//! handling. Every call is bounded by the caller-supplied timeout covering
//! connect, send, and receive together; a timeout is reported distinctly
//! from a refused or dropped connection. The client holds no state between
//! calls.

use awusb_common::{Error, Result, ServerSpec};
use awusb_protocol::{
    Message, MessagePayload, UsbDevice, read_framed_async, validate_version, write_framed_async,
};
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ServerClient {
    spec: ServerSpec,
    timeout: Duration,
}

impl ServerClient {
    pub fn new(spec: ServerSpec, timeout: Duration) -> Self {
        Self { spec, timeout }
    }

    pub fn spec(&self) -> &ServerSpec {
        &self.spec
    }

    /// Request the server's device inventory
    pub async fn list(&self) -> Result<Vec<UsbDevice>> {
        match self.exchange(MessagePayload::ListRequest).await? {
            MessagePayload::ListResponse { devices } => {
                debug!("Server {}: {} devices", self.spec, devices.len());
                Ok(devices)
            }
            other => Err(self.unexpected("list", &other)),
        }
    }

    /// Ask the server to export the device with the given bus id
    pub async fn attach(&self, bus_id: &str) -> Result<UsbDevice> {
        let request = MessagePayload::AttachRequest {
            bus_id: bus_id.to_string(),
        };
        match self.exchange(request).await? {
            MessagePayload::AttachResponse { device } => Ok(device),
            other => Err(self.unexpected("attach", &other)),
        }
    }

    /// Ask the server to stop exporting the device with the given bus id
    pub async fn detach(&self, bus_id: &str) -> Result<UsbDevice> {
        let request = MessagePayload::DetachRequest {
            bus_id: bus_id.to_string(),
        };
        match self.exchange(request).await? {
            MessagePayload::DetachResponse { device } => Ok(device),
            other => Err(self.unexpected("detach", &other)),
        }
    }

    /// One request/response exchange under the per-server timeout
    async fn exchange(&self, payload: MessagePayload) -> Result<MessagePayload> {
        let exchange = async {
            let mut stream =
                TcpStream::connect(self.spec.address())
                    .await
                    .map_err(|e| Error::Connection {
                        server: self.spec.to_string(),
                        message: e.to_string(),
                    })?;

            debug!("Connected to {}", self.spec);
            write_framed_async(&mut stream, &Message::new(payload))
                .await
                .map_err(|e| self.transport_error(e))?;

            let response = read_framed_async(&mut stream)
                .await
                .map_err(|e| self.transport_error(e))?;
            validate_version(&response.version)?;
            Ok::<_, Error>(response.payload)
        };

        let payload = match tokio::time::timeout(self.timeout, exchange).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(Error::Timeout {
                    server: self.spec.to_string(),
                    timeout: self.timeout,
                });
            }
        };

        // The server's own failure report, surfaced verbatim
        if let MessagePayload::Error { message } = payload {
            return Err(Error::Server {
                server: self.spec.to_string(),
                message,
            });
        }
        Ok(payload)
    }

    fn transport_error(&self, e: awusb_protocol::ProtocolError) -> Error {
        match e {
            awusb_protocol::ProtocolError::Io(io) => Error::Connection {
                server: self.spec.to_string(),
                message: io.to_string(),
            },
            other => Error::Protocol(other),
        }
    }

    fn unexpected(&self, operation: &str, payload: &MessagePayload) -> Error {
        Error::Server {
            server: self.spec.to_string(),
            message: format!(
                "unexpected response to {} request: {:?}",
                operation, payload
            ),
        }
    }
}
