//! Request handling
//!
//! One-shot request/response per connection: accept, read one framed
//! message, answer it, done. Failures while handling a request become an
//! `Error` payload so the client always gets an answer it can print; only
//! transport-level failures (unreadable frame, broken pipe) drop the
//! connection.

use crate::host::{DeviceHost, SystemHost};
use anyhow::{Context as _, Result};
use awusb_protocol::{
    AttachState, Message, MessagePayload, UsbDevice, read_framed_async, validate_version,
    write_framed_async,
};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Accept loop; runs until the process is stopped
pub async fn serve(bind: &str, port: u16) -> Result<()> {
    let listener = TcpListener::bind((bind, port))
        .await
        .with_context(|| format!("could not listen on {}:{}", bind, port))?;
    info!("Listening on {}:{}", bind, port);

    loop {
        let (mut stream, peer) = listener.accept().await.context("accept failed")?;
        tokio::spawn(async move {
            if let Err(e) = handle_connection(&mut stream, &SystemHost).await {
                warn!("Connection from {} failed: {}", peer, e);
            }
        });
    }
}

async fn handle_connection<S, H>(stream: &mut S, host: &H) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
    H: DeviceHost,
{
    let request = read_framed_async(stream).await.context("unreadable frame")?;

    let reply = match validate_version(&request.version) {
        Ok(()) => dispatch(request.payload, host).await,
        Err(e) => error_payload(e.to_string()),
    };

    write_framed_async(stream, &Message::new(reply))
        .await
        .context("could not send reply")?;
    Ok(())
}

async fn dispatch<H: DeviceHost>(payload: MessagePayload, host: &H) -> MessagePayload {
    match payload {
        MessagePayload::ListRequest => match host.list_devices() {
            Ok(devices) => {
                info!("List request: {} devices", devices.len());
                MessagePayload::ListResponse { devices }
            }
            Err(e) => error_payload(format!("device enumeration failed: {:#}", e)),
        },
        MessagePayload::AttachRequest { bus_id } => {
            info!("Attach request for {}", bus_id);
            match export_device(host, &bus_id).await {
                Ok(device) => MessagePayload::AttachResponse { device },
                Err(message) => error_payload(message),
            }
        }
        MessagePayload::DetachRequest { bus_id } => {
            info!("Detach request for {}", bus_id);
            match withdraw_device(host, &bus_id).await {
                Ok(device) => MessagePayload::DetachResponse { device },
                Err(message) => error_payload(message),
            }
        }
        other => error_payload(format!("unsupported request: {:?}", other)),
    }
}

/// Bind `bus_id` to the usbip host driver and echo the device record
///
/// No pre-check of the attach state: the inventory can be stale by the time
/// the request lands, so usbip's own verdict (including "already bound") is
/// the one reported.
async fn export_device<H: DeviceHost>(host: &H, bus_id: &str) -> Result<UsbDevice, String> {
    let device = find_device(host, bus_id)?;
    host.export(bus_id).await.map_err(|e| format!("{:#}", e))?;
    Ok(UsbDevice {
        state: AttachState::Attached,
        ..device
    })
}

async fn withdraw_device<H: DeviceHost>(host: &H, bus_id: &str) -> Result<UsbDevice, String> {
    let device = find_device(host, bus_id)?;
    host.withdraw(bus_id).await.map_err(|e| format!("{:#}", e))?;
    Ok(UsbDevice {
        state: AttachState::Free,
        ..device
    })
}

fn find_device<H: DeviceHost>(host: &H, bus_id: &str) -> Result<UsbDevice, String> {
    let devices = host
        .list_devices()
        .map_err(|e| format!("device enumeration failed: {:#}", e))?;
    devices
        .into_iter()
        .find(|d| d.bus_id == bus_id)
        .ok_or_else(|| format!("no exportable device with bus id {}", bus_id))
}

fn error_payload(message: String) -> MessagePayload {
    warn!("Replying with error: {}", message);
    MessagePayload::Error { message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use awusb_protocol::{CURRENT_VERSION, ProtocolVersion};

    struct MockHost {
        devices: Vec<UsbDevice>,
        export_error: Option<String>,
    }

    impl MockHost {
        fn with_devices(devices: Vec<UsbDevice>) -> Self {
            Self {
                devices,
                export_error: None,
            }
        }
    }

    impl DeviceHost for MockHost {
        fn list_devices(&self) -> Result<Vec<UsbDevice>> {
            Ok(self.devices.clone())
        }

        async fn export(&self, _bus_id: &str) -> Result<()> {
            match &self.export_error {
                Some(message) => bail!("{}", message),
                None => Ok(()),
            }
        }

        async fn withdraw(&self, _bus_id: &str) -> Result<()> {
            Ok(())
        }
    }

    fn device(bus_id: &str) -> UsbDevice {
        UsbDevice {
            bus_id: bus_id.to_string(),
            vendor_id: 0x046d,
            product_id: 0x0825,
            serial: None,
            description: "Logitech Webcam C270".to_string(),
            state: AttachState::Free,
        }
    }

    #[tokio::test]
    async fn test_list_returns_inventory() {
        let host = MockHost::with_devices(vec![device("1-1"), device("1-2")]);
        let reply = dispatch(MessagePayload::ListRequest, &host).await;
        let MessagePayload::ListResponse { devices } = reply else {
            panic!("expected ListResponse, got {:?}", reply);
        };
        assert_eq!(devices.len(), 2);
    }

    #[tokio::test]
    async fn test_attach_marks_device_attached() {
        let host = MockHost::with_devices(vec![device("1-2")]);
        let reply = dispatch(
            MessagePayload::AttachRequest {
                bus_id: "1-2".to_string(),
            },
            &host,
        )
        .await;
        let MessagePayload::AttachResponse { device } = reply else {
            panic!("expected AttachResponse, got {:?}", reply);
        };
        assert_eq!(device.bus_id, "1-2");
        assert_eq!(device.state, AttachState::Attached);
    }

    #[tokio::test]
    async fn test_attach_unknown_bus_id_is_error() {
        let host = MockHost::with_devices(vec![device("1-2")]);
        let reply = dispatch(
            MessagePayload::AttachRequest {
                bus_id: "9-9".to_string(),
            },
            &host,
        )
        .await;
        let MessagePayload::Error { message } = reply else {
            panic!("expected Error, got {:?}", reply);
        };
        assert!(message.contains("9-9"));
    }

    #[tokio::test]
    async fn test_attach_failure_carries_usbip_text() {
        let host = MockHost {
            devices: vec![device("1-2")],
            export_error: Some("usbip: error: device on busid 1-2 is attached".to_string()),
        };
        let reply = dispatch(
            MessagePayload::AttachRequest {
                bus_id: "1-2".to_string(),
            },
            &host,
        )
        .await;
        let MessagePayload::Error { message } = reply else {
            panic!("expected Error, got {:?}", reply);
        };
        assert!(message.contains("is attached"));
    }

    #[tokio::test]
    async fn test_detach_marks_device_free() {
        let mut exported = device("1-2");
        exported.state = AttachState::Attached;
        let host = MockHost::with_devices(vec![exported]);
        let reply = dispatch(
            MessagePayload::DetachRequest {
                bus_id: "1-2".to_string(),
            },
            &host,
        )
        .await;
        let MessagePayload::DetachResponse { device } = reply else {
            panic!("expected DetachResponse, got {:?}", reply);
        };
        assert_eq!(device.state, AttachState::Free);
    }

    #[tokio::test]
    async fn test_response_payload_as_request_is_error() {
        let host = MockHost::with_devices(vec![]);
        let reply = dispatch(
            MessagePayload::Error {
                message: "confused client".to_string(),
            },
            &host,
        )
        .await;
        assert!(matches!(reply, MessagePayload::Error { .. }));
    }

    #[tokio::test]
    async fn test_connection_roundtrip_over_duplex() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        let host = MockHost::with_devices(vec![device("1-1")]);

        write_framed_async(&mut client, &Message::new(MessagePayload::ListRequest))
            .await
            .unwrap();
        handle_connection(&mut server, &host).await.unwrap();

        let reply = read_framed_async(&mut client).await.unwrap();
        assert!(matches!(reply.payload, MessagePayload::ListResponse { .. }));
    }

    #[tokio::test]
    async fn test_incompatible_version_gets_error_reply() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        let host = MockHost::with_devices(vec![]);

        let request = Message {
            version: ProtocolVersion {
                major: CURRENT_VERSION.major + 1,
                minor: 0,
                patch: 0,
            },
            payload: MessagePayload::ListRequest,
        };
        write_framed_async(&mut client, &request).await.unwrap();
        handle_connection(&mut server, &host).await.unwrap();

        let reply = read_framed_async(&mut client).await.unwrap();
        let MessagePayload::Error { message } = reply.payload else {
            panic!("expected Error, got {:?}", reply.payload);
        };
        assert!(message.contains("version"));
    }
}
