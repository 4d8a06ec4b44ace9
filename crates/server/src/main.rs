//! awusb server
//!
//! Exports local USB devices to awusb clients. Answers inventory requests
//! and performs the server side of attach/detach by binding devices to the
//! kernel usbip-host driver; the data path itself is the kernel's usbip
//! facility, not this process.

mod host;
mod net;
mod usb;

use anyhow::{Context, Result};
use awusb_common::{DEFAULT_PORT, setup_logging};
use clap::Parser;
use tokio::signal;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "awusb-server")]
#[command(author, version, about = "Export local USB devices to awusb clients")]
#[command(long_about = "
Makes the USB devices plugged into this machine available to awusb clients
on the network, using the kernel usbip facility for the data path.

EXAMPLES:
    # Run with defaults (all interfaces, port 5055)
    awusb-server

    # Listen on one interface and a custom port
    awusb-server --bind 10.0.0.5 --port 6000

    # Show the exportable devices without starting the server
    awusb-server --list-devices

    # Run with debug logging
    awusb-server --log-level debug

Binding devices requires the usbip-host kernel module and the usbip tool.
")]
struct Args {
    /// Address to listen on
    #[arg(long, value_name = "ADDR", default_value = "0.0.0.0")]
    bind: String,

    /// Control port
    #[arg(short, long, value_name = "PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL", default_value = "info")]
    log_level: String,

    /// List exportable USB devices and exit
    #[arg(long)]
    list_devices: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(&args.log_level).context("Failed to setup logging")?;

    if args.list_devices {
        let devices = usb::enumerate().context("Failed to enumerate USB devices")?;
        if devices.is_empty() {
            println!("No exportable devices");
        }
        for device in devices {
            println!("{}", device);
        }
        return Ok(());
    }

    info!("awusb server v{}", env!("CARGO_PKG_VERSION"));

    tokio::select! {
        result = net::serve(&args.bind, args.port) => result,
        _ = signal::ctrl_c() => {
            info!("Shutting down");
            Ok(())
        }
    }
}
