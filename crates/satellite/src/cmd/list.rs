//! Receiver and forwarder listings

use anyhow::Result;
use clap::Args;
use satellite_config::{ForwarderKind, ReceiverKind};
use satellite_protocol::EventType;

/// Forwarders command arguments
#[derive(Args, Debug)]
pub struct ForwardersArgs {
    /// Event type used in the printed config snippets
    #[arg(short, long, default_value = "segment")]
    pub event_type: EventType,
}

pub fn receivers() -> Result<()> {
    for kind in ReceiverKind::ALL {
        let types: Vec<&str> = kind.event_types().iter().map(|t| t.as_str()).collect();
        println!("{} ({})", kind.show_name(), kind);
        println!("  {}", kind.description());
        println!("  server: {}, event types: {}", kind.server(), types.join(", "));
        println!();
        println!("{}", kind.default_config());
    }
    Ok(())
}

pub fn forwarders(args: ForwardersArgs) -> Result<()> {
    for kind in ForwarderKind::ALL {
        let sync = if kind.supports_sync() {
            "answers sync calls"
        } else {
            "batches only"
        };
        println!("{kind} ({sync})");
        println!("  {}", kind.description());
        println!();
        println!("{}", kind.default_config(args.event_type));
    }
    Ok(())
}
