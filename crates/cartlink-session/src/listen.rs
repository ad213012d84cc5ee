use cartlink_frame::{Packet, PacketStream, HEARTBEAT, TEXT};
use cartlink_transport::Transport;
use tracing::{debug, info, trace};

use crate::cancel::CancelToken;
use crate::error::Result;

/// Text the device prints when it has nothing more to say.
pub const DONE_MARKER: &str = "!!DONE!!";

/// Receives what the listen loop classifies.
pub trait ListenObserver {
    /// A TEXT packet, decoded.
    fn on_text(&mut self, text: &str);

    /// A HEARTBEAT packet. Ignored unless overridden.
    fn on_heartbeat(&mut self) {}

    /// Any packet type without dedicated handling.
    fn on_unclassified(&mut self, packet: &Packet);
}

/// Why the device side finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoneReason {
    /// A TEXT packet contained [`DONE_MARKER`].
    Marker,
    /// The stream ended with the zero sentinel (device powered off).
    PowerOff,
}

/// How a listen loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenOutcome {
    Done(DoneReason),
    /// Cancelled between packets.
    Aborted,
}

/// Receive packets until the device finishes or `cancel` fires.
///
/// Cancellation is checked before each packet; a packet already being read
/// is always read to completion (or to a fatal error) first.
pub fn listen<T, O>(transport: T, observer: &mut O, cancel: &CancelToken) -> Result<ListenOutcome>
where
    T: Transport,
    O: ListenObserver + ?Sized,
{
    let mut stream = PacketStream::new(transport);
    info!("listening for device output");

    loop {
        if cancel.is_cancelled() {
            info!("listen cancelled");
            return Ok(ListenOutcome::Aborted);
        }

        let Some(packet) = stream.read_packet()? else {
            info!("device stream ended");
            return Ok(ListenOutcome::Done(DoneReason::PowerOff));
        };

        match packet.kind {
            TEXT => {
                let text = String::from_utf8_lossy(&packet.payload);
                observer.on_text(&text);
                if text.contains(DONE_MARKER) {
                    info!("device reported done");
                    return Ok(ListenOutcome::Done(DoneReason::Marker));
                }
            }
            HEARTBEAT => {
                trace!("heartbeat");
                observer.on_heartbeat();
            }
            kind => {
                debug!(kind, len = packet.payload.len(), "unclassified packet");
                observer.on_unclassified(&packet);
            }
        }
    }
}
