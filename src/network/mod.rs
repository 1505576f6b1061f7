//! Network side of the viewer.
//!
//! Nothing in here touches the display state. The live connection task and
//! the upload task report back through an [`EventSender`]; the UI loop drains
//! the matching receiver and applies each event in arrival order.

pub mod live;
pub mod upload;

use std::path::PathBuf;

use tokio::sync::mpsc;

use crate::model::PacketRecord;
use crate::state::{Epoch, UploadTicket};

pub use live::LiveConnection;
pub use upload::{spawn_upload, upload_capture, UploadError, UPLOAD_FIELD};

pub type EventSender = mpsc::UnboundedSender<NetEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<NetEvent>;

pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

#[derive(Debug)]
pub enum NetEvent {
    Live {
        epoch: Epoch,
        event: StreamEvent,
    },
    Upload {
        ticket: UploadTicket,
        file: PathBuf,
        result: Result<Vec<PacketRecord>, UploadError>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Connected,
    Packet(PacketRecord),
    /// A message that could not be decoded; the connection stays open.
    Malformed(String),
    ServerError(String),
    /// The connection ended. `None` means a clean close.
    Closed(Option<String>),
}
