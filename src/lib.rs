//! Terminal viewer for captured network packets.
//!
//! Packets arrive either from a live WebSocket stream or from a capture file
//! uploaded to the server for parsing. The viewer keeps the newest
//! [`LIVE_CAPACITY`] live packets and switches between idle, live and static
//! display through the transitions of [`DisplayState`].
//!
//! ```no_run
//! use pktview::{event_channel, App, Endpoints};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let endpoints = Endpoints::new("http://127.0.0.1:8080", "/api/live", "/api/upload")?;
//! let (tx, mut rx) = event_channel();
//! let mut app = App::new(endpoints, tx);
//! app.start_live();
//! while let Some(event) = rx.recv().await {
//!     app.handle_net_event(event);
//!     println!("{} packets", app.state.packets().len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod buffer;
pub mod config;
pub mod model;
pub mod network;
pub mod state;
pub mod terminal;
pub mod ui;

pub use app::App;
pub use buffer::{PacketBuffer, LIVE_CAPACITY};
pub use config::{Cli, Config, ConfigError, Endpoints};
pub use model::{LiveFrame, PacketRecord, Timestamp};
pub use network::{event_channel, LiveConnection, NetEvent, StreamEvent, UploadError};
pub use state::{DisplayState, Epoch, LiveHandle, ModeKind, TransitionError, UploadOutcome};
