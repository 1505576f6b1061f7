//! Display state machine.
//!
//! `DisplayState` is the only owner of the packet list and of the live
//! connection handle. It has three modes: `Idle`, `Live` and `Static`. The
//! connection handle is stored inside the `Live` variant, so a handle exists
//! exactly when the state is live.
//!
//! Every live connection is opened under a fresh [`Epoch`]. Events coming back
//! from a connection carry that epoch and are dropped unless it is still the
//! current one, so a closed or superseded connection can never write into the
//! list again. Uploads follow the same rule with an [`UploadTicket`].

use thiserror::Error;
use tracing::{debug, info};

use crate::buffer::{PacketBuffer, LIVE_CAPACITY};
use crate::model::PacketRecord;

/// An open push connection owned by the display state.
pub trait LiveHandle {
    /// Tears the connection down. Must not block and must tolerate a
    /// connection that already ended on its own.
    fn close(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Epoch(u64);

impl Epoch {
    pub fn get(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UploadTicket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeKind {
    Idle,
    Live,
    Static,
}

enum Mode<C> {
    Idle,
    Live { epoch: Epoch, connection: C },
    Static,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("live capture is already running")]
    AlreadyLive,
}

/// Counters for the current live session.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    pub received: u64,
    pub skipped: u64,
}

#[derive(Debug)]
pub enum UploadOutcome<E> {
    Applied { count: usize },
    Failed(E),
    /// A newer upload or a live session started after this request was sent.
    Superseded,
}

pub struct DisplayState<C: LiveHandle> {
    packets: PacketBuffer,
    mode: Mode<C>,
    next_epoch: u64,
    next_ticket: u64,
    pending_upload: Option<UploadTicket>,
    session: SessionStats,
}

impl<C: LiveHandle> DisplayState<C> {
    pub fn new() -> Self {
        Self::with_capacity(LIVE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            packets: PacketBuffer::new(capacity),
            mode: Mode::Idle,
            next_epoch: 0,
            next_ticket: 0,
            pending_upload: None,
            session: SessionStats::default(),
        }
    }

    pub fn packets(&self) -> &PacketBuffer {
        &self.packets
    }

    pub fn mode(&self) -> ModeKind {
        match self.mode {
            Mode::Idle => ModeKind::Idle,
            Mode::Live { .. } => ModeKind::Live,
            Mode::Static => ModeKind::Static,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self.mode, Mode::Live { .. })
    }

    pub fn current_epoch(&self) -> Option<Epoch> {
        match &self.mode {
            Mode::Live { epoch, .. } => Some(*epoch),
            _ => None,
        }
    }

    pub fn connection(&self) -> Option<&C> {
        match &self.mode {
            Mode::Live { connection, .. } => Some(connection),
            _ => None,
        }
    }

    pub fn session(&self) -> SessionStats {
        self.session
    }

    pub fn upload_pending(&self) -> bool {
        self.pending_upload.is_some()
    }

    /// Enters live mode.
    ///
    /// The list is cleared and any pending upload is abandoned before `open`
    /// runs, so the first message always lands in an empty list.
    pub fn start_live<F>(&mut self, open: F) -> Result<Epoch, TransitionError>
    where
        F: FnOnce(Epoch) -> C,
    {
        if self.is_live() {
            return Err(TransitionError::AlreadyLive);
        }
        self.packets.clear();
        self.pending_upload = None;
        self.session = SessionStats::default();
        self.next_epoch += 1;
        let epoch = Epoch(self.next_epoch);
        let connection = open(epoch);
        self.mode = Mode::Live { epoch, connection };
        info!(epoch = epoch.0, "live capture started");
        Ok(epoch)
    }

    /// Leaves live mode and keeps the packets. Returns false if not live.
    pub fn stop_live(&mut self) -> bool {
        match self.close_connection() {
            Some(epoch) => {
                info!(epoch = epoch.0, kept = self.packets.len(), "live capture stopped");
                true
            }
            None => false,
        }
    }

    /// Prepends a packet from the connection opened under `epoch`.
    pub fn apply_packet(&mut self, epoch: Epoch, record: PacketRecord) -> bool {
        if !self.is_current(epoch) {
            debug!(epoch = epoch.0, "dropping packet from a closed connection");
            return false;
        }
        self.packets.push_newest(record);
        self.session.received += 1;
        true
    }

    pub fn note_skipped(&mut self, epoch: Epoch) -> bool {
        if !self.is_current(epoch) {
            return false;
        }
        self.session.skipped += 1;
        true
    }

    /// The connection under `epoch` ended without being asked to.
    pub fn connection_lost(&mut self, epoch: Epoch) -> bool {
        if !self.is_current(epoch) {
            return false;
        }
        self.close_connection();
        info!(epoch = epoch.0, "live connection ended");
        true
    }

    /// Replaces the list with a finished dataset and leaves live mode.
    pub fn load_static(&mut self, records: Vec<PacketRecord>) {
        self.close_connection();
        self.pending_upload = None;
        self.packets.replace(records);
        self.mode = Mode::Static;
        info!(count = self.packets.len(), "static dataset loaded");
    }

    /// Registers a new upload; any earlier pending upload is superseded.
    pub fn begin_upload(&mut self) -> UploadTicket {
        self.next_ticket += 1;
        let ticket = UploadTicket(self.next_ticket);
        self.pending_upload = Some(ticket);
        ticket
    }

    /// Applies the result of the upload registered as `ticket`.
    ///
    /// Failures leave the packets and the mode untouched.
    pub fn finish_upload<E>(
        &mut self,
        ticket: UploadTicket,
        result: Result<Vec<PacketRecord>, E>,
    ) -> UploadOutcome<E> {
        if self.pending_upload != Some(ticket) {
            return UploadOutcome::Superseded;
        }
        match result {
            Ok(records) => {
                let count = records.len();
                self.load_static(records);
                UploadOutcome::Applied { count }
            }
            Err(err) => {
                self.pending_upload = None;
                UploadOutcome::Failed(err)
            }
        }
    }

    /// Closes any open connection. Called when the viewer exits.
    pub fn shutdown(&mut self) {
        self.pending_upload = None;
        self.close_connection();
    }

    fn is_current(&self, epoch: Epoch) -> bool {
        self.current_epoch() == Some(epoch)
    }

    fn close_connection(&mut self) -> Option<Epoch> {
        if !self.is_live() {
            return None;
        }
        match std::mem::replace(&mut self.mode, Mode::Idle) {
            Mode::Live {
                epoch,
                mut connection,
            } => {
                connection.close();
                Some(epoch)
            }
            _ => None,
        }
    }
}

impl<C: LiveHandle> Default for DisplayState<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: LiveHandle> Drop for DisplayState<C> {
    fn drop(&mut self) {
        self.close_connection();
    }
}
