//! Control-thread service
//!
//! Runs a [`PlaybackSession`] on its own thread. Callers talk to it through
//! a [`PlayerHandle`] by sending [`Command`]s; events come back on a bounded
//! channel. The thread multiplexes three inputs:
//! - commands from the handle
//! - completion messages marshalled from the render graph
//! - the position tracker's tick

use crate::{
    error::{PlaybackError, Result},
    events::PlaybackEvent,
    render::RenderGraph,
    session::PlaybackSession,
    types::{AssetInfo, PlaybackConfig, SessionSnapshot, VirtualSegment},
};
use crossbeam_channel::{bounded, select, tick, unbounded, Receiver, Sender, TrySendError};
use std::path::PathBuf;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Commands sent to the control thread
#[derive(Debug)]
pub enum Command {
    /// Bind the shared audio asset
    LoadAsset {
        path: PathBuf,
        reply: Sender<Result<AssetInfo>>,
    },

    /// Replace the segment list
    SetSegments(Vec<VirtualSegment>),

    /// Select a segment, optionally from an absolute asset time
    SelectSegment {
        index: usize,
        from_time: Option<f64>,
    },

    Play,
    Pause,
    TogglePlayPause,
    NextSegment,
    PreviousSegment,

    /// Seek to an absolute asset time
    SeekTo(f64),

    /// Seek relative to the current position
    SeekBy(f64),

    SkipForward,
    SkipBackward,

    BeginScrub(f64),
    UpdateScrub(f64),
    CommitScrub(f64),
    CancelScrub,

    /// Set the playback rate
    SetRate(f32),

    /// Step through the configured rate presets
    CycleRate,

    /// Request a copy of the session state
    Snapshot(Sender<SessionSnapshot>),

    /// Stop playback and end the control thread
    Shutdown,
}

/// Entry point for starting the playback control thread
pub struct PlayerService;

impl PlayerService {
    /// Start the control thread around a render graph
    ///
    /// The returned handle is the only way to reach the session; dropping it
    /// without calling [`PlayerHandle::shutdown`] also ends the thread.
    pub fn init(config: PlaybackConfig, graph: Box<dyn RenderGraph>) -> Result<PlayerHandle> {
        config.validate()?;

        let (command_tx, command_rx) = unbounded();
        let (event_tx, event_rx) = bounded(config.event_capacity.max(1));
        let session = PlaybackSession::new(config, graph);

        let thread = thread::Builder::new()
            .name("verso-control".to_string())
            .spawn(move || run_control_loop(session, &command_rx, &event_tx))?;

        info!("Playback service started");
        Ok(PlayerHandle {
            command_tx,
            event_rx,
            thread: Some(thread),
        })
    }
}

/// Handle to a running playback service
pub struct PlayerHandle {
    command_tx: Sender<Command>,
    event_rx: Receiver<PlaybackEvent>,
    thread: Option<JoinHandle<()>>,
}

impl PlayerHandle {
    /// Send a command to the control thread
    pub fn send(&self, command: Command) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|_| PlaybackError::ServiceStopped)
    }

    /// Load the asset and wait for the result
    pub fn load_asset(&self, path: impl Into<PathBuf>) -> Result<AssetInfo> {
        let (reply, response) = bounded(1);
        self.send(Command::LoadAsset {
            path: path.into(),
            reply,
        })?;
        response.recv().map_err(|_| PlaybackError::ServiceStopped)?
    }

    /// Fetch a snapshot of the session state
    pub fn snapshot(&self) -> Result<SessionSnapshot> {
        let (reply, response) = bounded(1);
        self.send(Command::Snapshot(reply))?;
        response.recv().map_err(|_| PlaybackError::ServiceStopped)
    }

    /// Event stream from the control thread
    pub fn events(&self) -> &Receiver<PlaybackEvent> {
        &self.event_rx
    }

    /// Try to receive next event (non-blocking)
    pub fn try_recv_event(&self) -> Option<PlaybackEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Stop playback, end the control thread and wait for it
    pub fn shutdown(mut self) {
        self.stop_thread();
    }

    fn stop_thread(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        // Already-exited threads have dropped their receiver
        let _ = self.command_tx.send(Command::Shutdown);
        if thread.join().is_err() {
            warn!("Playback control thread panicked");
        }
    }
}

impl Drop for PlayerHandle {
    fn drop(&mut self) {
        self.stop_thread();
    }
}

fn run_control_loop(
    mut session: PlaybackSession,
    commands: &Receiver<Command>,
    events: &Sender<PlaybackEvent>,
) {
    let messages = session.message_receiver();
    let ticker = tick(Duration::from_millis(session.config().tick_interval_ms));

    loop {
        select! {
            recv(commands) -> command => match command {
                Ok(Command::Shutdown) | Err(_) => break,
                Ok(command) => apply_command(&mut session, command),
            },
            recv(messages) -> message => {
                if let Ok(message) = message {
                    session.handle_message(message);
                }
            },
            recv(ticker) -> _ => session.tick(),
        }

        forward_events(&mut session, events);
    }

    session.shutdown();
    forward_events(&mut session, events);
    debug!("Playback control thread exiting");
}

fn apply_command(session: &mut PlaybackSession, command: Command) {
    match command {
        Command::LoadAsset { path, reply } => {
            let _ = reply.send(session.load_asset(&path));
        }
        Command::SetSegments(segments) => session.set_segments(segments),
        Command::SelectSegment { index, from_time } => session.select_segment(index, from_time),
        Command::Play => session.play(),
        Command::Pause => session.pause(),
        Command::TogglePlayPause => session.toggle_play_pause(),
        Command::NextSegment => session.next_segment(),
        Command::PreviousSegment => session.previous_segment(),
        Command::SeekTo(time) => session.seek_to(time),
        Command::SeekBy(delta) => session.seek_by(delta),
        Command::SkipForward => session.skip_forward(),
        Command::SkipBackward => session.skip_backward(),
        Command::BeginScrub(time) => session.begin_scrub(time),
        Command::UpdateScrub(time) => session.update_scrub(time),
        Command::CommitScrub(time) => session.commit_scrub(time),
        Command::CancelScrub => session.cancel_scrub(),
        Command::SetRate(rate) => {
            if let Err(e) = session.set_rate(rate) {
                warn!("Rejected rate change: {}", e);
            }
        }
        Command::CycleRate => {
            if let Err(e) = session.cycle_rate() {
                warn!("Rate cycle failed: {}", e);
            }
        }
        Command::Snapshot(reply) => {
            let _ = reply.send(session.snapshot());
        }
        Command::Shutdown => {}
    }
}

/// Forward queued events without ever blocking the control thread
fn forward_events(session: &mut PlaybackSession, events: &Sender<PlaybackEvent>) {
    for event in session.drain_events() {
        match events.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                debug!("Event channel full, dropping {:?}", event);
            }
            Err(TrySendError::Disconnected(_)) => return,
        }
    }
}
