//! Goal-reached notification cues.
//!
//! A [`CuePlayer`] plays one cue to completion. The [`CueWorker`] owns a player
//! on its own thread, repeats a cue the requested number of times back to back,
//! and reports how it went so the app never blocks on audio.

pub mod bell;
#[cfg(feature = "audio")]
pub mod sound;
pub mod speech;

use std::cell::Cell;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{Config, GoalAction};

/// A playable notification resource.
#[derive(Debug, Clone, PartialEq)]
pub enum Cue {
    Speech(String),
    Clip(PathBuf),
    Tone { hz: f32, duration: Duration },
}

impl Cue {
    /// The cue configured for the goal-reached action, if any.
    pub fn for_config(cfg: &Config) -> Option<Cue> {
        match cfg.goal_action {
            GoalAction::Speech => Some(Cue::Speech(cfg.cue_text.clone())),
            GoalAction::Clip => cfg.clip_path.clone().map(Cue::Clip),
            GoalAction::Tone => Some(Cue::Tone {
                hz: cfg.tone_hz,
                duration: Duration::from_millis(cfg.tone_ms),
            }),
            GoalAction::None => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum CueError {
    #[error("cue backend unavailable: {0}")]
    Unavailable(String),

    #[error("playback failed: {0}")]
    Playback(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub trait CuePlayer: Send + 'static {
    /// Play `cue` once and return when playback has finished.
    fn play(&mut self, cue: &Cue) -> Result<(), CueError>;

    /// Hint that a user gesture just happened. Most backends ignore it.
    fn prime(&mut self) {}
}

/// Play `cue` `times` times sequentially, stopping at the first failure.
pub fn play_times<P: CuePlayer + ?Sized>(
    player: &mut P,
    cue: &Cue,
    times: u32,
) -> Result<(), CueError> {
    for i in 0..times {
        debug!(iteration = i + 1, times, "playing cue");
        player.play(cue)?;
    }
    Ok(())
}

/// Dispatches each cue kind to the backend that can play it.
pub struct SystemPlayer {
    speech: speech::SpeechPlayer,
    bell: bell::TerminalBell<std::io::Stdout>,
    #[cfg(feature = "audio")]
    sound: sound::SoundPlayer,
}

impl SystemPlayer {
    pub fn new(cfg: &Config) -> Self {
        let speech = match &cfg.speech_command {
            Some(cmd) => speech::SpeechPlayer::new(cmd),
            None => speech::SpeechPlayer::platform_default(),
        };
        Self {
            speech,
            bell: bell::TerminalBell::new(std::io::stdout()),
            #[cfg(feature = "audio")]
            sound: sound::SoundPlayer::new(),
        }
    }
}

impl CuePlayer for SystemPlayer {
    fn play(&mut self, cue: &Cue) -> Result<(), CueError> {
        match cue {
            Cue::Speech(_) => self.speech.play(cue),
            #[cfg(feature = "audio")]
            Cue::Clip(_) | Cue::Tone { .. } => self.sound.play(cue),
            #[cfg(not(feature = "audio"))]
            Cue::Clip(path) => Err(CueError::Unavailable(format!(
                "built without audio support, cannot play {}",
                path.display()
            ))),
            #[cfg(not(feature = "audio"))]
            Cue::Tone { .. } => self.bell.play(cue),
        }
    }

    fn prime(&mut self) {
        self.speech.prime();
        self.bell.prime();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CueOutcome {
    Finished,
    Failed(String),
}

/// Outcome of one [`CueWorker::request`], tagged with the id it returned.
#[derive(Debug, Clone, PartialEq)]
pub struct CueReport {
    pub request: u64,
    pub outcome: CueOutcome,
}

enum CueCommand {
    Play { request: u64, cue: Cue, times: u32 },
    Prime,
}

/// Runs a [`CuePlayer`] on a background thread. Dropping the worker lets
/// queued cues finish and then ends the thread.
pub struct CueWorker {
    tx: Sender<CueCommand>,
    outcomes: Receiver<CueReport>,
    last_request: Cell<u64>,
    stopped: Cell<bool>,
}

impl CueWorker {
    pub fn spawn<P: CuePlayer>(mut player: P) -> Self {
        let (tx, rx) = mpsc::channel::<CueCommand>();
        let (outcome_tx, outcomes) = mpsc::channel();

        thread::spawn(move || {
            for command in rx {
                match command {
                    CueCommand::Prime => player.prime(),
                    CueCommand::Play { request, cue, times } => {
                        let outcome = match play_times(&mut player, &cue, times) {
                            Ok(()) => CueOutcome::Finished,
                            Err(e) => {
                                warn!(error = %e, "cue playback failed");
                                CueOutcome::Failed(e.to_string())
                            }
                        };
                        if outcome_tx.send(CueReport { request, outcome }).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        Self {
            tx,
            outcomes,
            last_request: Cell::new(0),
            stopped: Cell::new(false),
        }
    }

    /// Queue `cue` to be played `times` times. Never blocks.
    ///
    /// Returns the id its [`CueReport`] will carry.
    pub fn request(&self, cue: Cue, times: u32) -> u64 {
        let request = self.last_request.get() + 1;
        self.last_request.set(request);
        self.send(CueCommand::Play {
            request,
            cue,
            times,
        });
        request
    }

    pub fn prime(&self) {
        self.send(CueCommand::Prime);
    }

    /// Next finished request, if one is ready.
    pub fn try_outcome(&self) -> Option<CueReport> {
        match self.outcomes.try_recv() {
            Ok(report) => Some(report),
            Err(TryRecvError::Empty) => None,
            // reported once against the latest request, then the worker stays quiet
            Err(TryRecvError::Disconnected) if !self.stopped.replace(true) => Some(CueReport {
                request: self.last_request.get(),
                outcome: CueOutcome::Failed("cue worker stopped".to_string()),
            }),
            Err(TryRecvError::Disconnected) => None,
        }
    }

    #[cfg(test)]
    fn wait_outcome(&self, timeout: Duration) -> Option<CueOutcome> {
        self.outcomes.recv_timeout(timeout).ok().map(|r| r.outcome)
    }

    fn send(&self, command: CueCommand) {
        if self.tx.send(command).is_err() {
            warn!("cue worker is gone, dropping request");
        }
    }
}
