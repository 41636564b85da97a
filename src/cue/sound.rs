//! Clip and tone playback through rodio.

use std::fs::File;
use std::io::BufReader;

use rodio::source::SineWave;
use rodio::{Decoder, OutputStream, Sink, Source};

use super::{Cue, CueError, CuePlayer};

const TONE_AMPLITUDE: f32 = 0.2;

#[derive(Debug, Default)]
pub struct SoundPlayer;

impl SoundPlayer {
    pub fn new() -> Self {
        Self
    }
}

impl CuePlayer for SoundPlayer {
    fn play(&mut self, cue: &Cue) -> Result<(), CueError> {
        // the stream must outlive the sink, so open it per playback on this thread
        let (_stream, stream_handle) = OutputStream::try_default()
            .map_err(|e| CueError::Unavailable(format!("no audio output: {e}")))?;
        let sink = Sink::try_new(&stream_handle)
            .map_err(|e| CueError::Playback(e.to_string()))?;

        match cue {
            Cue::Clip(path) => {
                let file = File::open(path)?;
                let source = Decoder::new(BufReader::new(file))
                    .map_err(|e| CueError::Playback(format!("{}: {e}", path.display())))?;
                sink.append(source);
            }
            Cue::Tone { hz, duration } => {
                sink.append(
                    SineWave::new(*hz)
                        .take_duration(*duration)
                        .amplify(TONE_AMPLITUDE),
                );
            }
            Cue::Speech(_) => {
                return Err(CueError::Unavailable(
                    "sound backend cannot speak".to_string(),
                ))
            }
        }

        sink.sleep_until_end();
        Ok(())
    }
}
