//! Looping audio cue for active violations.
//!
//! A two-state machine: Silent while every frame is compliant, Alerting
//! while any non-compliant detection is on screen. Transitions only happen
//! on edges, so a long-running violation starts the cue once instead of
//! restarting it per frame.
//!
//! Playback itself sits behind `CuePlayer`; default builds use the no-op
//! player and the cpal-backed WAV player is feature gated (audio-cpal).

use anyhow::Result;

/// Playback side of the audio cue.
///
/// `start_loop` begins looping the cue until `stop`; both are idempotent
/// from the state machine's point of view because it only calls them on
/// state edges.
pub trait CuePlayer: Send {
    fn start_loop(&mut self) -> Result<()>;
    fn stop(&mut self) -> Result<()>;
}

/// Player for builds without an audio stack. Logs instead of playing.
pub struct NullCuePlayer;

impl CuePlayer for NullCuePlayer {
    fn start_loop(&mut self) -> Result<()> {
        log::debug!("audio: cue loop started (null player)");
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        log::debug!("audio: cue loop stopped (null player)");
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AudioState {
    Silent,
    Alerting,
}

/// Edge-triggered siren controller.
pub struct AudioCue {
    state: AudioState,
    player: Box<dyn CuePlayer>,
}

impl AudioCue {
    pub fn new(player: Box<dyn CuePlayer>) -> Self {
        Self {
            state: AudioState::Silent,
            player,
        }
    }

    pub fn state(&self) -> AudioState {
        self.state
    }

    /// Feed the per-frame compliance verdict. `non_compliant` is true when
    /// any violation detection survived the gate on this frame.
    ///
    /// Player failures are logged and do not block the state transition:
    /// a broken sound device must not wedge the controller in one state.
    pub fn update(&mut self, non_compliant: bool) {
        match (self.state, non_compliant) {
            (AudioState::Silent, true) => {
                if let Err(err) = self.player.start_loop() {
                    log::warn!("audio: failed to start cue: {:#}", err);
                }
                self.state = AudioState::Alerting;
            }
            (AudioState::Alerting, false) => {
                if let Err(err) = self.player.stop() {
                    log::warn!("audio: failed to stop cue: {:#}", err);
                }
                self.state = AudioState::Silent;
            }
            // Same-state frames are no-ops.
            (AudioState::Silent, false) | (AudioState::Alerting, true) => {}
        }
    }
}

// ----------------------------------------------------------------------------
// cpal-backed WAV player (feature: audio-cpal)
// ----------------------------------------------------------------------------

#[cfg(feature = "audio-cpal")]
pub use cpal_player::WavCuePlayer;

#[cfg(feature = "audio-cpal")]
mod cpal_player {
    use std::path::Path;
    use std::sync::mpsc;
    use std::thread;

    use anyhow::{anyhow, Context, Result};
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

    use super::CuePlayer;

    enum Command {
        Start,
        Stop,
    }

    /// Loops a WAV cue on the default output device.
    ///
    /// cpal streams are not `Send`, so a dedicated thread owns the stream
    /// and the player drives it over a channel.
    pub struct WavCuePlayer {
        tx: mpsc::Sender<Command>,
    }

    impl WavCuePlayer {
        pub fn new<P: AsRef<Path>>(cue_path: P) -> Result<Self> {
            let cue_path = cue_path.as_ref();
            let mut reader = hound::WavReader::open(cue_path)
                .with_context(|| format!("open audio cue {}", cue_path.display()))?;
            let spec = reader.spec();
            let samples: Vec<f32> = match spec.sample_format {
                hound::SampleFormat::Float => reader
                    .samples::<f32>()
                    .collect::<std::result::Result<_, _>>()
                    .context("decode audio cue samples")?,
                hound::SampleFormat::Int => {
                    let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
                    reader
                        .samples::<i32>()
                        .map(|s| s.map(|s| s as f32 / scale))
                        .collect::<std::result::Result<_, _>>()
                        .context("decode audio cue samples")?
                }
            };
            if samples.is_empty() {
                return Err(anyhow!("audio cue {} has no samples", cue_path.display()));
            }

            let (tx, rx) = mpsc::channel();
            let channels = spec.channels;
            let sample_rate = spec.sample_rate;
            thread::Builder::new()
                .name("audio-cue".to_string())
                .spawn(move || playback_loop(rx, samples, channels, sample_rate))
                .context("spawn audio cue thread")?;

            log::info!("audio: loaded cue {}", cue_path.display());
            Ok(Self { tx })
        }
    }

    impl CuePlayer for WavCuePlayer {
        fn start_loop(&mut self) -> Result<()> {
            self.tx
                .send(Command::Start)
                .map_err(|_| anyhow!("audio cue thread is gone"))
        }

        fn stop(&mut self) -> Result<()> {
            self.tx
                .send(Command::Stop)
                .map_err(|_| anyhow!("audio cue thread is gone"))
        }
    }

    fn playback_loop(rx: mpsc::Receiver<Command>, samples: Vec<f32>, channels: u16, sample_rate: u32) {
        // The stream lives only while the cue plays; dropping it stops output.
        let mut stream: Option<cpal::Stream> = None;
        while let Ok(command) = rx.recv() {
            match command {
                Command::Start => {
                    if stream.is_none() {
                        match build_stream(samples.clone(), channels, sample_rate) {
                            Ok(s) => stream = Some(s),
                            Err(err) => log::warn!("audio: cannot build output stream: {:#}", err),
                        }
                    }
                }
                Command::Stop => {
                    stream = None;
                }
            }
        }
    }

    fn build_stream(samples: Vec<f32>, channels: u16, sample_rate: u32) -> Result<cpal::Stream> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| anyhow!("no default audio output device"))?;

        let config = cpal::StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let mut cursor = 0usize;
        let stream = device
            .build_output_stream(
                &config,
                move |out: &mut [f32], _| {
                    for slot in out.iter_mut() {
                        *slot = samples[cursor];
                        cursor = (cursor + 1) % samples.len();
                    }
                },
                |err| log::warn!("audio: stream error: {}", err),
                None,
            )
            .context("build audio output stream")?;
        stream.play().context("start audio output stream")?;
        Ok(stream)
    }
}
