//! Alerting: throttling, audio cue, and outbound notification.

mod audio;
mod notify;
mod throttle;

pub use audio::{AudioCue, AudioState, CuePlayer, NullCuePlayer};
#[cfg(feature = "audio-cpal")]
pub use audio::WavCuePlayer;
pub use notify::{
    alert_message, notifier_from_config, AlertDispatcher, Notifier, NullNotifier,
    TelegramNotifier,
};
pub use throttle::{AlertThrottle, DEFAULT_ALERT_INTERVAL};
