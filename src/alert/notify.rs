//! Outbound alert notifications.
//!
//! `Notifier` is the delivery seam: the Telegram Bot API implementation is
//! the production path, `NullNotifier` keeps the pipeline running when no
//! bot is configured. `AlertDispatcher` turns admitted violation classes
//! into a text message plus an annotated snapshot photo.
//!
//! Delivery is fire and forget. A detection pipeline must keep streaming
//! when the network or the bot is down, so every failure here is logged
//! and swallowed at the dispatcher boundary.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use crate::detect::PpeClass;
use crate::frame::Frame;

const SNAPSHOT_FILE_NAME: &str = "ppe_alert_snapshot.jpg";

pub trait Notifier: Send {
    fn send_message(&self, text: &str) -> Result<()>;
    fn send_photo(&self, photo_path: &Path, caption: &str) -> Result<()>;
}

/// Notifier for deployments without an alert channel.
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn send_message(&self, text: &str) -> Result<()> {
        log::debug!("notify: dropping message (no notifier configured): {}", text);
        Ok(())
    }

    fn send_photo(&self, photo_path: &Path, _caption: &str) -> Result<()> {
        log::debug!(
            "notify: dropping photo {} (no notifier configured)",
            photo_path.display()
        );
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Telegram Bot API
// ----------------------------------------------------------------------------

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

pub struct TelegramNotifier {
    api_base: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: String, chat_id: String) -> Self {
        Self::with_api_base(TELEGRAM_API_BASE.to_string(), bot_token, chat_id)
    }

    /// Point the notifier at a different API host. Used by tests to stand
    /// in a local server for api.telegram.org.
    pub fn with_api_base(api_base: String, bot_token: String, chat_id: String) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            bot_token,
            chat_id,
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.bot_token, method)
    }
}

impl Notifier for TelegramNotifier {
    fn send_message(&self, text: &str) -> Result<()> {
        let response = ureq::post(&self.method_url("sendMessage"))
            .send_form(&[("chat_id", self.chat_id.as_str()), ("text", text)])
            .context("telegram sendMessage")?;
        log::debug!("notify: sendMessage -> {}", response.status());
        Ok(())
    }

    fn send_photo(&self, photo_path: &Path, caption: &str) -> Result<()> {
        let photo = std::fs::read(photo_path)
            .with_context(|| format!("read alert snapshot {}", photo_path.display()))?;
        let (body, content_type) = multipart_photo_body(&self.chat_id, caption, &photo);
        let response = ureq::post(&self.method_url("sendPhoto"))
            .set("Content-Type", &content_type)
            .send_bytes(&body)
            .context("telegram sendPhoto")?;
        log::debug!("notify: sendPhoto -> {}", response.status());
        Ok(())
    }
}

/// Build a multipart/form-data body with chat_id, caption and photo parts.
/// ureq does not ship a multipart encoder, so the framing is spelled out.
fn multipart_photo_body(chat_id: &str, caption: &str, photo: &[u8]) -> (Vec<u8>, String) {
    const BOUNDARY: &str = "ppe-sentinel-photo-boundary";

    let mut body = Vec::with_capacity(photo.len() + 512);
    let mut text_part = |name: &str, value: &str| {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    };
    text_part("chat_id", chat_id);
    text_part("caption", caption);

    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        b"Content-Disposition: form-data; name=\"photo\"; filename=\"snapshot.jpg\"\r\n",
    );
    body.extend_from_slice(b"Content-Type: image/jpeg\r\n\r\n");
    body.extend_from_slice(photo);
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    let content_type = format!("multipart/form-data; boundary={}", BOUNDARY);
    (body, content_type)
}

// ----------------------------------------------------------------------------
// Dispatcher
// ----------------------------------------------------------------------------

/// Turns admitted violations into one message plus one snapshot photo.
pub struct AlertDispatcher {
    notifier: Box<dyn Notifier>,
    snapshot_dir: PathBuf,
}

impl AlertDispatcher {
    pub fn new(notifier: Box<dyn Notifier>) -> Self {
        Self {
            notifier,
            snapshot_dir: std::env::temp_dir(),
        }
    }

    pub fn with_snapshot_dir(notifier: Box<dyn Notifier>, snapshot_dir: PathBuf) -> Self {
        Self {
            notifier,
            snapshot_dir,
        }
    }

    /// Send one alert for this frame's admitted violation classes.
    ///
    /// The snapshot is written to disk only for the duration of the upload
    /// and removed afterwards whether or not the upload succeeded.
    pub fn dispatch(&self, frame: &Frame, admitted: &[PpeClass]) {
        if admitted.is_empty() {
            return;
        }
        if let Err(err) = self.try_dispatch(frame, admitted) {
            log::warn!("notify: alert delivery failed: {:#}", err);
        }
    }

    fn try_dispatch(&self, frame: &Frame, admitted: &[PpeClass]) -> Result<()> {
        let message = alert_message(admitted);
        self.notifier.send_message(&message)?;

        let snapshot_path = self.snapshot_dir.join(SNAPSHOT_FILE_NAME);
        let jpeg = frame.encode_jpeg()?;
        std::fs::write(&snapshot_path, &jpeg)
            .with_context(|| format!("write alert snapshot {}", snapshot_path.display()))?;

        let sent = self.notifier.send_photo(&snapshot_path, &message);
        if let Err(err) = std::fs::remove_file(&snapshot_path) {
            log::warn!(
                "notify: failed to remove snapshot {}: {}",
                snapshot_path.display(),
                err
            );
        }
        sent
    }
}

pub fn alert_message(admitted: &[PpeClass]) -> String {
    let mut message =
        String::from("Alert: a person is not wearing the required safety gear:\n");
    for class in admitted {
        message.push_str("- ");
        message.push_str(class.name());
        message.push('\n');
    }
    message
}

/// Parse a `token:chat_id` style pair into a Telegram notifier, or fall
/// back to the null notifier when either half is missing.
pub fn notifier_from_config(
    bot_token: Option<&str>,
    chat_id: Option<&str>,
) -> Result<Box<dyn Notifier>> {
    match (bot_token, chat_id) {
        (Some(token), Some(chat)) => {
            if token.is_empty() || chat.is_empty() {
                return Err(anyhow!("bot token and chat id must be non-empty"));
            }
            log::info!("notify: telegram alerts enabled for chat {}", chat);
            Ok(Box::new(TelegramNotifier::new(
                token.to_string(),
                chat.to_string(),
            )))
        }
        (None, None) => {
            log::info!("notify: no alert channel configured");
            Ok(Box::new(NullNotifier))
        }
        _ => Err(anyhow!(
            "telegram alerts need both a bot token and a chat id"
        )),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::frame::Frame;

    #[derive(Default)]
    struct Recorded {
        messages: Vec<String>,
        photos: Vec<(PathBuf, String)>,
    }

    struct RecordingNotifier {
        recorded: Arc<Mutex<Recorded>>,
        /// Snapshot paths observed during send_photo, checked for existence
        /// at send time.
        photo_existed: Arc<Mutex<Vec<bool>>>,
    }

    impl Notifier for RecordingNotifier {
        fn send_message(&self, text: &str) -> Result<()> {
            self.recorded.lock().unwrap().messages.push(text.to_string());
            Ok(())
        }

        fn send_photo(&self, photo_path: &Path, caption: &str) -> Result<()> {
            self.photo_existed
                .lock()
                .unwrap()
                .push(photo_path.exists());
            self.recorded
                .lock()
                .unwrap()
                .photos
                .push((photo_path.to_path_buf(), caption.to_string()));
            Ok(())
        }
    }

    fn test_frame() -> Frame {
        Frame::from_rgb(vec![40u8; 32 * 24 * 3], 32, 24).unwrap()
    }

    #[test]
    fn message_lists_each_admitted_class() {
        let message = alert_message(&[PpeClass::NoHardhat, PpeClass::NoSafetyVest]);
        assert!(message.starts_with("Alert: a person is not wearing"));
        assert!(message.contains("- NO-Hardhat\n"));
        assert!(message.contains("- NO-Safety Vest\n"));
    }

    #[test]
    fn dispatch_sends_message_and_photo_then_removes_snapshot() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let recorded = Arc::new(Mutex::new(Recorded::default()));
        let photo_existed = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = AlertDispatcher::with_snapshot_dir(
            Box::new(RecordingNotifier {
                recorded: Arc::clone(&recorded),
                photo_existed: Arc::clone(&photo_existed),
            }),
            dir.path().to_path_buf(),
        );

        dispatcher.dispatch(&test_frame(), &[PpeClass::NoMask]);

        let recorded = recorded.lock().unwrap();
        assert_eq!(recorded.messages.len(), 1);
        assert!(recorded.messages[0].contains("- NO-Mask\n"));
        assert_eq!(recorded.photos.len(), 1);

        // Snapshot existed during the upload and is gone afterwards.
        assert_eq!(photo_existed.lock().unwrap().as_slice(), &[true]);
        assert!(!recorded.photos[0].0.exists());
        Ok(())
    }

    #[test]
    fn dispatch_with_no_admitted_classes_is_a_no_op() {
        let recorded = Arc::new(Mutex::new(Recorded::default()));
        let dispatcher = AlertDispatcher::new(Box::new(RecordingNotifier {
            recorded: Arc::clone(&recorded),
            photo_existed: Arc::new(Mutex::new(Vec::new())),
        }));

        dispatcher.dispatch(&test_frame(), &[]);
        assert!(recorded.lock().unwrap().messages.is_empty());
    }

    struct FailingNotifier;

    impl Notifier for FailingNotifier {
        fn send_message(&self, _text: &str) -> Result<()> {
            Err(anyhow!("network down"))
        }

        fn send_photo(&self, _photo_path: &Path, _caption: &str) -> Result<()> {
            Err(anyhow!("network down"))
        }
    }

    #[test]
    fn delivery_failure_is_swallowed() {
        let dispatcher = AlertDispatcher::new(Box::new(FailingNotifier));
        dispatcher.dispatch(&test_frame(), &[PpeClass::NoHardhat]);
    }

    #[test]
    fn multipart_body_carries_all_three_parts() {
        let (body, content_type) = multipart_photo_body("42", "caption text", b"\xff\xd8jpeg");
        let text = String::from_utf8_lossy(&body);
        assert!(content_type.starts_with("multipart/form-data; boundary="));
        assert!(text.contains("name=\"chat_id\"\r\n\r\n42"));
        assert!(text.contains("name=\"caption\"\r\n\r\ncaption text"));
        assert!(text.contains("name=\"photo\"; filename=\"snapshot.jpg\""));
        assert!(text.contains("Content-Type: image/jpeg"));
        assert!(text.trim_end().ends_with("--"));
    }

    #[test]
    fn notifier_selection_requires_both_halves() {
        assert!(notifier_from_config(Some("token"), None).is_err());
        assert!(notifier_from_config(None, Some("42")).is_err());
        assert!(notifier_from_config(None, None).is_ok());
        assert!(notifier_from_config(Some("token"), Some("42")).is_ok());
    }
}
