use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use qrcode::types::QrError;
use qrcode::{Color, EcLevel, QrCode};
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::info;

pub const PAIR_DECISION_WINDOW: Duration = Duration::from_secs(3);

#[derive(Debug, Error)]
pub enum PairingError {
    #[error("QR generation failed: {0}")]
    Qr(#[from] QrError),
}

/// Renders a pairing code as terminal half-blocks, two modules per line.
pub fn render_qr(data: &str) -> Result<String, PairingError> {
    let code = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::L)?;
    let width = code.width();
    let colors = code.into_colors();
    let is_dark = |row: usize, col: usize| row < width && col < width && colors[row * width + col] == Color::Dark;

    let mut out = String::new();
    let mut row = 0;
    while row < width {
        for col in 0..width {
            out.push(match (is_dark(row, col), is_dark(row + 1, col)) {
                (true, true) => '█',
                (true, false) => '▀',
                (false, true) => '▄',
                (false, false) => ' ',
            });
        }
        out.push('\n');
        row += 2;
    }
    Ok(out)
}

/// Lets the console veto an incoming device pairing.
///
/// While a request is pending, console input goes to [`PairingGate::answer`]
/// instead of the command router.
#[derive(Default)]
pub struct PairingGate {
    waiting: AtomicBool,
    slot: Mutex<Option<oneshot::Sender<bool>>>,
}

impl PairingGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_waiting(&self) -> bool {
        self.waiting.load(Ordering::SeqCst)
    }

    /// Feeds one console line to a pending decision. Returns false when no
    /// decision is pending and the line should be treated as a command.
    pub fn answer(&self, input: &str) -> bool {
        if !self.is_waiting() {
            return false;
        }
        let reject = match input.trim() {
            "r" => true,
            "a" => false,
            _ => return true,
        };
        if let Some(tx) = self.slot.lock().unwrap_or_else(PoisonError::into_inner).take() {
            let _ = tx.send(reject);
        }
        true
    }

    /// Waits up to `window` for an answer. Silence accepts.
    pub async fn decide(&self, window: Duration) -> bool {
        let (tx, rx) = oneshot::channel();
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(tx);
        self.waiting.store(true, Ordering::SeqCst);

        let reject = matches!(tokio::time::timeout(window, rx).await, Ok(Ok(true)));

        self.waiting.store(false, Ordering::SeqCst);
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).take();
        if reject {
            info!("Rejecting pair");
        } else {
            info!("Accepting pair");
        }
        !reject
    }
}
