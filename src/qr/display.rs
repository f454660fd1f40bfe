//! Change detection for the QR display view
//!
//! The display state is an immutable snapshot: each fetch outcome is applied
//! through a pure transition that returns the next snapshot, and only the
//! refresh loop in [`crate::qr::service`] commits results. That keeps the
//! redraw decision unit-testable without any network or timer in the way.

use chrono::{DateTime, Utc};

use crate::backend::{FetchError, QrTokenRecord};
use crate::qr::link::compose_link;
use crate::qr::render::render_png;

/// One snapshot of the QR display.
///
/// Starts out idle (nothing fetched yet, nothing rendered). Once a fetch
/// succeeds it is displayed and stays displayed: a failed refresh records an
/// error message but never clears the image — stale-but-valid beats blank.
#[derive(Debug, Clone, Default)]
pub struct DisplayState {
    /// Most recently rendered token record. `None` means idle.
    pub last_seen: Option<QrTokenRecord>,
    /// Deep link the current image encodes.
    pub deep_link: Option<String>,
    /// PNG bytes of the current image. Always corresponds to `last_seen`.
    pub qr_png: Option<Vec<u8>>,
    /// Number of redraws so far: one per distinct token, never per fetch.
    pub render_count: u64,
    /// When the last fetch attempt finished, successful or not.
    pub last_checked: Option<DateTime<Utc>>,
    /// Message from the most recent failed attempt; cleared on success.
    pub last_error: Option<String>,
}

impl DisplayState {
    pub fn is_displayed(&self) -> bool {
        self.last_seen.is_some()
    }

    pub fn phase(&self) -> &'static str {
        if self.is_displayed() {
            "displayed"
        } else {
            "idle"
        }
    }

    /// Applies one fetch outcome and returns the next snapshot.
    ///
    /// Redraw happens if and only if the fetched token differs from the
    /// last-seen token. An unchanged token only refreshes the bookkeeping
    /// fields (`last_checked` and the backend's rotation metadata). Errors
    /// leave the displayed image and link untouched.
    pub fn apply(
        &self,
        outcome: Result<QrTokenRecord, FetchError>,
        frontend_base_url: &str,
        company_id: i64,
        checked_at: DateTime<Utc>,
    ) -> DisplayState {
        let mut next = self.clone();
        next.last_checked = Some(checked_at);

        match outcome {
            Ok(record) => {
                next.last_error = None;

                let changed = self
                    .last_seen
                    .as_ref()
                    .map_or(true, |seen| seen.token != record.token);

                if !changed {
                    // Same token: keep the image, refresh rotation metadata.
                    next.last_seen = Some(record);
                    return next;
                }

                let link = compose_link(frontend_base_url, company_id, &record.token);
                match render_png(&link) {
                    Ok(png) => {
                        next.qr_png = Some(png);
                        next.deep_link = Some(link);
                        next.last_seen = Some(record);
                        next.render_count += 1;
                    }
                    Err(e) => {
                        // Invariant: the image always matches `last_seen`, so
                        // a render failure keeps the previous token too.
                        next.last_error = Some(e.to_string());
                    }
                }
            }
            Err(e) => {
                next.last_error = Some(e.to_string());
            }
        }

        next
    }
}
