//! Coarse upload progress.
//!
//! Progress is not tied to bytes on the wire: the flow advances through a fixed
//! set of milestones, one per named step.

pub const STARTED: u8 = 10;
pub const CREDENTIAL_ACQUIRED: u8 = 20;
pub const DESCRIPTOR_REQUESTED: u8 = 30;
pub const DESCRIPTOR_RECEIVED: u8 = 50;
pub const FORM_BUILT: u8 = 60;
pub const UPLOAD_SENT: u8 = 70;
pub const COMPLETE: u8 = 100;

/// Integer percentage in 0..=100, never decreasing within one flow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct UploadProgress(u8);

impl UploadProgress {
    pub fn percent(&self) -> u8 {
        self.0
    }

    /// Move forward to `to`. Returns whether the value changed.
    pub fn advance(&mut self, to: u8) -> bool {
        let to = to.min(COMPLETE);
        if to > self.0 {
            self.0 = to;
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.0 = 0;
    }

    pub fn is_complete(&self) -> bool {
        self.0 == COMPLETE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_is_monotonic() {
        let mut progress = UploadProgress::default();
        assert!(progress.advance(STARTED));
        assert!(progress.advance(DESCRIPTOR_RECEIVED));
        assert!(!progress.advance(CREDENTIAL_ACQUIRED));
        assert_eq!(progress.percent(), DESCRIPTOR_RECEIVED);
    }

    #[test]
    fn test_progress_clamps_and_resets() {
        let mut progress = UploadProgress::default();
        progress.advance(250);
        assert!(progress.is_complete());
        progress.reset();
        assert_eq!(progress.percent(), 0);
    }
}
