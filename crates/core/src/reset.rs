//! Device reset line.
//!
//! The emulated device can ask its host board to reset it: a control write
//! with the DEVICE_RESET bit arms a pending flag, and the host's main loop
//! polls [`crate::Device::poll_and_reset`] to drive the wired reset pin.
//! The pin idles high and asserts low, matching the upstream wiring.

/// Output pin driving the board's reset input.
pub trait ResetLine {
    fn set_high(&mut self);
    fn set_low(&mut self);
}

/// Test/CLI reset line that records the driven level and each assertion.
pub struct RecordingResetLine {
    /// True while the line is driven low (reset asserted)
    pub low: bool,
    /// Number of times the line was pulled low
    pub pulls: u32,
}

impl RecordingResetLine {
    /// New line idling high.
    pub fn new() -> Self {
        RecordingResetLine { low: false, pulls: 0 }
    }
}

impl Default for RecordingResetLine {
    fn default() -> Self {
        Self::new()
    }
}

impl ResetLine for RecordingResetLine {
    fn set_high(&mut self) {
        self.low = false;
    }

    fn set_low(&mut self) {
        self.low = true;
        self.pulls += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_line_tracks_pulls() {
        let mut line = RecordingResetLine::new();
        assert!(!line.low);
        line.set_low();
        line.set_low();
        assert!(line.low);
        assert_eq!(line.pulls, 2);
        line.set_high();
        assert!(!line.low);
        assert_eq!(line.pulls, 2);
    }
}
