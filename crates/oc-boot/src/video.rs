//! Video interface timing preset
//!
//! Software reads back the timing registers the boot ROM programmed to decide between 50 Hz
//! and 60 Hz output, so bring-up presets them before anything runs.

use tracing::debug;

/// Vertical timing programmed into the video interface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoTiming {
    /// Lines in a full interlaced frame
    pub total_lines: u32,
    /// Active video lines per field
    pub active_lines: u32,
    /// Equalization pulse half-lines
    pub equalization: u32,
    /// Pre- and post-blanking half-lines of the odd field
    pub odd_blanking: (u32, u32),
    /// Pre- and post-blanking half-lines of the even field
    pub even_blanking: (u32, u32),
    pub refresh_rate: u32,
}

impl VideoTiming {
    pub const NTSC: VideoTiming = VideoTiming {
        total_lines: 525,
        active_lines: 240,
        equalization: 6,
        odd_blanking: (24, 3),
        even_blanking: (25, 2),
        refresh_rate: 60,
    };

    pub const PAL: VideoTiming = VideoTiming {
        total_lines: 625,
        active_lines: 287,
        equalization: 5,
        odd_blanking: (35, 2),
        even_blanking: (36, 1),
        refresh_rate: 50,
    };
}

/// The video interface as far as bring-up is concerned
#[derive(Debug, Default)]
pub struct VideoInterface {
    timing: Option<VideoTiming>,
}

impl VideoInterface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Program the registers for NTSC or PAL output
    pub fn preset(&mut self, ntsc: bool) {
        let timing = if ntsc { VideoTiming::NTSC } else { VideoTiming::PAL };
        debug!(
            "VI preset: {} lines, {} active, {} Hz",
            timing.total_lines, timing.active_lines, timing.refresh_rate
        );
        self.timing = Some(timing);
    }

    /// Timing currently programmed, `None` before the first preset
    pub fn timing(&self) -> Option<VideoTiming> {
        self.timing
    }

    pub fn is_ntsc(&self) -> bool {
        self.timing == Some(VideoTiming::NTSC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset() {
        let mut vi = VideoInterface::new();
        assert!(vi.timing().is_none());

        vi.preset(false);
        assert_eq!(vi.timing().unwrap().total_lines, 625);
        assert_eq!(vi.timing().unwrap().active_lines, 287);
        assert!(!vi.is_ntsc());

        vi.preset(true);
        assert_eq!(vi.timing().unwrap().total_lines, 525);
        assert_eq!(vi.timing().unwrap().refresh_rate, 60);
        assert!(vi.is_ntsc());
    }
}
