use chrono::{DateTime, Local};
use std::time::SystemTime;

/// Which rendering a timestamp is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StampMode {
    /// Bracketed on-screen form, `[MMDDYYYY-HH:MM:SS.mmm]`
    Display,
    /// Filename-safe form, `YYYYMMDD_HHMMSS`
    FileName,
}

/// Format a capture time in the requested mode, local wall clock.
pub fn format_stamp(at: SystemTime, mode: StampMode) -> String {
    let local: DateTime<Local> = at.into();
    match mode {
        StampMode::Display => local.format("[%m%d%Y-%H:%M:%S%.3f]").to_string(),
        StampMode::FileName => local.format("%Y%m%d_%H%M%S").to_string(),
    }
}

/// Format the current instant in the requested mode.
pub fn now_stamp(mode: StampMode) -> String {
    format_stamp(SystemTime::now(), mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_display_stamp_shape() {
        let stamp = now_stamp(StampMode::Display);
        assert!(stamp.starts_with('['));
        assert!(stamp.ends_with(']'));
        // [ + 8 date digits + - + 8 time chars + .mmm + ]
        assert_eq!(stamp.len(), 23);
        assert_eq!(&stamp[9..10], "-");
        assert_eq!(&stamp[18..19], ".");
    }

    #[test]
    fn test_filename_stamp_shape() {
        let stamp = now_stamp(StampMode::FileName);
        assert_eq!(stamp.len(), 15);
        assert_eq!(&stamp[8..9], "_");
        assert!(!stamp.contains(':'));
        assert!(!stamp.contains('['));
        assert!(stamp
            .chars()
            .all(|c| c.is_ascii_digit() || c == '_'));
    }

    #[test]
    fn test_same_instant_same_second_across_modes() {
        let at = SystemTime::now();
        let display = format_stamp(at, StampMode::Display);
        let filename = format_stamp(at, StampMode::FileName);
        // Year digits appear in both renderings
        let year = &filename[0..4];
        assert_eq!(&display[5..9], year);
    }

    #[test]
    fn test_stamp_is_stable_for_fixed_instant() {
        let at = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        assert_eq!(
            format_stamp(at, StampMode::Display),
            format_stamp(at, StampMode::Display)
        );
        assert_eq!(
            format_stamp(at, StampMode::FileName),
            format_stamp(at, StampMode::FileName)
        );
    }
}
