use crate::common::config::{GapSettings, MAX_GAP_STEPS};

/// Effective spacing between tiled windows.
///
/// The gap is configured in steps of `increment` pixels so it can be grown or
/// shrunk from the keyboard one step at a time.
#[derive(Clone, Debug, PartialEq)]
pub struct GapModel {
    pub size: u32,
    pub increment: u32,
    pub hide_when_single: bool,
}

impl Default for GapModel {
    fn default() -> Self { Self::from_settings(&GapSettings::default()) }
}

impl GapModel {
    pub fn from_settings(settings: &GapSettings) -> Self {
        Self {
            size: settings.size.min(MAX_GAP_STEPS),
            increment: settings.increment,
            hide_when_single: settings.hide_when_single,
        }
    }

    /// Pixels removed from each side of a window, given how many tiled
    /// windows share its monitor.
    pub fn effective(&self, tiled_on_monitor: usize) -> f64 {
        if self.hide_when_single && tiled_on_monitor <= 1 {
            return 0.0;
        }
        f64::from(self.size) * f64::from(self.increment)
    }

    pub fn increase(&mut self) -> bool {
        if self.size >= MAX_GAP_STEPS {
            return false;
        }
        self.size += 1;
        true
    }

    pub fn decrease(&mut self) -> bool {
        if self.size == 0 {
            return false;
        }
        self.size -= 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gap_is_size_times_increment() {
        let gaps = GapModel { size: 3, increment: 4, hide_when_single: false };
        assert_eq!(gaps.effective(1), 12.0);
        assert_eq!(gaps.effective(5), 12.0);
    }

    #[test]
    fn single_window_hides_gap_when_configured() {
        let gaps = GapModel { size: 3, increment: 4, hide_when_single: true };
        assert_eq!(gaps.effective(1), 0.0);
        assert_eq!(gaps.effective(2), 12.0);
    }

    #[test]
    fn steps_saturate() {
        let mut gaps = GapModel { size: 0, increment: 1, hide_when_single: false };
        assert!(!gaps.decrease());
        assert!(gaps.increase());
        assert_eq!(gaps.size, 1);

        gaps.size = MAX_GAP_STEPS;
        assert!(!gaps.increase());
        assert_eq!(gaps.size, MAX_GAP_STEPS);
    }
}
