//! Day clock for the office schedule
//!
//! Simulated time advances one minute per `ms_per_game_minute` of host
//! time. The clock itself knows nothing about agents; it only reports how
//! many minutes elapsed and offers the arrival/departure curves the office
//! uses to decide who comes and goes.

use serde::{Deserialize, Serialize};

use crate::core::types::Millis;

/// Time of day periods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimePeriod {
    Morning,   // 06:00-12:00
    Afternoon, // 12:00-18:00
    Evening,   // 18:00-24:00
    Night,     // 00:00-06:00
}

impl TimePeriod {
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            6..=11 => TimePeriod::Morning,
            12..=17 => TimePeriod::Afternoon,
            18..=23 => TimePeriod::Evening,
            _ => TimePeriod::Night,
        }
    }
}

/// Share of the roster that should have arrived, keyed by minutes into the
/// arrival window. Slow start, rush around the third and fourth hour.
const ARRIVAL_KEYFRAMES: [(u32, f32); 6] = [
    (0, 0.0),
    (60, 0.05),
    (120, 0.15),
    (180, 0.40),
    (240, 0.80),
    (300, 1.00),
];

/// Simulated wall clock with a pausable minute accumulator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayClock {
    hours: u32,
    minutes: u32,
    day: u64,
    ms_per_minute: Millis,
    accumulator: Millis,
    paused: bool,
}

impl DayClock {
    pub fn new(start_hour: u32, ms_per_minute: Millis) -> Self {
        Self {
            hours: start_hour % 24,
            minutes: 0,
            day: 0,
            ms_per_minute: ms_per_minute.max(1),
            accumulator: 0,
            paused: false,
        }
    }

    /// Feed host time; returns how many simulated minutes passed
    pub fn advance(&mut self, dt: Millis) -> u32 {
        if self.paused {
            return 0;
        }
        self.accumulator += dt;
        let mut elapsed = 0;
        while self.accumulator >= self.ms_per_minute {
            self.accumulator -= self.ms_per_minute;
            self.advance_minute();
            elapsed += 1;
        }
        elapsed
    }

    /// Step exactly one simulated minute
    pub fn advance_minute(&mut self) {
        self.minutes += 1;
        if self.minutes >= 60 {
            self.hours += self.minutes / 60;
            self.minutes %= 60;
            if self.hours >= 24 {
                self.hours %= 24;
                self.day += 1;
            }
        }
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn hours(&self) -> u32 {
        self.hours
    }

    pub fn minutes(&self) -> u32 {
        self.minutes
    }

    pub fn current_day(&self) -> u64 {
        self.day
    }

    pub fn minute_of_day(&self) -> u32 {
        self.hours * 60 + self.minutes
    }

    pub fn current_time_period(&self) -> TimePeriod {
        TimePeriod::from_hour(self.hours)
    }

    pub fn is_night(&self) -> bool {
        self.current_time_period() == TimePeriod::Night
    }

    /// "HH:MM" for display
    pub fn label(&self) -> String {
        format!("{:02}:{:02}", self.hours, self.minutes)
    }

    /// Fraction of agents that should be present `minutes_into_window`
    /// minutes after the arrival window opened
    pub fn arrival_progress(minutes_into_window: u32, window_minutes: u32) -> f32 {
        if minutes_into_window >= window_minutes {
            return 1.0;
        }
        // Keyframes are laid out over a five-hour window; stretch to fit
        let scale = window_minutes as f32 / 300.0;
        let t = minutes_into_window as f32 / scale;
        for pair in ARRIVAL_KEYFRAMES.windows(2) {
            let (t0, p0) = pair[0];
            let (t1, p1) = pair[1];
            let (t0, t1) = (t0 as f32, t1 as f32);
            if t >= t0 && t < t1 {
                return p0 + (t - t0) / (t1 - t0) * (p1 - p0);
            }
        }
        1.0
    }

    /// Minutes from now until `end_hour:00`, wrapping past midnight
    pub fn minutes_until(&self, end_hour: u32) -> u32 {
        let now = self.minute_of_day();
        let end = end_hour * 60;
        if end > now {
            end - now
        } else {
            24 * 60 - now + end
        }
    }

    /// True if the current hour lies in `[start, end)`, wrapping past midnight
    pub fn in_window(&self, start_hour: u32, end_hour: u32) -> bool {
        if start_hour <= end_hour {
            self.hours >= start_hour && self.hours < end_hour
        } else {
            self.hours >= start_hour || self.hours < end_hour
        }
    }
}

impl Default for DayClock {
    fn default() -> Self {
        Self::new(6, 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_period_from_hour() {
        assert_eq!(TimePeriod::from_hour(6), TimePeriod::Morning);
        assert_eq!(TimePeriod::from_hour(11), TimePeriod::Morning);
        assert_eq!(TimePeriod::from_hour(12), TimePeriod::Afternoon);
        assert_eq!(TimePeriod::from_hour(18), TimePeriod::Evening);
        assert_eq!(TimePeriod::from_hour(23), TimePeriod::Evening);
        assert_eq!(TimePeriod::from_hour(0), TimePeriod::Night);
        assert_eq!(TimePeriod::from_hour(5), TimePeriod::Night);
    }

    #[test]
    fn test_clock_advances_and_wraps() {
        let mut clock = DayClock::new(23, 100);
        assert_eq!(clock.advance(100 * 59), 59);
        assert_eq!(clock.label(), "23:59");

        clock.advance(100);
        assert_eq!(clock.label(), "00:00");
        assert_eq!(clock.current_day(), 1);
        assert!(clock.is_night());
    }

    #[test]
    fn test_partial_minutes_accumulate() {
        let mut clock = DayClock::new(6, 100);
        assert_eq!(clock.advance(60), 0);
        assert_eq!(clock.advance(60), 1);
        assert_eq!(clock.minutes(), 1);
    }

    #[test]
    fn test_paused_clock_does_not_advance() {
        let mut clock = DayClock::new(6, 100);
        clock.pause();
        assert_eq!(clock.advance(10_000), 0);
        assert_eq!(clock.label(), "06:00");
        clock.resume();
        assert_eq!(clock.advance(100), 1);
    }

    #[test]
    fn test_arrival_progress_keyframes() {
        assert_eq!(DayClock::arrival_progress(0, 300), 0.0);
        assert!((DayClock::arrival_progress(60, 300) - 0.05).abs() < 1e-6);
        assert!((DayClock::arrival_progress(150, 300) - 0.275).abs() < 1e-6);
        assert!((DayClock::arrival_progress(240, 300) - 0.80).abs() < 1e-6);
        assert_eq!(DayClock::arrival_progress(300, 300), 1.0);
        assert_eq!(DayClock::arrival_progress(900, 300), 1.0);
    }

    #[test]
    fn test_minutes_until_wraps_midnight() {
        let mut clock = DayClock::new(22, 100);
        assert_eq!(clock.minutes_until(4), 6 * 60);
        clock.advance(100 * 30);
        assert_eq!(clock.minutes_until(4), 6 * 60 - 30);

        let early = DayClock::new(2, 100);
        assert_eq!(early.minutes_until(4), 120);
    }

    #[test]
    fn test_in_window_wrapping() {
        assert!(DayClock::new(23, 100).in_window(22, 4));
        assert!(DayClock::new(1, 100).in_window(22, 4));
        assert!(!DayClock::new(12, 100).in_window(22, 4));
        assert!(DayClock::new(6, 100).in_window(6, 11));
        assert!(!DayClock::new(11, 100).in_window(6, 11));
    }
}
