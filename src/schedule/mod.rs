//! Clock & Schedule: pure functions mapping a Taipei wall-clock timestamp to
//! trading/closed status and to the session-appropriate slow-tick threshold.
//!
//! Nothing here performs I/O or touches a clock itself — callers supply `now`.

use crate::config::SessionConfig;
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use std::time::Duration;

mod clock;
pub use clock::now_taipei;

/// Returns true iff `now` falls inside either session, after the symmetric
/// buffer, honouring holiday and weekend/weekday edges. See rules 1-8.
pub fn is_trading_time(
    now: NaiveDateTime,
    holiday_date: Option<NaiveDate>,
    cfg: &SessionConfig,
) -> bool {
    let today = now.date();
    let time_now = now.time();
    let buffer = cfg.buffer();

    // Rule 1: the holiday itself is fully closed.
    if let Some(holiday) = holiday_date {
        if today == holiday {
            return false;
        }
    }

    let day_open_buffered = apply_buffer(cfg.day_open, -buffer);

    // Rule 2: the overnight tail following a holiday, before the next day-open, is closed.
    if let Some(holiday) = holiday_date {
        if today == holiday + chrono::Duration::days(1) && time_now < day_open_buffered {
            return false;
        }
    }

    let weekday = now.weekday();

    // Rule 3: Sunday is always closed.
    if weekday == Weekday::Sun {
        return false;
    }

    let night_open_buffered = apply_buffer(cfg.night_open, -buffer);
    let night_close_buffered = apply_buffer(cfg.night_close, buffer);
    let night_wraps_midnight = night_open_buffered >= night_close_buffered;

    // Rule 4: Saturday after the (same-day) night session closes is closed.
    if weekday == Weekday::Sat && !night_wraps_midnight && time_now >= night_close_buffered {
        return false;
    }

    // Rule 5: Monday before day-open is closed.
    if weekday == Weekday::Mon && time_now < day_open_buffered {
        return false;
    }

    let day_close_buffered = apply_buffer(cfg.day_close, buffer);
    let in_day = day_open_buffered <= time_now && time_now < day_close_buffered;

    let in_night = if !night_wraps_midnight {
        night_open_buffered <= time_now && time_now < night_close_buffered
    } else {
        time_now >= night_open_buffered || time_now < night_close_buffered
    };

    in_day || in_night
}

/// Shifts a wall-clock time by a `chrono::Duration`, wrapping at midnight.
/// Used to dilate session boundaries outward by the clock-skew buffer.
fn apply_buffer(t: NaiveTime, delta: chrono::Duration) -> NaiveTime {
    let dummy_date = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
    (NaiveDateTime::new(dummy_date, t) + delta).time()
}

/// Returns the day-session threshold while `now` is in the day-session window
/// (day-open, inclusive, through night-open, exclusive); otherwise the
/// (thinner) night-session threshold.
pub fn slow_tick_threshold(now: NaiveDateTime, cfg: &SessionConfig) -> Duration {
    let time_now = now.time();
    if cfg.day_open <= time_now && time_now < cfg.night_open {
        cfg.day_slow_tick_threshold
    } else {
        cfg.night_slow_tick_threshold
    }
}
