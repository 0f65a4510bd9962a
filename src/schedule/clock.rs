//! Exchange-zone wall-clock reading. The only non-pure piece of Clock &
//! Schedule: everything else in this module is a pure function of `now`.

use chrono::NaiveDateTime;
use chrono_tz::Asia::Taipei;

/// Current wall-clock time in the exchange zone (Asia/Taipei, no DST).
pub fn now_taipei() -> NaiveDateTime {
    chrono::Utc::now().with_timezone(&Taipei).naive_local()
}
