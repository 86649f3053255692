use chrono::{DateTime, Days, TimeZone};

use crate::types::DailySchedule;

/// Next `hour:minute` strictly after `from`, in `from`'s timezone.
///
/// A wall-clock time that does not exist on some day (DST gap) moves to the
/// following day; an ambiguous one (DST fold) fires at its earlier instant.
pub fn next_daily_run<Tz: TimeZone>(schedule: DailySchedule, from: &DateTime<Tz>) -> Option<DateTime<Tz>> {
    let tz = from.timezone();
    let today = from.date_naive();
    (0..=2u64).find_map(|offset| {
        let day = today.checked_add_days(Days::new(offset))?;
        let naive = day.and_hms_opt(schedule.hour as u32, schedule.minute as u32, 0)?;
        tz.from_local_datetime(&naive)
            .earliest()
            .filter(|candidate| candidate > from)
    })
}
