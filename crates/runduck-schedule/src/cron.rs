use runduck_core::ScheduleSpec;

const ANY: &str = "*";

/// Build a 5-field cron expression (`minute hour dayofmonth month weekday`)
/// from the orchestrator's structured schedule.
///
/// Unset fields become `*`. An absent schedule yields an empty string. The
/// `seconds` field has no slot in a 5-field expression and is ignored.
pub fn to_cron(schedule: Option<&ScheduleSpec>) -> String {
    let Some(schedule) = schedule else {
        return String::new();
    };

    let time = schedule.time.as_ref();
    let minute = time
        .and_then(|t| non_empty(t.minute.as_deref()))
        .map(normalize_minute)
        .unwrap_or_else(|| ANY.to_string());
    let hour = time
        .and_then(|t| non_empty(t.hour.as_deref()))
        .map(convert_hour_range)
        .unwrap_or_else(|| ANY.to_string());
    let dayofmonth = schedule
        .dayofmonth
        .as_ref()
        .and_then(|d| non_empty(d.day.as_deref()))
        .unwrap_or(ANY);
    let month = non_empty(schedule.month.as_deref()).unwrap_or(ANY);
    let weekday = schedule
        .weekday
        .as_ref()
        .and_then(|d| non_empty(d.day.as_deref()))
        .unwrap_or(ANY);

    format!("{minute} {hour} {dayofmonth} {month} {weekday}")
}

/// Minute field clean-up: drop one trailing comma and turn `0/N` or `/N`
/// into `*/N`.
fn normalize_minute(minute: &str) -> String {
    let minute = minute.strip_suffix(',').unwrap_or(minute);
    if let Some((base, step)) = minute.split_once('/') {
        if base.chars().all(|c| c == '0') {
            return format!("*/{step}");
        }
    }
    minute.to_string()
}

/// Rewrite hour ranges that wrap past midnight into two plain ranges.
///
/// `"9-8"` becomes `"9-23,0-8"` and `"7-02/1"` becomes `"7-23/1,0-2/1"`; the
/// step suffix is kept on both halves. Each comma-separated item is handled
/// on its own; anything that is not a wrapping numeric range is returned as
/// given.
pub fn convert_hour_range(hour: &str) -> String {
    hour.split(',')
        .map(convert_hour_item)
        .collect::<Vec<_>>()
        .join(",")
}

fn convert_hour_item(item: &str) -> String {
    let (range, step) = match item.split_once('/') {
        Some((range, step)) => (range, Some(step)),
        None => (item, None),
    };
    let Some((start, end)) = range.split_once('-') else {
        return item.to_string();
    };
    let (Ok(start), Ok(end)) = (start.trim().parse::<u32>(), end.trim().parse::<u32>()) else {
        return item.to_string();
    };
    if start <= end {
        return item.to_string();
    }

    let suffix = step.map(|s| format!("/{s}")).unwrap_or_default();
    format!("{start}-23{suffix},0-{end}{suffix}")
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use runduck_core::{DayField, ScheduleTime};

    fn schedule(minute: &str, hour: &str) -> ScheduleSpec {
        ScheduleSpec {
            time: Some(ScheduleTime {
                minute: Some(minute.to_string()),
                hour: Some(hour.to_string()),
                seconds: Some("0".to_string()),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn wrapping_hour_range_is_split() {
        assert_eq!(convert_hour_range("9-8"), "9-23,0-8");
        assert_eq!(convert_hour_range("7-02/1"), "7-23/1,0-2/1");
    }

    #[test]
    fn plain_hours_pass_through() {
        assert_eq!(convert_hour_range("9-17"), "9-17");
        assert_eq!(convert_hour_range("*/2"), "*/2");
        assert_eq!(convert_hour_range("07"), "07");
        assert_eq!(convert_hour_range("1,22-3"), "1,22-23,0-3");
    }

    #[test]
    fn unset_fields_default_to_any() {
        let spec = ScheduleSpec {
            time: Some(ScheduleTime {
                minute: Some("30".to_string()),
                hour: None,
                seconds: None,
            }),
            month: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(to_cron(Some(&spec)), "30 * * * *");
        assert_eq!(to_cron(Some(&ScheduleSpec::default())), "* * * * *");
        assert_eq!(to_cron(None), "");
    }

    #[test]
    fn minute_steps_are_normalised() {
        assert_eq!(to_cron(Some(&schedule("0/15", "*"))), "*/15 * * * *");
        assert_eq!(to_cron(Some(&schedule("/5", "*"))), "*/5 * * * *");
        assert_eq!(to_cron(Some(&schedule("5,", "3"))), "5 3 * * *");
        assert_eq!(to_cron(Some(&schedule("10/20", "3"))), "10/20 3 * * *");
    }

    #[test]
    fn full_schedule() {
        let mut spec = schedule("0/10", "22-4");
        spec.month = Some("*".to_string());
        spec.dayofmonth = Some(DayField { day: Some("?".to_string()) });
        spec.weekday = Some(DayField { day: Some("MON-FRI".to_string()) });
        assert_eq!(to_cron(Some(&spec)), "*/10 22-23,0-4 ? * MON-FRI");
    }
}
