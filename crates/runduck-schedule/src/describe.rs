use tracing::debug;

use crate::error::{Result, ScheduleError};

/// Turns a 5-field cron expression into a human readable sentence.
pub trait CronDescriber: Send + Sync {
    fn describe(&self, cron: &str) -> Result<String>;
}

/// Describe `cron`, falling back to the raw expression when the describer
/// rejects it. Never fails.
pub fn describe(describer: &dyn CronDescriber, cron: &str) -> String {
    match describer.describe(cron) {
        Ok(text) => text,
        Err(e) => {
            debug!(cron, error = %e, "falling back to raw cron expression");
            cron.to_string()
        }
    }
}

/// Built-in English describer.
///
/// Covers the subset of cron the orchestrator emits: values, ranges, steps,
/// lists, `?`, `L` for day of month, `#` for weekday, and month/weekday names.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnglishDescriber;

impl CronDescriber for EnglishDescriber {
    fn describe(&self, cron: &str) -> Result<String> {
        let fields: Vec<&str> = cron.split_whitespace().collect();
        let [minute, hour, dom, month, dow] = fields.as_slice() else {
            return Err(fail(cron, format!("expected 5 fields, got {}", fields.len())));
        };

        let minute = parse_field(Field::Minute, minute).map_err(|r| fail(cron, r))?;
        let hour = parse_field(Field::Hour, hour).map_err(|r| fail(cron, r))?;
        let dom = parse_field(Field::DayOfMonth, dom).map_err(|r| fail(cron, r))?;
        let month = parse_field(Field::Month, month).map_err(|r| fail(cron, r))?;
        let dow = parse_field(Field::Weekday, dow).map_err(|r| fail(cron, r))?;

        let mut parts = vec![time_phrase(&minute, &hour)];
        parts.extend(
            [
                day_of_month_phrase(&dom),
                month_phrase(&month),
                weekday_phrase(&dow),
            ]
            .into_iter()
            .flatten(),
        );

        Ok(capitalize(&parts.join(", ")))
    }
}

fn fail(cron: &str, reason: String) -> ScheduleError {
    ScheduleError::Description {
        cron: cron.to_string(),
        reason,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Minute,
    Hour,
    DayOfMonth,
    Month,
    Weekday,
}

impl Field {
    fn label(self) -> &'static str {
        match self {
            Field::Minute => "minute",
            Field::Hour => "hour",
            Field::DayOfMonth => "day of month",
            Field::Month => "month",
            Field::Weekday => "weekday",
        }
    }

    fn bounds(self) -> (u32, u32) {
        match self {
            Field::Minute => (0, 59),
            Field::Hour => (0, 23),
            Field::DayOfMonth => (1, 31),
            Field::Month => (1, 12),
            Field::Weekday => (0, 7),
        }
    }

    fn value(self, token: &str) -> std::result::Result<u32, String> {
        let named = match self {
            Field::Month => name_index(&MONTH_ABBREVIATIONS, token).map(|i| i + 1),
            Field::Weekday => name_index(&WEEKDAY_ABBREVIATIONS, token),
            _ => None,
        };
        let n = match named {
            Some(n) => n,
            None => token
                .parse::<u32>()
                .map_err(|_| format!("invalid {} value '{token}'", self.label()))?,
        };
        let (lo, hi) = self.bounds();
        if n < lo || n > hi {
            return Err(format!("{} value {n} out of range {lo}-{hi}", self.label()));
        }
        Ok(n)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Item {
    Every(u32),
    Value(u32),
    Range { from: u32, to: u32, step: Option<u32> },
    StepFrom { from: u32, step: u32 },
    LastDay,
    Nth { day: u32, nth: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Spec {
    Any,
    Items(Vec<Item>),
}

fn parse_field(field: Field, raw: &str) -> std::result::Result<Spec, String> {
    if raw == "*" || raw == "?" {
        return Ok(Spec::Any);
    }
    raw.split(',')
        .map(|item| parse_item(field, item))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map(Spec::Items)
}

fn parse_item(field: Field, item: &str) -> std::result::Result<Item, String> {
    if item == "L" && field == Field::DayOfMonth {
        return Ok(Item::LastDay);
    }
    if field == Field::Weekday {
        if let Some((day, nth)) = item.split_once('#') {
            let nth = nth
                .parse::<u32>()
                .ok()
                .filter(|n| (1..=5).contains(n))
                .ok_or_else(|| format!("invalid weekday occurrence '{item}'"))?;
            return Ok(Item::Nth { day: field.value(day)?, nth });
        }
    }

    let (base, step) = match item.split_once('/') {
        Some((base, step)) => {
            let step = step
                .parse::<u32>()
                .ok()
                .filter(|s| *s > 0)
                .ok_or_else(|| format!("invalid {} step '{item}'", field.label()))?;
            (base, Some(step))
        }
        None => (item, None),
    };

    if base == "*" {
        return step
            .map(Item::Every)
            .ok_or_else(|| format!("'*' cannot be combined with other {} values", field.label()));
    }
    if let Some((from, to)) = base.split_once('-') {
        let (from, to) = (field.value(from)?, field.value(to)?);
        if from > to {
            return Err(format!("{} range {from}-{to} is inverted", field.label()));
        }
        return Ok(Item::Range { from, to, step });
    }

    let from = field.value(base)?;
    Ok(match step {
        Some(step) => Item::StepFrom { from, step },
        None => Item::Value(from),
    })
}

fn time_phrase(minute: &Spec, hour: &Spec) -> String {
    match (minute, hour) {
        (Spec::Any, Spec::Any) => return "every minute".to_string(),
        (Spec::Items(m), Spec::Items(h)) => {
            if let ([Item::Value(m)], Some(hours)) = (m.as_slice(), all_values(h)) {
                let times: Vec<String> = hours.iter().map(|h| format!("{h:02}:{m:02}")).collect();
                return format!("at {}", join_and(&times));
            }
        }
        _ => {}
    }

    let mut parts = vec![minute_phrase(minute)];
    if let Some(hours) = hour_phrase(hour) {
        parts.push(hours);
    }
    parts.join(", ")
}

fn minute_phrase(spec: &Spec) -> String {
    let Spec::Items(items) = spec else {
        return "every minute".to_string();
    };
    if let Some(values) = all_values(items) {
        let values: Vec<String> = values.iter().map(u32::to_string).collect();
        let unit = if values == ["1"] { "minute" } else { "minutes" };
        return format!("at {} {unit} past the hour", join_and(&values));
    }
    describe_items(items, |item| match item {
        Item::Every(step) => every(*step, "minute"),
        Item::Value(m) => format!("at {m} minutes past the hour"),
        Item::Range { from, to, step } => with_step(
            *step,
            "minute",
            format!("minutes {from} through {to} past the hour"),
        ),
        Item::StepFrom { from, step } => format!(
            "{}, starting at {from} minutes past the hour",
            every(*step, "minute")
        ),
        Item::LastDay | Item::Nth { .. } => String::new(),
    })
}

fn hour_phrase(spec: &Spec) -> Option<String> {
    let Spec::Items(items) = spec else {
        return None;
    };
    Some(describe_items(items, |item| match item {
        Item::Every(step) => every(*step, "hour"),
        Item::Value(h) => format!("between {h:02}:00 and {h:02}:59"),
        Item::Range { from, to, step } => {
            with_step(*step, "hour", format!("between {from:02}:00 and {to:02}:59"))
        }
        Item::StepFrom { from, step } => {
            format!("{}, starting at {from:02}:00", every(*step, "hour"))
        }
        Item::LastDay | Item::Nth { .. } => String::new(),
    }))
}

fn day_of_month_phrase(spec: &Spec) -> Option<String> {
    let Spec::Items(items) = spec else {
        return None;
    };
    if let Some(days) = all_values(items) {
        let days: Vec<String> = days.iter().map(u32::to_string).collect();
        return Some(format!("on day {} of the month", join_and(&days)));
    }
    Some(describe_items(items, |item| match item {
        Item::Every(step) => every(*step, "day"),
        Item::Value(d) => format!("on day {d} of the month"),
        Item::Range { from, to, step } => with_step(
            *step,
            "day",
            format!("between day {from} and {to} of the month"),
        ),
        Item::StepFrom { from, step } => {
            format!("{}, starting on day {from} of the month", every(*step, "day"))
        }
        Item::LastDay => "on the last day of the month".to_string(),
        Item::Nth { .. } => String::new(),
    }))
}

fn month_phrase(spec: &Spec) -> Option<String> {
    let Spec::Items(items) = spec else {
        return None;
    };
    if let Some(months) = all_values(items) {
        let names: Vec<String> = months.iter().map(|m| month_name(*m)).collect();
        return Some(format!("only in {}", join_and(&names)));
    }
    Some(describe_items(items, |item| match item {
        Item::Every(step) => every(*step, "month"),
        Item::Value(m) => format!("only in {}", month_name(*m)),
        Item::Range { from, to, step } => with_step(
            *step,
            "month",
            format!("{} through {}", month_name(*from), month_name(*to)),
        ),
        Item::StepFrom { from, step } => format!(
            "{}, starting in {}",
            every(*step, "month"),
            month_name(*from)
        ),
        Item::LastDay | Item::Nth { .. } => String::new(),
    }))
}

fn weekday_phrase(spec: &Spec) -> Option<String> {
    let Spec::Items(items) = spec else {
        return None;
    };
    if let Some(days) = all_values(items) {
        let mut seen = Vec::with_capacity(days.len());
        for day in days.into_iter().map(|d| d % 7) {
            if !seen.contains(&day) {
                seen.push(day);
            }
        }
        let names: Vec<String> = seen.into_iter().map(weekday_name).collect();
        return Some(format!("only on {}", join_and(&names)));
    }
    Some(describe_items(items, |item| match item {
        Item::Every(1) => "every day of the week".to_string(),
        Item::Every(step) => format!("every {step} days of the week"),
        Item::Value(d) => format!("only on {}", weekday_name(*d)),
        Item::Range { from, to, step } => with_step(
            *step,
            "day",
            format!("{} through {}", weekday_name(*from), weekday_name(*to)),
        ),
        Item::StepFrom { from, step } => format!(
            "{}, starting on {}",
            every(*step, "day"),
            weekday_name(*from)
        ),
        Item::Nth { day, nth } => format!(
            "on the {} {} of the month",
            ordinal(*nth),
            weekday_name(*day)
        ),
        Item::LastDay => String::new(),
    }))
}

fn all_values(items: &[Item]) -> Option<Vec<u32>> {
    items
        .iter()
        .map(|item| match item {
            Item::Value(v) => Some(*v),
            _ => None,
        })
        .collect()
}

fn describe_items(items: &[Item], phrase: impl Fn(&Item) -> String) -> String {
    let phrases: Vec<String> = items.iter().map(phrase).filter(|p| !p.is_empty()).collect();
    join_and(&phrases)
}

fn every(step: u32, unit: &str) -> String {
    if step == 1 {
        format!("every {unit}")
    } else {
        format!("every {step} {unit}s")
    }
}

fn with_step(step: Option<u32>, unit: &str, phrase: String) -> String {
    match step {
        Some(step) => format!("{}, {phrase}", every(step, unit)),
        None => phrase,
    }
}

fn join_and(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [one] => one.clone(),
        [init @ .., last] => format!("{} and {last}", init.join(", ")),
    }
}

fn capitalize(s: &str) -> String {
    let mut c = s.chars();
    match c.next() {
        None => String::new(),
        Some(f) => f.to_uppercase().to_string() + c.as_str(),
    }
}

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];
const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];
const WEEKDAY_ABBREVIATIONS: [&str; 7] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];
const WEEKDAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

fn name_index(names: &[&str], token: &str) -> Option<u32> {
    names
        .iter()
        .position(|n| n.eq_ignore_ascii_case(token))
        .map(|i| i as u32)
}

fn month_name(m: u32) -> String {
    MONTH_NAMES[(m as usize).saturating_sub(1) % 12].to_string()
}

// 0 and 7 are both Sunday.
fn weekday_name(d: u32) -> String {
    WEEKDAY_NAMES[(d % 7) as usize].to_string()
}

fn ordinal(n: u32) -> &'static str {
    match n {
        1 => "first",
        2 => "second",
        3 => "third",
        4 => "fourth",
        _ => "fifth",
    }
}
