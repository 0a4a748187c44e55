// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Human schedule rules: `daily HH:MM` and `weekly <Day> HH:MM`.

use chrono::{DateTime, Datelike, LocalResult, NaiveDateTime, TimeZone, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use cron::Schedule;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ScheduleParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
	Daily,
	Weekly,
}

/// A normalized schedule: frequency, optional weekday, hour and minute.
///
/// Construction validates every field, so a rule in hand can always be
/// evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScheduleRule {
	frequency: Frequency,
	weekday: Option<Weekday>,
	hour: u32,
	minute: u32,
}

impl ScheduleRule {
	pub fn daily(hour: u32, minute: u32) -> Result<Self, ScheduleParseError> {
		check_time(hour, minute, &format!("daily {hour:02}:{minute:02}"))?;
		Ok(Self {
			frequency: Frequency::Daily,
			weekday: None,
			hour,
			minute,
		})
	}

	pub fn weekly(weekday: Weekday, hour: u32, minute: u32) -> Result<Self, ScheduleParseError> {
		check_time(
			hour,
			minute,
			&format!("weekly {} {hour:02}:{minute:02}", weekday_name(weekday)),
		)?;
		Ok(Self {
			frequency: Frequency::Weekly,
			weekday: Some(weekday),
			hour,
			minute,
		})
	}

	pub fn frequency(&self) -> Frequency {
		self.frequency
	}

	pub fn weekday(&self) -> Option<Weekday> {
		self.weekday
	}

	pub fn hour(&self) -> u32 {
		self.hour
	}

	pub fn minute(&self) -> u32 {
		self.minute
	}

	/// Whether the wall-clock minute containing `at` is a firing minute.
	pub fn matches<Z: TimeZone>(&self, at: &DateTime<Z>) -> bool {
		at.hour() == self.hour
			&& at.minute() == self.minute
			&& self.weekday.map_or(true, |day| at.weekday() == day)
	}

	/// Equivalent 7-field expression for the `cron` crate
	/// (second minute hour day-of-month month day-of-week year).
	pub fn cron_expression(&self) -> String {
		let dow = match self.weekday {
			Some(day) => cron_day(day).to_string(),
			None => "*".to_string(),
		};
		format!("0 {} {} * * {} *", self.minute, self.hour, dow)
	}

	/// Next firing time strictly after `after`, evaluated in `tz`.
	///
	/// Wall-clock occurrences come from the cron expression on a naive
	/// timeline and are then placed in `tz`: a time repeated by a backward
	/// clock change resolves to its first instance, a time skipped by a
	/// forward change resolves to the first valid minute after the gap.
	pub fn next_after(&self, after: DateTime<Utc>, tz: Tz) -> Option<DateTime<Utc>> {
		let schedule = Schedule::from_str(&self.cron_expression()).ok()?;
		let local_after = after.with_timezone(&tz).naive_local();
		let start = Utc.from_utc_datetime(&(local_after - chrono::Duration::days(1)));
		schedule
			.after(&start)
			.take(16)
			.filter_map(|wall| resolve_local(tz, wall.naive_utc()))
			.find(|at| *at > after)
	}
}

/// Longest clock-change gap searched when a wall time does not exist.
const MAX_GAP_MINUTES: i64 = 180;

fn resolve_local(tz: Tz, wall: NaiveDateTime) -> Option<DateTime<Utc>> {
	let resolved = match tz.from_local_datetime(&wall) {
		LocalResult::Single(at) => Some(at),
		LocalResult::Ambiguous(first, _) => Some(first),
		LocalResult::None => (1..=MAX_GAP_MINUTES).find_map(|m| {
			tz.from_local_datetime(&(wall + chrono::Duration::minutes(m)))
				.earliest()
		}),
	};
	resolved.map(|at| at.with_timezone(&Utc))
}

impl FromStr for ScheduleRule {
	type Err = ScheduleParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let tokens: Vec<&str> = s.split_whitespace().collect();
		match tokens.as_slice() {
			[freq, time] if freq.eq_ignore_ascii_case("daily") => {
				let (hour, minute) = parse_hh_mm(s, time)?;
				Self::daily(hour, minute).map_err(|e| ScheduleParseError::new(s, e.reason))
			}
			[freq, day, time] if freq.eq_ignore_ascii_case("weekly") => {
				let weekday = parse_weekday(day)
					.ok_or_else(|| ScheduleParseError::new(s, format!("unknown day '{day}'")))?;
				let (hour, minute) = parse_hh_mm(s, time)?;
				Self::weekly(weekday, hour, minute).map_err(|e| ScheduleParseError::new(s, e.reason))
			}
			[] => Err(ScheduleParseError::new(s, "empty schedule")),
			_ => Err(ScheduleParseError::new(s, "unrecognized format")),
		}
	}
}

impl fmt::Display for ScheduleRule {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.weekday {
			Some(day) => write!(
				f,
				"weekly {} {:02}:{:02}",
				weekday_name(day),
				self.hour,
				self.minute
			),
			None => write!(f, "daily {:02}:{:02}", self.hour, self.minute),
		}
	}
}

impl Serialize for ScheduleRule {
	fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_str(self)
	}
}

impl<'de> Deserialize<'de> for ScheduleRule {
	fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let s = String::deserialize(deserializer)?;
		s.parse().map_err(serde::de::Error::custom)
	}
}

fn check_time(hour: u32, minute: u32, input: &str) -> Result<(), ScheduleParseError> {
	if hour > 23 {
		return Err(ScheduleParseError::new(input, format!("hour {hour} out of range")));
	}
	if minute > 59 {
		return Err(ScheduleParseError::new(input, format!("minute {minute} out of range")));
	}
	Ok(())
}

fn parse_hh_mm(input: &str, time: &str) -> Result<(u32, u32), ScheduleParseError> {
	let bad = || ScheduleParseError::new(input, format!("invalid time '{time}'"));
	let (hh, mm) = time.split_once(':').ok_or_else(bad)?;
	if hh.len() != 2 || mm.len() != 2 {
		return Err(bad());
	}
	if !hh.bytes().chain(mm.bytes()).all(|b| b.is_ascii_digit()) {
		return Err(bad());
	}
	let hour = hh.parse().map_err(|_| bad())?;
	let minute = mm.parse().map_err(|_| bad())?;
	Ok((hour, minute))
}

fn parse_weekday(day: &str) -> Option<Weekday> {
	match day.to_ascii_lowercase().as_str() {
		"monday" => Some(Weekday::Mon),
		"tuesday" => Some(Weekday::Tue),
		"wednesday" => Some(Weekday::Wed),
		"thursday" => Some(Weekday::Thu),
		"friday" => Some(Weekday::Fri),
		"saturday" => Some(Weekday::Sat),
		"sunday" => Some(Weekday::Sun),
		_ => None,
	}
}

fn weekday_name(day: Weekday) -> &'static str {
	match day {
		Weekday::Mon => "Monday",
		Weekday::Tue => "Tuesday",
		Weekday::Wed => "Wednesday",
		Weekday::Thu => "Thursday",
		Weekday::Fri => "Friday",
		Weekday::Sat => "Saturday",
		Weekday::Sun => "Sunday",
	}
}

fn cron_day(day: Weekday) -> &'static str {
	match day {
		Weekday::Mon => "Mon",
		Weekday::Tue => "Tue",
		Weekday::Wed => "Wed",
		Weekday::Thu => "Thu",
		Weekday::Fri => "Fri",
		Weekday::Sat => "Sat",
		Weekday::Sun => "Sun",
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashSet;

	#[test]
	fn test_rules_hash_by_value() {
		let rules: HashSet<ScheduleRule> = ["daily 03:00", "daily 03:00", "weekly Sun 03:00"]
			.into_iter()
			.map(|s| s.parse().unwrap())
			.collect();
		assert_eq!(rules.len(), 2);
		let frequencies: HashSet<Frequency> = rules.iter().map(|r| r.frequency()).collect();
		assert_eq!(frequencies.len(), 2);
	}

	#[test]
	fn test_parse_daily() {
		let rule: ScheduleRule = "daily 03:00".parse().unwrap();
		assert_eq!(rule.frequency(), Frequency::Daily);
		assert_eq!(rule.weekday(), None);
		assert_eq!((rule.hour(), rule.minute()), (3, 0));
	}

	#[test]
	fn test_parse_weekly_case_insensitive() {
		let rule: ScheduleRule = "WEEKLY sunday 02:30".parse().unwrap();
		assert_eq!(rule.frequency(), Frequency::Weekly);
		assert_eq!(rule.weekday(), Some(Weekday::Sun));
		assert_eq!((rule.hour(), rule.minute()), (2, 30));
		assert_eq!(rule.to_string(), "weekly Sunday 02:30");
	}

	#[test]
	fn test_parse_tolerates_extra_whitespace() {
		let rule: ScheduleRule = "  daily   23:59 ".parse().unwrap();
		assert_eq!((rule.hour(), rule.minute()), (23, 59));
	}

	#[test]
	fn test_parse_rejects_malformed() {
		for bad in [
			"",
			"every tuesday at noon",
			"daily 3:00",
			"daily 24:00",
			"daily 12:60",
			"daily 12:0a",
			"weekly Funday 03:00",
			"weekly 03:00",
			"monthly 1 03:00",
			"daily 03:00 extra",
		] {
			assert!(bad.parse::<ScheduleRule>().is_err(), "accepted {bad:?}");
		}
	}

	#[test]
	fn test_matches_daily_minute() {
		let rule: ScheduleRule = "daily 03:00".parse().unwrap();
		let hit = Utc.with_ymd_and_hms(2026, 1, 5, 3, 0, 42).unwrap();
		let miss = Utc.with_ymd_and_hms(2026, 1, 5, 3, 1, 0).unwrap();
		assert!(rule.matches(&hit));
		assert!(!rule.matches(&miss));
	}

	#[test]
	fn test_matches_weekly_only_on_day() {
		let rule: ScheduleRule = "weekly Sunday 03:00".parse().unwrap();
		// 2026-01-04 is a Sunday
		let sunday = Utc.with_ymd_and_hms(2026, 1, 4, 3, 0, 0).unwrap();
		let monday = Utc.with_ymd_and_hms(2026, 1, 5, 3, 0, 0).unwrap();
		assert!(rule.matches(&sunday));
		assert!(!rule.matches(&monday));
	}

	#[test]
	fn test_cron_expression() {
		let daily: ScheduleRule = "daily 02:05".parse().unwrap();
		assert_eq!(daily.cron_expression(), "0 5 2 * * * *");
		let weekly: ScheduleRule = "weekly Friday 22:15".parse().unwrap();
		assert_eq!(weekly.cron_expression(), "0 15 22 * * Fri *");
	}

	#[test]
	fn test_next_after_daily() {
		let rule: ScheduleRule = "daily 03:00".parse().unwrap();
		let after = Utc.with_ymd_and_hms(2026, 1, 19, 10, 30, 0).unwrap();
		let next = rule.next_after(after, chrono_tz::UTC).unwrap();
		assert_eq!(next, Utc.with_ymd_and_hms(2026, 1, 20, 3, 0, 0).unwrap());
	}

	#[test]
	fn test_next_after_weekly_in_timezone() {
		let rule: ScheduleRule = "weekly Sunday 09:00".parse().unwrap();
		// 2026-01-17 is a Saturday. Sydney is UTC+11 in January.
		let after = Utc.with_ymd_and_hms(2026, 1, 17, 12, 0, 0).unwrap();
		let next = rule
			.next_after(after, chrono_tz::Australia::Sydney)
			.unwrap();
		assert_eq!(next, Utc.with_ymd_and_hms(2026, 1, 17, 22, 0, 0).unwrap());
	}

	#[test]
	fn test_next_after_repeated_hour_fires_first_instance() {
		let rule: ScheduleRule = "daily 01:30".parse().unwrap();
		let tz = chrono_tz::America::New_York;
		// 2025-11-02 01:30 happens at 05:30Z (EDT) and again at 06:30Z (EST).
		let first = rule
			.next_after(Utc.with_ymd_and_hms(2025, 11, 2, 0, 0, 0).unwrap(), tz)
			.unwrap();
		assert_eq!(first, Utc.with_ymd_and_hms(2025, 11, 2, 5, 30, 0).unwrap());
		let second = rule.next_after(first, tz).unwrap();
		assert_eq!(second, Utc.with_ymd_and_hms(2025, 11, 3, 6, 30, 0).unwrap());
	}

	#[test]
	fn test_next_after_skipped_hour_fires_after_gap() {
		let rule: ScheduleRule = "daily 02:30".parse().unwrap();
		let tz = chrono_tz::America::New_York;
		// 2025-03-09 02:00-03:00 does not exist; 03:00 EDT is 07:00Z.
		let after = Utc.with_ymd_and_hms(2025, 3, 8, 12, 0, 0).unwrap();
		let next = rule.next_after(after, tz).unwrap();
		assert_eq!(next, Utc.with_ymd_and_hms(2025, 3, 9, 7, 0, 0).unwrap());
		let following = rule.next_after(next, tz).unwrap();
		assert_eq!(following, Utc.with_ymd_and_hms(2025, 3, 10, 6, 30, 0).unwrap());
	}

	#[test]
	fn test_serde_as_string() {
		let rule: ScheduleRule = "weekly Monday 01:00".parse().unwrap();
		let json = serde_json::to_string(&rule).unwrap();
		assert_eq!(json, "\"weekly Monday 01:00\"");
		let back: ScheduleRule = serde_json::from_str(&json).unwrap();
		assert_eq!(back, rule);
	}
}
