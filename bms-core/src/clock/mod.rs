//! Time/date fields exchanged with the real-time clock and the `settime`
//! command codec.
//!
//! `settime` carries six two-digit fields after the keyword, each preceded
//! by a single delimiter byte (`settime 24.03.17 08:15:00`). Delimiter bytes
//! are not inspected. The tokenizer only checks the overall length; per-field
//! decoding then checks each value against the legal range for its unit.

use core::fmt;

use winnow::combinator::preceded;
use winnow::error::ContextError;
use winnow::prelude::*;
use winnow::token::{any, literal, take};

/// Keyword that starts a set-time command.
pub const SETTIME_KEYWORD: &[u8] = b"settime";

/// Number of two-digit fields carried by a set-time command.
pub const FIELD_COUNT: usize = 6;

/// Width of a single encoded field.
pub const FIELD_WIDTH: usize = 2;

/// Length of a set-time command without its terminator.
pub const SETTIME_COMMAND_LEN: usize = SETTIME_KEYWORD.len() + FIELD_COUNT * (FIELD_WIDTH + 1);

/// Wall-clock time of day as held by the RTC.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RtcTime {
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
}

/// Calendar date as held by the RTC. `year` is relative to 2000.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RtcDate {
    pub year: u8,
    pub month: u8,
    pub day: u8,
}

/// Combined date and time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimeDate {
    pub date: RtcDate,
    pub time: RtcTime,
}

impl TimeDate {
    #[must_use]
    pub const fn new(date: RtcDate, time: RtcTime) -> Self {
        Self { date, time }
    }

    /// Stores `value` into `field` if it lies within the field's range.
    ///
    /// Out-of-range values leave the previous contents untouched.
    pub fn store(&mut self, field: TimeField, value: u8) -> bool {
        if !field.accepts(value) {
            return false;
        }
        let slot = match field {
            TimeField::Year => &mut self.date.year,
            TimeField::Month => &mut self.date.month,
            TimeField::Day => &mut self.date.day,
            TimeField::Hour => &mut self.time.hours,
            TimeField::Minute => &mut self.time.minutes,
            TimeField::Second => &mut self.time.seconds,
        };
        *slot = value;
        true
    }
}

impl fmt::Display for TimeDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "20{:02}.{:02}.{:02} - {:02}:{:02}:{:02}",
            self.date.year,
            self.date.month,
            self.date.day,
            self.time.hours,
            self.time.minutes,
            self.time.seconds
        )
    }
}

/// Fields of a set-time command in wire order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimeField {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
}

impl TimeField {
    pub const ALL: [TimeField; FIELD_COUNT] = [
        TimeField::Year,
        TimeField::Month,
        TimeField::Day,
        TimeField::Hour,
        TimeField::Minute,
        TimeField::Second,
    ];

    /// Inclusive legal range for the field.
    #[must_use]
    pub const fn range(self) -> (u8, u8) {
        match self {
            TimeField::Year => (0, 99),
            TimeField::Month => (1, 12),
            TimeField::Day => (1, 31),
            TimeField::Hour => (0, 23),
            TimeField::Minute | TimeField::Second => (0, 59),
        }
    }

    #[must_use]
    pub const fn accepts(self, value: u8) -> bool {
        let (min, max) = self.range();
        value >= min && value <= max
    }

    const fn bit(self) -> u8 {
        1 << self as u8
    }
}

/// Set of fields that failed validation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FieldMask(u8);

impl FieldMask {
    pub const EMPTY: FieldMask = FieldMask(0);

    pub fn insert(&mut self, field: TimeField) {
        self.0 |= field.bit();
    }

    #[must_use]
    pub const fn contains(self, field: TimeField) -> bool {
        self.0 & field.bit() != 0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterates the rejected fields in wire order.
    pub fn iter(self) -> impl Iterator<Item = TimeField> {
        TimeField::ALL
            .into_iter()
            .filter(move |field| self.contains(*field))
    }
}

/// Reasons a set-time command is rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SetTimeError {
    /// Command length does not match the fixed layout.
    Length { received: usize },
    /// One or more fields were outside their legal range.
    Value { rejected: FieldMask },
}

impl fmt::Display for SetTimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetTimeError::Length { received } => write!(
                f,
                "expected {SETTIME_COMMAND_LEN} bytes in `settime YY.MM.DD HH:MM:SS` layout, got {received}"
            ),
            SetTimeError::Value { rejected } => {
                f.write_str("out of range:")?;
                for field in rejected.iter() {
                    write!(f, " {field:?}")?;
                }
                Ok(())
            }
        }
    }
}

/// Splits a set-time command into its six raw field tokens.
pub fn tokenize(line: &[u8]) -> Result<[&[u8]; FIELD_COUNT], SetTimeError> {
    let length_error = SetTimeError::Length {
        received: line.len(),
    };
    if line.len() != SETTIME_COMMAND_LEN {
        return Err(length_error);
    }
    settime_fields.parse(line).map_err(|_| length_error)
}

fn settime_fields<'a>(input: &mut &'a [u8]) -> Result<[&'a [u8]; FIELD_COUNT], ContextError> {
    preceded(
        literal(SETTIME_KEYWORD),
        (field, field, field, field, field, field),
    )
    .map(|(year, month, day, hour, minute, second)| [year, month, day, hour, minute, second])
    .parse_next(input)
}

fn field<'a>(input: &mut &'a [u8]) -> Result<&'a [u8], ContextError> {
    preceded(any, take(FIELD_WIDTH)).parse_next(input)
}

/// Decodes a two-digit field as `tens * 10 + ones`.
#[must_use]
pub fn decode_pair(token: &[u8]) -> Option<u8> {
    match token {
        [tens, ones] if tens.is_ascii_digit() && ones.is_ascii_digit() => {
            Some((tens - b'0') * 10 + (ones - b'0'))
        }
        _ => None,
    }
}

/// Applies a set-time command to `target`.
///
/// Every field is attempted. Fields that validate are written into `target`
/// even when another field is rejected, so the caller must only commit
/// `target` to the RTC on `Ok`.
pub fn apply_settime(line: &[u8], target: &mut TimeDate) -> Result<(), SetTimeError> {
    let tokens = tokenize(line)?;
    let mut rejected = FieldMask::EMPTY;

    for (field, token) in TimeField::ALL.into_iter().zip(tokens) {
        let stored = decode_pair(token).is_some_and(|value| target.store(field, value));
        if !stored {
            rejected.insert(field);
        }
    }

    if rejected.is_empty() {
        Ok(())
    } else {
        Err(SetTimeError::Value { rejected })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TimeDate {
        TimeDate::new(
            RtcDate {
                year: 24,
                month: 3,
                day: 17,
            },
            RtcTime {
                hours: 8,
                minutes: 15,
                seconds: 0,
            },
        )
    }

    #[test]
    fn grammar_length_matches_wire_layout() {
        assert_eq!(SETTIME_COMMAND_LEN, 25);
        assert_eq!(b"settime 24.03.17 08:15:00".len(), SETTIME_COMMAND_LEN);
    }

    #[test]
    fn tokenizer_splits_fields() {
        let tokens = tokenize(b"settime 24.03.17 08:15:00").unwrap();
        let expected: [&[u8]; FIELD_COUNT] = [b"24", b"03", b"17", b"08", b"15", b"00"];
        assert_eq!(tokens, expected);
    }

    #[test]
    fn tokenizer_rejects_wrong_length() {
        assert_eq!(
            tokenize(b"settime 24.03.17 08:15"),
            Err(SetTimeError::Length { received: 22 })
        );
        assert_eq!(
            tokenize(b"settime"),
            Err(SetTimeError::Length { received: 7 })
        );
    }

    #[test]
    fn delimiter_bytes_are_not_inspected() {
        let tokens = tokenize(b"settime 24x03x17T08h15m00").unwrap();
        let expected: [&[u8]; FIELD_COUNT] = [b"24", b"03", b"17", b"08", b"15", b"00"];
        assert_eq!(tokens, expected);
    }

    #[test]
    fn misaligned_fields_fail_value_checks_not_length() {
        let mut target = sample();
        let error = apply_settime(b"settime 2403.17 08:15:00 ", &mut target).unwrap_err();
        assert!(matches!(error, SetTimeError::Value { .. }), "{error:?}");
    }

    #[test]
    fn decode_pair_requires_two_digits() {
        assert_eq!(decode_pair(b"07"), Some(7));
        assert_eq!(decode_pair(b"59"), Some(59));
        assert_eq!(decode_pair(b"5a"), None);
        assert_eq!(decode_pair(b"5"), None);
    }

    #[test]
    fn apply_writes_every_field() {
        let mut target = TimeDate::default();
        apply_settime(b"settime 24.03.17 08:15:00", &mut target).unwrap();
        assert_eq!(target, sample());
    }

    #[test]
    fn rejected_field_keeps_previous_value_while_others_update() {
        let mut target = sample();
        let error = apply_settime(b"settime 25 12 31 23 61 59", &mut target).unwrap_err();

        let SetTimeError::Value { rejected } = error else {
            panic!("expected value error, got {error:?}");
        };
        assert!(rejected.contains(TimeField::Minute));
        assert_eq!(rejected.iter().count(), 1);

        assert_eq!(target.date, RtcDate { year: 25, month: 12, day: 31 });
        assert_eq!(target.time.hours, 23);
        assert_eq!(target.time.minutes, 15);
        assert_eq!(target.time.seconds, 59);
    }

    #[test]
    fn field_ranges_follow_calendar_units() {
        assert!(!TimeField::Month.accepts(0));
        assert!(TimeField::Month.accepts(12));
        assert!(!TimeField::Day.accepts(32));
        assert!(!TimeField::Hour.accepts(24));
        assert!(TimeField::Year.accepts(99));
    }

    #[test]
    fn display_uses_console_layout() {
        let mut out: heapless::String<32> = heapless::String::new();
        core::fmt::write(&mut out, format_args!("{}", sample())).unwrap();
        assert_eq!(out.as_str(), "2024.03.17 - 08:15:00");
    }
}
