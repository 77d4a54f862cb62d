mod support;

use bms_core::clock::{RtcDate, RtcTime, TimeField};
use bms_core::{CommandError, CommandOutcome};
use support::{Harness, RtcCall, rtc_at};

#[test]
fn valid_settime_commits_time_then_date() {
    let mut harness = Harness::new(3);
    harness.enable_test_mode(0);

    let report = harness.send("settime 25.12.31 23:59:58", 10);

    let expected = rtc_at(25, 12, 31, 23, 59, 58);
    assert_eq!(report.response, Some(Ok(CommandOutcome::TimeSet(expected))));
    assert_eq!(harness.output.as_str(), "Time and date set!\r\n");
    assert_eq!(
        harness.devices.rtc.writes.as_slice(),
        &[
            RtcCall::SetTime(RtcTime {
                hours: 23,
                minutes: 59,
                seconds: 58,
            }),
            RtcCall::SetDate(RtcDate {
                year: 25,
                month: 12,
                day: 31,
            }),
        ]
    );
    assert_eq!(harness.rx.len(), 0);
}

#[test]
fn space_delimited_fields_are_accepted() {
    let mut harness = Harness::new(3);
    harness.enable_test_mode(0);

    let report = harness.send("settime 24 02 29 00 00 00", 10);
    assert_eq!(
        report.response,
        Some(Ok(CommandOutcome::TimeSet(rtc_at(24, 2, 29, 0, 0, 0))))
    );
}

#[test]
fn wrong_length_is_rejected_without_rtc_write() {
    let mut harness = Harness::new(3);
    harness.enable_test_mode(0);
    let before = *harness.decoder.clock();

    let report = harness.send("settime 25.12.31 23:59", 10);

    assert_eq!(
        report.response,
        Some(Err(CommandError::InvalidParameterLength { received: 22 }))
    );
    assert_eq!(
        harness.output.as_str(),
        "Invalid parameter length!\r\nsettime 25.12.31 23:59\r\n"
    );
    assert!(harness.devices.rtc.writes.is_empty());
    assert_eq!(*harness.decoder.clock(), before);
    assert_eq!(harness.rx.len(), 0);
}

#[test]
fn single_out_of_range_field_rejects_whole_command() {
    let mut harness = Harness::new(3);
    harness.enable_test_mode(0);

    let report = harness.send("settime 25.12.31 23:61:58", 10);

    let Some(Err(CommandError::InvalidParameterValue { rejected })) = report.response else {
        panic!("expected invalid parameter value, got {:?}", report.response);
    };
    assert!(rejected.contains(TimeField::Minute));
    assert_eq!(rejected.iter().count(), 1);
    assert_eq!(
        harness.output.as_str(),
        "Invalid parameter!\r\nsettime 25.12.31 23:61:58\r\n"
    );
    assert!(harness.devices.rtc.writes.is_empty());
}

#[test]
fn rejected_settime_leaks_valid_fields_into_shared_record() {
    let mut harness = Harness::new(3);
    harness.enable_test_mode(0);
    harness.send("gettime", 5);
    assert_eq!(*harness.decoder.clock(), rtc_at(24, 3, 17, 8, 15, 0));

    harness.send("settime 25.12.31 23:61:58", 10);

    // The RTC is untouched, but every field that validated has already been
    // written into the decoder's time/date record. Only the minute keeps the
    // value read by the earlier `gettime`.
    assert!(harness.devices.rtc.writes.is_empty());
    assert_eq!(*harness.decoder.clock(), rtc_at(25, 12, 31, 23, 15, 58));
}

#[test]
fn non_digit_field_is_a_value_error() {
    let mut harness = Harness::new(3);
    harness.enable_test_mode(0);

    let report = harness.send("settime 2x.12.31 23:59:58", 10);

    let Some(Err(CommandError::InvalidParameterValue { rejected })) = report.response else {
        panic!("expected invalid parameter value, got {:?}", report.response);
    };
    assert!(rejected.contains(TimeField::Year));
    assert!(harness.devices.rtc.writes.is_empty());
}

#[test]
fn rejected_settime_still_rearms_session() {
    let mut harness = Harness::new(3);
    harness.enable_test_mode(0);

    harness.send("settime 99", 20_000);
    assert_eq!(
        harness.decoder.session().armed_at(),
        Some(support::MockInstant::millis(20_000))
    );
}

#[test]
fn any_byte_is_accepted_as_delimiter() {
    let mut harness = Harness::new(3);
    harness.enable_test_mode(0);

    let report = harness.send("settime 24x03x17T08h15m00", 10);

    let expected = rtc_at(24, 3, 17, 8, 15, 0);
    assert_eq!(report.response, Some(Ok(CommandOutcome::TimeSet(expected))));
    assert_eq!(harness.output.as_str(), "Time and date set!\r\n");
    assert_eq!(harness.devices.rtc.writes.len(), 2);
}

#[test]
fn keyword_prefix_with_wrong_length_is_a_length_error() {
    let mut harness = Harness::new(3);
    harness.enable_test_mode(0);

    let report = harness.send("settimes", 10);

    assert_eq!(
        report.response,
        Some(Err(CommandError::InvalidParameterLength { received: 8 }))
    );
    assert_eq!(harness.output.as_str(), "Invalid parameter length!\r\nsettimes\r\n");
    assert!(harness.devices.rtc.writes.is_empty());
}
