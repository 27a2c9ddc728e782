//! Booking window and meeting timing rules.
//!
//! Meeting dates and times are wall-clock values in a single scheduling zone,
//! modelled as a fixed UTC offset. Everything here is a pure function of the
//! policy, a meeting and the current instant, so callers pass `now` explicitly.

use crate::errors::MsError;
use crate::models::{Meeting, MeetingBucket, MeetingStatus, TimeRemaining};
use chrono::{
    DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone,
    Timelike, Utc,
};

/// How close to the start a participant may join the call.
pub const CALL_JOIN_WINDOW_MINUTES: i64 = 15;

/// How long before the start the reminder goes out.
pub const REMINDER_LEAD_MINUTES: i64 = 30;

/// Tolerance around the reminder lead. A meeting is due when its start is
/// within `lead ± tolerance` of now.
pub const REMINDER_TOLERANCE_MINUTES: i64 = 1;

/// Timing rules for booking and running meetings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulingPolicy {
    /// Offset of the scheduling zone from UTC.
    pub utc_offset: FixedOffset,

    /// Minimum gap between now and a same-day booking.
    pub booking_lead: Duration,

    /// Last bookable day, counted from today.
    pub booking_horizon_days: i64,

    /// Join is allowed once the start is this close.
    pub join_window: Duration,

    /// Reminder fires this long before the start.
    pub reminder_lead: Duration,

    /// Accepted deviation around `reminder_lead`.
    pub reminder_tolerance: Duration,
}

impl Default for SchedulingPolicy {
    fn default() -> Self {
        Self::new(
            Utc.fix(),
            crate::config::DEFAULT_BOOKING_LEAD_MINUTES,
            crate::config::DEFAULT_BOOKING_HORIZON_DAYS,
        )
    }
}

impl SchedulingPolicy {
    pub fn new(utc_offset: FixedOffset, lead_minutes: i64, horizon_days: i64) -> Self {
        Self {
            utc_offset,
            booking_lead: Duration::minutes(lead_minutes),
            booking_horizon_days: horizon_days,
            join_window: Duration::minutes(CALL_JOIN_WINDOW_MINUTES),
            reminder_lead: Duration::minutes(REMINDER_LEAD_MINUTES),
            reminder_tolerance: Duration::minutes(REMINDER_TOLERANCE_MINUTES),
        }
    }

    /// Current wall-clock time in the scheduling zone.
    pub fn local_now(&self, now: DateTime<Utc>) -> NaiveDateTime {
        now.with_timezone(&self.utc_offset).naive_local()
    }

    /// Today's date in the scheduling zone.
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        self.local_now(now).date()
    }

    /// Convert a scheduling-zone wall-clock value to an instant.
    pub fn to_instant(&self, local: NaiveDateTime) -> DateTime<Utc> {
        let offset = Duration::seconds(i64::from(self.utc_offset.local_minus_utc()));
        Utc.from_utc_datetime(&(local - offset))
    }

    /// Instant at which the meeting starts.
    pub fn starts_at(&self, meeting: &Meeting) -> DateTime<Utc> {
        self.to_instant(meeting.local_start())
    }

    /// Earliest local date-time a booking would be accepted for right now.
    ///
    /// Today the lead time applies; from tomorrow on any time of day is fine.
    /// Bookings are minute-resolution, so a partial minute rounds up.
    pub fn earliest_bookable(&self, now: DateTime<Utc>) -> NaiveDateTime {
        let local_now = self.local_now(now);
        let with_lead = ceil_to_minute(local_now + self.booking_lead);
        let tomorrow = local_now
            .date()
            .succ_opt()
            .map(|d| d.and_time(NaiveTime::MIN))
            .unwrap_or(with_lead);
        with_lead.min(tomorrow)
    }

    /// Last local date a booking may be placed on right now.
    pub fn latest_bookable_date(&self, now: DateTime<Utc>) -> NaiveDate {
        self.today(now) + Duration::days(self.booking_horizon_days)
    }

    /// Check a requested slot against the booking window.
    ///
    /// The slot must be in the future, at least the lead time away when it is
    /// today, and no later than the horizon.
    pub fn check_booking_window(
        &self,
        date: NaiveDate,
        time: NaiveTime,
        now: DateTime<Utc>,
    ) -> Result<(), MsError> {
        let local_now = self.local_now(now);
        let candidate = date.and_time(time);
        let latest_allowed_date = self.latest_bookable_date(now);

        let violation = |reason: String| MsError::BookingWindowViolation {
            reason,
            earliest_allowed: self.earliest_bookable(now),
            latest_allowed_date,
        };

        if candidate <= local_now {
            return Err(violation("Meeting time must be in the future".to_string()));
        }

        if date == local_now.date() && candidate < local_now + self.booking_lead {
            return Err(violation(format!(
                "Meetings today must be booked at least {} minutes in advance",
                self.booking_lead.num_minutes()
            )));
        }

        if date > latest_allowed_date {
            return Err(violation(format!(
                "Meetings can be booked at most {} days in advance",
                self.booking_horizon_days
            )));
        }

        Ok(())
    }

    /// Whether participants may join the call now.
    ///
    /// True for scheduled meetings from `join_window` before the start onward.
    pub fn can_join_call(&self, meeting: &Meeting, now: DateTime<Utc>) -> bool {
        meeting.status == MeetingStatus::Scheduled
            && self.starts_at(meeting) - now <= self.join_window
    }

    /// Whether the pre-meeting reminder should go out now.
    pub fn is_reminder_due(&self, meeting: &Meeting, now: DateTime<Utc>) -> bool {
        if meeting.status != MeetingStatus::Scheduled {
            return false;
        }

        let until_start = self.starts_at(meeting) - now;
        until_start >= self.reminder_lead - self.reminder_tolerance
            && until_start <= self.reminder_lead + self.reminder_tolerance
    }

    /// Countdown until the meeting starts.
    pub fn time_remaining(&self, meeting: &Meeting, now: DateTime<Utc>) -> TimeRemaining {
        let total = (self.starts_at(meeting) - now).num_seconds();
        if total <= 0 {
            return TimeRemaining {
                days: 0,
                hours: 0,
                minutes: 0,
                seconds: 0,
                passed: true,
            };
        }

        TimeRemaining {
            days: total / 86_400,
            hours: (total % 86_400) / 3_600,
            minutes: (total % 3_600) / 60,
            seconds: total % 60,
            passed: false,
        }
    }

    /// Display bucket for a meeting.
    pub fn bucket(&self, meeting: &Meeting, now: DateTime<Utc>) -> MeetingBucket {
        match meeting.status {
            MeetingStatus::Pending => MeetingBucket::Pending,
            MeetingStatus::Scheduled if self.starts_at(meeting) > now => MeetingBucket::Upcoming,
            MeetingStatus::Scheduled => MeetingBucket::Past,
            MeetingStatus::Completed | MeetingStatus::Cancelled | MeetingStatus::Rejected => {
                MeetingBucket::Past
            }
        }
    }

    /// Local dates that may hold meetings with a reminder due now.
    ///
    /// Usually just today; near local midnight the reminder window reaches
    /// into tomorrow.
    pub fn reminder_sweep_dates(&self, now: DateTime<Utc>) -> Vec<NaiveDate> {
        let today = self.today(now);
        let horizon = self.today(now + self.reminder_lead + self.reminder_tolerance);
        if horizon == today {
            vec![today]
        } else {
            vec![today, horizon]
        }
    }
}

fn ceil_to_minute(t: NaiveDateTime) -> NaiveDateTime {
    let partial =
        Duration::seconds(i64::from(t.second())) + Duration::nanoseconds(i64::from(t.nanosecond()));
    if partial == Duration::zero() {
        t
    } else {
        t - partial + Duration::minutes(1)
    }
}
