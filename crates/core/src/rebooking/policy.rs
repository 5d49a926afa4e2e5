use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset, Offset, Utc};

use crate::config::RebookingConfig;
use crate::domain::booking::Flight;

pub trait Clock: Send + Sync {
    fn now_utc(&self) -> DateTime<Utc>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Inputs available to a rebooking policy once the target flight is known.
#[derive(Clone, Debug)]
pub struct DepartureCheck<'a> {
    pub flight: &'a Flight,
    pub now: DateTime<FixedOffset>,
    pub time_until_departure: Duration,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PolicyDecision {
    Permit,
    Reject { reason: String },
}

pub trait RebookingPolicy: Send + Sync {
    fn name(&self) -> &'static str;
    fn evaluate(&self, check: &DepartureCheck<'_>) -> PolicyDecision;
}

/// Allows any departure time; the lead time is still reported in the outcome.
#[derive(Clone, Copy, Debug, Default)]
pub struct PermitAnyDeparture;

impl RebookingPolicy for PermitAnyDeparture {
    fn name(&self) -> &'static str {
        "permit_any_departure"
    }

    fn evaluate(&self, _check: &DepartureCheck<'_>) -> PolicyDecision {
        PolicyDecision::Permit
    }
}

/// Rejects flights departing sooner than `lead_time` from now.
#[derive(Clone, Copy, Debug)]
pub struct MinimumLeadTime {
    pub lead_time: Duration,
}

impl MinimumLeadTime {
    /// Lead times beyond what `Duration` can hold saturate to `Duration::MAX`.
    pub fn minutes(minutes: i64) -> Self {
        Self { lead_time: Duration::try_minutes(minutes).unwrap_or(Duration::MAX) }
    }

    fn describe_lead_time(&self) -> String {
        let minutes = self.lead_time.num_minutes();
        if minutes % 60 == 0 {
            let hours = minutes / 60;
            if hours == 1 {
                "1 hour".to_string()
            } else {
                format!("{hours} hours")
            }
        } else {
            format!("{minutes} minutes")
        }
    }
}

impl RebookingPolicy for MinimumLeadTime {
    fn name(&self) -> &'static str {
        "minimum_lead_time"
    }

    fn evaluate(&self, check: &DepartureCheck<'_>) -> PolicyDecision {
        if check.time_until_departure < self.lead_time {
            return PolicyDecision::Reject {
                reason: format!(
                    "not permitted to reschedule to a flight that is less than {} from the current time; selected flight is at {}",
                    self.describe_lead_time(),
                    check.flight.scheduled_departure
                ),
            };
        }
        PolicyDecision::Permit
    }
}

pub fn policy_from_config(config: &RebookingConfig) -> Arc<dyn RebookingPolicy> {
    match config.min_lead_time_minutes {
        Some(minutes) => {
            Arc::new(MinimumLeadTime::minutes(i64::try_from(minutes).unwrap_or(i64::MAX)))
        }
        None => Arc::new(PermitAnyDeparture),
    }
}

/// Offset used when computing time until departure; falls back to UTC when out of range.
pub fn reference_offset(hours: i32) -> FixedOffset {
    FixedOffset::east_opt(hours.saturating_mul(3600)).unwrap_or_else(|| Utc.fix())
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, FixedOffset, TimeZone, Utc};

    use super::{
        policy_from_config, reference_offset, DepartureCheck, MinimumLeadTime, PermitAnyDeparture,
        PolicyDecision, RebookingPolicy,
    };
    use crate::config::RebookingConfig;
    use crate::domain::booking::{Flight, FlightId};

    fn flight() -> Flight {
        Flight {
            flight_id: FlightId(19251),
            flight_no: "LX0112".to_string(),
            departure_airport: "BSL".to_string(),
            arrival_airport: "CDG".to_string(),
            scheduled_departure: FixedOffset::east_opt(3 * 3600)
                .and_then(|offset| offset.with_ymd_and_hms(2024, 5, 3, 15, 0, 0).single())
                .expect("valid timestamp"),
        }
    }

    fn check(flight: &Flight, minutes: i64) -> DepartureCheck<'_> {
        DepartureCheck {
            flight,
            now: Utc::now().fixed_offset(),
            time_until_departure: Duration::minutes(minutes),
        }
    }

    #[test]
    fn permit_any_departure_allows_past_flights() {
        let flight = flight();
        assert_eq!(PermitAnyDeparture.evaluate(&check(&flight, -30)), PolicyDecision::Permit);
    }

    #[test]
    fn minimum_lead_time_rejects_close_departures() {
        let flight = flight();
        let policy = MinimumLeadTime::minutes(180);

        assert_eq!(policy.evaluate(&check(&flight, 180)), PolicyDecision::Permit);
        match policy.evaluate(&check(&flight, 179)) {
            PolicyDecision::Reject { reason } => assert!(reason.contains("less than 3 hours")),
            PolicyDecision::Permit => panic!("expected rejection"),
        }
    }

    #[test]
    fn lead_time_description_uses_minutes_when_not_whole_hours() {
        let flight = flight();
        match MinimumLeadTime::minutes(90).evaluate(&check(&flight, 10)) {
            PolicyDecision::Reject { reason } => assert!(reason.contains("less than 90 minutes")),
            PolicyDecision::Permit => panic!("expected rejection"),
        }
    }

    #[test]
    fn config_selects_policy() {
        let permissive = RebookingConfig { reference_utc_offset_hours: 3, min_lead_time_minutes: None };
        assert_eq!(policy_from_config(&permissive).name(), "permit_any_departure");

        let strict =
            RebookingConfig { reference_utc_offset_hours: 3, min_lead_time_minutes: Some(180) };
        assert_eq!(policy_from_config(&strict).name(), "minimum_lead_time");
    }

    #[test]
    fn oversized_lead_time_saturates_instead_of_panicking() {
        let flight = flight();
        let policy = MinimumLeadTime::minutes(i64::MAX);
        assert_eq!(policy.lead_time, Duration::MAX);
        assert!(matches!(
            policy.evaluate(&check(&flight, 60 * 24 * 365)),
            PolicyDecision::Reject { .. }
        ));

        let from_config = policy_from_config(&RebookingConfig {
            reference_utc_offset_hours: 3,
            min_lead_time_minutes: Some(u64::MAX),
        });
        assert_eq!(from_config.name(), "minimum_lead_time");
        assert!(matches!(
            from_config.evaluate(&check(&flight, 60 * 24 * 365)),
            PolicyDecision::Reject { .. }
        ));
    }

    #[test]
    fn reference_offset_is_fixed_hours_east() {
        assert_eq!(reference_offset(3).local_minus_utc(), 3 * 3600);
        assert_eq!(reference_offset(-5).local_minus_utc(), -5 * 3600);
        assert_eq!(reference_offset(40).local_minus_utc(), 0);
    }
}
