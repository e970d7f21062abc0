use chrono::{DateTime, SubsecRound, Utc};

/// `TIMESTAMPTZ` keeps microseconds.
const STORED_SUBSEC_DIGITS: u16 = 6;

/// Current time at the precision the store keeps, so an aggregate compares
/// equal to its reloaded copy.
pub fn now() -> DateTime<Utc> {
    at_storage_precision(Utc::now())
}

pub fn at_storage_precision(timestamp: DateTime<Utc>) -> DateTime<Utc> {
    timestamp.trunc_subsecs(STORED_SUBSEC_DIGITS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn drops_nanoseconds_below_a_microsecond() {
        let precise = Utc
            .with_ymd_and_hms(2025, 1, 1, 12, 0, 0)
            .unwrap()
            .with_nanosecond(584_712_426)
            .unwrap();

        assert_eq!(at_storage_precision(precise).nanosecond(), 584_712_000);
    }

    #[test]
    fn now_has_whole_microseconds() {
        assert_eq!(now().nanosecond() % 1_000, 0);
    }
}
