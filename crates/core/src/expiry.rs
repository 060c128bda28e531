//! Advisory auto-expiry policy for groups
//!
//! Reports whether a group has outlived its configured lifetime. Callers
//! (an external scheduled job, or nobody) decide what to do with the
//! answer; nothing here deletes data.

use chrono::{DateTime, Duration, Utc};

/// Returns `true` iff `auto_delete_after` is set and `now` is strictly
/// past `created_at` plus that many hours.
///
/// Lifetimes too large for chrono's `Duration` count as never reached.
pub fn should_auto_delete(
    created_at: DateTime<Utc>,
    auto_delete_after: Option<i64>,
    now: DateTime<Utc>,
) -> bool {
    let Some(hours) = auto_delete_after else {
        return false;
    };
    match Duration::try_hours(hours).and_then(|d| created_at.checked_add_signed(d)) {
        Some(deadline) => now > deadline,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_policy_never_expires() {
        let created = Utc::now() - Duration::days(3650);
        assert!(!should_auto_delete(created, None, Utc::now()));
    }

    #[test]
    fn test_expiry_is_strict() {
        let created = Utc::now();
        let boundary = created + Duration::hours(1);

        assert!(!should_auto_delete(created, Some(1), boundary));
        assert!(should_auto_delete(
            created,
            Some(1),
            boundary + Duration::milliseconds(1)
        ));
    }

    #[test]
    fn test_overflowing_lifetime_never_expires() {
        let now = Utc::now();
        assert!(!should_auto_delete(now, Some(i64::MAX), now));
        assert!(!should_auto_delete(now, Some(i64::MIN), now));

        // Largest representable deadline still evaluates normally
        let huge = Duration::MAX.num_hours();
        assert!(!should_auto_delete(now, Some(huge), now));
    }

    #[test]
    fn test_one_hour_policy_scenario() {
        // Created at T0 with a 1 hour lifetime
        let t0 = Utc::now();

        // T0+30min: still alive
        assert!(!should_auto_delete(t0, Some(1), t0 + Duration::minutes(30)));

        // T0+90min: expired
        assert!(should_auto_delete(t0, Some(1), t0 + Duration::minutes(90)));
    }
}
