use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;
use validator::Validate;

/// Days before the end date at which a profile starts counting as expiring.
pub const EXPIRY_WARNING_DAYS: i64 = 3;

/// A billing month is a fixed 30-day block, matching how subscriptions are
/// sold: one month is 30 days, three months is 90.
pub const DAYS_PER_MONTH: i64 = 30;

/// One sold slot on an account, leased to a client for a date window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub id: Uuid,
    pub account_id: Uuid,
    pub client_id: Uuid,
    /// Denormalized for listings and messages.
    pub client_name: String,
    pub profile_name: String,
    pub pin: Option<String>,
    pub phone: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// Courtesy profiles are excluded from revenue, not from slot counting.
    pub generates_payment: bool,
    pub price: f64,
    pub created_at: DateTime<Utc>,
}

/// Never stored; always derived from the end date at read time so a stale
/// label cannot survive in the database.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProfileStatus {
    Active,
    Expiring,
    Expired,
}

/// Status of a lease ending at `end_date`, judged at `now`. Expired once the
/// end date is behind `now`; expiring inside the warning window, boundary
/// days included; active otherwise.
pub fn derive_status(end_date: DateTime<Utc>, now: DateTime<Utc>) -> ProfileStatus {
    if end_date < now {
        ProfileStatus::Expired
    } else if end_date - now <= Duration::days(EXPIRY_WARNING_DAYS) {
        ProfileStatus::Expiring
    } else {
        ProfileStatus::Active
    }
}

/// Lease window of `months` billing months starting at `start`.
pub fn renewal_window(start: DateTime<Utc>, months: i32) -> (DateTime<Utc>, DateTime<Utc>) {
    (start, start + Duration::days(DAYS_PER_MONTH * i64::from(months)))
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewProfile {
    pub client_id: Uuid,
    #[validate(length(min = 1, message = "client name must not be empty"))]
    pub client_name: String,
    #[validate(length(min = 1, message = "profile name must not be empty"))]
    pub profile_name: String,
    pub pin: Option<String>,
    #[validate(length(min = 1, message = "phone must not be empty"))]
    pub phone: String,
    /// Defaults to the moment of creation.
    pub start_date: Option<DateTime<Utc>>,
    /// Defaults to one billing month.
    #[validate(range(min = 1, message = "duration must be at least one month"))]
    pub duration_months: Option<i32>,
    #[serde(default = "default_generates_payment")]
    pub generates_payment: bool,
    /// Defaults to the service's monthly price.
    #[validate(range(min = 0.0))]
    pub price: Option<f64>,
}

fn default_generates_payment() -> bool {
    true
}

impl NewProfile {
    pub fn into_profile(self, account_id: Uuid, default_price: f64) -> Profile {
        let (start_date, end_date) = renewal_window(
            self.start_date.unwrap_or_else(Utc::now),
            self.duration_months.unwrap_or(1),
        );
        Profile {
            id: Uuid::new_v4(),
            account_id,
            client_id: self.client_id,
            client_name: self.client_name,
            profile_name: self.profile_name,
            pin: self.pin.filter(|pin| !pin.is_empty()),
            phone: self.phone,
            start_date,
            end_date,
            generates_payment: self.generates_payment,
            price: self.price.unwrap_or(default_price),
            created_at: Utc::now(),
        }
    }
}

impl Profile {
    pub fn status_at(&self, now: DateTime<Utc>) -> ProfileStatus {
        derive_status(self.end_date, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn status_is_expiring_inside_the_warning_window() {
        let end = date(2024, 1, 31);
        assert_eq!(derive_status(end, date(2024, 1, 29)), ProfileStatus::Expiring);
    }

    #[test]
    fn status_is_expired_once_the_end_date_has_passed() {
        let end = date(2024, 1, 31);
        assert_eq!(derive_status(end, date(2024, 2, 1)), ProfileStatus::Expired);
    }

    #[test]
    fn status_is_active_well_before_the_end_date() {
        let end = date(2024, 1, 31);
        assert_eq!(derive_status(end, date(2024, 1, 10)), ProfileStatus::Active);
    }

    #[test]
    fn warning_window_boundaries_are_inclusive() {
        let end = date(2024, 1, 31);
        // Exactly three days out and the end date itself both warn.
        assert_eq!(derive_status(end, date(2024, 1, 28)), ProfileStatus::Expiring);
        assert_eq!(derive_status(end, end), ProfileStatus::Expiring);
        // One second past the end date is expired.
        assert_eq!(
            derive_status(end, end + Duration::seconds(1)),
            ProfileStatus::Expired
        );
        // A hair more than three days out is still active.
        assert_eq!(
            derive_status(end, date(2024, 1, 27)),
            ProfileStatus::Active
        );
    }

    #[test]
    fn renewal_window_counts_thirty_day_months() {
        let start = date(2024, 3, 1);
        let (s, e) = renewal_window(start, 3);
        assert_eq!(s, start);
        assert_eq!(e, start + Duration::days(90));
    }

    #[test]
    fn draft_defaults_fill_window_and_price() {
        let draft = NewProfile {
            client_id: Uuid::new_v4(),
            client_name: "Ana Paredes".to_string(),
            profile_name: "ANA".to_string(),
            pin: Some(String::new()),
            phone: "0991234567".to_string(),
            start_date: Some(date(2024, 5, 1)),
            duration_months: None,
            generates_payment: true,
            price: None,
        };
        let profile = draft.into_profile(Uuid::new_v4(), 3.5);
        assert_eq!(profile.end_date, date(2024, 5, 31));
        assert_eq!(profile.price, 3.5);
        // Empty PINs are stored as unassigned.
        assert_eq!(profile.pin, None);
    }
}
