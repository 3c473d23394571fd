use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A purchased subscription account whose profile slots are resold one by
/// one. `free_slots` and `occupied_slots` are the slot ledger: together they
/// always add up to the capacity the account was provisioned with, and only
/// conditional writes that carry the current `version` may move them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Account {
    pub id: Uuid,
    /// Login email for the upstream service.
    pub login: String,
    pub service_id: Uuid,
    /// Denormalized for listings; resolved from the service at creation.
    pub service_name: String,
    pub billing_date: DateTime<Utc>,
    pub note: String,
    pub email_password: String,
    pub account_password: String,
    pub free_slots: i32,
    pub occupied_slots: i32,
    /// Revision counter bumped by the store on every write. Conditional
    /// writes compare it so concurrent slot updates cannot be lost.
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewAccount {
    #[validate(length(min = 1, message = "login must not be empty"))]
    pub login: String,
    pub service_id: Uuid,
    pub billing_date: DateTime<Utc>,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub email_password: String,
    #[serde(default)]
    pub account_password: String,
}

/// Partial edit of an account's detail fields. Slot counters are never
/// patched directly; they only move through the slot ledger.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountPatch {
    pub login: Option<String>,
    pub billing_date: Option<DateTime<Utc>>,
    pub note: Option<String>,
    pub email_password: Option<String>,
    pub account_password: Option<String>,
}

impl Account {
    /// A fresh account starts with every slot free.
    pub fn new(draft: NewAccount, service_id: Uuid, service_name: String, slot_capacity: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            login: draft.login,
            service_id,
            service_name,
            billing_date: draft.billing_date,
            note: draft.note,
            email_password: draft.email_password,
            account_password: draft.account_password,
            free_slots: slot_capacity,
            occupied_slots: 0,
            version: 0,
            created_at: Utc::now(),
        }
    }

    pub fn total_slots(&self) -> i32 {
        self.free_slots + self.occupied_slots
    }

    /// Next state with one slot moved from free to occupied, or `None` when
    /// the account is full.
    pub fn take_slot(&self) -> Option<Account> {
        if self.free_slots <= 0 {
            return None;
        }
        let mut next = self.clone();
        next.free_slots -= 1;
        next.occupied_slots += 1;
        Some(next)
    }

    /// Next state with one slot handed back. Clamped so occupied never goes
    /// below zero and free never exceeds `capacity`, which repairs counters
    /// that drifted in legacy data instead of corrupting them further.
    pub fn release_slot(&self, capacity: i32) -> Account {
        let mut next = self.clone();
        next.occupied_slots = (self.occupied_slots - 1).max(0);
        next.free_slots = (self.free_slots + 1).min(capacity);
        next
    }

    pub fn apply(&mut self, patch: AccountPatch) {
        if let Some(login) = patch.login {
            self.login = login;
        }
        if let Some(billing_date) = patch.billing_date {
            self.billing_date = billing_date;
        }
        if let Some(note) = patch.note {
            self.note = note;
        }
        if let Some(email_password) = patch.email_password {
            self.email_password = email_password;
        }
        if let Some(account_password) = patch.account_password {
            self.account_password = account_password;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account_with(free: i32, occupied: i32) -> Account {
        let draft = NewAccount {
            login: "owner@mail.com".to_string(),
            service_id: Uuid::new_v4(),
            billing_date: Utc::now(),
            note: String::new(),
            email_password: String::new(),
            account_password: String::new(),
        };
        let mut account = Account::new(draft, Uuid::new_v4(), "Netflix".to_string(), free + occupied);
        account.free_slots = free;
        account.occupied_slots = occupied;
        account
    }

    #[test]
    fn new_account_has_all_slots_free() {
        let account = account_with(5, 0);
        assert_eq!(account.free_slots, 5);
        assert_eq!(account.occupied_slots, 0);
        assert_eq!(account.version, 0);
    }

    #[test]
    fn take_slot_moves_one_free_to_occupied() {
        let account = account_with(3, 2);
        let next = account.take_slot().unwrap();
        assert_eq!(next.free_slots, 2);
        assert_eq!(next.occupied_slots, 3);
        assert_eq!(next.total_slots(), account.total_slots());
    }

    #[test]
    fn take_slot_refuses_when_full() {
        assert!(account_with(0, 4).take_slot().is_none());
    }

    #[test]
    fn release_slot_moves_one_back() {
        let next = account_with(1, 4).release_slot(5);
        assert_eq!(next.free_slots, 2);
        assert_eq!(next.occupied_slots, 3);
    }

    #[test]
    fn release_slot_clamps_occupied_at_zero() {
        let next = account_with(4, 0).release_slot(4);
        assert_eq!(next.occupied_slots, 0);
        assert_eq!(next.free_slots, 4);
    }

    #[test]
    fn release_slot_never_exceeds_true_capacity() {
        // Four-slot account: a release must top out at four, not at the
        // old hardwired five.
        let next = account_with(4, 0).release_slot(4);
        assert_eq!(next.free_slots, 4);
        assert_eq!(next.total_slots(), 4);
    }

    #[test]
    fn patch_touches_details_but_never_counters() {
        let mut account = account_with(2, 3);
        account.apply(AccountPatch {
            note: Some("renewed upstream".to_string()),
            ..AccountPatch::default()
        });
        assert_eq!(account.note, "renewed upstream");
        assert_eq!(account.free_slots, 2);
        assert_eq!(account.occupied_slots, 3);
    }
}
