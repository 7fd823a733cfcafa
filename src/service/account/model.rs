use chrono::{DateTime, Utc};
use teloxide::types::UserId;

/// Durable per-user ledger row. `selected_model` and `tts_speed` are carried
/// for compatibility with existing data files and have no behavior here.
#[derive(Debug, Clone)]
pub struct UserAccount {
    pub id: UserId,
    pub username: Option<String>,
    pub is_premium: bool,
    pub credits: i64,
    pub validity_expire_at: Option<DateTime<Utc>>,
    pub selected_model: Option<String>,
    pub tts_speed: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserAccount {
    /// Effective premium status, derived from the ledger rather than the
    /// stored flag. The stored flag is only a mutation-time snapshot.
    pub fn is_premium_now(&self, now: DateTime<Utc>) -> bool {
        premium_now(self.credits, self.validity_expire_at, now)
    }
}

/// The one premium derivation: a positive credit balance or an unexpired
/// validity window. Every mutation and every read-side check goes through
/// this.
pub fn premium_now(credits: i64, validity_expire_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    credits > 0 || validity_expire_at.is_some_and(|expires| expires > now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn credits_alone_grant_premium() {
        let now = Utc::now();
        assert!(premium_now(1, None, now));
        assert!(!premium_now(0, None, now));
    }

    #[test]
    fn future_validity_grants_premium_without_credits() {
        let now = Utc::now();
        assert!(premium_now(0, Some(now + Duration::days(3)), now));
    }

    #[test]
    fn expired_validity_does_not_grant_premium() {
        let now = Utc::now();
        assert!(!premium_now(0, Some(now - Duration::seconds(1)), now));
    }

    #[test]
    fn credits_keep_premium_after_validity_expires() {
        let now = Utc::now();
        assert!(premium_now(5, Some(now - Duration::days(1)), now));
    }
}
