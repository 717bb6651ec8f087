//! Alert records and arm requests.

use crate::{Destination, TokenHolding, TokenId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Everything needed to arm an alert, produced when a conversation completes.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertRequest {
    pub user_id: UserId,
    pub token: TokenHolding,
    pub threshold_percent: f64,
    pub destination: Destination,
}

/// At most one active alert exists per (user, token) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlertKey {
    pub user_id: UserId,
    pub token_id: TokenId,
}

/// An armed alert. The baseline moves only when the supervisor rearms it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub user_id: UserId,
    pub token: TokenHolding,
    pub threshold_percent: f64,
    /// Position value (price * balance) recorded at arm time or last rearm.
    pub baseline_value: f64,
    pub destination: Destination,
    pub created_at: DateTime<Utc>,
}

impl Alert {
    pub fn from_request(request: &AlertRequest, baseline_value: f64) -> Self {
        Self {
            user_id: request.user_id,
            token: request.token.clone(),
            threshold_percent: request.threshold_percent,
            baseline_value,
            destination: request.destination,
            created_at: Utc::now(),
        }
    }

    pub fn key(&self) -> AlertKey {
        AlertKey {
            user_id: self.user_id,
            token_id: self.token.id.clone(),
        }
    }

    /// Signed percentage change of `current_value` against the baseline.
    pub fn percent_change(&self, current_value: f64) -> f64 {
        (current_value - self.baseline_value) / self.baseline_value * 100.0
    }

    /// Whether a change of this magnitude fires the alert. The boundary is
    /// inclusive: a move of exactly the threshold fires.
    pub fn breaches(&self, percent_change: f64) -> bool {
        percent_change.abs() >= self.threshold_percent
    }
}

/// What happens to an alert immediately after it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RearmPolicy {
    /// Reset the baseline to the value that fired and keep watching.
    #[default]
    Rearm,
    /// Deliver once, then delete the alert.
    FireOnce,
}

// === Alert tests ===

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn alert(baseline: f64, threshold: f64) -> Alert {
        Alert {
            user_id: UserId(1),
            token: TokenHolding::native(10.0),
            threshold_percent: threshold,
            baseline_value: baseline,
            destination: Destination(1),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_percent_change_signed() {
        let a = alert(100.0, 5.0);
        assert_eq!(a.percent_change(106.0), 6.0);
        assert_eq!(a.percent_change(95.0), -5.0);
        assert_eq!(a.percent_change(100.0), 0.0);
    }

    #[test]
    fn test_breaches_both_directions() {
        let a = alert(100.0, 5.0);
        assert!(a.breaches(6.0));
        assert!(a.breaches(-5.0));
        assert!(!a.breaches(4.0));
        assert!(!a.breaches(-4.99));
    }

    #[test]
    fn test_breaches_boundary_inclusive() {
        let a = alert(100.0, 5.0);
        assert!(a.breaches(5.0));
        assert!(a.breaches(-5.0));
    }

    #[test]
    fn test_key_pairs_user_and_token() {
        let a = alert(100.0, 5.0);
        let key = a.key();
        assert_eq!(key.user_id, UserId(1));
        assert_eq!(key.token_id, TokenId::native());
    }

    #[test]
    fn test_from_request() {
        let request = AlertRequest {
            user_id: UserId(42),
            token: TokenHolding::native(2.0),
            threshold_percent: 7.5,
            destination: Destination(42),
        };
        let a = Alert::from_request(&request, 300.0);
        assert_eq!(a.user_id, UserId(42));
        assert_eq!(a.baseline_value, 300.0);
        assert_eq!(a.threshold_percent, 7.5);
    }

    #[test]
    fn test_rearm_policy_default() {
        assert_eq!(RearmPolicy::default(), RearmPolicy::Rearm);
    }

    #[test]
    fn test_alert_serde_round_trip() {
        let a = alert(250.0, 10.0);
        let json = serde_json::to_string(&a).unwrap();
        let parsed: Alert = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, a);
    }
}
