/// The JSON-encoded payload carried by activity-log rows (§3 "ActivityLog
/// row ... carries opaque `event` bytes (JSON-encoded)"). Deliberately
/// names only *what changed*, not the new state itself: both the direct
/// post-mutation broadcast and the activity-log replay path rebuild the
/// broadcast payload from the current catalog, which is what makes replay
/// naturally idempotent (§4.2) -- a redelivered event just re-asserts
/// whatever the catalog currently says, rather than replaying a possibly
/// stale snapshot.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ActivityEvent {
    AccountChanged { account_id: models::Id },
    LabelLinksChanged,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let event = ActivityEvent::AccountChanged {
            account_id: models::Id::generate(),
        };
        let encoded = serde_json::to_vec(&event).unwrap();
        let decoded: ActivityEvent = serde_json::from_slice(&encoded).unwrap();
        assert_eq!(decoded, event);
    }
}
