//! End-to-end tests of the presence loop
//!
//! A `ProximityClient` runs over a `ScriptedSensor` and an
//! `InstrumentedStore` wrapping one connection to a `Scenario` store, so
//! every test sees real publishes, real auto-remove and real snapshots.

use std::time::Duration;

/// Poll `condition` every 5ms until it holds or `timeout` elapses
pub async fn wait_until<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use ohhey_core::{GeoCoord, GeoPosition, OhHeyError, StoredPresence, Timestamp, UserId};
    use ohhey_geo::{haversine_distance, is_within_range, SCENE_UNITS_PER_METER};
    use ohhey_presence::PresenceConnection;
    use ohhey_runtime::{ClientConfig, ProximityClient};
    use ohhey_tracker::SensorError;

    use super::*;
    use crate::{InstrumentedStore, Scenario, ScriptedSensor};

    type Sensor = Arc<ScriptedSensor>;
    type Store = Arc<InstrumentedStore<PresenceConnection>>;
    type Client = ProximityClient<Sensor, Store>;

    const SETTLE: Duration = Duration::from_secs(2);
    const ANCHOR: GeoCoord = GeoCoord {
        latitude: 37.0,
        longitude: -122.0,
    };

    fn client_with(scenario: &Scenario, config: ClientConfig) -> (Client, Sensor, Store) {
        let sensor = Arc::new(ScriptedSensor::new());
        let store = Arc::new(InstrumentedStore::new(scenario.connect()));
        let client = ProximityClient::new(&config, Arc::clone(&sensor), Arc::clone(&store));
        (client, sensor, store)
    }

    fn client(scenario: &Scenario) -> (Client, Sensor, Store) {
        client_with(scenario, ClientConfig::new(UserId::new("local")))
    }

    fn ids(client: &Client) -> Vec<String> {
        client
            .nearby()
            .iter()
            .map(|user| user.user_id.as_str().to_string())
            .collect()
    }

    /// Two peers: userA about 5.56m north, userB about 111m north
    async fn two_peers() -> Scenario {
        let mut scenario = Scenario::new(ANCHOR);
        scenario
            .place_at("userA", GeoCoord::new(37.00005, -122.0))
            .await
            .unwrap();
        scenario
            .place_at("userB", GeoCoord::new(37.001, -122.0))
            .await
            .unwrap();
        scenario
    }

    #[tokio::test]
    async fn test_start_delivers_nearby_set() {
        let scenario = two_peers().await;
        let (client, sensor, _store) = client(&scenario);

        let delivered: Arc<Mutex<Vec<Vec<UserId>>>> = Arc::default();
        let sink = Arc::clone(&delivered);
        client.subscribe(move |nearby| {
            sink.lock()
                .push(nearby.iter().map(|u| u.user_id.clone()).collect());
        });

        sensor.queue_fix(GeoPosition::at(37.0, -122.0));
        let position = client.start().await.unwrap();
        assert_eq!(position.latitude, 37.0);
        assert!(client.is_tracking());

        let nearby = client.nearby();
        assert_eq!(nearby.len(), 1);
        assert_eq!(nearby[0].user_id, UserId::new("userA"));
        assert!((nearby[0].distance - 5.56).abs() < 0.01);

        assert_eq!(*delivered.lock(), vec![vec![UserId::new("userA")]]);
        assert!(scenario.store().get(&UserId::new("local")).is_some());
    }

    #[tokio::test]
    async fn test_movement_changes_nearby_set() {
        let scenario = two_peers().await;
        let (client, sensor, _store) = client(&scenario);

        sensor.queue_fix(GeoPosition::at(37.0, -122.0));
        client.start().await.unwrap();
        assert_eq!(ids(&client), vec!["userA"]);

        assert_eq!(sensor.push_fix(GeoPosition::at(37.001, -122.00001)), 1);
        assert!(wait_until(SETTLE, || ids(&client) == vec!["userB"]).await);
        assert_eq!(client.stats().fixes, 2);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent_and_final() {
        let scenario = two_peers().await;
        let (client, sensor, store) = client(&scenario);

        sensor.queue_fix(GeoPosition::at(37.0, -122.0));
        client.start().await.unwrap();
        sensor.push_fix(GeoPosition::at(37.0, -122.00001));
        assert!(wait_until(SETTLE, || client.stats().publishes == 2).await);

        client.shutdown();
        client.shutdown();
        assert!(!client.is_tracking());
        assert_eq!(sensor.active_watches(), 0);
        assert_eq!(sensor.cleared_count(), 1);

        assert_eq!(sensor.push_fix(GeoPosition::at(37.001, -122.0)), 0);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(client.stats().publishes, 2);
        assert_eq!(store.calls().sets, 2);
    }

    #[tokio::test]
    async fn test_tracking_restarts_after_sensor_ends_watch() {
        let scenario = two_peers().await;
        let (client, sensor, store) = client(&scenario);

        sensor.queue_fix(GeoPosition::at(37.0, -122.0));
        client.start().await.unwrap();

        assert_eq!(sensor.end_all_watches(), 1);
        assert!(wait_until(SETTLE, || !client.is_tracking()).await);

        client.tracker().start_continuous_tracking().unwrap();
        assert!(client.is_tracking());
        assert_eq!(sensor.active_watches(), 1);

        assert_eq!(sensor.push_fix(GeoPosition::at(37.001, -122.0)), 1);
        assert!(wait_until(SETTLE, || ids(&client) == vec!["userB"]).await);
        assert_eq!(store.calls().sets, 2);
    }

    #[tokio::test]
    async fn test_dropping_client_releases_watch() {
        let scenario = two_peers().await;
        let (client, sensor, _store) = client(&scenario);

        sensor.queue_fix(GeoPosition::at(37.0, -122.0));
        client.start().await.unwrap();
        assert_eq!(sensor.active_watches(), 1);

        drop(client);
        assert_eq!(sensor.active_watches(), 0);
        assert_eq!(sensor.cleared_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_snapshot_keeps_previous_set() {
        let scenario = two_peers().await;
        let (client, sensor, store) = client(&scenario);

        sensor.queue_fix(GeoPosition::at(37.0, -122.0));
        client.start().await.unwrap();
        assert_eq!(ids(&client), vec!["userA"]);

        store.fail_reads(true);
        sensor.push_fix(GeoPosition::at(37.001, -122.0));
        assert!(wait_until(SETTLE, || client.resolver().stats().failed_fetches == 1).await);
        assert_eq!(ids(&client), vec!["userA"]);

        store.fail_reads(false);
        sensor.push_fix(GeoPosition::at(37.001, -122.0));
        assert!(wait_until(SETTLE, || ids(&client) == vec!["userB"]).await);
        assert_eq!(client.resolver().stats().cycles, 2);
    }

    #[tokio::test]
    async fn test_write_failure_skips_cycle() {
        let scenario = two_peers().await;
        let (client, sensor, store) = client(&scenario);

        store.fail_writes(true);
        sensor.queue_fix(GeoPosition::at(37.0, -122.0));
        client.start().await.unwrap();

        assert_eq!(client.stats().publishes, 0);
        assert_eq!(client.resolver().stats().cycles, 0);
        assert!(client.nearby().is_empty());

        store.fail_writes(false);
        client.tracker().publish().await.unwrap();
        assert_eq!(ids(&client), vec!["userA"]);
    }

    #[tokio::test]
    async fn test_peer_disconnect_removes_them() {
        let mut scenario = two_peers().await;
        let (client, sensor, _store) = client(&scenario);

        sensor.queue_fix(GeoPosition::at(37.0, -122.0));
        client.start().await.unwrap();
        assert_eq!(ids(&client), vec!["userA"]);

        assert!(scenario.disconnect("userA"));
        sensor.push_fix(GeoPosition::at(37.0, -122.0));
        assert!(wait_until(SETTLE, || client.nearby().is_empty()).await);
    }

    #[tokio::test]
    async fn test_own_record_removed_on_client_disconnect() {
        let scenario = two_peers().await;
        let (client, sensor, store) = client(&scenario);

        sensor.queue_fix(GeoPosition::at(37.0, -122.0));
        client.start().await.unwrap();
        assert_eq!(store.calls().registrations, 1);

        client.shutdown();
        store.inner().disconnect();
        assert!(scenario.store().get(&UserId::new("local")).is_none());
        assert_eq!(scenario.store().len(), 2);
    }

    #[tokio::test]
    async fn test_watch_error_does_not_end_tracking() {
        let scenario = two_peers().await;
        let (client, sensor, _store) = client(&scenario);

        sensor.queue_fix(GeoPosition::at(37.0, -122.0));
        client.start().await.unwrap();

        sensor.push_error(SensorError::Timeout);
        assert!(wait_until(SETTLE, || client.stats().watch_errors == 1).await);
        assert!(client.is_tracking());

        sensor.push_fix(GeoPosition::at(37.001, -122.0));
        assert!(wait_until(SETTLE, || ids(&client) == vec!["userB"]).await);
    }

    #[tokio::test]
    async fn test_duplicate_entries_resolve_to_latest() {
        let scenario = two_peers().await;
        let (client, sensor, store) = client(&scenario);

        // A racing writer has moved userB next to us and userA away
        let near = GeoPosition::at(37.00002, -122.0);
        let far = GeoPosition::at(37.01, -122.0);
        store.append_to_reads(vec![
            (
                UserId::new("userB"),
                StoredPresence::from_position(&near, Timestamp::now()),
            ),
            (
                UserId::new("userA"),
                StoredPresence::from_position(&far, Timestamp::now()),
            ),
        ]);

        sensor.queue_fix(GeoPosition::at(37.0, -122.0));
        client.start().await.unwrap();

        assert_eq!(ids(&client), vec!["userB"]);
    }

    #[tokio::test]
    async fn test_malformed_record_is_skipped() {
        let scenario = two_peers().await;
        scenario.put_malformed("broken");
        let (client, sensor, _store) = client(&scenario);

        sensor.queue_fix(GeoPosition::at(37.0, -122.0));
        client.start().await.unwrap();

        assert_eq!(ids(&client), vec!["userA"]);
        assert_eq!(client.resolver().stats().skipped_records, 1);
    }

    #[tokio::test]
    async fn test_crowd_matches_brute_force() {
        let mut scenario = Scenario::new(ANCHOR);
        let crowd = scenario.crowd(300, 25.0, 42).await.unwrap();
        let (client, sensor, _store) = client(&scenario);

        let expected = crowd
            .iter()
            .filter(|(_, coord)| is_within_range(haversine_distance(ANCHOR, *coord)))
            .count();

        sensor.queue_fix(GeoPosition::at(ANCHOR.latitude, ANCHOR.longitude));
        client.start().await.unwrap();

        let nearby = client.nearby();
        assert_eq!(nearby.len(), expected);
        assert!(nearby.iter().all(|u| u.distance <= 15.0));
        assert!(nearby.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[tokio::test]
    async fn test_reconcile_places_nearby_users() {
        let scenario = two_peers().await;
        let (client, sensor, _store) = client(&scenario);
        let mut roster = client.new_roster();

        assert!(client.reconcile(&mut roster).is_none());

        sensor.queue_fix(GeoPosition::at(37.0, -122.0));
        client.start().await.unwrap();

        let diff = client.reconcile(&mut roster).unwrap();
        assert_eq!(diff.added.len(), 1);
        let (user, offset) = &diff.added[0];
        assert_eq!(*user, UserId::new("userA"));
        assert_eq!(offset.x, 0.0);
        assert!((offset.z - 5.56 * SCENE_UNITS_PER_METER).abs() < 0.01);

        assert!(client.reconcile(&mut roster).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_start_without_capability() {
        let scenario = two_peers().await;
        let sensor = Arc::new(ScriptedSensor::unavailable());
        let store = Arc::new(InstrumentedStore::new(scenario.connect()));
        let client = ProximityClient::new(
            &ClientConfig::new(UserId::new("local")),
            Arc::clone(&sensor),
            Arc::clone(&store),
        );

        assert_eq!(client.start().await, Err(OhHeyError::PositionUnavailable));
        assert!(!client.is_tracking());
        assert_eq!(store.calls().sets, 0);
    }

    #[tokio::test]
    async fn test_start_denied() {
        let scenario = two_peers().await;
        let (client, sensor, store) = client(&scenario);

        sensor.queue_error(SensorError::Denied);
        assert_eq!(client.start().await, Err(OhHeyError::PositionDenied));
        assert!(!client.is_tracking());
        assert_eq!(store.calls().sets, 0);
        assert_eq!(sensor.active_watches(), 0);
    }

    #[tokio::test]
    async fn test_start_times_out() {
        let scenario = two_peers().await;
        let mut config = ClientConfig::new(UserId::new("local"));
        config.tracking.timeout = Duration::from_millis(20);
        let (client, sensor, _store) = client_with(&scenario, config);

        assert_eq!(client.start().await, Err(OhHeyError::PositionTimeout));
        assert_eq!(
            sensor.last_options().map(|o| o.timeout),
            Some(Duration::from_millis(20))
        );
        assert!(client.tracker().current_position().is_none());
    }

    #[tokio::test]
    async fn test_wait_until_gives_up() {
        assert!(!wait_until(Duration::from_millis(20), || false).await);
        assert!(wait_until(Duration::from_millis(20), || true).await);
    }
}
