use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::subscription::Subscription;

/// Latest position fix. Replaced wholesale on every reading; no history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
    /// Accuracy radius in metres.
    pub accuracy: f64,
}

impl LocationSample {
    pub fn now(latitude: f64, longitude: f64, accuracy: f64) -> Self {
        Self {
            latitude,
            longitude,
            timestamp: Utc::now(),
            accuracy,
        }
    }

    /// Short human label used when asking the guidance oracle.
    pub fn label(&self) -> String {
        format!("{:.5}, {:.5} (±{:.0} m)", self.latitude, self.longitude, self.accuracy)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LocationUpdate {
    Fix(LocationSample),
    Error(String),
}

/// Watch-style position source.
pub trait LocationSource: Send + Sync {
    fn subscribe(&self) -> Subscription<LocationUpdate>;
}

/// Replays a fixed sequence of updates, each after its delay.
#[derive(Debug, Clone, Default)]
pub struct ScriptedLocation {
    steps: Vec<(Duration, LocationUpdate)>,
}

impl ScriptedLocation {
    pub fn new(steps: Vec<(Duration, LocationUpdate)>) -> Self {
        Self { steps }
    }

    /// A single immediate fix.
    pub fn fixed(latitude: f64, longitude: f64, accuracy: f64) -> Self {
        Self::new(vec![(
            Duration::ZERO,
            LocationUpdate::Fix(LocationSample::now(latitude, longitude, accuracy)),
        )])
    }

    /// Reports a single error, as a denied or missing location API would.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::new(vec![(Duration::ZERO, LocationUpdate::Error(reason.into()))])
    }
}

impl LocationSource for ScriptedLocation {
    fn subscribe(&self) -> Subscription<LocationUpdate> {
        let steps = self.steps.clone();
        Subscription::spawn(|tx| async move {
            for (delay, update) in steps {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                let update = match update {
                    LocationUpdate::Fix(sample) => LocationUpdate::Fix(LocationSample {
                        timestamp: Utc::now(),
                        ..sample
                    }),
                    other => other,
                };
                if tx.send(update).is_err() {
                    return;
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixed_source_yields_one_fix() {
        let mut sub = ScriptedLocation::fixed(51.5, -0.12, 8.0).subscribe();
        match sub.next().await {
            Some(LocationUpdate::Fix(sample)) => {
                assert_eq!(sample.latitude, 51.5);
                assert_eq!(sample.accuracy, 8.0);
            }
            other => panic!("unexpected update: {other:?}"),
        }
        assert!(sub.next().await.is_none());
    }

    #[tokio::test]
    async fn unavailable_source_reports_error() {
        let mut sub = ScriptedLocation::unavailable("User denied Geolocation").subscribe();
        assert_eq!(
            sub.next().await,
            Some(LocationUpdate::Error("User denied Geolocation".into()))
        );
    }

    #[test]
    fn label_formats_coordinates() {
        let s = LocationSample::now(40.7128, -74.006, 12.4);
        assert_eq!(s.label(), "40.71280, -74.00600 (±12 m)");
    }
}
