//! Nearby responder directory.
//!
//! There is no real dispatch routing behind this: the directory hands back a
//! fixed roster, with an extra community tier when location broadcast is on.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponderKind {
    Police,
    Ambulance,
    Citizen,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Responder {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ResponderKind,
    pub name: String,
    /// Metres from the user.
    pub distance: u32,
    /// Degrees clockwise from north.
    pub bearing: u16,
    /// Minutes.
    pub eta: u32,
}

impl Responder {
    pub fn new(
        id: &str,
        kind: ResponderKind,
        name: &str,
        distance: u32,
        bearing: u16,
        eta: u32,
    ) -> Self {
        Self {
            id: id.to_string(),
            kind,
            name: name.to_string(),
            distance,
            bearing,
            eta,
        }
    }
}

/// Result of a dispatch request.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    pub responders: Vec<Responder>,
    /// Number of nearby users that received the exact coordinates, when the
    /// community tier was engaged.
    pub broadcast_fanout: Option<u32>,
}

pub trait ResponderDirectory: Send + Sync {
    /// Must be a pure function of `community`.
    fn dispatch(&self, community: bool) -> Dispatch;
}

/// Fixed two-tier roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticDirectory {
    pub baseline: Vec<Responder>,
    pub community: Vec<Responder>,
    pub broadcast_fanout: u32,
}

impl Default for StaticDirectory {
    fn default() -> Self {
        Self {
            baseline: vec![
                Responder::new("p1", ResponderKind::Police, "Unit 402", 800, 45, 3),
                Responder::new("c1", ResponderKind::Citizen, "Guardian-Res", 150, 180, 1),
            ],
            community: vec![Responder::new(
                "c2",
                ResponderKind::Citizen,
                "Volunteer #88",
                400,
                300,
                2,
            )],
            broadcast_fanout: 12,
        }
    }
}

impl ResponderDirectory for StaticDirectory {
    fn dispatch(&self, community: bool) -> Dispatch {
        let mut responders = self.baseline.clone();
        let broadcast_fanout = if community {
            responders.extend(self.community.iter().cloned());
            Some(self.broadcast_fanout)
        } else {
            None
        };
        Dispatch {
            responders,
            broadcast_fanout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_only_without_community() {
        let d = StaticDirectory::default().dispatch(false);
        assert_eq!(d.responders.len(), 2);
        assert_eq!(d.responders[0].kind, ResponderKind::Police);
        assert_eq!(d.responders[1].kind, ResponderKind::Citizen);
        assert!(d.broadcast_fanout.is_none());
    }

    #[test]
    fn community_adds_volunteer_and_fanout() {
        let d = StaticDirectory::default().dispatch(true);
        assert_eq!(d.responders.len(), 3);
        assert_eq!(d.responders[2].name, "Volunteer #88");
        assert_eq!(d.broadcast_fanout, Some(12));
    }

    #[test]
    fn dispatch_is_deterministic() {
        let dir = StaticDirectory::default();
        assert_eq!(dir.dispatch(true), dir.dispatch(true));
    }

    #[test]
    fn responder_kind_serializes_as_type() {
        let r = Responder::new("a1", ResponderKind::Ambulance, "Medic 7", 1200, 90, 5);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["type"], "ambulance");
    }
}
