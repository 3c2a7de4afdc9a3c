/// What the client shows for the selected device
use crate::relay::RelayEvent;
use crate::types::PositionSnapshot;
use std::fmt;

/// Baseline from a one-shot fetch plus the latest pushed update
///
/// The displayed position is `live_overlay` when present, else `baseline`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientViewState {
    baseline: Option<PositionSnapshot>,
    live_overlay: Option<PositionSnapshot>,
}

/// Result of merging one stream event
#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    Connected,
    Applied,
    /// Update without usable coordinates; previous view kept
    NoLocation,
    /// In-band error; previous view kept
    LiveError(String),
}

impl ClientViewState {
    pub fn displayed(&self) -> Option<&PositionSnapshot> {
        self.live_overlay.as_ref().or(self.baseline.as_ref())
    }

    pub fn baseline(&self) -> Option<&PositionSnapshot> {
        self.baseline.as_ref()
    }

    pub fn live_overlay(&self) -> Option<&PositionSnapshot> {
        self.live_overlay.as_ref()
    }

    pub fn clear(&mut self) {
        self.baseline = None;
        self.live_overlay = None;
    }

    /// Install a fetched baseline unless it is older than what we already have
    ///
    /// A baseline newer than the overlay retires the overlay.
    pub fn apply_baseline(&mut self, snapshot: PositionSnapshot) -> bool {
        if let Some(current) = &self.baseline {
            if snapshot.is_older_than(current) {
                return false;
            }
        }
        if let Some(overlay) = &self.live_overlay {
            if overlay.is_older_than(&snapshot) {
                self.live_overlay = None;
            }
        }
        self.baseline = Some(snapshot);
        true
    }

    /// Install a pushed update as overlay and republish it as baseline
    pub fn apply_live(&mut self, snapshot: PositionSnapshot) {
        self.baseline = Some(snapshot.clone());
        self.live_overlay = Some(snapshot);
    }

    /// Merge one relay event for `device_id`
    pub fn merge_event(&mut self, device_id: &str, event: &RelayEvent) -> MergeOutcome {
        match event {
            RelayEvent::Connection { .. } => MergeOutcome::Connected,
            RelayEvent::Update { data, .. } => {
                let Some(snapshot) = PositionSnapshot::from_payload(device_id, data) else {
                    return MergeOutcome::NoLocation;
                };
                self.apply_live(snapshot);
                MergeOutcome::Applied
            }
            RelayEvent::Error { message, .. } => MergeOutcome::LiveError(message.clone()),
        }
    }
}

/// User-facing status line
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    LoadFailed(String),
    LiveUpdatesUnavailable(String),
    ConnectionLost,
    NoLocation,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::LoadFailed(_) => write!(f, "Failed to load bus location"),
            Notice::LiveUpdatesUnavailable(_) => write!(f, "Live updates temporarily unavailable"),
            Notice::ConnectionLost => write!(f, "Connection lost. Retrying..."),
            Notice::NoLocation => write!(f, "No location data available"),
        }
    }
}
