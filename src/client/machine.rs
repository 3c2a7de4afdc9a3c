/// Client reconciliation state machine (no I/O)
///
/// Inputs describe what happened; the returned commands describe the I/O the
/// driver must perform. Every piece of async work carries a token, and results
/// whose token is no longer current are dropped, so a late answer for a
/// previous selection can never touch the view.
use crate::relay::RelayEvent;
use crate::types::{DeviceId, PositionSnapshot};
use chrono::{DateTime, Utc};
use std::time::Duration;

use super::state::{ClientViewState, MergeOutcome, Notice};

pub type Token = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    BaselineLoading,
    BaselineReady,
    BaselineFailed,
    StreamConnecting,
    StreamLive,
    StreamErrorTransient,
    ReconnectPending,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Select(DeviceId),
    ClearSelection,
    Refresh,
    /// `Ok(None)`: the device answered without coordinates
    BaselineLoaded {
        token: Token,
        result: Result<Option<PositionSnapshot>, String>,
    },
    StreamConnecting {
        token: Token,
    },
    StreamOpened {
        token: Token,
    },
    StreamEvent {
        token: Token,
        event: RelayEvent,
    },
    TransportFailed {
        token: Token,
        reason: String,
    },
    ReconnectDue {
        token: Token,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CloseStream,
    CancelReconnect,
    CancelFetches,
    FetchBaseline { device_id: DeviceId, token: Token },
    OpenStream { device_id: DeviceId, token: Token },
    ScheduleReconnect { token: Token, delay: Duration },
}

/// Observable state, published by the driver after every input
#[derive(Debug, Clone, PartialEq)]
pub struct ViewSnapshot {
    pub device_id: Option<DeviceId>,
    pub phase: Phase,
    pub displayed: Option<PositionSnapshot>,
    pub notice: Option<Notice>,
    pub last_update_at: Option<DateTime<Utc>>,
}

impl Default for ViewSnapshot {
    fn default() -> Self {
        Self {
            device_id: None,
            phase: Phase::Idle,
            displayed: None,
            notice: None,
            last_update_at: None,
        }
    }
}

pub struct ReconcilerMachine {
    phase: Phase,
    selection: Option<DeviceId>,
    view: ClientViewState,
    notice: Option<Notice>,
    last_update_at: Option<DateTime<Utc>>,
    reconnect_delay: Duration,
    next_token: Token,
    baseline_token: Option<Token>,
    refresh_token: Option<Token>,
    stream_token: Option<Token>,
    reconnect_token: Option<Token>,
    discarded_events: u64,
}

impl ReconcilerMachine {
    pub fn new(reconnect_delay: Duration) -> Self {
        Self {
            phase: Phase::Idle,
            selection: None,
            view: ClientViewState::default(),
            notice: None,
            last_update_at: None,
            reconnect_delay,
            next_token: 1,
            baseline_token: None,
            refresh_token: None,
            stream_token: None,
            reconnect_token: None,
            discarded_events: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn selection(&self) -> Option<&DeviceId> {
        self.selection.as_ref()
    }

    pub fn view(&self) -> &ClientViewState {
        &self.view
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Stream events dropped for carrying a stale token or another device's tag
    pub fn discarded_events(&self) -> u64 {
        self.discarded_events
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot {
            device_id: self.selection.clone(),
            phase: self.phase,
            displayed: self.view.displayed().cloned(),
            notice: self.notice.clone(),
            last_update_at: self.last_update_at,
        }
    }

    pub fn handle(&mut self, input: Input) -> Vec<Command> {
        match input {
            Input::Select(device_id) => self.select(device_id),
            Input::ClearSelection => self.clear(),
            Input::Refresh => self.refresh(),
            Input::BaselineLoaded { token, result } => self.baseline_loaded(token, result),
            Input::StreamConnecting { token } => {
                if self.stream_token == Some(token) {
                    self.phase = Phase::StreamConnecting;
                }
                Vec::new()
            }
            Input::StreamOpened { token } => {
                if self.stream_token == Some(token) {
                    self.phase = Phase::StreamLive;
                    if self.notice == Some(Notice::ConnectionLost) {
                        self.notice = None;
                    }
                }
                Vec::new()
            }
            Input::StreamEvent { token, event } => {
                self.stream_event(token, event);
                Vec::new()
            }
            Input::TransportFailed { token, .. } => self.transport_failed(token),
            Input::ReconnectDue { token } => self.reconnect_due(token),
        }
    }

    fn issue_token(&mut self) -> Token {
        let token = self.next_token;
        self.next_token += 1;
        token
    }

    /// Cancel timer, stream and fetches of the current selection
    fn cancel_pending_work(&mut self) -> Vec<Command> {
        let mut commands = Vec::new();
        if self.reconnect_token.take().is_some() {
            commands.push(Command::CancelReconnect);
        }
        if self.stream_token.take().is_some() {
            commands.push(Command::CloseStream);
        }
        let had_baseline = self.baseline_token.take().is_some();
        let had_refresh = self.refresh_token.take().is_some();
        if had_baseline || had_refresh {
            commands.push(Command::CancelFetches);
        }
        commands
    }

    fn select(&mut self, device_id: DeviceId) -> Vec<Command> {
        let mut commands = self.cancel_pending_work();

        self.view.clear();
        self.notice = None;
        self.last_update_at = None;
        self.selection = Some(device_id.clone());

        let token = self.issue_token();
        self.baseline_token = Some(token);
        self.phase = Phase::BaselineLoading;
        commands.push(Command::FetchBaseline { device_id, token });
        commands
    }

    fn clear(&mut self) -> Vec<Command> {
        let commands = self.cancel_pending_work();
        self.selection = None;
        self.view.clear();
        self.notice = None;
        self.last_update_at = None;
        self.phase = Phase::Idle;
        commands
    }

    fn refresh(&mut self) -> Vec<Command> {
        let device_id = match &self.selection {
            Some(id) => id.clone(),
            None => return Vec::new(),
        };
        if self.baseline_token.is_some() || self.refresh_token.is_some() {
            return Vec::new();
        }

        let token = self.issue_token();
        self.refresh_token = Some(token);
        vec![Command::FetchBaseline { device_id, token }]
    }

    fn baseline_loaded(
        &mut self,
        token: Token,
        result: Result<Option<PositionSnapshot>, String>,
    ) -> Vec<Command> {
        if self.refresh_token == Some(token) {
            self.refresh_token = None;
            match result {
                Ok(Some(snapshot)) => {
                    self.view.apply_baseline(snapshot);
                    if matches!(self.notice, Some(Notice::LoadFailed(_))) {
                        self.notice = None;
                    }
                }
                Ok(None) => {}
                Err(reason) => self.notice = Some(Notice::LoadFailed(reason)),
            }
            return Vec::new();
        }

        if self.baseline_token != Some(token) {
            return Vec::new();
        }
        self.baseline_token = None;

        let device_id = match &self.selection {
            Some(id) => id.clone(),
            None => return Vec::new(),
        };

        match result {
            Ok(Some(snapshot)) => {
                self.view.apply_baseline(snapshot);
                self.phase = Phase::BaselineReady;
            }
            Ok(None) => {
                self.notice = Some(Notice::NoLocation);
                self.phase = Phase::BaselineReady;
            }
            Err(reason) => {
                self.view.clear();
                self.notice = Some(Notice::LoadFailed(reason));
                self.phase = Phase::BaselineFailed;
            }
        }

        // The live stream opens whether or not the baseline succeeded
        let stream = self.issue_token();
        self.stream_token = Some(stream);
        vec![Command::OpenStream {
            device_id,
            token: stream,
        }]
    }

    fn stream_event(&mut self, token: Token, event: RelayEvent) {
        let device_id = match &self.selection {
            Some(id) if self.stream_token == Some(token) && event.belongs_to(id) => id.clone(),
            _ => {
                self.discarded_events += 1;
                return;
            }
        };

        match self.view.merge_event(device_id.as_str(), &event) {
            MergeOutcome::Connected => {
                self.phase = Phase::StreamLive;
                if matches!(
                    self.notice,
                    Some(Notice::ConnectionLost) | Some(Notice::LiveUpdatesUnavailable(_))
                ) {
                    self.notice = None;
                }
            }
            MergeOutcome::Applied => {
                self.phase = Phase::StreamLive;
                self.notice = None;
                if let RelayEvent::Update { timestamp, .. } = &event {
                    self.last_update_at = Some(*timestamp);
                }
            }
            MergeOutcome::NoLocation => {
                self.phase = Phase::StreamLive;
                self.notice = Some(Notice::NoLocation);
            }
            MergeOutcome::LiveError(message) => {
                self.phase = Phase::StreamErrorTransient;
                self.notice = Some(Notice::LiveUpdatesUnavailable(message));
            }
        }
    }

    fn transport_failed(&mut self, token: Token) -> Vec<Command> {
        if self.stream_token != Some(token) {
            return Vec::new();
        }
        self.stream_token = None;

        // At most one pending reconnect per selection
        if self.reconnect_token.is_some() {
            return Vec::new();
        }

        let reconnect = self.issue_token();
        self.reconnect_token = Some(reconnect);
        self.phase = Phase::ReconnectPending;
        self.notice = Some(Notice::ConnectionLost);
        vec![Command::ScheduleReconnect {
            token: reconnect,
            delay: self.reconnect_delay,
        }]
    }

    fn reconnect_due(&mut self, token: Token) -> Vec<Command> {
        if self.reconnect_token != Some(token) {
            return Vec::new();
        }
        self.reconnect_token = None;

        let device_id = match &self.selection {
            Some(id) => id.clone(),
            None => return Vec::new(),
        };

        let stream = self.issue_token();
        self.stream_token = Some(stream);
        vec![Command::OpenStream {
            device_id,
            token: stream,
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const DELAY: Duration = Duration::from_secs(5);

    fn id(raw: &str) -> DeviceId {
        DeviceId::parse(raw).unwrap()
    }

    fn snapshot(lat: f64, timestamp: &str) -> PositionSnapshot {
        let payload = json!({ "lat": lat, "lng": 77.6, "timestamp": timestamp });
        PositionSnapshot::from_payload("bus-1", &payload).unwrap()
    }

    fn fetch_token(commands: &[Command]) -> Token {
        commands
            .iter()
            .find_map(|c| match c {
                Command::FetchBaseline { token, .. } => Some(*token),
                _ => None,
            })
            .unwrap()
    }

    fn open_token(commands: &[Command]) -> Token {
        commands
            .iter()
            .find_map(|c| match c {
                Command::OpenStream { token, .. } => Some(*token),
                _ => None,
            })
            .unwrap()
    }

    /// Selected `bus-1`, baseline at T0 loaded, stream live; returns the stream token
    fn live_machine() -> (ReconcilerMachine, Token) {
        let mut machine = ReconcilerMachine::new(DELAY);
        let commands = machine.handle(Input::Select(id("bus-1")));
        let commands = machine.handle(Input::BaselineLoaded {
            token: fetch_token(&commands),
            result: Ok(Some(snapshot(1.0, "2024-05-01T10:00:00Z"))),
        });
        let stream = open_token(&commands);
        machine.handle(Input::StreamConnecting { token: stream });
        machine.handle(Input::StreamOpened { token: stream });
        machine.handle(Input::StreamEvent {
            token: stream,
            event: RelayEvent::connection(&id("bus-1")),
        });
        (machine, stream)
    }

    #[test]
    fn test_selection_lifecycle() {
        let mut machine = ReconcilerMachine::new(DELAY);
        assert_eq!(machine.phase(), Phase::Idle);

        let commands = machine.handle(Input::Select(id("bus-1")));
        assert_eq!(
            commands,
            vec![Command::FetchBaseline {
                device_id: id("bus-1"),
                token: 1,
            }]
        );
        assert_eq!(machine.phase(), Phase::BaselineLoading);

        let commands = machine.handle(Input::BaselineLoaded {
            token: 1,
            result: Ok(Some(snapshot(1.0, "2024-05-01T10:00:00Z"))),
        });
        assert_eq!(machine.phase(), Phase::BaselineReady);
        assert_eq!(
            commands,
            vec![Command::OpenStream {
                device_id: id("bus-1"),
                token: 2,
            }]
        );

        machine.handle(Input::StreamConnecting { token: 2 });
        assert_eq!(machine.phase(), Phase::StreamConnecting);
        machine.handle(Input::StreamEvent {
            token: 2,
            event: RelayEvent::connection(&id("bus-1")),
        });
        assert_eq!(machine.phase(), Phase::StreamLive);
        assert_eq!(machine.snapshot().displayed.unwrap().latitude, 1.0);
    }

    #[test]
    fn test_failed_baseline_still_opens_stream() {
        let mut machine = ReconcilerMachine::new(DELAY);
        let commands = machine.handle(Input::Select(id("bus-1")));
        let commands = machine.handle(Input::BaselineLoaded {
            token: fetch_token(&commands),
            result: Err("HTTP 500".to_string()),
        });

        assert_eq!(machine.phase(), Phase::BaselineFailed);
        assert_eq!(
            machine.notice(),
            Some(&Notice::LoadFailed("HTTP 500".to_string()))
        );
        assert!(machine.view().displayed().is_none());
        assert!(matches!(commands[..], [Command::OpenStream { .. }]));
    }

    #[test]
    fn test_update_then_stale_refresh() {
        let (mut machine, stream) = live_machine();
        let update = RelayEvent::update(
            &id("bus-1"),
            json!({ "lat": 2.0, "lng": 77.6, "timestamp": "2024-05-01T10:00:05Z" }),
        );
        machine.handle(Input::StreamEvent {
            token: stream,
            event: update,
        });
        assert_eq!(machine.view().displayed().unwrap().latitude, 2.0);
        assert!(machine.snapshot().last_update_at.is_some());

        let commands = machine.handle(Input::Refresh);
        assert_eq!(commands.len(), 1);
        // A second refresh while one is in flight is coalesced
        assert!(machine.handle(Input::Refresh).is_empty());

        machine.handle(Input::BaselineLoaded {
            token: fetch_token(&commands),
            result: Ok(Some(snapshot(1.0, "2024-05-01T10:00:00Z"))),
        });
        assert_eq!(machine.view().displayed().unwrap().latitude, 2.0);
        assert_eq!(machine.phase(), Phase::StreamLive);
    }

    #[test]
    fn test_in_band_error_keeps_overlay() {
        let (mut machine, stream) = live_machine();
        machine.handle(Input::StreamEvent {
            token: stream,
            event: RelayEvent::update(&id("bus-1"), json!({ "lat": 2.0, "lng": 77.6 })),
        });
        machine.handle(Input::StreamEvent {
            token: stream,
            event: RelayEvent::error(&id("bus-1"), "HTTP 500 from /data"),
        });

        assert_eq!(machine.phase(), Phase::StreamErrorTransient);
        assert_eq!(
            machine.notice().unwrap().to_string(),
            "Live updates temporarily unavailable"
        );
        assert_eq!(machine.view().displayed().unwrap().latitude, 2.0);

        machine.handle(Input::StreamEvent {
            token: stream,
            event: RelayEvent::update(&id("bus-1"), json!({ "lat": 3.0, "lng": 77.6 })),
        });
        assert_eq!(machine.phase(), Phase::StreamLive);
        assert!(machine.notice().is_none());
    }

    #[test]
    fn test_single_pending_reconnect() {
        let (mut machine, stream) = live_machine();

        let commands = machine.handle(Input::TransportFailed {
            token: stream,
            reason: "eof".to_string(),
        });
        assert!(matches!(
            commands[..],
            [Command::ScheduleReconnect { delay: DELAY, .. }]
        ));
        assert_eq!(machine.phase(), Phase::ReconnectPending);
        assert_eq!(machine.notice(), Some(&Notice::ConnectionLost));
        // Overlay and baseline survive a transport failure
        assert_eq!(machine.view().displayed().unwrap().latitude, 1.0);

        // Repeated error callbacks for the dead stream do not stack timers
        let repeated = machine.handle(Input::TransportFailed {
            token: stream,
            reason: "eof".to_string(),
        });
        assert!(repeated.is_empty());

        let reconnect = match commands[0] {
            Command::ScheduleReconnect { token, .. } => token,
            _ => unreachable!(),
        };
        let commands = machine.handle(Input::ReconnectDue { token: reconnect });
        assert!(matches!(
            &commands[..],
            [Command::OpenStream { device_id, .. }] if device_id.as_str() == "bus-1"
        ));
        // Timer already consumed
        assert!(machine
            .handle(Input::ReconnectDue { token: reconnect })
            .is_empty());
    }

    #[test]
    fn test_switch_cancels_reconnect_and_discards_old_events() {
        let (mut machine, stream) = live_machine();
        let commands = machine.handle(Input::TransportFailed {
            token: stream,
            reason: "eof".to_string(),
        });
        let reconnect = match commands[0] {
            Command::ScheduleReconnect { token, .. } => token,
            _ => unreachable!(),
        };

        let commands = machine.handle(Input::Select(id("bus-2")));
        assert_eq!(commands[0], Command::CancelReconnect);
        assert!(matches!(commands[1], Command::FetchBaseline { .. }));
        assert!(machine.view().displayed().is_none());
        assert_eq!(machine.phase(), Phase::BaselineLoading);

        // Timer fired anyway (raced the cancel): ignored
        assert!(machine
            .handle(Input::ReconnectDue { token: reconnect })
            .is_empty());

        // Late event from the old stream: ignored
        machine.handle(Input::StreamEvent {
            token: stream,
            event: RelayEvent::update(&id("bus-1"), json!({ "lat": 9.0, "lng": 9.0 })),
        });
        assert!(machine.view().displayed().is_none());
        assert_eq!(machine.discarded_events(), 1);
    }

    #[test]
    fn test_switch_closes_stream_and_rejects_foreign_events() {
        let (mut machine, old_stream) = live_machine();

        let commands = machine.handle(Input::Select(id("bus-2")));
        assert_eq!(commands[0], Command::CloseStream);
        let commands = machine.handle(Input::BaselineLoaded {
            token: fetch_token(&commands),
            result: Ok(None),
        });
        let stream = open_token(&commands);
        assert_ne!(stream, old_stream);
        assert_eq!(machine.notice(), Some(&Notice::NoLocation));

        // Right token, wrong device tag
        machine.handle(Input::StreamEvent {
            token: stream,
            event: RelayEvent::update(&id("bus-1"), json!({ "lat": 9.0, "lng": 9.0 })),
        });
        assert!(machine.view().displayed().is_none());

        machine.handle(Input::StreamEvent {
            token: stream,
            event: RelayEvent::update(&id("bus-2"), json!({ "lat": 4.0, "lng": 5.0 })),
        });
        assert_eq!(machine.view().displayed().unwrap().device_id, "bus-2");
        assert_eq!(machine.discarded_events(), 1);
    }

    #[test]
    fn test_late_baseline_for_previous_selection() {
        let mut machine = ReconcilerMachine::new(DELAY);
        let first = machine.handle(Input::Select(id("bus-1")));
        let second = machine.handle(Input::Select(id("bus-2")));
        assert_eq!(second[0], Command::CancelFetches);

        assert!(machine
            .handle(Input::BaselineLoaded {
                token: fetch_token(&first),
                result: Ok(Some(snapshot(1.0, "2024-05-01T10:00:00Z"))),
            })
            .is_empty());
        assert!(machine.view().displayed().is_none());
        assert_eq!(machine.phase(), Phase::BaselineLoading);
    }

    #[test]
    fn test_clear_cancels_everything() {
        let (mut machine, stream) = live_machine();
        machine.handle(Input::TransportFailed {
            token: stream,
            reason: "eof".to_string(),
        });
        machine.handle(Input::Refresh);

        let commands = machine.handle(Input::ClearSelection);
        assert_eq!(
            commands,
            vec![Command::CancelReconnect, Command::CancelFetches]
        );
        assert_eq!(machine.phase(), Phase::Idle);
        assert_eq!(machine.snapshot(), ViewSnapshot::default());
        assert!(machine.handle(Input::Refresh).is_empty());
    }
}
