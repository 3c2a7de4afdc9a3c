/// Tokio driver for [`ReconcilerMachine`]
///
/// Owns the I/O the machine asks for: baseline fetch tasks, the stream pump
/// and the reconnect timer. Every task is aborted when the machine cancels it
/// or when the reconciler is dropped.
use crate::errors::TrackerError;
use crate::logger::{self, LogTag};
use crate::types::DeviceId;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::machine::{Command, Input, ReconcilerMachine, Token, ViewSnapshot};
use super::transport::{fetch_baseline_snapshot, RelayTransport};

/// Handle to a running reconciliation loop
pub struct LiveReconciler {
    inputs: mpsc::UnboundedSender<Input>,
    view: watch::Receiver<ViewSnapshot>,
    task: JoinHandle<()>,
}

impl LiveReconciler {
    /// Start the driver task; must be called inside a tokio runtime
    pub fn spawn(transport: Arc<dyn RelayTransport>, reconnect_delay: Duration) -> Self {
        let (inputs_tx, inputs_rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(ViewSnapshot::default());

        let driver = Driver {
            machine: ReconcilerMachine::new(reconnect_delay),
            transport,
            inputs: inputs_tx.clone(),
            stream_task: None,
            reconnect_task: None,
            fetch_tasks: Vec::new(),
        };
        let task = tokio::spawn(driver.run(inputs_rx, view_tx));

        Self {
            inputs: inputs_tx,
            view: view_rx,
            task,
        }
    }

    /// Follow `device_id`, replacing any previous selection
    pub fn select(&self, device_id: &str) -> Result<(), TrackerError> {
        let device_id = DeviceId::parse(device_id)?;
        self.send(Input::Select(device_id))
    }

    /// Drop the selection and cancel all pending work
    pub fn clear(&self) -> Result<(), TrackerError> {
        self.send(Input::ClearSelection)
    }

    /// Re-fetch the baseline of the current selection
    pub fn refresh(&self) -> Result<(), TrackerError> {
        self.send(Input::Refresh)
    }

    pub fn view(&self) -> ViewSnapshot {
        self.view.borrow().clone()
    }

    /// Receiver notified on every visible change
    pub fn watch(&self) -> watch::Receiver<ViewSnapshot> {
        self.view.clone()
    }

    pub fn shutdown(&self) {
        self.task.abort();
    }

    fn send(&self, input: Input) -> Result<(), TrackerError> {
        self.inputs
            .send(input)
            .map_err(|_| TrackerError::TransportClosed("reconciler stopped".to_string()))
    }
}

impl Drop for LiveReconciler {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct Driver {
    machine: ReconcilerMachine,
    transport: Arc<dyn RelayTransport>,
    inputs: mpsc::UnboundedSender<Input>,
    stream_task: Option<JoinHandle<()>>,
    reconnect_task: Option<JoinHandle<()>>,
    fetch_tasks: Vec<JoinHandle<()>>,
}

impl Driver {
    async fn run(
        mut self,
        mut inputs: mpsc::UnboundedReceiver<Input>,
        view: watch::Sender<ViewSnapshot>,
    ) {
        while let Some(input) = inputs.recv().await {
            if let Input::Select(device_id) = &input {
                logger::info(LogTag::Client, &format!("Following {}", device_id));
            }

            for command in self.machine.handle(input) {
                self.execute(command);
            }

            let snapshot = self.machine.snapshot();
            view.send_if_modified(|current| {
                if *current == snapshot {
                    false
                } else {
                    *current = snapshot;
                    true
                }
            });
        }
    }

    fn execute(&mut self, command: Command) {
        logger::debug(LogTag::Client, &format!("Executing {:?}", command));

        match command {
            Command::CloseStream => {
                if let Some(task) = self.stream_task.take() {
                    task.abort();
                }
            }
            Command::CancelReconnect => {
                if let Some(task) = self.reconnect_task.take() {
                    task.abort();
                }
            }
            Command::CancelFetches => {
                for task in self.fetch_tasks.drain(..) {
                    task.abort();
                }
            }
            Command::FetchBaseline { device_id, token } => {
                self.fetch_tasks.retain(|task| !task.is_finished());

                let transport = Arc::clone(&self.transport);
                let inputs = self.inputs.clone();
                self.fetch_tasks.push(tokio::spawn(async move {
                    let result = fetch_baseline_snapshot(transport.as_ref(), &device_id)
                        .await
                        .map_err(|e| {
                            logger::warning(
                                LogTag::Client,
                                &format!("Baseline fetch failed for {}: {}", device_id, e),
                            );
                            e.to_string()
                        });
                    let _ = inputs.send(Input::BaselineLoaded { token, result });
                }));
            }
            Command::OpenStream { device_id, token } => {
                if let Some(task) = self.stream_task.take() {
                    task.abort();
                }
                let _ = self.inputs.send(Input::StreamConnecting { token });
                self.stream_task = Some(tokio::spawn(pump_stream(
                    Arc::clone(&self.transport),
                    self.inputs.clone(),
                    device_id,
                    token,
                )));
            }
            Command::ScheduleReconnect { token, delay } => {
                if let Some(task) = self.reconnect_task.take() {
                    task.abort();
                }
                let inputs = self.inputs.clone();
                self.reconnect_task = Some(tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = inputs.send(Input::ReconnectDue { token });
                }));
            }
        }
    }
}

impl Drop for Driver {
    fn drop(&mut self) {
        if let Some(task) = self.stream_task.take() {
            task.abort();
        }
        if let Some(task) = self.reconnect_task.take() {
            task.abort();
        }
        for task in self.fetch_tasks.drain(..) {
            task.abort();
        }
    }
}

/// Forward one stream connection into the machine until it fails
async fn pump_stream(
    transport: Arc<dyn RelayTransport>,
    inputs: mpsc::UnboundedSender<Input>,
    device_id: DeviceId,
    token: Token,
) {
    let mut events = match transport.open_stream(&device_id).await {
        Ok(events) => events,
        Err(e) => {
            logger::warning(
                LogTag::Client,
                &format!("Live stream for {} failed to open: {}", device_id, e),
            );
            let _ = inputs.send(Input::TransportFailed {
                token,
                reason: e.to_string(),
            });
            return;
        }
    };

    if inputs.send(Input::StreamOpened { token }).is_err() {
        return;
    }

    while let Some(item) = events.next().await {
        match item {
            Ok(event) => {
                if inputs.send(Input::StreamEvent { token, event }).is_err() {
                    return;
                }
            }
            Err(e) => {
                logger::warning(
                    LogTag::Client,
                    &format!("Live stream for {} lost: {}", device_id, e),
                );
                let _ = inputs.send(Input::TransportFailed {
                    token,
                    reason: e.to_string(),
                });
                return;
            }
        }
    }

    let _ = inputs.send(Input::TransportFailed {
        token,
        reason: "stream ended".to_string(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::machine::Phase;
    use crate::client::state::Notice;
    use crate::client::transport::EventStream;
    use crate::errors::ApiError;
    use crate::relay::RelayEvent;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::{json, Value};
    use tokio::time::{timeout, Instant};

    const DELAY: Duration = Duration::from_secs(5);

    type EventSender = futures::channel::mpsc::UnboundedSender<Result<RelayEvent, TrackerError>>;

    /// Hands every opened stream's sending half to the test
    struct FakeTransport {
        opened: Mutex<Vec<String>>,
        streams: mpsc::UnboundedSender<(DeviceId, EventSender)>,
    }

    impl FakeTransport {
        fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<(DeviceId, EventSender)>) {
            let (streams, rx) = mpsc::unbounded_channel();
            let transport = Arc::new(Self {
                opened: Mutex::new(Vec::new()),
                streams,
            });
            (transport, rx)
        }

        fn opened(&self) -> Vec<String> {
            self.opened.lock().clone()
        }
    }

    #[async_trait]
    impl RelayTransport for FakeTransport {
        async fn fetch_baseline(&self, device_id: &DeviceId) -> Result<Value, TrackerError> {
            if device_id.as_str() == "broken" {
                return Err(ApiError::HttpStatus {
                    endpoint: "/proxy/data".to_string(),
                    status: 500,
                }
                .into());
            }
            Ok(json!({ "lat": 1.0, "lng": 2.0, "timestamp": "2024-05-01T10:00:00Z" }))
        }

        async fn open_stream(&self, device_id: &DeviceId) -> Result<EventStream, TrackerError> {
            self.opened.lock().push(device_id.to_string());
            let (tx, rx) = futures::channel::mpsc::unbounded();
            let _ = self.streams.send((device_id.clone(), tx));
            Ok(Box::pin(rx))
        }
    }

    fn id(raw: &str) -> DeviceId {
        DeviceId::parse(raw).unwrap()
    }

    async fn wait_for(
        view: &mut watch::Receiver<ViewSnapshot>,
        predicate: impl Fn(&ViewSnapshot) -> bool,
    ) -> ViewSnapshot {
        timeout(Duration::from_secs(60), async {
            loop {
                {
                    let current = view.borrow_and_update();
                    if predicate(&current) {
                        return current.clone();
                    }
                }
                view.changed().await.unwrap();
            }
        })
        .await
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_updates_reach_view() {
        let (transport, mut streams) = FakeTransport::new();
        let reconciler = LiveReconciler::spawn(transport, DELAY);
        let mut view = reconciler.watch();

        reconciler.select("bus-1").unwrap();
        let (device_id, tx) = streams.recv().await.unwrap();
        let ready = wait_for(&mut view, |v| v.displayed.is_some()).await;
        assert_eq!(ready.displayed.unwrap().latitude, 1.0);

        tx.unbounded_send(Ok(RelayEvent::connection(&device_id)))
            .unwrap();
        tx.unbounded_send(Ok(RelayEvent::update(
            &device_id,
            json!({ "lat": 3.0, "lng": 4.0, "timestamp": "2024-05-01T10:00:05Z" }),
        )))
        .unwrap();
        let live = wait_for(&mut view, |v| {
            v.displayed.as_ref().map(|p| p.latitude) == Some(3.0)
        })
        .await;
        assert_eq!(live.phase, Phase::StreamLive);
        assert!(live.last_update_at.is_some());

        tx.unbounded_send(Ok(RelayEvent::error(&device_id, "HTTP 500 from /data")))
            .unwrap();
        let degraded = wait_for(&mut view, |v| v.phase == Phase::StreamErrorTransient).await;
        assert!(matches!(degraded.notice, Some(Notice::LiveUpdatesUnavailable(_))));
        assert_eq!(degraded.displayed.unwrap().latitude, 3.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnects_once_after_delay() {
        let (transport, mut streams) = FakeTransport::new();
        let reconciler = LiveReconciler::spawn(transport.clone(), DELAY);
        let mut view = reconciler.watch();

        reconciler.select("bus-1").unwrap();
        let (_, tx) = streams.recv().await.unwrap();
        tx.unbounded_send(Ok(RelayEvent::connection(&id("bus-1"))))
            .unwrap();
        wait_for(&mut view, |v| v.phase == Phase::StreamLive).await;

        let died_at = Instant::now();
        drop(tx);
        let pending = wait_for(&mut view, |v| v.phase == Phase::ReconnectPending).await;
        assert_eq!(pending.notice, Some(Notice::ConnectionLost));
        assert!(pending.displayed.is_some());

        assert!(timeout(DELAY - Duration::from_millis(100), streams.recv())
            .await
            .is_err());
        let (reopened, _tx) = streams.recv().await.unwrap();
        assert_eq!(reopened, id("bus-1"));
        assert_eq!(died_at.elapsed(), DELAY);

        assert!(timeout(DELAY * 3, streams.recv()).await.is_err());
        assert_eq!(transport.opened(), vec!["bus-1", "bus-1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_switch_cancels_pending_reconnect() {
        let (transport, mut streams) = FakeTransport::new();
        let reconciler = LiveReconciler::spawn(transport.clone(), DELAY);
        let mut view = reconciler.watch();

        reconciler.select("bus-1").unwrap();
        let (_, tx) = streams.recv().await.unwrap();
        drop(tx);
        wait_for(&mut view, |v| v.phase == Phase::ReconnectPending).await;

        tokio::time::sleep(Duration::from_secs(2)).await;
        reconciler.select("bus-2").unwrap();
        let (next, _tx) = streams.recv().await.unwrap();
        assert_eq!(next, id("bus-2"));

        // Past the original T+5s: bus-1 is never reopened
        assert!(timeout(DELAY * 2, streams.recv()).await.is_err());
        assert_eq!(transport.opened(), vec!["bus-1", "bus-2"]);
        assert_eq!(reconciler.view().device_id, Some(id("bus-2")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_baseline_still_streams() {
        let (transport, mut streams) = FakeTransport::new();
        let reconciler = LiveReconciler::spawn(transport, DELAY);
        let mut view = reconciler.watch();

        reconciler.select("broken").unwrap();
        let (device_id, _tx) = streams.recv().await.unwrap();
        assert_eq!(device_id, id("broken"));

        let failed = wait_for(&mut view, |v| v.notice.is_some()).await;
        assert_eq!(
            failed.notice.unwrap().to_string(),
            "Failed to load bus location"
        );
        assert!(failed.displayed.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_closes_stream() {
        let (transport, mut streams) = FakeTransport::new();
        let reconciler = LiveReconciler::spawn(transport, DELAY);
        let mut view = reconciler.watch();

        assert!(reconciler.select("   ").is_err());
        reconciler.select("bus-1").unwrap();
        let (_, tx) = streams.recv().await.unwrap();
        wait_for(&mut view, |v| v.phase == Phase::StreamLive).await;

        reconciler.clear().unwrap();
        wait_for(&mut view, |v| v.phase == Phase::Idle).await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(tx.is_closed());
        assert_eq!(reconciler.view(), ViewSnapshot::default());
    }
}
