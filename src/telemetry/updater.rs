//! Per-device telemetry workers.
//!
//! One task per device slot. A worker first discovers the device's
//! components (retrying until the device reports any), then polls status at
//! a fixed interval and forwards the parsed readouts to the control layer
//! over a channel. Workers never touch the control layer's state directly.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::PollSettings;
use crate::device::{DeviceHandle, DeviceSet};
use crate::error::{PanelError, Result};
use crate::protocol::{Readouts, parse_status};
use crate::telemetry::{ComponentRegistry, TelemetryEvent};

struct Worker {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl Worker {
    fn is_live(&self) -> bool {
        !self.token.is_cancelled() && !self.handle.is_finished()
    }
}

/// Starts and stops telemetry workers, one per device slot.
///
/// Must be used from within a tokio runtime.
pub struct TelemetryUpdater {
    devices: DeviceSet,
    settings: PollSettings,
    registry: Arc<ComponentRegistry>,
    events: UnboundedSender<TelemetryEvent>,
    workers: HashMap<usize, Worker>,
}

impl TelemetryUpdater {
    /// Create an updater and the receiving end of its event channel.
    pub fn new(
        devices: DeviceSet,
        settings: PollSettings,
    ) -> (Self, UnboundedReceiver<TelemetryEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let updater = Self {
            devices,
            settings,
            registry: Arc::new(ComponentRegistry::new()),
            events,
            workers: HashMap::new(),
        };
        (updater, rx)
    }

    pub fn devices(&self) -> &DeviceSet {
        &self.devices
    }

    /// Start polling `device`.
    ///
    /// No-op if a worker for that slot is already running. If a previous
    /// worker was stopped but has not exited yet, the new one waits for it
    /// before touching the device.
    pub fn start(&mut self, device: usize) -> Result<()> {
        let handle = self.devices.get(device)?;

        if self.workers.get(&device).is_some_and(Worker::is_live) {
            debug!(device, "Telemetry worker already running");
            return Ok(());
        }

        let previous = self.workers.remove(&device).map(|w| w.handle);
        let token = CancellationToken::new();
        let ctx = WorkerContext {
            index: device,
            device: handle,
            settings: self.settings.clone(),
            registry: Arc::clone(&self.registry),
            events: self.events.clone(),
            token: token.clone(),
        };

        let join = tokio::spawn(async move {
            if let Some(previous) = previous {
                if let Err(e) = previous.await {
                    warn!(device = ctx.index, error = %e, "Previous telemetry worker panicked");
                }
            }
            ctx.run().await;
        });

        self.workers.insert(device, Worker { token, handle: join });
        info!(device, "Telemetry worker started");
        Ok(())
    }

    /// Signal the worker for `device` to stop. Returns immediately; the
    /// worker emits [`TelemetryEvent::Stopped`] once it has exited.
    pub fn stop(&mut self, device: usize) {
        if let Some(worker) = self.workers.get(&device) {
            if !worker.token.is_cancelled() {
                worker.token.cancel();
                info!(device, "Telemetry worker stop requested");
            }
        }
    }

    pub fn stop_all(&mut self) {
        let slots: Vec<usize> = self.workers.keys().copied().collect();
        for device in slots {
            self.stop(device);
        }
    }

    pub fn is_running(&self, device: usize) -> bool {
        self.workers.get(&device).is_some_and(Worker::is_live)
    }

    /// Components seen so far on `device`.
    pub fn known_components(&self, device: usize) -> Vec<String> {
        self.registry.known(device)
    }

    pub fn is_discovering(&self, device: usize) -> bool {
        self.registry.is_discovering(device)
    }

    /// Stop every worker and wait for all of them to exit.
    pub async fn shutdown(mut self) {
        self.stop_all();
        for (device, worker) in self.workers.drain() {
            if let Err(e) = worker.handle.await {
                warn!(device, error = %e, "Telemetry worker panicked");
            }
        }
    }
}

impl Drop for TelemetryUpdater {
    fn drop(&mut self) {
        for worker in self.workers.values() {
            worker.token.cancel();
        }
    }
}

// =============================================================================
// Worker
// =============================================================================

struct WorkerContext {
    index: usize,
    device: Arc<dyn DeviceHandle>,
    settings: PollSettings,
    registry: Arc<ComponentRegistry>,
    events: UnboundedSender<TelemetryEvent>,
    token: CancellationToken,
}

impl WorkerContext {
    async fn run(self) {
        let completed = !self.registry.begin_discovery(self.index) || self.discover().await;
        if completed {
            while !self.token.is_cancelled() {
                self.poll_once().await;
                if !self.wait(self.settings.poll_interval()).await {
                    break;
                }
            }
        }

        info!(device = self.index, "Telemetry worker stopped");
        let _ = self.events.send(TelemetryEvent::Stopped { device: self.index });
    }

    /// Retry reads until the device reports at least one component.
    /// Returns `false` if cancelled first.
    async fn discover(&self) -> bool {
        debug!(device = self.index, "Discovering components");
        let found = loop {
            if self.token.is_cancelled() {
                break None;
            }
            match self.read().await {
                Ok(readouts) => break Some(readouts),
                Err(e) => debug!(device = self.index, error = %e, "Discovery read failed, retrying"),
            }
            if !self.wait(self.settings.discovery_interval()).await {
                break None;
            }
        };

        let completed = match found {
            Some(readouts) => {
                self.registry
                    .register(self.index, readouts.keys().map(String::as_str));
                info!(device = self.index, components = readouts.len(), "Components discovered");
                self.emit(TelemetryEvent::ComponentsDiscovered {
                    device: self.index,
                    readouts,
                });
                true
            }
            None => false,
        };
        self.registry.end_discovery(self.index);
        completed
    }

    async fn poll_once(&self) {
        let readouts = match self.read().await {
            Ok(readouts) => readouts,
            Err(e) => {
                debug!(device = self.index, error = %e, "Status read failed, skipping cycle");
                return;
            }
        };
        // Stopped while the read was in flight.
        if self.token.is_cancelled() {
            return;
        }

        let new = self
            .registry
            .register(self.index, readouts.keys().map(String::as_str));
        for name in new {
            if let Some(readout) = readouts.get(&name) {
                info!(device = self.index, component = %name, "New component connected");
                self.emit(TelemetryEvent::ComponentDiscovered {
                    device: self.index,
                    readout: readout.clone(),
                });
            }
        }

        self.emit(TelemetryEvent::ComponentsUpdated {
            device: self.index,
            readouts,
        });
    }

    /// One status read on the blocking pool. A report with no components
    /// counts as a failed read.
    async fn read(&self) -> Result<Readouts> {
        let device = Arc::clone(&self.device);
        let lines = tokio::task::spawn_blocking(move || device.get_status())
            .await
            .map_err(|e| e.to_string())
            .and_then(|r| r.map_err(|e| e.to_string()))
            .map_err(|message| PanelError::TransientReadFailure {
                device: self.index,
                message,
            })?;

        let readouts = parse_status(&lines);
        if readouts.is_empty() {
            return Err(PanelError::TransientReadFailure {
                device: self.index,
                message: "no components in status report".into(),
            });
        }
        Ok(readouts)
    }

    /// Sleep for `interval`. Returns `false` if cancelled meanwhile.
    async fn wait(&self, interval: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => false,
            _ = tokio::time::sleep(interval) => true,
        }
    }

    fn emit(&self, event: TelemetryEvent) {
        if self.events.send(event).is_err() {
            debug!(device = self.index, "Event receiver gone, stopping worker");
            self.token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::testing::{ScriptedDevice, fans};

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn fast() -> PollSettings {
        PollSettings::new(Duration::from_millis(10), Duration::from_millis(5))
    }

    fn device_set(devices: Vec<ScriptedDevice>) -> (DeviceSet, Vec<Arc<ScriptedDevice>>) {
        let handles: Vec<Arc<ScriptedDevice>> = devices.into_iter().map(Arc::new).collect();
        let set = DeviceSet::new(
            handles
                .iter()
                .map(|d| Arc::clone(d) as Arc<dyn DeviceHandle>)
                .collect(),
        );
        (set, handles)
    }

    async fn next_event(rx: &mut UnboundedReceiver<TelemetryEvent>) -> TelemetryEvent {
        tokio::time::timeout(TIMEOUT, rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("channel closed")
    }

    /// Skip events until one matches.
    async fn wait_for(
        rx: &mut UnboundedReceiver<TelemetryEvent>,
        pred: impl Fn(&TelemetryEvent) -> bool,
    ) -> TelemetryEvent {
        loop {
            let event = next_event(rx).await;
            if pred(&event) {
                return event;
            }
        }
    }

    #[tokio::test]
    async fn test_discovery_retries_then_reports_present_components() {
        let device = ScriptedDevice::new(
            "hub",
            vec![
                None,
                Some(fans(&[], &["Fan 1", "Fan 2"])),
                Some(fans(&["Fan 1"], &["Fan 2"])),
            ],
        );
        let (set, handles) = device_set(vec![device]);
        let (mut updater, mut rx) = TelemetryUpdater::new(set, fast());
        updater.start(0).unwrap();

        match next_event(&mut rx).await {
            TelemetryEvent::ComponentsDiscovered { device, readouts } => {
                assert_eq!(device, 0);
                assert_eq!(readouts.keys().collect::<Vec<_>>(), vec!["Fan 1"]);
            }
            other => panic!("expected discovery, got {:?}", other),
        }
        assert!(handles[0].reads() >= 3);
        assert!(matches!(
            next_event(&mut rx).await,
            TelemetryEvent::ComponentsUpdated { device: 0, .. }
        ));
        assert_eq!(updater.known_components(0), vec!["Fan 1"]);
        assert!(!updater.is_discovering(0));

        updater.shutdown().await;
    }

    #[tokio::test]
    async fn test_new_component_after_discovery() {
        let device = ScriptedDevice::new(
            "hub",
            vec![
                Some(fans(&["Fan 1"], &["Fan 2"])),
                Some(fans(&["Fan 1", "Fan 2"], &[])),
            ],
        );
        let (set, _) = device_set(vec![device]);
        let (mut updater, mut rx) = TelemetryUpdater::new(set, fast());
        updater.start(0).unwrap();

        assert!(matches!(
            next_event(&mut rx).await,
            TelemetryEvent::ComponentsDiscovered { .. }
        ));
        match next_event(&mut rx).await {
            TelemetryEvent::ComponentDiscovered { device, readout } => {
                assert_eq!(device, 0);
                assert_eq!(readout.component_name, "Fan 2");
            }
            other => panic!("expected new component, got {:?}", other),
        }
        match next_event(&mut rx).await {
            TelemetryEvent::ComponentsUpdated { readouts, .. } => assert_eq!(readouts.len(), 2),
            other => panic!("expected update, got {:?}", other),
        }

        // Known components do not re-announce.
        let event = next_event(&mut rx).await;
        assert!(matches!(event, TelemetryEvent::ComponentsUpdated { .. }));

        updater.shutdown().await;
    }

    #[tokio::test]
    async fn test_failed_poll_skips_cycle() {
        let device = ScriptedDevice::new(
            "hub",
            vec![
                Some(fans(&["Fan 1"], &[])),
                None,
                None,
                Some(fans(&["Fan 1"], &[])),
            ],
        );
        let (set, handles) = device_set(vec![device]);
        let (mut updater, mut rx) = TelemetryUpdater::new(set, fast());
        updater.start(0).unwrap();

        assert!(matches!(
            next_event(&mut rx).await,
            TelemetryEvent::ComponentsDiscovered { .. }
        ));
        assert!(matches!(
            next_event(&mut rx).await,
            TelemetryEvent::ComponentsUpdated { .. }
        ));
        assert!(handles[0].reads() >= 4);
        assert!(updater.is_running(0));

        updater.shutdown().await;
    }

    #[tokio::test]
    async fn test_stop_emits_stopped_once() {
        let device = ScriptedDevice::new("hub", vec![Some(fans(&["Fan 1"], &[]))]);
        let (set, _) = device_set(vec![device]);
        let (mut updater, mut rx) = TelemetryUpdater::new(set, fast());

        updater.start(0).unwrap();
        updater.start(0).unwrap();
        assert!(updater.is_running(0));
        wait_for(&mut rx, |e| matches!(e, TelemetryEvent::ComponentsDiscovered { .. })).await;

        updater.stop(0);
        assert!(!updater.is_running(0));
        wait_for(&mut rx, |e| matches!(e, TelemetryEvent::Stopped { device: 0 })).await;

        // Nothing else arrives once the single worker is gone.
        let extra = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(extra.is_err());

        updater.shutdown().await;
    }

    #[tokio::test]
    async fn test_stop_during_discovery() {
        let device = ScriptedDevice::new("hub", vec![Some(fans(&[], &["Fan 1"]))]);
        let (set, _) = device_set(vec![device]);
        let (mut updater, mut rx) = TelemetryUpdater::new(set, fast());
        updater.start(0).unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        updater.stop(0);

        assert_eq!(next_event(&mut rx).await, TelemetryEvent::Stopped { device: 0 });
        assert!(updater.known_components(0).is_empty());
        assert!(!updater.is_discovering(0));

        updater.shutdown().await;
    }

    #[tokio::test]
    async fn test_restart_skips_discovery() {
        let device = ScriptedDevice::new("hub", vec![Some(fans(&["Fan 1"], &[]))]);
        let (set, _) = device_set(vec![device]);
        let (mut updater, mut rx) = TelemetryUpdater::new(set, fast());

        updater.start(0).unwrap();
        wait_for(&mut rx, |e| matches!(e, TelemetryEvent::ComponentsDiscovered { .. })).await;

        updater.stop(0);
        updater.start(0).unwrap();
        assert!(updater.is_running(0));

        // The old worker finishes before the new one reports anything.
        wait_for(&mut rx, |e| matches!(e, TelemetryEvent::Stopped { .. })).await;
        assert!(matches!(
            next_event(&mut rx).await,
            TelemetryEvent::ComponentsUpdated { device: 0, .. }
        ));

        updater.shutdown().await;
    }

    #[tokio::test]
    async fn test_worker_cancelled_before_start_never_polls() {
        let device = ScriptedDevice::new("hub", vec![Some(fans(&["Fan 1"], &[]))]);
        let (set, handles) = device_set(vec![device]);
        let (mut updater, mut rx) = TelemetryUpdater::new(set, fast());

        updater.start(0).unwrap();
        wait_for(&mut rx, |e| matches!(e, TelemetryEvent::ComponentsDiscovered { .. })).await;

        updater.stop(0);
        updater.start(0).unwrap();
        updater.stop(0);

        // First worker winds down.
        wait_for(&mut rx, |e| matches!(e, TelemetryEvent::Stopped { .. })).await;
        let reads = handles[0].reads();

        // Second worker exits without touching the device.
        assert_eq!(next_event(&mut rx).await, TelemetryEvent::Stopped { device: 0 });
        let extra = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(extra.is_err());
        assert_eq!(handles[0].reads(), reads);

        updater.shutdown().await;
    }

    #[tokio::test]
    async fn test_switching_devices_keeps_registries_apart() {
        let first = ScriptedDevice::new("first", vec![Some(fans(&["Fan 1", "Fan 2"], &[]))]);
        let second = ScriptedDevice::new("second", vec![Some(fans(&["Pump 1"], &[]))]);
        let (set, _) = device_set(vec![first, second]);
        let (mut updater, mut rx) = TelemetryUpdater::new(set, fast());

        updater.start(0).unwrap();
        wait_for(&mut rx, |e| matches!(e, TelemetryEvent::ComponentsDiscovered { .. })).await;

        updater.stop(0);
        updater.start(1).unwrap();

        let event = wait_for(&mut rx, |e| {
            matches!(e, TelemetryEvent::ComponentsDiscovered { device: 1, .. })
        })
        .await;
        assert_eq!(event.device(), 1);

        assert_eq!(updater.known_components(0), vec!["Fan 1", "Fan 2"]);
        assert_eq!(updater.known_components(1), vec!["Pump 1"]);
        assert!(!updater.is_running(0));
        assert!(updater.is_running(1));

        updater.shutdown().await;
    }

    #[tokio::test]
    async fn test_start_unknown_device() {
        let (set, _) = device_set(vec![]);
        let (mut updater, _rx) = TelemetryUpdater::new(set, fast());
        assert!(matches!(updater.start(3), Err(PanelError::NoSuchDevice(3))));
        assert!(!updater.is_running(3));
    }
}
