//! Scripted device double for tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::device::{DeviceHandle, DeviceInfo};
use crate::error::{PanelError, Result};
use crate::protocol::{StatusLine, StatusValue};

/// Device that replays queued status reports.
///
/// `None` entries fail the read. Once the queue is drained the last report
/// handed out repeats.
pub struct ScriptedDevice {
    info: DeviceInfo,
    script: Mutex<VecDeque<Option<Vec<StatusLine>>>>,
    last: Mutex<Vec<StatusLine>>,
    reads: AtomicUsize,
    fail_connect: bool,
    lifecycle: Mutex<Vec<&'static str>>,
    pub duties: Mutex<Vec<(String, u8)>>,
}

impl ScriptedDevice {
    pub fn new(name: &str, script: Vec<Option<Vec<StatusLine>>>) -> Self {
        Self {
            info: DeviceInfo::new(name, 0xffff, 0x0001),
            script: Mutex::new(script.into()),
            last: Mutex::new(Vec::new()),
            reads: AtomicUsize::new(0),
            fail_connect: false,
            lifecycle: Mutex::new(Vec::new()),
            duties: Mutex::new(Vec::new()),
        }
    }

    /// Make `connect` fail.
    pub fn failing_connect(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Lifecycle calls received so far, in order.
    pub fn lifecycle(&self) -> Vec<&'static str> {
        self.lifecycle.lock().unwrap().clone()
    }

    fn record(&self, call: &'static str) {
        self.lifecycle.lock().unwrap().push(call);
    }
}

impl DeviceHandle for ScriptedDevice {
    fn info(&self) -> DeviceInfo {
        self.info.clone()
    }

    fn connect(&self) -> Result<()> {
        self.record("connect");
        if self.fail_connect {
            return Err(PanelError::InvalidInput("scripted connect failure".into()));
        }
        Ok(())
    }

    fn initialize(&self) -> Result<()> {
        self.record("initialize");
        Ok(())
    }

    fn disconnect(&self) -> Result<()> {
        self.record("disconnect");
        Ok(())
    }

    fn get_status(&self) -> Result<Vec<StatusLine>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Some(lines)) => {
                *self.last.lock().unwrap() = lines.clone();
                Ok(lines)
            }
            Some(None) => Err(PanelError::InvalidInput("scripted read failure".into())),
            None => Ok(self.last.lock().unwrap().clone()),
        }
    }

    fn set_fixed_duty(&self, channel: &str, percent: u8) -> Result<()> {
        self.duties
            .lock()
            .unwrap()
            .push((channel.to_string(), percent));
        Ok(())
    }
}

/// Status lines for populated fans by name plus absent slots.
pub fn fans(present: &[&str], absent: &[&str]) -> Vec<StatusLine> {
    let mut lines = Vec::new();
    for name in present {
        lines.push(StatusLine::new(name, "DC", ""));
        lines.push(StatusLine::new(&format!("{} current", name), 0.05, "A"));
        lines.push(StatusLine::new(&format!("{} speed", name), 900_i64, "rpm"));
        lines.push(StatusLine::new(&format!("{} voltage", name), 12.0, "V"));
    }
    for name in absent {
        lines.push(StatusLine::new(name, StatusValue::Absent, ""));
    }
    lines
}
