use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use gateway::{notification_channel, BackendGateway, ExecuteOptions, NotificationSender};
use shared::{
    error::GatewayError,
    protocol::{KeyPayload, Notification, ResultValue},
};

use crate::dispatcher::CommandDispatcher;
use crate::recorder::CommandRecorder;

mod interpreter_tests;

/// Backend double: answers each command path with a scripted value, records
/// everything sent, and optionally fails selected paths.
pub struct ScriptedGateway {
    responses: Mutex<HashMap<String, ResultValue>>,
    failing: Mutex<HashSet<String>>,
    delays: Mutex<HashMap<String, u64>>,
    sent: Mutex<Vec<(String, bool)>>,
    key_handled: Mutex<bool>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            delays: Mutex::new(HashMap::new()),
            sent: Mutex::new(Vec::new()),
            key_handled: Mutex::new(false),
        }
    }

    pub fn respond(&self, path: &str, value: ResultValue) {
        self.responses
            .lock()
            .unwrap()
            .insert(path.to_string(), value);
    }

    pub fn fail_on(&self, path: &str) {
        self.failing.lock().unwrap().insert(path.to_string());
    }

    /// Stalls every command to this path, keeping it in flight for the
    /// given duration before it answers.
    pub fn delay_on(&self, path: &str, millis: u64) {
        self.delays.lock().unwrap().insert(path.to_string(), millis);
    }

    pub fn set_key_handled(&self, handled: bool) {
        *self.key_handled.lock().unwrap() = handled;
    }

    /// Full command texts, in send order.
    pub fn sent(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(text, _)| text.clone())
            .collect()
    }

    /// Command paths only (text up to the first space).
    pub fn sent_paths(&self) -> Vec<String> {
        self.sent()
            .iter()
            .map(|text| text.split(' ').next().unwrap_or(text).to_string())
            .collect()
    }

    pub fn count_path(&self, path: &str) -> usize {
        self.sent_paths().iter().filter(|p| *p == path).count()
    }
}

#[async_trait]
impl BackendGateway for ScriptedGateway {
    async fn execute(
        &self,
        command: &str,
        options: ExecuteOptions,
    ) -> Result<ResultValue, GatewayError> {
        self.sent
            .lock()
            .unwrap()
            .push((command.to_string(), options.render));
        let path = command.split(' ').next().unwrap_or(command);
        let delay = self.delays.lock().unwrap().get(path).copied();
        if let Some(millis) = delay {
            tokio::time::sleep(std::time::Duration::from_millis(millis)).await;
        }
        if self.failing.lock().unwrap().contains(path) {
            return Err(GatewayError::Transport("scripted failure".to_string()));
        }
        Ok(self
            .responses
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .unwrap_or(ResultValue::Null))
    }

    fn key_press_probe(&self, _payload: &KeyPayload) -> Result<bool, GatewayError> {
        Ok(*self.key_handled.lock().unwrap())
    }
}

pub struct Harness {
    pub gateway: Arc<ScriptedGateway>,
    pub dispatcher: Arc<CommandDispatcher>,
    pub notifications: crossbeam_channel::Receiver<Notification>,
}

pub fn harness() -> Harness {
    let gateway = Arc::new(ScriptedGateway::new());
    let (tx, rx): (NotificationSender, _) = notification_channel(64);
    let dispatcher = Arc::new(CommandDispatcher::new(
        gateway.clone(),
        tx,
        Arc::new(CommandRecorder::default()),
    ));
    Harness {
        gateway,
        dispatcher,
        notifications: rx,
    }
}

impl Harness {
    pub fn drained_notifications(&self) -> Vec<Notification> {
        self.notifications.try_iter().collect()
    }
}

/// Polls a condition until it holds, failing the test after 2 seconds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    panic!("condition not reached within 2s");
}
