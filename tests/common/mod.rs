//! Shared fixtures for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use ground_station::error::{AppResult, TelemetryError};
use ground_station::sources::TelemetrySource;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Source whose reads are fed from the test through a shared queue.
pub struct ScriptedSource {
    queue: Arc<Mutex<VecDeque<AppResult<Option<String>>>>>,
}

/// Test-side end of a [`ScriptedSource`].
#[derive(Clone)]
pub struct Feed {
    queue: Arc<Mutex<VecDeque<AppResult<Option<String>>>>>,
}

impl Feed {
    pub fn line(&self, line: impl Into<String>) {
        self.queue
            .lock()
            .unwrap()
            .push_back(Ok(Some(line.into())));
    }

    pub fn fail(&self, reason: &str) {
        self.queue
            .lock()
            .unwrap()
            .push_back(Err(TelemetryError::Connection(reason.to_string())));
    }
}

pub fn scripted() -> (Box<dyn TelemetrySource>, Feed) {
    let queue = Arc::new(Mutex::new(VecDeque::new()));
    (
        Box::new(ScriptedSource {
            queue: queue.clone(),
        }),
        Feed { queue },
    )
}

#[async_trait]
impl TelemetrySource for ScriptedSource {
    fn describe(&self) -> String {
        "scripted".to_string()
    }

    async fn start(&mut self) -> AppResult<()> {
        Ok(())
    }

    async fn read_line(&mut self) -> AppResult<Option<String>> {
        self.queue.lock().unwrap().pop_front().unwrap_or(Ok(None))
    }

    async fn stop(&mut self) {}
}
