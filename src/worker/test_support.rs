//! Scripted execution contexts for unit tests

use crate::config::RuntimeKind;
use crate::worker::context::{ContextFactory, ExecutionContext, Navigation};
use crate::{HarvestError, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use url::Url;

/// Shared script and counters for every context a factory hands out
#[derive(Default)]
pub struct Script {
    statuses: Mutex<VecDeque<u16>>,
    pub navigations: AtomicUsize,
    pub resets: AtomicUsize,
    pub closes: AtomicUsize,
    pub creates: AtomicUsize,
    pub fail_create_after: Mutex<Option<usize>>,
}

impl Script {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Statuses returned by successive navigations; 200 once exhausted
    pub fn with_statuses(statuses: &[u16]) -> Arc<Self> {
        let script = Self::default();
        script.statuses.lock().unwrap().extend(statuses);
        Arc::new(script)
    }

    pub fn navigations(&self) -> usize {
        self.navigations.load(Ordering::SeqCst)
    }

    pub fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }

    fn next_status(&self) -> u16 {
        self.statuses.lock().unwrap().pop_front().unwrap_or(200)
    }
}

pub struct ScriptedContext {
    worker_id: String,
    script: Arc<Script>,
    closed: AtomicBool,
}

#[async_trait]
impl ExecutionContext for ScriptedContext {
    fn kind(&self) -> RuntimeKind {
        RuntimeKind::Http
    }

    async fn navigate(&self, url: &Url) -> Result<Navigation> {
        if self.is_closed() {
            return Err(HarvestError::ContextClosed {
                worker: self.worker_id.clone(),
            });
        }
        self.script.navigations.fetch_add(1, Ordering::SeqCst);
        let status = self.script.next_status();
        Ok(Navigation {
            status,
            final_url: url.to_string(),
            content: format!("<html><body>{} {}</body></html>", url, status),
        })
    }

    async fn reset(&self) -> Result<()> {
        self.script.resets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn set_identity(&self, _identity: &str) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.script.closes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

pub struct ScriptedFactory {
    pub script: Arc<Script>,
}

impl ScriptedFactory {
    pub fn new(script: Arc<Script>) -> Arc<Self> {
        Arc::new(Self { script })
    }
}

#[async_trait]
impl ContextFactory for ScriptedFactory {
    fn kind(&self) -> RuntimeKind {
        RuntimeKind::Http
    }

    async fn create(&self, worker_id: &str, _identity: &str) -> Result<Box<dyn ExecutionContext>> {
        let created = self.script.creates.fetch_add(1, Ordering::SeqCst);
        if let Some(limit) = *self.script.fail_create_after.lock().unwrap() {
            if created >= limit {
                return Err(HarvestError::Browser("tab failed to open".to_string()));
            }
        }
        Ok(Box::new(ScriptedContext {
            worker_id: worker_id.to_string(),
            script: self.script.clone(),
            closed: AtomicBool::new(false),
        }))
    }
}
