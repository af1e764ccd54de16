//! Display sinks for probe results
//!
//! A sink receives a probe's terminal record and renders it as
//! pretty-printed JSON (2-space indentation), replacing whatever the target
//! held before. The serialized text is the artifact the surrounding test
//! harness inspects.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Sink errors
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Where probe records land
pub trait RenderSink {
    fn render(&mut self, record: &Value) -> Result<(), SinkError>;
}

impl<S: RenderSink + ?Sized> RenderSink for &mut S {
    fn render(&mut self, record: &Value) -> Result<(), SinkError> {
        (**self).render(record)
    }
}

/// In-memory page: named containers holding rendered text
#[derive(Debug, Default)]
pub struct Page {
    containers: HashMap<String, String>,
}

impl Page {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Mutex<Page>> {
        Arc::new(Mutex::new(Page::new()))
    }

    /// Rendered text of a container, if anything has been rendered into it.
    pub fn text(&self, container_id: &str) -> Option<&str> {
        self.containers.get(container_id).map(|s| s.as_str())
    }
}

/// Renders into one named container of a shared page, clearing its prior
/// content on every render.
pub struct ContainerSink {
    page: Arc<Mutex<Page>>,
    container_id: String,
}

impl ContainerSink {
    pub fn new(page: Arc<Mutex<Page>>, container_id: impl Into<String>) -> Self {
        Self {
            page,
            container_id: container_id.into(),
        }
    }
}

impl RenderSink for ContainerSink {
    fn render(&mut self, record: &Value) -> Result<(), SinkError> {
        let text = serde_json::to_string_pretty(record)?;
        let mut page = self.page.lock().unwrap();
        page.containers.insert(self.container_id.clone(), text);
        Ok(())
    }
}

/// Prints records to stdout
pub struct StdoutSink {
    pub compact: bool,
}

impl RenderSink for StdoutSink {
    fn render(&mut self, record: &Value) -> Result<(), SinkError> {
        let text = if self.compact {
            serde_json::to_string(record)?
        } else {
            serde_json::to_string_pretty(record)?
        };
        println!("{}", text);
        Ok(())
    }
}

/// Captures rendered records in memory; used by harnesses and tests
#[derive(Debug, Default)]
pub struct MemorySink {
    pub records: Vec<Value>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RenderSink for MemorySink {
    fn render(&mut self, record: &Value) -> Result<(), SinkError> {
        self.records.push(record.clone());
        Ok(())
    }
}

/// Wrapper that forwards the first render and drops the rest. Probes use
/// this to guarantee at most one terminal emission per instance.
pub struct EmitOnce<S: RenderSink> {
    inner: S,
    fired: bool,
}

impl<S: RenderSink> EmitOnce<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            fired: false,
        }
    }

    pub fn fired(&self) -> bool {
        self.fired
    }
}

impl<S: RenderSink> RenderSink for EmitOnce<S> {
    fn render(&mut self, record: &Value) -> Result<(), SinkError> {
        if self.fired {
            tracing::debug!("suppressing render after terminal emission");
            return Ok(());
        }
        self.fired = true;
        self.inner.render(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_container_sink_clears_prior_content() {
        let page = Page::shared();
        let mut sink = ContainerSink::new(page.clone(), "browser-container");
        sink.render(&json!({"first": 1})).unwrap();
        sink.render(&json!({"second": 2})).unwrap();

        let page = page.lock().unwrap();
        let text = page.text("browser-container").unwrap();
        assert!(text.contains("\"second\": 2"));
        assert!(!text.contains("first"));
        assert!(page.text("web-rtc-container").is_none());
    }

    #[test]
    fn test_pretty_output_uses_two_space_indent() {
        let page = Page::shared();
        let mut sink = ContainerSink::new(page.clone(), "c");
        sink.render(&json!({"a": {"b": 1}})).unwrap();
        let page = page.lock().unwrap();
        let text = page.text("c").unwrap();
        assert!(text.starts_with("{\n  \"a\""));
    }

    #[test]
    fn test_emit_once_drops_later_renders() {
        let mut inner = MemorySink::new();
        {
            let mut once = EmitOnce::new(&mut inner);
            once.render(&json!({"n": 1})).unwrap();
            once.render(&json!({"n": 2})).unwrap();
            assert!(once.fired());
        }
        assert_eq!(inner.records.len(), 1);
        assert_eq!(inner.records[0], json!({"n": 1}));
    }
}
