//! Client facade
//!
//! [`Langfuse`] turns traces and observations into ingestion records and
//! owns the background flush loop of the batching engine it drives.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::{Result, Error};
use crate::id::{IdGenerator, UuidGenerator};
use crate::manager::{BatchEventManager, EventManager, EventManagerExt};
use crate::metrics::MetricsCollector;
use crate::observation::{Event, Generation, Score, Span, Trace};
use crate::record::EventType;

#[cfg(feature = "http")]
use crate::config::ClientConfig;
#[cfg(feature = "http")]
use crate::http::HttpIngestionClient;

/// Background flush loop handle
struct Worker {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Langfuse tracing client
///
/// Every call enqueues without waiting for the network and fails fast with
/// [`Error::NoCapacity`] when the buffers are full. Call
/// [`shutdown`](Self::shutdown) before exit to deliver what is still
/// buffered.
///
/// ```no_run
/// use langfuse_rs::{ClientConfig, Langfuse, Span, Trace};
///
/// # async fn run() -> langfuse_rs::Result<()> {
/// let langfuse = Langfuse::new(ClientConfig::from_env())?;
///
/// let trace = langfuse.trace(Trace::new().with_name("chat")).await?;
/// let span = langfuse.span(trace.span(Span::new().with_name("retrieve"))).await?;
/// langfuse.end_span(span).await?;
///
/// langfuse.shutdown().await;
/// # Ok(())
/// # }
/// ```
pub struct Langfuse {
    manager: Arc<dyn EventManager>,
    batch: Option<Arc<BatchEventManager>>,
    ids: Arc<dyn IdGenerator>,
    release: Option<String>,
    report_metrics: bool,
    worker: Mutex<Option<Worker>>,
}

impl Langfuse {
    /// Create a client that delivers over HTTP
    ///
    /// Unset fields of `config` are filled from the environment. Must be
    /// called within a Tokio runtime; the flush loop starts immediately.
    #[cfg(feature = "http")]
    pub fn new(config: ClientConfig) -> Result<Self> {
        let config = config.apply_env();
        config.validate()?;

        if !config.has_credentials() {
            return Err(Error::config("public and secret keys are required"));
        }

        let client = Arc::new(HttpIngestionClient::new(&config)?);
        let manager = Arc::new(BatchEventManager::from_config(client, &config));

        info!(host = %config.host, shards = config.shard_count, capacity = config.shard_capacity, "langfuse client started");

        let mut langfuse = Self::with_batch_manager(manager, config.release.clone());
        langfuse.report_metrics = config.report_metrics_on_shutdown;
        Ok(langfuse)
    }

    /// Create a client around a batching engine and start its flush loop
    ///
    /// Must be called within a Tokio runtime.
    pub fn with_batch_manager(manager: Arc<BatchEventManager>, release: Option<String>) -> Self {
        let cancel = CancellationToken::new();
        let handle = manager.spawn(cancel.clone());

        Self {
            manager: manager.clone(),
            batch: Some(manager),
            ids: Arc::new(UuidGenerator),
            release,
            report_metrics: false,
            worker: Mutex::new(Some(Worker { cancel, handle })),
        }
    }

    /// Create a client around a caller-driven event manager
    ///
    /// No flush loop is started; delivery is up to the manager.
    pub fn with_event_manager(manager: Arc<dyn EventManager>) -> Self {
        Self {
            manager,
            batch: None,
            ids: Arc::new(UuidGenerator),
            release: None,
            report_metrics: false,
            worker: Mutex::new(None),
        }
    }

    /// Set the generator used for observation ids
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Create or upsert a trace
    pub async fn trace(&self, mut trace: Trace) -> Result<Trace> {
        let id = self.assign_id(&mut trace.id);
        if trace.release.is_none() {
            trace.release = self.release.clone();
        }
        if trace.timestamp.is_none() {
            trace.timestamp = Some(Utc::now());
        }

        self.manager.enqueue_serialized(&id, EventType::TraceCreate, &trace).await?;
        Ok(trace)
    }

    /// Update an existing trace
    pub async fn update_trace(&self, trace: Trace) -> Result<Trace> {
        if trace.id.is_none() {
            return Err(Error::validation("trace id is not set"));
        }

        self.manager.enqueue_serialized("", EventType::TraceCreate, &trace).await?;
        Ok(trace)
    }

    /// Start a span
    pub async fn span(&self, mut span: Span) -> Result<Span> {
        let id = self.assign_id(&mut span.id);
        span.start_time.get_or_insert_with(Utc::now);

        self.manager.enqueue_serialized(&id, EventType::SpanCreate, &span).await?;
        Ok(span)
    }

    /// End a span, stamping its end time
    pub async fn end_span(&self, mut span: Span) -> Result<Span> {
        if span.id.is_none() {
            return Err(Error::validation("span id is not set"));
        }
        span.end_time = Some(Utc::now());

        self.manager.enqueue_serialized("", EventType::SpanUpdate, &span).await?;
        Ok(span)
    }

    /// Record a point-in-time event
    pub async fn event(&self, mut event: Event) -> Result<Event> {
        let id = self.assign_id(&mut event.id);
        event.start_time.get_or_insert_with(Utc::now);

        self.manager.enqueue_serialized(&id, EventType::EventCreate, &event).await?;
        Ok(event)
    }

    /// Start a generation
    pub async fn generation(&self, mut generation: Generation) -> Result<Generation> {
        let id = self.assign_id(&mut generation.id);
        generation.start_time.get_or_insert_with(Utc::now);

        self.manager.enqueue_serialized(&id, EventType::GenerationCreate, &generation).await?;
        Ok(generation)
    }

    /// End a generation, stamping its end time
    pub async fn end_generation(&self, mut generation: Generation) -> Result<Generation> {
        if generation.id.is_none() {
            return Err(Error::validation("generation id is not set"));
        }
        generation.end_time = Some(Utc::now());

        self.manager.enqueue_serialized("", EventType::GenerationUpdate, &generation).await?;
        Ok(generation)
    }

    /// Record a score; requires a trace id and a name
    pub async fn score(&self, mut score: Score) -> Result<Score> {
        if score.trace_id.is_none() {
            return Err(Error::validation("trace id is required"));
        }
        if score.name.as_deref().map_or(true, str::is_empty) {
            return Err(Error::validation("name is required"));
        }
        let id = self.assign_id(&mut score.id);

        self.manager.enqueue_serialized(&id, EventType::ScoreCreate, &score).await?;
        Ok(score)
    }

    /// Deliver everything buffered so far
    pub async fn flush(&self) {
        self.manager.flush().await;
    }

    /// Stop the flush loop and deliver what is left
    ///
    /// Waits for a flush that is already running, then flushes once more.
    /// Calling it again only flushes.
    pub async fn shutdown(&self) {
        let worker = self.worker.lock().take();

        if let Some(worker) = worker {
            worker.cancel.cancel();
            if let Err(e) = worker.handle.await {
                error!(error = %e, "flush loop ended abnormally");
            }
        }

        self.manager.flush().await;

        if let Some(metrics) = self.metrics() {
            if self.report_metrics {
                info!("{}", metrics.get_report());
            }
        }
        debug!("langfuse client shut down");
    }

    /// Check if the background flush loop is running
    pub fn is_running(&self) -> bool {
        self.worker
            .lock()
            .as_ref()
            .map_or(false, |worker| !worker.handle.is_finished())
    }

    /// Delivery metrics, when driving a batching engine
    pub fn metrics(&self) -> Option<&MetricsCollector> {
        self.batch.as_deref().map(BatchEventManager::metrics)
    }

    /// The event manager records are handed to
    pub fn event_manager(&self) -> &Arc<dyn EventManager> {
        &self.manager
    }

    fn assign_id(&self, slot: &mut Option<String>) -> String {
        slot.get_or_insert_with(|| self.ids.generate()).clone()
    }
}

impl Drop for Langfuse {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.get_mut().take() {
            worker.cancel.cancel();
        }
    }
}
