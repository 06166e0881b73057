//! Bounded-concurrency downloader with a result queue drained on the update
//! thread.
//!
//! Work is submitted from the update thread, dispatched FIFO onto at most
//! `max_workers` concurrent tasks, and every completion is posted back on a
//! bounded channel. Nothing touches view state off the update thread: the
//! caller applies completions in [`Downloader::drain`].

use crate::core::config::DownloaderConfig;
use crate::core::geo::TileCoord;
use crate::layers::tile::TileTicket;
use crate::prelude::{Arc, Duration, Instant};
use crate::runtime::{AsyncSpawner, TokioSpawner};
use crate::{MapError, Result};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{mpsc, Semaphore};

/// How long a worker waits before retrying a post to a full result queue
const POST_RETRY_DELAY: Duration = Duration::from_millis(5);

type Job = Pin<Box<dyn Future<Output = Option<Completion>> + Send + 'static>>;

/// A tile fetch handed to the downloader.
#[derive(Debug, Clone, PartialEq)]
pub struct TileRequest {
    pub ticket: TileTicket,
    pub coord: TileCoord,
    pub url: String,
    pub cache_path: PathBuf,
}

/// Result of a tile fetch, tagged with the ticket of the tile that asked.
#[derive(Debug)]
pub struct TileOutcome {
    pub ticket: TileTicket,
    pub coord: TileCoord,
    pub result: Result<PathBuf>,
}

/// Anything posted back to the update thread.
pub enum Completion {
    Tile(TileOutcome),
    /// Runs during [`Downloader::drain`]
    Callback(Box<dyn FnOnce() + Send + 'static>),
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tile(outcome) => f.debug_tuple("Tile").field(outcome).finish(),
            Self::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

struct Shared {
    config: DownloaderConfig,
    client: reqwest::Client,
    job_tx: mpsc::UnboundedSender<Job>,
    result_rx: Receiver<Completion>,
    in_flight: Arc<AtomicUsize>,
    // Keeps an owned runtime alive as long as any handle exists.
    _spawner: Arc<dyn AsyncSpawner>,
}

/// Handle to the download worker pool. Cheap to clone.
#[derive(Clone)]
pub struct Downloader {
    inner: Arc<Shared>,
}

impl Downloader {
    /// Starts a downloader on a dedicated runtime.
    pub fn new(config: DownloaderConfig) -> Result<Self> {
        config.validate()?;
        let spawner = TokioSpawner::new(config.max_workers)?;
        Self::with_spawner(config, Arc::new(spawner))
    }

    /// Starts a downloader whose tasks run on `spawner`.
    pub fn with_spawner(config: DownloaderConfig, spawner: Arc<dyn AsyncSpawner>) -> Result<Self> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout())
            .build()?;

        let (job_tx, job_rx) = mpsc::unbounded_channel();
        let (result_tx, result_rx) = bounded(config.result_capacity);
        let in_flight = Arc::new(AtomicUsize::new(0));

        let worker = DownloadWorker {
            job_rx,
            result_tx,
            permits: Arc::new(Semaphore::new(config.max_workers)),
            max_workers: config.max_workers,
            in_flight: Arc::clone(&in_flight),
        };
        spawner.spawn_boxed(Box::pin(worker.run()));

        Ok(Self {
            inner: Arc::new(Shared {
                config,
                client,
                job_tx,
                result_rx,
                in_flight,
                _spawner: spawner,
            }),
        })
    }

    pub fn config(&self) -> &DownloaderConfig {
        &self.inner.config
    }

    /// Tasks submitted whose completion has not been posted yet.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    /// Completions waiting to be drained.
    pub fn queued_results(&self) -> usize {
        self.inner.result_rx.len()
    }

    /// Queues an arbitrary task. A `Some` output is posted for draining.
    pub fn submit<F>(&self, task: F)
    where
        F: Future<Output = Option<Completion>> + Send + 'static,
    {
        self.inner.in_flight.fetch_add(1, Ordering::AcqRel);
        if self.inner.job_tx.send(Box::pin(task)).is_err() {
            self.inner.in_flight.fetch_sub(1, Ordering::AcqRel);
            log::warn!("download queue closed, dropping task");
        }
    }

    /// Fetches a tile into its cache path unless the file already exists.
    pub fn download_tile(&self, request: TileRequest) {
        log::debug!(
            "queue tile z={} x={} y={} from {}",
            request.coord.z,
            request.coord.x,
            request.coord.y,
            request.url
        );
        let client = self.inner.client.clone();
        self.submit(async move {
            let result = fetch_tile(&client, &request).await;
            if let Err(e) = &result {
                log::warn!("tile {:?} failed: {}", request.coord, e);
            }
            Some(Completion::Tile(TileOutcome {
                ticket: request.ticket,
                coord: request.coord,
                result,
            }))
        });
    }

    /// Fetches `url` and runs `callback` with the body during a later drain.
    pub fn download<F>(&self, url: impl Into<String>, callback: F)
    where
        F: FnOnce(&str, Result<Vec<u8>>) + Send + 'static,
    {
        let url = url.into();
        let client = self.inner.client.clone();
        self.submit(async move {
            let result = fetch_bytes(&client, &url).await;
            if let Err(e) = &result {
                log::warn!("download of {} failed: {}", url, e);
            }
            Some(Completion::Callback(Box::new(move || callback(&url, result))))
        });
    }

    /// Applies queued completions until the queue is empty or `budget` has
    /// elapsed. At least one completion is processed when any is queued.
    /// Returns how many were processed.
    pub fn drain<F>(&self, budget: Duration, mut apply: F) -> usize
    where
        F: FnMut(TileOutcome),
    {
        let start = Instant::now();
        let mut drained = 0;
        while let Ok(completion) = self.inner.result_rx.try_recv() {
            match completion {
                Completion::Tile(outcome) => apply(outcome),
                Completion::Callback(callback) => callback(),
            }
            drained += 1;
            if start.elapsed() >= budget {
                break;
            }
        }
        drained
    }

    /// [`Downloader::drain`] with the configured per-tick budget.
    pub fn drain_capped<F>(&self, apply: F) -> usize
    where
        F: FnMut(TileOutcome),
    {
        self.drain(self.inner.config.cap_time(), apply)
    }
}

impl fmt::Debug for Downloader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Downloader")
            .field("max_workers", &self.inner.config.max_workers)
            .field("in_flight", &self.in_flight())
            .field("queued_results", &self.queued_results())
            .finish()
    }
}

/// Dispatches queued jobs in submission order, one permit per running job.
struct DownloadWorker {
    job_rx: mpsc::UnboundedReceiver<Job>,
    result_tx: Sender<Completion>,
    permits: Arc<Semaphore>,
    max_workers: usize,
    in_flight: Arc<AtomicUsize>,
}

impl DownloadWorker {
    async fn run(mut self) {
        log::debug!("DownloadWorker starting with max_workers: {}", self.max_workers);

        while let Some(job) = self.job_rx.recv().await {
            let permit = match Arc::clone(&self.permits).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            let result_tx = self.result_tx.clone();
            let in_flight = Arc::clone(&self.in_flight);

            tokio::spawn(async move {
                match AssertUnwindSafe(job).catch_unwind().await {
                    Ok(Some(completion)) => post(&result_tx, completion).await,
                    Ok(None) => {}
                    Err(_) => log::error!("download task panicked"),
                }
                in_flight.fetch_sub(1, Ordering::AcqRel);
                // The permit is held until the completion is queued, so a full
                // result queue throttles new work.
                drop(permit);
            });
        }

        log::debug!("DownloadWorker exiting - all handles dropped");
    }
}

async fn post(result_tx: &Sender<Completion>, mut completion: Completion) {
    loop {
        match result_tx.try_send(completion) {
            Ok(()) => return,
            Err(TrySendError::Full(returned)) => {
                completion = returned;
                tokio::time::sleep(POST_RETRY_DELAY).await;
            }
            Err(TrySendError::Disconnected(_)) => return,
        }
    }
}

async fn fetch_tile(client: &reqwest::Client, request: &TileRequest) -> Result<PathBuf> {
    if tokio::fs::try_exists(&request.cache_path)
        .await
        .unwrap_or(false)
    {
        log::debug!("use cache {}", request.cache_path.display());
        return Ok(request.cache_path.clone());
    }

    let data = fetch_bytes(client, &request.url).await?;

    // Write beside the target and rename so readers never see a partial file.
    let partial = request
        .cache_path
        .with_extension(format!("part-{}", request.ticket.get()));
    tokio::fs::write(&partial, &data).await?;
    if let Err(e) = tokio::fs::rename(&partial, &request.cache_path).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(e.into());
    }

    log::debug!(
        "downloaded {} bytes into {}",
        data.len(),
        request.cache_path.display()
    );
    Ok(request.cache_path.clone())
}

async fn fetch_bytes(client: &reqwest::Client, url: &str) -> Result<Vec<u8>> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(MapError::HttpStatus {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    Ok(response.bytes().await?.to_vec())
}
