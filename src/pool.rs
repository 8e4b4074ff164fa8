//! # Worker Pool
//!
//! A fixed-size pool of OS threads that runs named, pure tasks off the
//! request-handling threads.
//!
//! - One pool per process: [`WorkerPoolBuilder::create`] fails with
//!   `PoolAlreadyCreated` on the second call. The startup routine owns the
//!   returned `Arc<WorkerPool>` and hands clones to request handlers.
//! - Tasks take and return `serde_json::Value`, so nothing mutable is shared
//!   between a task, its siblings and the submitter.
//! - `submit` dispatches immediately and returns a future for the result.
//!   Results resolve independently of submission order.
//! - A task that errors or panics only fails its own future.
//!
//! ```rust,no_run
//! use path_analyzer::{AnalysisConfig, GpsPoint, WorkerPool, PoolConfig};
//!
//! # async fn run() -> path_analyzer::Result<()> {
//! let pool = WorkerPool::create(PoolConfig::default())?;
//! let points: Vec<GpsPoint> = (0..100).map(|i| GpsPoint::new(51.5, i as f64 * 0.001)).collect();
//! let path = pool.analyze(points, None, AnalysisConfig::default()).await?;
//! println!("{}", path.category);
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::channel::oneshot;
use futures::future::{self, BoxFuture, FutureExt};
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::analysis::{analyze_offline, analyze_preflighted, AnalyzedPath};
use crate::gpx_input::{parse_gpx, RawPath};
use crate::preflight::PreflightResult;
use crate::{AnalysisConfig, GpsPoint, PathError, Result};

/// Task name for [`analyze_offline`].
pub const TASK_ANALYZE: &str = "analyze";
/// Task name for [`analyze_preflighted`].
pub const TASK_ANALYZE_PREFLIGHTED: &str = "analyze_preflighted";
/// Task name for [`parse_gpx`].
pub const TASK_PARSE_GPX: &str = "parse_gpx";

static POOL_CREATED: AtomicBool = AtomicBool::new(false);

/// A registered task: serializable arguments in, serializable result out.
pub type TaskFn = Arc<dyn Fn(Value) -> Result<Value> + Send + Sync>;

/// Configuration for the worker pool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Number of worker threads. Default: one per CPU core
    pub num_threads: Option<usize>,
}

impl PoolConfig {
    fn resolved_threads(&self) -> usize {
        self.num_threads.unwrap_or_else(num_cpus::get).max(1)
    }
}

/// Arguments of the `analyze` task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeTaskArgs {
    pub points: Vec<GpsPoint>,
    #[serde(default)]
    pub elevations: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pub config: AnalysisConfig,
}

/// Arguments of the `analyze_preflighted` task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreflightedTaskArgs {
    pub path: PreflightResult,
    #[serde(default)]
    pub config: AnalysisConfig,
}

/// Arguments of the `parse_gpx` task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseGpxTaskArgs {
    pub text: String,
}

/// Builder for [`WorkerPool`], pre-loaded with the analysis and GPX tasks.
pub struct WorkerPoolBuilder {
    config: PoolConfig,
    tasks: HashMap<String, TaskFn>,
}

impl Default for WorkerPoolBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkerPoolBuilder {
    pub fn new() -> Self {
        Self {
            config: PoolConfig::default(),
            tasks: HashMap::new(),
        }
        .register(TASK_ANALYZE, typed_task(|args: AnalyzeTaskArgs| {
            analyze_offline(&args.points, args.elevations.as_deref(), &args.config)
        }))
        .register(TASK_ANALYZE_PREFLIGHTED, typed_task(|args: PreflightedTaskArgs| {
            analyze_preflighted(&args.path, &args.config)
        }))
        .register(TASK_PARSE_GPX, typed_task(|args: ParseGpxTaskArgs| parse_gpx(&args.text)))
    }

    pub fn config(mut self, config: PoolConfig) -> Self {
        self.config = config;
        self
    }

    pub fn num_threads(mut self, num_threads: usize) -> Self {
        self.config.num_threads = Some(num_threads);
        self
    }

    /// Register (or replace) a task under `name`.
    pub fn register<F>(mut self, name: &str, task: F) -> Self
    where
        F: Fn(Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.tasks.insert(name.to_string(), Arc::new(task));
        self
    }

    /// Start the process-wide pool. Fails if one was already created.
    pub fn create(self) -> Result<Arc<WorkerPool>> {
        if POOL_CREATED
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(PathError::PoolAlreadyCreated);
        }

        match self.build() {
            Ok(pool) => Ok(Arc::new(pool)),
            Err(e) => {
                POOL_CREATED.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    fn build(self) -> Result<WorkerPool> {
        let size = self.config.resolved_threads();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(size)
            .thread_name(|i| format!("path-worker-{}", i))
            .build()
            .map_err(|e| PathError::task_failed("worker-pool", e.to_string()))?;

        info!(
            "[WorkerPool] Started {} workers with tasks {:?}",
            size,
            self.tasks.keys().collect::<Vec<_>>()
        );

        Ok(WorkerPool {
            pool,
            tasks: self.tasks,
            size,
        })
    }
}

/// Fixed-size pool executing registered tasks to completion.
pub struct WorkerPool {
    pool: rayon::ThreadPool,
    tasks: HashMap<String, TaskFn>,
    size: usize,
}

impl WorkerPool {
    pub fn builder() -> WorkerPoolBuilder {
        WorkerPoolBuilder::new()
    }

    /// Start the process-wide pool with the default tasks.
    pub fn create(config: PoolConfig) -> Result<Arc<Self>> {
        WorkerPoolBuilder::new().config(config).create()
    }

    /// Number of worker threads.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn has_task(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    /// Dispatch `task_name` with `args` to the first free worker.
    ///
    /// Errors returned by the task are passed through unchanged; a panic
    /// becomes `TaskFailed`. Dropping the returned future does not cancel
    /// the task.
    pub fn submit(&self, task_name: &str, args: Value) -> BoxFuture<'static, Result<Value>> {
        let Some(task) = self.tasks.get(task_name).cloned() else {
            return future::ready(Err(PathError::UnknownTask {
                task: task_name.to_string(),
            }))
            .boxed();
        };

        let (tx, rx) = oneshot::channel();
        let name = task_name.to_string();
        debug!("[WorkerPool] Dispatching '{}'", name);

        {
            let name = name.clone();
            self.pool.spawn(move || {
                // The submitter may have stopped waiting
                let _ = tx.send(run_isolated(&name, || task(args)));
            });
        }

        await_result(name, rx)
    }

    /// Run [`analyze_offline`] on a worker.
    pub fn analyze(
        &self,
        points: Vec<GpsPoint>,
        elevations: Option<Vec<Option<f64>>>,
        config: AnalysisConfig,
    ) -> BoxFuture<'static, Result<AnalyzedPath>> {
        self.submit_typed(TASK_ANALYZE, &AnalyzeTaskArgs { points, elevations, config })
    }

    /// Run [`analyze_preflighted`] on a worker.
    pub fn analyze_preflighted(
        &self,
        path: PreflightResult,
        config: AnalysisConfig,
    ) -> BoxFuture<'static, Result<AnalyzedPath>> {
        self.submit_typed(TASK_ANALYZE_PREFLIGHTED, &PreflightedTaskArgs { path, config })
    }

    /// Run [`parse_gpx`] on a worker.
    pub fn parse_gpx(&self, text: String) -> BoxFuture<'static, Result<RawPath>> {
        self.submit_typed(TASK_PARSE_GPX, &ParseGpxTaskArgs { text })
    }

    fn submit_typed<A, R>(&self, task_name: &str, args: &A) -> BoxFuture<'static, Result<R>>
    where
        A: Serialize,
        R: DeserializeOwned + Send + 'static,
    {
        let args = match serde_json::to_value(args) {
            Ok(v) => v,
            Err(e) => return future::ready(Err(e.into())).boxed(),
        };
        let pending = self.submit(task_name, args);
        async move {
            let value = pending.await?;
            Ok(serde_json::from_value(value)?)
        }
        .boxed()
    }
}

/// Run `job` on rayon's global pool, outside any [`WorkerPool`].
///
/// Used when no pool was handed out, so CPU-bound work still stays off the
/// caller's async executor. Panics are isolated the same way as in `submit`.
pub(crate) fn spawn_detached<T, F>(task_name: &str, job: F) -> BoxFuture<'static, Result<T>>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    let name = task_name.to_string();
    {
        let name = name.clone();
        rayon::spawn(move || {
            let _ = tx.send(run_isolated(&name, job));
        });
    }
    await_result(name, rx)
}

fn run_isolated<T>(name: &str, job: impl FnOnce() -> Result<T>) -> Result<T> {
    match panic::catch_unwind(AssertUnwindSafe(job)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            warn!("[WorkerPool] Task '{}' failed: {}", name, e);
            Err(e)
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!("[WorkerPool] Task '{}' panicked: {}", name, message);
            Err(PathError::task_failed(name, message))
        }
    }
}

fn await_result<T: Send + 'static>(
    name: String,
    rx: oneshot::Receiver<Result<T>>,
) -> BoxFuture<'static, Result<T>> {
    async move {
        rx.await
            .unwrap_or_else(|_| Err(PathError::task_failed(&name, "worker dropped the task")))
    }
    .boxed()
}

/// Adapt a typed function into a [`TaskFn`]-compatible closure.
fn typed_task<A, R, F>(f: F) -> impl Fn(Value) -> Result<Value> + Send + Sync + 'static
where
    A: DeserializeOwned,
    R: Serialize,
    F: Fn(A) -> Result<R> + Send + Sync + 'static,
{
    move |args: Value| {
        let args: A = serde_json::from_value(args)?;
        let result = f(args)?;
        Ok(serde_json::to_value(result)?)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

// ============================================================================
// Tests
// ============================================================================
