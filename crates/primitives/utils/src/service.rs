//! Service orchestration for the vigil node.
//!
//! The app is divided into always-on services (reconciliation, receipt
//! watching), each started through [ServiceRunner::service_loop] and
//! supervised by a [ServiceMonitor]. Cancellation flows through
//! [ServiceContext] scopes rather than any process-wide side channel:
//! a service that wants the node to stop returns an error or calls
//! [ServiceContext::cancel_global], and the monitor winds the rest down.

use anyhow::Context;
use std::panic;
use std::time::Duration;
use tokio::task::JoinSet;

/// Maximum duration a service has to gracefully shutdown before it is
/// forcefully cancelled.
const SERVICE_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// Cancellation scopes handed to every service.
///
/// Services derived from the same root context share a _global_ scope: any
/// of them can wind down the whole node with [ServiceContext::cancel_global].
/// A context created with [ServiceContext::child] additionally carries a
/// _local_ scope, so a parent can cancel its children without touching the
/// rest of the app. A child can never cancel its parent.
#[derive(Clone)]
pub struct ServiceContext {
    token_global: tokio_util::sync::CancellationToken,
    token_local: Option<tokio_util::sync::CancellationToken>,
}

impl Default for ServiceContext {
    fn default() -> Self {
        Self { token_global: tokio_util::sync::CancellationToken::new(), token_local: None }
    }
}

impl ServiceContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stops all services under the same global context scope.
    pub fn cancel_global(&self) {
        tracing::info!("🔌 Gracefully shutting down node");

        self.token_global.cancel();
    }

    /// Stops all services under the same local context scope.
    pub fn cancel_local(&self) {
        self.token_local.as_ref().unwrap_or(&self.token_global).cancel();
    }

    /// A future which completes when this service is cancelled, either
    /// locally or globally.
    ///
    /// Use this to race against other futures in a [tokio::select], or
    /// [ServiceContext::run_until_cancelled] when wrapping a single future.
    pub async fn cancelled(&self) {
        match &self.token_local {
            Some(token_local) => {
                tokio::select! {
                    _ = self.token_global.cancelled() => {},
                    _ = token_local.cancelled() => {},
                }
            }
            None => self.token_global.cancelled().await,
        }
    }

    /// Checks cancellation without waiting. Only suitable alongside
    /// non-blocking work (ticking, synchronous sections); blocking futures
    /// should race [ServiceContext::cancelled] instead.
    #[inline(always)]
    pub fn is_cancelled(&self) -> bool {
        self.token_global.is_cancelled()
            || self.token_local.as_ref().map(|t| t.is_cancelled()).unwrap_or(false)
    }

    /// Runs a future until this service is cancelled.
    ///
    /// The future must be cancel-safe: it may be interrupted at any point in
    /// its execution without leaving partial side effects behind.
    ///
    /// Returns the future's output wrapped in [Some], or [None] if the
    /// service was cancelled first.
    pub async fn run_until_cancelled<T, F>(&self, f: F) -> Option<T>
    where
        T: Sized + Send + Sync,
        F: std::future::Future<Output = T>,
    {
        tokio::select! {
            res = f => Some(res),
            _ = self.cancelled() => None
        }
    }

    /// Creates a new [ServiceContext] in a child scope of the current one.
    /// Cancelling the child's local scope leaves the parent untouched.
    pub fn child(&self) -> Self {
        let token_local = self.token_local.as_ref().unwrap_or(&self.token_global).child_token();

        Self { token_local: Some(token_local), ..Clone::clone(self) }
    }
}

/// A long-running unit of the node, started with
/// [ServiceRunner::service_loop] and run to completion (or cancellation)
/// under a [ServiceMonitor].
#[async_trait::async_trait]
pub trait Service: 'static + Send + Sync {
    fn name(&self) -> &'static str;

    async fn start<'a>(&mut self, runner: ServiceRunner<'a>) -> anyhow::Result<()>;
}

#[async_trait::async_trait]
impl Service for Box<dyn Service> {
    fn name(&self) -> &'static str {
        self.as_ref().name()
    }

    async fn start<'a>(&mut self, runner: ServiceRunner<'a>) -> anyhow::Result<()> {
        self.as_mut().start(runner).await
    }
}

/// Wrapper around a [tokio::task::JoinSet] and a [ServiceContext], enforcing
/// shutdown behavior onto services started with
/// [ServiceRunner::service_loop].
pub struct ServiceRunner<'a> {
    ctx: ServiceContext,
    join_set: &'a mut JoinSet<anyhow::Result<&'static str>>,
    name: &'static str,
}

impl<'a> ServiceRunner<'a> {
    fn new(
        ctx: ServiceContext,
        join_set: &'a mut JoinSet<anyhow::Result<&'static str>>,
        name: &'static str,
    ) -> Self {
        Self { ctx, join_set, name }
    }

    /// The main loop of a service.
    ///
    /// The future passed to this function should complete only once the
    /// service completes or is cancelled. After cancellation, the service
    /// has up to [SERVICE_GRACE_PERIOD] to wind down before it is dropped.
    pub fn service_loop<F, E>(self, runner: impl FnOnce(ServiceContext) -> F + Send + 'static)
    where
        F: std::future::Future<Output = Result<(), E>> + Send + 'static,
        E: Into<anyhow::Error> + Send,
    {
        let Self { ctx, join_set, name } = self;
        join_set.spawn(async move {
            tracing::debug!("Starting service: {name}");

            // If a service is implemented correctly, `stopper` should never
            // win the race. It is a safety net for services missing a
            // cancellation check along some branch of their execution.
            let ctx1 = ctx.clone();
            tokio::select! {
                res = runner(ctx) => res.map_err(Into::into)?,
                _ = Self::stopper(ctx1, name) => {},
            }

            tracing::debug!("Shutting down service: {name}");

            Ok(name)
        });
    }

    async fn stopper(ctx: ServiceContext, name: &'static str) {
        ctx.cancelled().await;
        tokio::time::sleep(SERVICE_GRACE_PERIOD).await;

        tracing::warn!("⚠️  Forcefully shutting down service: {name}");
    }
}

/// Starts services and runs them to completion.
///
/// Every vigil service is required: the first one to finish (normally or
/// with an error) triggers a global shutdown of the others, and the first
/// error encountered is what [ServiceMonitor::start] returns. `SIGINT` and
/// `SIGTERM` are handled here as well.
#[derive(Default)]
pub struct ServiceMonitor {
    services: Vec<Box<dyn Service>>,
    join_set: JoinSet<anyhow::Result<&'static str>>,
}

impl ServiceMonitor {
    pub fn with(mut self, svc: impl Service) -> Self {
        self.services.push(Box::new(svc));
        self
    }

    /// Starts all registered services and waits for them to complete.
    pub async fn start(mut self) -> anyhow::Result<()> {
        let ctx = ServiceContext::new();

        for svc in self.services.iter_mut() {
            let name = svc.name();
            let runner = ServiceRunner::new(ctx.child(), &mut self.join_set, name);
            svc.start(runner).await.with_context(|| format!("Starting service: {name}"))?;
        }

        // SIGINT & SIGTERM
        let runner = ServiceRunner::new(ctx.clone(), &mut self.join_set, "signal-handler");
        runner.service_loop(|ctx| async move {
            let sigint = tokio::signal::ctrl_c();
            let sigterm = async {
                match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(mut signal) => signal.recv().await,
                    Err(_) => core::future::pending().await, // SIGTERM not supported
                }
            };

            tokio::select! {
                res = sigint => res?,
                _ = sigterm => {},
                _ = ctx.cancelled() => {},
            };

            if !ctx.is_cancelled() {
                ctx.cancel_global();
            }

            anyhow::Ok(())
        });

        let mut first_error = None;
        while let Some(result) = self.join_set.join_next().await {
            match result {
                Ok(Ok(name)) => {
                    tracing::debug!("Service {name} has shut down");
                }
                Ok(Err(err)) => {
                    tracing::error!("Service stopped with error: {err:#}");
                    first_error.get_or_insert(err);
                }
                Err(panic_error) if panic_error.is_panic() => {
                    // bubble up panics too
                    panic::resume_unwind(panic_error.into_panic());
                }
                Err(_task_cancelled_error) => {}
            }

            // One service down means the node cannot do its job anymore.
            if !ctx.is_cancelled() {
                ctx.cancel_global();
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn run_until_cancelled_yields_value_when_not_cancelled() {
        let ctx = ServiceContext::new();
        let out = ctx.run_until_cancelled(async { 7u32 }).await;
        assert_eq!(out, Some(7));
    }

    #[tokio::test]
    async fn run_until_cancelled_returns_none_after_global_cancel() {
        let ctx = ServiceContext::new();
        ctx.cancel_global();
        let out = ctx.run_until_cancelled(std::future::pending::<u32>()).await;
        assert_eq!(out, None);
    }

    #[tokio::test]
    async fn child_local_cancel_does_not_reach_parent() {
        let parent = ServiceContext::new();
        let child = parent.child();

        child.cancel_local();

        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());
    }

    #[tokio::test]
    async fn global_cancel_reaches_children() {
        let parent = ServiceContext::new();
        let child = parent.child();

        parent.cancel_global();

        assert!(child.is_cancelled());
    }

    struct CountingService(Arc<AtomicUsize>);

    #[async_trait::async_trait]
    impl Service for CountingService {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn start<'a>(&mut self, runner: ServiceRunner<'a>) -> anyhow::Result<()> {
            let counter = Arc::clone(&self.0);
            runner.service_loop(move |_ctx| async move {
                counter.fetch_add(1, Ordering::SeqCst);
                anyhow::Ok(())
            });
            Ok(())
        }
    }

    #[tokio::test]
    async fn monitor_runs_service_to_completion() {
        let counter = Arc::new(AtomicUsize::new(0));
        let monitor = ServiceMonitor::default().with(CountingService(Arc::clone(&counter)));

        monitor.start().await.expect("monitor run");

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    struct FailingService;

    #[async_trait::async_trait]
    impl Service for FailingService {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn start<'a>(&mut self, runner: ServiceRunner<'a>) -> anyhow::Result<()> {
            runner.service_loop(|_ctx| async move { Err(anyhow::anyhow!("boom")) });
            Ok(())
        }
    }

    #[tokio::test]
    async fn monitor_surfaces_first_service_error() {
        let monitor = ServiceMonitor::default().with(FailingService);
        let err = monitor.start().await.expect_err("service error should propagate");
        assert!(err.to_string().contains("boom"));
    }
}
