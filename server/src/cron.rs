use std::{future::Future, pin::Pin, time::Duration};

use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::{poller, state::AppState};

type CronFuture = Pin<Box<dyn Future<Output = color_eyre::Result<()>> + Send>>;
type CronFn<S> = Box<dyn Fn(S, String) -> CronFuture + Send + Sync>;

struct CronJob<S> {
    name: &'static str,
    interval: Duration,
    func: CronFn<S>,
}

/// Named jobs that each run on a fixed interval
pub struct CronRegistry<S> {
    jobs: Vec<CronJob<S>>,
}

impl<S> Default for CronRegistry<S> {
    fn default() -> Self {
        Self { jobs: Vec::new() }
    }
}

impl<S: Clone + Send + Sync + 'static> CronRegistry<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F, Fut>(&mut self, name: &'static str, interval: Duration, func: F)
    where
        F: Fn(S, String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = color_eyre::Result<()>> + Send + 'static,
    {
        self.jobs.push(CronJob {
            name,
            interval,
            func: Box::new(move |state, job_name| Box::pin(func(state, job_name))),
        });
    }

    pub fn job_names(&self) -> Vec<&'static str> {
        self.jobs.iter().map(|job| job.name).collect()
    }
}

/// Drives every job in a registry: once immediately, then on each interval tick
pub struct Worker<S> {
    state: S,
    registry: CronRegistry<S>,
}

impl<S: Clone + Send + Sync + 'static> Worker<S> {
    pub fn new(state: S, registry: CronRegistry<S>) -> Self {
        Self { state, registry }
    }

    pub async fn run(self) -> color_eyre::Result<()> {
        let mut handles = Vec::new();

        for job in self.registry.jobs {
            let state = self.state.clone();
            handles.push(tokio::spawn(async move {
                let mut interval = tokio::time::interval(job.interval);
                // A slow run pushes the schedule back instead of firing a burst afterwards
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

                loop {
                    // The first tick completes immediately
                    interval.tick().await;

                    info!("Running cron job {}", job.name);
                    if let Err(err) = (job.func)(state.clone(), job.name.to_string()).await {
                        error!("Cron job {} failed: {:?}", job.name, err);
                    }
                }
            }));
        }

        futures::future::try_join_all(handles).await?;
        Ok(())
    }
}

fn cron_registry(poll_interval: Duration) -> CronRegistry<AppState> {
    let mut registry = CronRegistry::new();

    registry.register(
        "poll_liked_posts",
        poll_interval,
        |state: AppState, _job_name: String| async move {
            poller::poll_liked_posts(&state).await?;
            Ok::<_, color_eyre::Report>(())
        },
    );

    registry
}

pub async fn run_cron(app_state: AppState) -> color_eyre::Result<()> {
    let registry = cron_registry(app_state.config.poll_interval);
    Worker::new(app_state, registry).run().await
}
