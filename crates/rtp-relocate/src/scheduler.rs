//! The relocation state machine.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rtp_queue::{PrefetchQueue, RegionRegistry};
use rtp_search::SearchError;
use rtp_world::{Location, Position, RegionId, WorldProvider};
use thiserror::Error;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::cooldown::CooldownLedger;
use crate::cost::CostProvider;
use crate::grace::GraceTimers;
use crate::message::{Message, MessageSink};
use crate::request::{Agent, RelocationRequest, RequesterId};

/// Default interval between movement checks during a delay.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Error)]
pub enum RelocationError {
    #[error("insufficient funds for a relocation costing {price:.2}")]
    InsufficientFunds { price: f64 },
    #[error("on cooldown for another {remaining:?}")]
    OnCooldown { remaining: Duration },
    #[error("relocation canceled by movement")]
    MovementCanceled,
    #[error(transparent)]
    SearchNonConvergent(#[from] SearchError),
    #[error("region {0} is not configured")]
    UnknownRegion(RegionId),
    #[error("{0} already has a relocation in progress")]
    AlreadyInProgress(RequesterId),
}

/// States a request passes through. Transitions are traced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Idle,
    CostCheck,
    CooldownCheck,
    DelayWait,
    Immediate,
    Executing,
    PostProcess,
    Done,
    Rejected,
    Canceled,
}

/// Where the destination came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Queue,
    /// The queue had nothing usable.
    Search,
}

/// A completed relocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Relocation {
    pub position: Position,
    /// Where the agent was placed.
    pub location: Location,
    pub source: Source,
    pub phases: Vec<Phase>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerOptions {
    /// Movement check interval while a cancellable delay is pending.
    pub poll_interval: Duration,
    /// Queued candidates at least this old are checked again before use.
    pub revalidate_after: Duration,
    /// Wait before the post-relocation refill starts.
    pub refill_delay: Duration,
    /// Longest cooldown any request may carry. The cooldown ledger never
    /// sweeps entries younger than this.
    pub cooldown_horizon: Duration,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            revalidate_after: Duration::ZERO,
            refill_delay: Duration::ZERO,
            cooldown_horizon: Duration::ZERO,
        }
    }
}

struct PhaseLog {
    requester: RequesterId,
    phases: Vec<Phase>,
}

impl PhaseLog {
    fn new(requester: RequesterId) -> Self {
        Self {
            requester,
            phases: vec![Phase::Idle],
        }
    }

    fn enter(&mut self, phase: Phase) {
        let from = self.phases.last().copied().unwrap_or(Phase::Idle);
        trace!(requester = %self.requester, ?from, to = ?phase, "relocation phase");
        self.phases.push(phase);
    }
}

/// Marks a requester busy until dropped.
struct InFlight<'a> {
    set: &'a Mutex<HashSet<RequesterId>>,
    requester: RequesterId,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set.lock().remove(&self.requester);
    }
}

/// Runs relocation requests against per-region queues.
///
/// Requests from different agents run concurrently. A second request from
/// an agent with one still pending is refused, which keeps each agent's
/// cooldown check and commit in order.
pub struct RelocationScheduler<W> {
    registry: Arc<RegionRegistry<W>>,
    ledger: CooldownLedger,
    grace: Arc<GraceTimers>,
    cost: Option<Arc<dyn CostProvider>>,
    sink: Arc<dyn MessageSink>,
    options: SchedulerOptions,
    in_flight: Mutex<HashSet<RequesterId>>,
}

impl<W: WorldProvider> RelocationScheduler<W> {
    pub fn new(registry: Arc<RegionRegistry<W>>, sink: impl MessageSink) -> Self {
        Self {
            registry,
            ledger: CooldownLedger::new(),
            grace: Arc::new(GraceTimers::new()),
            cost: None,
            sink: Arc::new(sink),
            options: SchedulerOptions::default(),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn with_cost_provider(mut self, provider: impl CostProvider) -> Self {
        self.cost = Some(Arc::new(provider));
        self
    }

    /// Replaces the options. Resets the cooldown ledger, so call before use.
    pub fn with_options(mut self, options: SchedulerOptions) -> Self {
        self.ledger = CooldownLedger::with_horizon(options.cooldown_horizon);
        self.options = options;
        self
    }

    pub fn registry(&self) -> &Arc<RegionRegistry<W>> {
        &self.registry
    }

    pub fn ledger(&self) -> &CooldownLedger {
        &self.ledger
    }

    pub fn grace_timers(&self) -> &Arc<GraceTimers> {
        &self.grace
    }

    pub const fn options(&self) -> SchedulerOptions {
        self.options
    }

    /// Run one request to completion.
    ///
    /// Cost and cooldown rejections leave no trace besides a notice. A
    /// cancelled delay consumes nothing from the queue.
    pub async fn request_relocation(
        &self,
        request: RelocationRequest,
    ) -> Result<Relocation, RelocationError> {
        let requester = request.requester();
        let _in_flight = self.begin(requester)?;
        let mut log = PhaseLog::new(requester);

        let Some(queue) = self.registry.queue(&request.region) else {
            log.enter(Phase::Rejected);
            warn!(%requester, region = %request.region, "relocation to unknown region");
            return Err(RelocationError::UnknownRegion(request.region));
        };

        log.enter(Phase::CostCheck);
        let charge = match self.check_cost(&request) {
            Ok(charge) => charge,
            Err(err) => return Err(self.reject(&mut log, err)),
        };

        log.enter(Phase::CooldownCheck);
        if request.checks_cooldown() {
            if let Some(remaining) = self.ledger.remaining(requester, request.settings.cooldown) {
                return Err(self.reject(&mut log, RelocationError::OnCooldown { remaining }));
            }
        }

        match request.effective_delay() {
            Some(delay) => {
                log.enter(Phase::DelayWait);
                self.sink.send(requester, &Message::Delay { delay });
                let completed = self
                    .wait_delay(&*request.agent, delay, request.settings.cancel_on_move)
                    .await;
                if !completed {
                    log.enter(Phase::Canceled);
                    info!(%requester, "relocation canceled by movement");
                    self.sink.send(requester, &Message::Canceled);
                    return Err(RelocationError::MovementCanceled);
                }
            }
            None => log.enter(Phase::Immediate),
        }

        log.enter(Phase::Executing);
        let (position, source) = match self.acquire(&queue, requester).await {
            Ok(found) => found,
            Err(err) => return Err(self.reject(&mut log, err)),
        };
        let location = position.standing_location();
        request.agent.teleport(&request.region, location);
        self.ledger.record(requester, Instant::now());
        info!(%requester, %position, ?source, "relocated");

        log.enter(Phase::PostProcess);
        if let Some(grace) = request.settings.grace {
            self.grace.arm(requester, grace);
        }
        if charge {
            self.settle(requester, request.settings.price);
        }
        self.sink.send(
            requester,
            &Message::Teleported {
                position: position.clone(),
            },
        );
        self.schedule_refill(&queue);
        log.enter(Phase::Done);

        Ok(Relocation {
            position,
            location,
            source,
            phases: log.phases,
        })
    }

    fn begin(&self, requester: RequesterId) -> Result<InFlight<'_>, RelocationError> {
        if !self.in_flight.lock().insert(requester) {
            debug!(%requester, "relocation already in progress");
            return Err(RelocationError::AlreadyInProgress(requester));
        }
        Ok(InFlight {
            set: &self.in_flight,
            requester,
        })
    }

    fn reject(&self, log: &mut PhaseLog, err: RelocationError) -> RelocationError {
        log.enter(Phase::Rejected);
        let message = match &err {
            RelocationError::InsufficientFunds { price } => {
                Some(Message::InsufficientFunds { price: *price })
            }
            RelocationError::OnCooldown { remaining } => Some(Message::Countdown {
                remaining: *remaining,
            }),
            RelocationError::SearchNonConvergent(_) => Some(Message::Failed),
            RelocationError::MovementCanceled
            | RelocationError::UnknownRegion(_)
            | RelocationError::AlreadyInProgress(_) => None,
        };
        debug!(requester = %log.requester, %err, "relocation rejected");
        if let Some(message) = message {
            self.sink.send(log.requester, &message);
        }
        err
    }

    /// Whether the relocation should be charged once it succeeds.
    fn check_cost(&self, request: &RelocationRequest) -> Result<bool, RelocationError> {
        if !request.uses_cost() {
            return Ok(false);
        }
        let requester = request.requester();
        let price = request.settings.price;
        let Some(provider) = &self.cost else {
            warn!(%requester, "relocation has a cost but no cost provider is installed");
            return Ok(false);
        };
        match provider.has_sufficient_balance(requester, price) {
            Ok(true) => Ok(true),
            Ok(false) => Err(RelocationError::InsufficientFunds { price }),
            Err(err) => {
                warn!(%requester, %err, "cost check skipped");
                Ok(false)
            }
        }
    }

    fn settle(&self, requester: RequesterId, price: f64) {
        let Some(provider) = &self.cost else {
            return;
        };
        match provider.settle(requester, price) {
            Ok(()) => self.sink.send(requester, &Message::Payment { price }),
            Err(err) => warn!(%requester, %err, "payment failed after relocation"),
        }
    }

    /// Wait out `delay`. Returns `false` if the agent moved first.
    async fn wait_delay(&self, agent: &dyn Agent, delay: Duration, cancel_on_move: bool) -> bool {
        let elapsed = tokio::time::sleep(delay);
        if !cancel_on_move {
            elapsed.await;
            return true;
        }

        let origin = agent.location();
        let moved = async {
            let mut ticks = tokio::time::interval(self.options.poll_interval);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                if agent.location() != origin {
                    return;
                }
            }
        };

        tokio::select! {
            biased;
            () = elapsed => true,
            () = moved => false,
        }
    }

    /// Pop a usable candidate, falling back to a direct search.
    async fn acquire(
        &self,
        queue: &Arc<PrefetchQueue<W>>,
        requester: RequesterId,
    ) -> Result<(Position, Source), RelocationError> {
        while let Some(candidate) = queue.try_pop() {
            if !candidate.is_stale(self.options.revalidate_after)
                || revalidate(queue, &candidate.position).await
            {
                return Ok((candidate.position, Source::Queue));
            }
            debug!(position = %candidate.position, "stale candidate rejected");
            queue.fill(1).detach();
        }

        let region = queue.region();
        info!(region = %region.id, "queue depleted, searching directly");
        match queue.searcher().find(region).await {
            Ok(position) => Ok((position, Source::Search)),
            Err(err) => {
                self.sink.send(requester, &Message::Depleted);
                Err(err.into())
            }
        }
    }

    fn schedule_refill(&self, queue: &Arc<PrefetchQueue<W>>) {
        let queue = Arc::clone(queue);
        let delay = self.options.refill_delay;
        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            queue.fill(1).wait().await
        });
    }
}

/// Check a queued position against the current criteria on a fresh chunk.
async fn revalidate<W: WorldProvider>(queue: &PrefetchQueue<W>, position: &Position) -> bool {
    let searcher = queue.searcher();
    match searcher
        .world()
        .load_chunk(&position.region, position.chunk())
        .await
    {
        Ok(chunk) => searcher.is_safe(position, &*chunk),
        Err(err) => {
            warn!(%position, %err, "could not reload chunk of queued candidate");
            false
        }
    }
}

impl<W> std::fmt::Debug for RelocationScheduler<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelocationScheduler")
            .field("ledger", &self.ledger)
            .field("grace", &self.grace)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
