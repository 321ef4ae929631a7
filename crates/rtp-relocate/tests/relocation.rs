use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use rtp_queue::{PrefetchQueue, RegionRegistry};
use rtp_relocate::{
    Agent, CostError, CostProvider, Message, Phase, RelocationError, RelocationFlags,
    RelocationRequest, RelocationScheduler, RequesterId, SchedulerOptions, Source,
};
use rtp_search::{LocationSearcher, SafetyCriteria};
use rtp_world::{Biome, ChunkPos, Column, Location, Material, MemoryWorld, Region, RegionId};

const CAPACITY: usize = 3;

struct TestAgent {
    id: RequesterId,
    location: Mutex<Location>,
    teleports: Mutex<Vec<(RegionId, Location)>>,
}

impl TestAgent {
    fn new(id: u64) -> Arc<Self> {
        Arc::new(Self {
            id: RequesterId(id),
            location: Mutex::new(Location::new(0.5, 70.0, 0.5)),
            teleports: Mutex::new(Vec::new()),
        })
    }

    fn step(&self) {
        self.location.lock().x += 1.0;
    }

    fn teleports(&self) -> usize {
        self.teleports.lock().len()
    }
}

impl Agent for TestAgent {
    fn id(&self) -> RequesterId {
        self.id
    }

    fn location(&self) -> Location {
        *self.location.lock()
    }

    fn teleport(&self, region: &RegionId, location: Location) {
        *self.location.lock() = location;
        self.teleports.lock().push((region.clone(), location));
    }
}

#[derive(Default)]
struct Wallets {
    balances: Mutex<HashMap<RequesterId, f64>>,
    offline: bool,
}

impl Wallets {
    fn with(requester: RequesterId, balance: f64) -> Self {
        let wallets = Self::default();
        wallets.balances.lock().insert(requester, balance);
        wallets
    }

    fn offline() -> Self {
        Self {
            offline: true,
            ..Self::default()
        }
    }
}

impl CostProvider for Wallets {
    fn has_sufficient_balance(&self, requester: RequesterId, amount: f64) -> Result<bool, CostError> {
        if self.offline {
            return Err(CostError::Unavailable("economy plugin missing".into()));
        }
        Ok(self.balances.lock().get(&requester).copied().unwrap_or(0.0) >= amount)
    }

    fn settle(&self, requester: RequesterId, amount: f64) -> Result<(), CostError> {
        if self.offline {
            return Err(CostError::Unavailable("economy plugin missing".into()));
        }
        *self.balances.lock().entry(requester).or_insert(0.0) -= amount;
        Ok(())
    }
}

fn grass() -> Column {
    Column::new(64, Material::GrassBlock, Biome::Plains)
}

fn lava() -> Column {
    Column::new(64, Material::Lava, Biome::Plains)
}

fn plains() -> Arc<MemoryWorld> {
    let world = Arc::new(MemoryWorld::new());
    world.add_region("overworld", grass());
    world
}

type Inbox = Arc<Mutex<Vec<(RequesterId, Message)>>>;

struct Harness {
    world: Arc<MemoryWorld>,
    searcher: Arc<LocationSearcher<MemoryWorld>>,
    queue: Arc<PrefetchQueue<MemoryWorld>>,
    inbox: Inbox,
    scheduler: Arc<RelocationScheduler<MemoryWorld>>,
}

impl Harness {
    async fn new() -> Self {
        Self::build(plains(), SafetyCriteria::standard(), 256, |scheduler| scheduler).await
    }

    async fn build(
        world: Arc<MemoryWorld>,
        criteria: SafetyCriteria,
        radius: u32,
        configure: impl FnOnce(RelocationScheduler<MemoryWorld>) -> RelocationScheduler<MemoryWorld>,
    ) -> Self {
        let searcher = Arc::new(LocationSearcher::new(world.clone(), criteria).with_seed(11));

        let registry = Arc::new(RegionRegistry::new(searcher.clone()));
        registry.configure(Region::new("overworld", 0, 0, radius), CAPACITY);
        let activation = registry.activate(&RegionId::new("overworld")).unwrap();
        activation.initial_fill.unwrap().wait().await;
        assert_eq!(activation.queue.len(), CAPACITY);

        let inbox = Inbox::default();
        let sink = inbox.clone();
        let scheduler = RelocationScheduler::new(registry, move |requester: RequesterId, message: &Message| {
            sink.lock().push((requester, message.clone()));
        });

        Self {
            world,
            searcher,
            queue: activation.queue,
            inbox,
            scheduler: Arc::new(configure(scheduler)),
        }
    }

    fn messages(&self, requester: RequesterId) -> Vec<Message> {
        self.inbox
            .lock()
            .iter()
            .filter(|(to, _)| *to == requester)
            .map(|(_, message)| message.clone())
            .collect()
    }
}

/// Let spawned refills run.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

#[tokio::test(start_paused = true)]
async fn immediate_relocation_uses_queue_and_refills() {
    let h = Harness::new().await;
    let agent = TestAgent::new(1);

    let relocation = h
        .scheduler
        .request_relocation(RelocationRequest::new(agent.clone(), "overworld"))
        .await
        .unwrap();

    assert_eq!(relocation.source, Source::Queue);
    assert_eq!(
        relocation.phases,
        vec![
            Phase::Idle,
            Phase::CostCheck,
            Phase::CooldownCheck,
            Phase::Immediate,
            Phase::Executing,
            Phase::PostProcess,
            Phase::Done,
        ]
    );
    assert_eq!(relocation.location.y, 65.5);
    assert_eq!(agent.location(), relocation.location);
    assert_eq!(agent.teleports(), 1);
    assert_eq!(h.queue.len(), CAPACITY - 1);
    assert_eq!(
        h.messages(agent.id()),
        vec![Message::Teleported {
            position: relocation.position
        }]
    );

    settle().await;
    assert_eq!(h.queue.len(), CAPACITY);
}

#[tokio::test(start_paused = true)]
async fn cooldown_blocks_until_elapsed() {
    let h = Harness::new().await;
    let agent = TestAgent::new(2);
    let request = || {
        RelocationRequest::new(agent.clone(), "overworld").with_cooldown(Duration::from_millis(1000))
    };

    h.scheduler.request_relocation(request()).await.unwrap();

    tokio::time::advance(Duration::from_millis(500)).await;
    let err = h.scheduler.request_relocation(request()).await.unwrap_err();
    let RelocationError::OnCooldown { remaining } = err else {
        panic!("expected cooldown, got {err:?}");
    };
    assert!(remaining > Duration::ZERO && remaining <= Duration::from_millis(500));
    assert!(matches!(
        h.messages(agent.id()).last(),
        Some(Message::Countdown { .. })
    ));
    assert_eq!(agent.teleports(), 1);

    tokio::time::advance(Duration::from_millis(501)).await;
    h.scheduler.request_relocation(request()).await.unwrap();
    assert_eq!(agent.teleports(), 2);
}

#[tokio::test(start_paused = true)]
async fn ignore_cooldown_flag_skips_the_check() {
    let h = Harness::new().await;
    let agent = TestAgent::new(3);
    let request = || {
        RelocationRequest::new(agent.clone(), "overworld")
            .with_cooldown(Duration::from_secs(60))
            .with_flags(RelocationFlags::IGNORE_COOLDOWN)
    };

    h.scheduler.request_relocation(request()).await.unwrap();
    h.scheduler.request_relocation(request()).await.unwrap();
    assert_eq!(agent.teleports(), 2);
}

#[tokio::test(start_paused = true)]
async fn moving_during_delay_cancels() {
    let h = Harness::new().await;
    let agent = TestAgent::new(4);
    let request = RelocationRequest::new(agent.clone(), "overworld")
        .with_delay(Duration::from_millis(200))
        .with_cooldown(Duration::from_secs(5))
        .cancel_on_move(true);

    let scheduler = h.scheduler.clone();
    let pending = tokio::spawn(async move { scheduler.request_relocation(request).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    agent.step();

    let err = pending.await.unwrap().unwrap_err();
    assert!(matches!(err, RelocationError::MovementCanceled));
    assert_eq!(agent.teleports(), 0);
    assert_eq!(h.queue.len(), CAPACITY, "canceled relocation consumed a position");
    assert!(h.scheduler.ledger().last(agent.id()).is_none());

    let messages = h.messages(agent.id());
    assert_eq!(
        messages
            .iter()
            .filter(|message| **message == Message::Canceled)
            .count(),
        1
    );
    assert!(matches!(messages[0], Message::Delay { .. }));

    // the canceled run left no cooldown behind
    h.scheduler
        .request_relocation(RelocationRequest::new(agent.clone(), "overworld"))
        .await
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn standing_still_through_delay_relocates() {
    let h = Harness::new().await;
    let agent = TestAgent::new(5);
    let start = tokio::time::Instant::now();

    let relocation = h
        .scheduler
        .request_relocation(
            RelocationRequest::new(agent.clone(), "overworld")
                .with_delay(Duration::from_millis(200))
                .cancel_on_move(true),
        )
        .await
        .unwrap();

    assert!(start.elapsed() >= Duration::from_millis(200));
    assert!(relocation.phases.contains(&Phase::DelayWait));
    assert_eq!(agent.teleports(), 1);
}

#[tokio::test(start_paused = true)]
async fn moving_without_cancel_on_move_still_relocates() {
    let h = Harness::new().await;
    let agent = TestAgent::new(17);
    let request = RelocationRequest::new(agent.clone(), "overworld")
        .with_delay(Duration::from_millis(200))
        .cancel_on_move(false);

    let scheduler = h.scheduler.clone();
    let start = tokio::time::Instant::now();
    let pending = tokio::spawn(async move { scheduler.request_relocation(request).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    agent.step();

    let relocation = pending.await.unwrap().unwrap();
    assert!(start.elapsed() >= Duration::from_millis(200));
    assert!(relocation.phases.contains(&Phase::DelayWait));
    assert_eq!(relocation.phases.last(), Some(&Phase::Done));
    assert_eq!(agent.teleports(), 1);
    assert!(!h.messages(agent.id()).contains(&Message::Canceled));
}

#[tokio::test(start_paused = true)]
async fn ignore_delay_moves_immediately() {
    let h = Harness::new().await;
    let agent = TestAgent::new(6);
    let start = tokio::time::Instant::now();

    let relocation = h
        .scheduler
        .request_relocation(
            RelocationRequest::new(agent.clone(), "overworld")
                .with_delay(Duration::from_secs(5))
                .with_flags(RelocationFlags::IGNORE_DELAY),
        )
        .await
        .unwrap();

    assert!(start.elapsed() < Duration::from_millis(100));
    assert!(relocation.phases.contains(&Phase::Immediate));
}

#[tokio::test(start_paused = true)]
async fn empty_queue_falls_back_to_search() {
    let h = Harness::new().await;
    while h.queue.try_pop().is_some() {}
    let agent = TestAgent::new(7);

    let relocation = h
        .scheduler
        .request_relocation(RelocationRequest::new(agent.clone(), "overworld"))
        .await
        .unwrap();

    assert_eq!(relocation.source, Source::Search);
    assert_eq!(relocation.position.region, RegionId::new("overworld"));
    assert_eq!(
        h.messages(agent.id()),
        vec![Message::Teleported {
            position: relocation.position
        }]
    );

    settle().await;
    assert_eq!(h.queue.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn depleted_notice_only_when_fallback_fails() {
    let h = Harness::new().await;
    while h.queue.try_pop().is_some() {}
    h.world.add_region("overworld", lava());
    let agent = TestAgent::new(16);

    let err = h
        .scheduler
        .request_relocation(RelocationRequest::new(agent.clone(), "overworld"))
        .await
        .unwrap_err();

    assert!(matches!(err, RelocationError::SearchNonConvergent(_)));
    assert_eq!(h.messages(agent.id()), vec![Message::Depleted, Message::Failed]);
    assert_eq!(agent.teleports(), 0);
    assert!(h.scheduler.ledger().is_empty());
}

#[tokio::test(start_paused = true)]
async fn stale_candidates_are_revalidated() {
    let region = RegionId::new("overworld");
    let refuge = ChunkPos::new(2, -1);
    let world = plains();
    // keep the initial fill out of the refuge chunk
    world.fill_chunk(&region, refuge, Column::new(64, Material::Sand, Biome::Desert));
    let h = Harness::build(
        world,
        SafetyCriteria::standard().disallow_biomes([Biome::Desert]),
        64,
        |scheduler| scheduler,
    )
    .await;

    // everything queued now sits on lava
    h.world.add_region(region.clone(), lava());
    h.world.fill_chunk(&region, refuge, grass());
    h.searcher.replace_criteria(SafetyCriteria::standard());

    let agent = TestAgent::new(8);
    let relocation = h
        .scheduler
        .request_relocation(RelocationRequest::new(agent.clone(), "overworld"))
        .await
        .unwrap();

    assert_eq!(relocation.source, Source::Search);
    assert_eq!(relocation.position.chunk(), refuge);
    assert!(!h.messages(agent.id()).contains(&Message::Depleted));

    // one replacement per discarded candidate plus the post-move refill
    settle().await;
    assert_eq!(h.queue.len(), CAPACITY);
    while let Some(candidate) = h.queue.try_pop() {
        assert_eq!(candidate.position.chunk(), refuge);
    }
}

#[tokio::test(start_paused = true)]
async fn fresh_candidates_skip_revalidation() {
    let h = Harness::build(plains(), SafetyCriteria::standard(), 256, |scheduler| {
        scheduler.with_options(SchedulerOptions {
            revalidate_after: Duration::from_secs(3600),
            ..SchedulerOptions::default()
        })
    })
    .await;
    h.world.add_region("overworld", lava());
    let loads = h.world.loads();

    let relocation = h
        .scheduler
        .request_relocation(RelocationRequest::new(TestAgent::new(9), "overworld"))
        .await
        .unwrap();

    assert_eq!(relocation.source, Source::Queue);
    assert_eq!(relocation.position.y, 64);
    assert_eq!(h.world.loads(), loads);
}

#[tokio::test(start_paused = true)]
async fn insufficient_funds_rejects_without_side_effects() {
    let agent = TestAgent::new(10);
    let wallets = Arc::new(Wallets::with(agent.id(), 5.0));
    let provider = wallets.clone();
    let h = Harness::build(plains(), SafetyCriteria::standard(), 256, move |scheduler| {
        scheduler.with_cost_provider(provider)
    })
    .await;

    let err = h
        .scheduler
        .request_relocation(RelocationRequest::new(agent.clone(), "overworld").with_cost(20.0))
        .await
        .unwrap_err();

    assert!(matches!(err, RelocationError::InsufficientFunds { .. }));
    assert_eq!(
        h.messages(agent.id()),
        vec![Message::InsufficientFunds { price: 20.0 }]
    );
    assert_eq!(agent.teleports(), 0);
    assert_eq!(h.queue.len(), CAPACITY);
    assert!(h.scheduler.ledger().is_empty());
    assert_eq!(wallets.balances.lock()[&agent.id()], 5.0);
}

#[tokio::test(start_paused = true)]
async fn cost_is_settled_after_the_move() {
    let agent = TestAgent::new(11);
    let wallets = Arc::new(Wallets::with(agent.id(), 50.0));
    let provider = wallets.clone();
    let h = Harness::build(plains(), SafetyCriteria::standard(), 256, move |scheduler| {
        scheduler.with_cost_provider(provider)
    })
    .await;

    h.scheduler
        .request_relocation(RelocationRequest::new(agent.clone(), "overworld").with_cost(20.0))
        .await
        .unwrap();

    assert_eq!(wallets.balances.lock()[&agent.id()], 30.0);
    let messages = h.messages(agent.id());
    assert!(messages.contains(&Message::Payment { price: 20.0 }));
}

#[tokio::test(start_paused = true)]
async fn unavailable_cost_provider_lets_relocation_through() {
    let agent = TestAgent::new(12);
    let h = Harness::build(plains(), SafetyCriteria::standard(), 256, |scheduler| {
        scheduler.with_cost_provider(Arc::new(Wallets::offline()))
    })
    .await;

    let relocation = h
        .scheduler
        .request_relocation(RelocationRequest::new(agent.clone(), "overworld").with_cost(20.0))
        .await
        .unwrap();

    assert_eq!(relocation.source, Source::Queue);
    assert!(
        !h.messages(agent.id())
            .iter()
            .any(|message| matches!(message, Message::Payment { .. }))
    );
}

#[tokio::test(start_paused = true)]
async fn costed_request_without_provider_goes_through_uncharged() {
    let h = Harness::new().await;
    let agent = TestAgent::new(18);

    let relocation = h
        .scheduler
        .request_relocation(RelocationRequest::new(agent.clone(), "overworld").with_cost(20.0))
        .await
        .unwrap();

    assert_eq!(relocation.source, Source::Queue);
    assert!(relocation.phases.contains(&Phase::CostCheck));
    assert_eq!(agent.teleports(), 1);
    assert_eq!(
        h.messages(agent.id()),
        vec![Message::Teleported {
            position: relocation.position
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn grace_timer_is_armed_after_success() {
    let h = Harness::new().await;
    let agent = TestAgent::new(13);

    h.scheduler
        .request_relocation(
            RelocationRequest::new(agent.clone(), "overworld").with_grace(Duration::from_secs(10)),
        )
        .await
        .unwrap();

    let timers = h.scheduler.grace_timers();
    assert!(timers.is_active(agent.id()));
    tokio::time::sleep(Duration::from_secs(11)).await;
    assert!(!timers.is_active(agent.id()));
}

#[tokio::test(start_paused = true)]
async fn second_request_while_pending_is_refused() {
    let h = Harness::new().await;
    let agent = TestAgent::new(14);

    let scheduler = h.scheduler.clone();
    let first = RelocationRequest::new(agent.clone(), "overworld").with_delay(Duration::from_secs(1));
    let pending = tokio::spawn(async move { scheduler.request_relocation(first).await });
    tokio::time::sleep(Duration::from_millis(10)).await;

    let err = h
        .scheduler
        .request_relocation(RelocationRequest::new(agent.clone(), "overworld"))
        .await
        .unwrap_err();
    assert!(matches!(err, RelocationError::AlreadyInProgress(id) if id == agent.id()));

    pending.await.unwrap().unwrap();
    assert_eq!(agent.teleports(), 1);
}

#[tokio::test(start_paused = true)]
async fn unknown_region_is_rejected() {
    let h = Harness::new().await;
    let err = h
        .scheduler
        .request_relocation(RelocationRequest::new(TestAgent::new(15), "the_end"))
        .await
        .unwrap_err();
    assert!(matches!(err, RelocationError::UnknownRegion(_)));
}
