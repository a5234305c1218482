//! End-to-end tests for the join/compensate saga.
//!
//! Wires the in-memory ledger, repositories, listeners, and dispatcher the
//! same way the API does, then drives delivery and asserts the reconciled
//! state of both aggregates.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{FreelancerId, ProjectId};
use dispatcher::{
    DispatcherConfig, EventDispatcher, EventListener, ListenerError, ListenerRegistry,
};
use domain::{
    FREELANCER_ASSIGNED, FreelancerRepository, FreelancerService, InMemoryFreelancerRepository,
    InMemoryProjectRepository, JoinProject, ProjectRepository, ProjectService, RegisterFreelancer,
    RegisterProject,
};
use ledger::{DispatchState, EventLedger, EventLedgerExt, InMemoryLedger, LedgerEntry};
use saga::FreelancerCommitmentListener;

struct Harness {
    ledger: InMemoryLedger,
    freelancers: InMemoryFreelancerRepository,
    projects: InMemoryProjectRepository,
    freelancer_service: FreelancerService<InMemoryFreelancerRepository>,
    project_service: ProjectService<InMemoryProjectRepository, InMemoryFreelancerRepository>,
    dispatcher: EventDispatcher<InMemoryLedger>,
}

fn fast_config() -> DispatcherConfig {
    DispatcherConfig {
        poll_interval: Duration::from_millis(2),
        batch_size: 16,
        max_attempts: 3,
        base_backoff: Duration::ZERO,
        max_backoff: Duration::ZERO,
    }
}

fn harness_with(
    config: DispatcherConfig,
    customize: impl FnOnce(
        &mut ListenerRegistry,
        InMemoryFreelancerRepository,
        InMemoryProjectRepository,
    ),
) -> Harness {
    let ledger = InMemoryLedger::new();
    let ledger_dyn: Arc<dyn EventLedger> = Arc::new(ledger.clone());
    let freelancers = InMemoryFreelancerRepository::new(ledger_dyn.clone());
    let projects = InMemoryProjectRepository::new(ledger_dyn);

    let mut registry = ListenerRegistry::new();
    customize(&mut registry, freelancers.clone(), projects.clone());

    let dispatcher = EventDispatcher::new(ledger.clone(), registry, config);
    let freelancer_service = FreelancerService::new(freelancers.clone());
    let project_service = ProjectService::new(projects.clone(), freelancers.clone());

    Harness {
        ledger,
        freelancers,
        projects,
        freelancer_service,
        project_service,
        dispatcher,
    }
}

fn harness() -> Harness {
    harness_with(fast_config(), |registry, freelancers, projects| {
        saga::register_listeners(registry, freelancers, projects);
    })
}

async fn register_freelancer(harness: &Harness, availability: u32) -> FreelancerId {
    let cmd = RegisterFreelancer::new("Ada", availability);
    let id = cmd.freelancer_id;
    harness.freelancer_service.register(cmd).await.unwrap();
    id
}

async fn register_project(harness: &Harness, required_hours: u32) -> ProjectId {
    let cmd = RegisterProject::new("Billing revamp", "Rework invoicing", required_hours);
    let id = cmd.project_id;
    harness.project_service.register(cmd).await.unwrap();
    id
}

/// Drives poll cycles until the ledger has no undelivered work left.
async fn settle(harness: &Harness) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let processed = harness.dispatcher.poll_once().await.unwrap();
            if processed == 0 && harness.ledger.pending_count().await.unwrap() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("saga did not settle in time");
}

#[tokio::test]
async fn happy_path_reduces_availability_and_keeps_commitment() {
    let harness = harness();
    let freelancer_id = register_freelancer(&harness, 40).await;
    let project_id = register_project(&harness, 100).await;

    harness
        .project_service
        .join(JoinProject::new(project_id, freelancer_id, 30))
        .await
        .unwrap();

    settle(&harness).await;

    let freelancer = harness
        .freelancers
        .find_by_id(freelancer_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(freelancer.weekly_availability(), 10);

    let project = harness
        .projects
        .find_by_id(project_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(project.commitment_for(freelancer_id), Some(30));

    assert!(harness.ledger.dead_letters().await.unwrap().is_empty());
    assert_eq!(harness.ledger.pending_count().await.unwrap(), 0);
}

#[tokio::test]
async fn shortfall_compensates_without_touching_availability() {
    let harness = harness();
    let freelancer_id = register_freelancer(&harness, 10).await;
    let project_id = register_project(&harness, 100).await;

    // The join appears immediately successful to the caller.
    let project = harness
        .project_service
        .join(JoinProject::new(project_id, freelancer_id, 30))
        .await
        .unwrap();
    assert_eq!(project.commitment_for(freelancer_id), Some(30));

    settle(&harness).await;

    // Afterwards the freelancer has disappeared from the committed list and
    // the availability never moved.
    let freelancer = harness
        .freelancers
        .find_by_id(freelancer_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(freelancer.weekly_availability(), 10);

    let project = harness
        .projects
        .find_by_id(project_id)
        .await
        .unwrap()
        .unwrap();
    assert!(!project.has_commitment(freelancer_id));

    // Join, compensation, and nothing else; all resolved.
    let dispatched = harness
        .ledger
        .entries_in_state(DispatchState::Dispatched)
        .await
        .unwrap();
    assert_eq!(dispatched.len(), 2);
}

#[tokio::test]
async fn redelivered_join_entry_does_not_double_subtract() {
    let harness = harness();
    let freelancer_id = register_freelancer(&harness, 40).await;
    let project_id = register_project(&harness, 100).await;

    harness
        .project_service
        .join(JoinProject::new(project_id, freelancer_id, 30))
        .await
        .unwrap();
    settle(&harness).await;

    // Simulate crash-and-resume redelivery: hand the already-dispatched
    // entry to a fresh listener instance, twice.
    let dispatched = harness
        .ledger
        .entries_in_state(DispatchState::Dispatched)
        .await
        .unwrap();
    let join_entry = dispatched
        .iter()
        .find(|e| e.event_type == domain::FREELANCER_JOINED_PROJECT)
        .unwrap();

    let listener = FreelancerCommitmentListener::new(harness.freelancers.clone());
    listener.handle(join_entry).await.unwrap();
    listener.handle(join_entry).await.unwrap();

    let freelancer = harness
        .freelancers
        .find_by_id(freelancer_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(freelancer.weekly_availability(), 10);
}

/// Wraps a listener with an artificial delivery delay.
struct DelayedListener<L> {
    inner: L,
    delay: Duration,
}

#[async_trait]
impl<L: EventListener> EventListener for DelayedListener<L> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn event_types(&self) -> &'static [&'static str] {
        self.inner.event_types()
    }

    async fn handle(&self, entry: &LedgerEntry) -> Result<(), ListenerError> {
        tokio::time::sleep(self.delay).await;
        self.inner.handle(entry).await
    }
}

#[tokio::test]
async fn sequential_joins_apply_in_production_order() {
    // A slow freelancer-side listener plus two concurrent workers: if the
    // claim protocol did not serialize per owner, the second join could be
    // applied while the first is still sleeping inside its listener.
    let harness = harness_with(fast_config(), |registry, freelancers, projects| {
        registry.register(Arc::new(DelayedListener {
            inner: FreelancerCommitmentListener::new(freelancers),
            delay: Duration::from_millis(50),
        }));
        registry.register(Arc::new(saga::ProjectCompensationListener::new(projects)));
    });

    let freelancer_id = register_freelancer(&harness, 40).await;
    let project_a = register_project(&harness, 100).await;
    let project_b = register_project(&harness, 100).await;

    harness
        .project_service
        .join(JoinProject::new(project_a, freelancer_id, 35))
        .await
        .unwrap();
    harness
        .project_service
        .join(JoinProject::new(project_b, freelancer_id, 10))
        .await
        .unwrap();

    let handle = harness.dispatcher.start(2);
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let project_b_settled = !harness
                .projects
                .find_by_id(project_b)
                .await
                .unwrap()
                .unwrap()
                .has_commitment(freelancer_id);
            let drained = harness.ledger.pending_count().await.unwrap() == 0;
            if project_b_settled && drained {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("saga did not settle in time");
    handle.shutdown().await;

    // Production order: the 35-hour join lands first (40 -> 5), then the
    // 10-hour join hits a shortfall and is compensated. The reversed order
    // would have kept project B and compensated project A instead.
    let freelancer = harness
        .freelancers
        .find_by_id(freelancer_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(freelancer.weekly_availability(), 5);

    let a = harness
        .projects
        .find_by_id(project_a)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(a.commitment_for(freelancer_id), Some(35));
}

/// A listener that never succeeds, for dead-letter tests.
struct AlwaysFailing;

#[async_trait]
impl EventListener for AlwaysFailing {
    fn name(&self) -> &'static str {
        "always-failing"
    }

    fn event_types(&self) -> &'static [&'static str] {
        &[FREELANCER_ASSIGNED]
    }

    async fn handle(&self, _entry: &LedgerEntry) -> Result<(), ListenerError> {
        Err(ListenerError::Transient("audit sink unavailable".to_string()))
    }
}

#[tokio::test]
async fn failing_listener_dead_letters_entry_but_saga_completes() {
    let harness = harness_with(fast_config(), |registry, freelancers, projects| {
        saga::register_listeners(registry, freelancers, projects);
        registry.register(Arc::new(AlwaysFailing));
    });

    let freelancer_id = register_freelancer(&harness, 40).await;
    let project_id = register_project(&harness, 100).await;

    harness
        .project_service
        .join(JoinProject::new(project_id, freelancer_id, 10))
        .await
        .unwrap();

    // Drive until the assigned entry exhausts its retry budget.
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            harness.dispatcher.poll_once().await.unwrap();
            if !harness.ledger.dead_letters().await.unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("entry was not dead-lettered in time");

    // The saga itself completed: availability reduced, commitment kept.
    let freelancer = harness
        .freelancers
        .find_by_id(freelancer_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(freelancer.weekly_availability(), 30);

    // The dead letter is terminal, queryable, and carries its history.
    let dead = harness.ledger.dead_letters().await.unwrap();
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].event_type, FREELANCER_ASSIGNED);
    assert_eq!(dead[0].attempts, fast_config().max_attempts);
    assert!(
        dead[0]
            .last_error
            .as_deref()
            .unwrap()
            .contains("audit sink unavailable")
    );

    // It is never claimed again.
    assert_eq!(harness.dispatcher.poll_once().await.unwrap(), 0);
}
