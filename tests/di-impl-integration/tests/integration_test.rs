//! Centralized integration tests for the resolution engine
use di_abstractions::{
    ContainerConfig, DiContainer, Injectable, LifetimeManager, MemberPlan, ParameterSource, Policy,
};
use di_impl::{DiContainerImpl, ExternallyControlledLifetimeManager, PolicyOrigin};
use infrastructure_common::{BuildKey, ContainerState, DependencyError, LifetimeKind};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::time::Duration;
use tokio::task::JoinSet;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// 构造计数的测试组件
#[derive(Debug)]
struct Counted;

fn counted_plan(constructions: Arc<AtomicUsize>, delay: Duration) -> MemberPlan {
    MemberPlan::builder::<Counted>()
        .constructor(vec![], move |_| {
            constructions.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(delay);
            Ok(Counted)
        })
        .build()
}

trait Greeter: Send + Sync {
    fn greet(&self) -> String;
}

#[derive(Debug)]
struct English;

impl Greeter for English {
    fn greet(&self) -> String {
        "hello".to_string()
    }
}

impl Injectable for English {
    fn member_plan() -> MemberPlan {
        MemberPlan::builder::<English>().constructor(vec![], |_| Ok(English)).build()
    }
}

#[derive(Debug)]
struct French;

impl Greeter for French {
    fn greet(&self) -> String {
        "bonjour".to_string()
    }
}

impl Injectable for French {
    fn member_plan() -> MemberPlan {
        MemberPlan::builder::<French>().constructor(vec![], |_| Ok(French)).build()
    }
}

#[derive(Debug)]
struct Clock;

impl Injectable for Clock {
    fn member_plan() -> MemberPlan {
        MemberPlan::builder::<Clock>().constructor(vec![], |_| Ok(Clock)).build()
    }
}

/// 属性注入的测试组件
struct Dashboard {
    clock: Mutex<Option<Arc<Clock>>>,
}

impl Injectable for Dashboard {
    fn member_plan() -> MemberPlan {
        MemberPlan::builder::<Dashboard>()
            .constructor(vec![], |_| {
                Ok(Dashboard {
                    clock: Mutex::new(None),
                })
            })
            .property("clock", ParameterSource::dependency::<Clock>(), |dashboard, p| {
                *dashboard.clock.lock() = Some(p.get::<Clock>(0)?);
                Ok(())
            })
            .build()
    }
}

struct Left;
struct Right;

fn cyclic_plans() -> (MemberPlan, MemberPlan) {
    let left = MemberPlan::builder::<Left>()
        .constructor(vec![ParameterSource::dependency::<Right>()], |p| {
            p.get::<Right>(0)?;
            Ok(Left)
        })
        .build();
    let right = MemberPlan::builder::<Right>()
        .constructor(vec![ParameterSource::dependency::<Left>()], |p| {
            p.get::<Left>(0)?;
            Ok(Right)
        })
        .build();
    (left, right)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_singleton_constructs_once() {
    init_tracing();
    let constructions = Arc::new(AtomicUsize::new(0));
    let container = DiContainerImpl::new();
    container
        .register_plan(
            None,
            counted_plan(constructions.clone(), Duration::from_millis(50)),
            LifetimeKind::ContainerControlled,
        )
        .unwrap();

    let barrier = Arc::new(Barrier::new(16));
    let mut tasks = JoinSet::new();
    for _ in 0..16 {
        let container = container.clone();
        let barrier = barrier.clone();
        tasks.spawn_blocking(move || {
            barrier.wait();
            container.resolve::<Counted>()
        });
    }

    let mut resolved = Vec::new();
    while let Some(result) = tasks.join_next().await {
        resolved.push(result.unwrap().unwrap());
    }

    assert_eq!(resolved.len(), 16);
    assert_eq!(constructions.load(Ordering::SeqCst), 1);
    assert!(resolved.iter().all(|value| Arc::ptr_eq(value, &resolved[0])));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_transient_resolves_are_distinct() {
    let constructions = Arc::new(AtomicUsize::new(0));
    let container = DiContainerImpl::new();
    container
        .register_plan(None, counted_plan(constructions.clone(), Duration::ZERO), LifetimeKind::Transient)
        .unwrap();

    let mut tasks = JoinSet::new();
    for _ in 0..8 {
        let container = container.clone();
        tasks.spawn_blocking(move || container.resolve::<Counted>());
    }
    let mut resolved = Vec::new();
    while let Some(result) = tasks.join_next().await {
        resolved.push(result.unwrap().unwrap());
    }
    resolved.push(container.resolve::<Counted>().unwrap());

    assert_eq!(constructions.load(Ordering::SeqCst), 9);
    for (i, a) in resolved.iter().enumerate() {
        for b in &resolved[i + 1..] {
            assert!(!Arc::ptr_eq(a, b));
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_waiters_share_failure_and_later_resolve_retries() {
    init_tracing();
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = attempts.clone();
    let plan = MemberPlan::builder::<Counted>()
        .constructor(vec![], move |_| {
            let attempt = counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(200));
            if attempt == 0 {
                anyhow::bail!("warming up");
            }
            Ok(Counted)
        })
        .build();
    let container = DiContainerImpl::new();
    container
        .register_plan(None, plan, LifetimeKind::ContainerControlled)
        .unwrap();

    let barrier = Arc::new(Barrier::new(4));
    let mut tasks = JoinSet::new();
    for _ in 0..4 {
        let container = container.clone();
        let barrier = barrier.clone();
        tasks.spawn_blocking(move || {
            barrier.wait();
            container
                .resolve::<Counted>()
                .map(|_| ())
                .map_err(|error| error.to_string())
        });
    }
    let mut failures = Vec::new();
    while let Some(result) = tasks.join_next().await {
        failures.push(result.unwrap().unwrap_err());
    }

    assert_eq!(attempts.load(Ordering::SeqCst), 1);
    assert_eq!(failures.len(), 4);
    assert!(failures.iter().all(|message| message == &failures[0]));
    assert!(failures[0].contains("warming up"));

    // 失败释放了构造权，新的解析可以重试
    let value = container.resolve::<Counted>().unwrap();
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert!(Arc::ptr_eq(&value, &container.resolve::<Counted>().unwrap()));
}

#[tokio::test]
async fn test_externally_controlled_rebuilds_after_release() {
    let constructions = Arc::new(AtomicUsize::new(0));
    let container = DiContainerImpl::new();
    container
        .register_plan(
            None,
            counted_plan(constructions.clone(), Duration::ZERO),
            LifetimeKind::ExternallyControlled,
        )
        .unwrap();

    let first = container.resolve::<Counted>().unwrap();
    let again = container.resolve::<Counted>().unwrap();
    assert!(Arc::ptr_eq(&first, &again));
    assert_eq!(constructions.load(Ordering::SeqCst), 1);

    drop(first);
    drop(again);
    let rebuilt = container.resolve::<Counted>().unwrap();
    assert_eq!(constructions.load(Ordering::SeqCst), 2);
    drop(rebuilt);
}

#[tokio::test]
async fn test_externally_controlled_forget_forces_rebuild() {
    let constructions = Arc::new(AtomicUsize::new(0));
    let container = DiContainerImpl::new();
    container
        .set_member_plan(None, counted_plan(constructions.clone(), Duration::ZERO))
        .unwrap();
    let manager = Arc::new(ExternallyControlledLifetimeManager::new());
    container
        .register_lifetime_manager(&BuildKey::of::<Counted>(), manager.clone())
        .unwrap();

    let held = container.resolve::<Counted>().unwrap();
    manager.forget();
    let fresh = container.resolve::<Counted>().unwrap();
    assert!(!Arc::ptr_eq(&held, &fresh));
    assert_eq!(constructions.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_cycle_fails_with_circular_dependency() {
    let container = DiContainerImpl::new();
    let (left, right) = cyclic_plans();
    container.register_plan(None, left, LifetimeKind::Transient).unwrap();
    container.register_plan(None, right, LifetimeKind::Transient).unwrap();

    let error = container.resolve::<Left>().err().unwrap();
    assert!(error.is_circular());
    match error.root_cause() {
        DependencyError::CircularDependency { dependency_chain } => {
            assert_eq!(dependency_chain.matches("Left").count(), 2);
            assert!(dependency_chain.contains("Right"));
        }
        other => panic!("unexpected error: {other}"),
    }

    let problems = container.validate().unwrap_err();
    assert!(problems.iter().any(DependencyError::is_circular));
}

#[tokio::test]
async fn test_cycle_between_singletons_fails_and_releases_guard() {
    let container = DiContainerImpl::new();
    let (left, right) = cyclic_plans();
    container.register_plan(None, left, LifetimeKind::ContainerControlled).unwrap();
    container.register_plan(None, right, LifetimeKind::ContainerControlled).unwrap();

    assert!(container.resolve::<Left>().err().unwrap().is_circular());
    // 构造权已释放，再次解析得到同样的错误而不是阻塞
    assert!(container.resolve::<Left>().err().unwrap().is_circular());
}

#[tokio::test]
async fn test_mapping_cycle_fails_fast() {
    let container = DiContainerImpl::new();
    container
        .register_redirect(BuildKey::of::<Left>(), BuildKey::of::<Right>(), LifetimeKind::Transient)
        .unwrap();
    container
        .register_redirect(BuildKey::of::<Right>(), BuildKey::of::<Left>(), LifetimeKind::Transient)
        .unwrap();

    assert!(container.resolve::<Left>().err().unwrap().is_circular());
}

#[derive(Debug, PartialEq)]
struct Tag(&'static str);

impl Policy for Tag {}

#[tokio::test]
async fn test_override_chain() {
    let parent = DiContainerImpl::new();
    let child = parent.create_child_container().unwrap();
    let key = BuildKey::of::<Clock>();

    child.set_policy(key.clone(), Tag("child")).unwrap();
    assert!(parent.get_policy::<Tag>(&key).is_none());
    assert!(child.clear_policy::<Tag>(&key));
    assert!(child.get_policy::<Tag>(&key).is_none());

    parent.set_policy(key.clone(), Tag("parent")).unwrap();
    child.set_policy(key.clone(), Tag("child")).unwrap();
    assert_eq!(child.get_policy::<Tag>(&key).as_deref(), Some(&Tag("child")));
    child.clear_policy::<Tag>(&key);
    assert_eq!(child.get_policy::<Tag>(&key).as_deref(), Some(&Tag("parent")));
    assert_eq!(
        child.policies().get_with_origin::<Tag>(&key).map(|(_, origin)| origin),
        Some(PolicyOrigin::Inherited { depth: 1 })
    );
}

#[tokio::test]
async fn test_child_registration_shadows_parent() {
    let parent = DiContainerImpl::new();
    let child = parent.create_child_container().unwrap();
    let parent_clock = Arc::new(Clock);
    let child_clock = Arc::new(Clock);
    parent
        .register_instance(None, parent_clock.clone(), LifetimeKind::ContainerControlled)
        .unwrap();
    child
        .register_instance(None, child_clock.clone(), LifetimeKind::ContainerControlled)
        .unwrap();

    assert!(Arc::ptr_eq(&child.resolve::<Clock>().unwrap(), &child_clock));
    assert!(Arc::ptr_eq(&parent.resolve::<Clock>().unwrap(), &parent_clock));

    child.policies().clear_all(&BuildKey::of::<Clock>());
    assert!(Arc::ptr_eq(&child.resolve::<Clock>().unwrap(), &parent_clock));
}

#[tokio::test]
async fn test_child_transient_registration_shadows_parent_singleton() {
    let parent = DiContainerImpl::new();
    parent.register_type::<Clock>(None, LifetimeKind::ContainerControlled).unwrap();
    let child = parent.create_child_container().unwrap();
    child.register_type::<Clock>(None, LifetimeKind::Transient).unwrap();

    let first = child.resolve::<Clock>().unwrap();
    let second = child.resolve::<Clock>().unwrap();
    assert!(!Arc::ptr_eq(&first, &second));

    let shared = parent.resolve::<Clock>().unwrap();
    assert!(Arc::ptr_eq(&shared, &parent.resolve::<Clock>().unwrap()));
    assert!(!Arc::ptr_eq(&shared, &first));
}

#[derive(Debug, PartialEq)]
struct Tagged(&'static str);

fn tagged_plan(tag: &'static str) -> MemberPlan {
    MemberPlan::builder::<Tagged>()
        .constructor(vec![], move |_| Ok(Tagged(tag)))
        .build()
}

#[tokio::test]
async fn test_child_plan_shadows_parent_redirect() {
    let parent = DiContainerImpl::new();
    parent.register_plan(None, tagged_plan("default"), LifetimeKind::Transient).unwrap();
    parent
        .register_redirect(BuildKey::named::<Tagged>("x"), BuildKey::of::<Tagged>(), LifetimeKind::Transient)
        .unwrap();
    let child = parent.create_child_container().unwrap();
    child
        .register_plan(Some("x"), tagged_plan("child-x"), LifetimeKind::Transient)
        .unwrap();

    assert_eq!(*child.resolve_named::<Tagged>("x").unwrap(), Tagged("child-x"));
    assert_eq!(*parent.resolve_named::<Tagged>("x").unwrap(), Tagged("default"));
    assert!(child.validate().is_ok());

    // 子容器重新映射后再次遮蔽自己的计划
    child
        .register_redirect(BuildKey::named::<Tagged>("x"), BuildKey::of::<Tagged>(), LifetimeKind::Transient)
        .unwrap();
    assert_eq!(*child.resolve_named::<Tagged>("x").unwrap(), Tagged("default"));
}

#[tokio::test]
async fn test_mapping_creates_implementation() {
    let container = DiContainerImpl::new();
    container
        .register_mapping::<dyn Greeter, English, _>(None, LifetimeKind::Transient, |english| english)
        .unwrap();

    let greeter = container.resolve_dyn::<dyn Greeter>().unwrap();
    assert_eq!(greeter.greet(), "hello");
    assert!(container.is_registered::<English>());
    assert_eq!(container.stats().constructions, 1);
}

#[tokio::test]
async fn test_mapping_lifetime_applies_to_requested_key() {
    let container = DiContainerImpl::new();
    container
        .register_mapping::<dyn Greeter, English, _>(None, LifetimeKind::ContainerControlled, |english| english)
        .unwrap();

    let first = container.resolve_dyn::<dyn Greeter>().unwrap();
    let second = container.resolve_dyn::<dyn Greeter>().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    // 映射目标本身是瞬时的
    let a = container.resolve::<English>().unwrap();
    let b = container.resolve::<English>().unwrap();
    assert!(!Arc::ptr_eq(&a, &b));
}

#[tokio::test]
async fn test_build_up_reinjects_transient_members() {
    let container = DiContainerImpl::new();
    container.register_type::<Clock>(None, LifetimeKind::Transient).unwrap();
    container.register_type::<Dashboard>(None, LifetimeKind::Transient).unwrap();

    let original = Arc::new(Clock);
    let dashboard = Arc::new(Dashboard {
        clock: Mutex::new(Some(original.clone())),
    });

    let built = container.build_up(dashboard.clone()).unwrap();
    assert!(Arc::ptr_eq(&built, &dashboard));
    let first = dashboard.clock.lock().clone().unwrap();
    assert!(!Arc::ptr_eq(&first, &original));

    container.build_up(dashboard.clone()).unwrap();
    let second = dashboard.clock.lock().clone().unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn test_build_up_skips_lifetime_cache() {
    let container = DiContainerImpl::new();
    container.register_type::<Clock>(None, LifetimeKind::ContainerControlled).unwrap();
    container.register_type::<Dashboard>(None, LifetimeKind::ContainerControlled).unwrap();

    let cached = container.resolve::<Dashboard>().unwrap();
    let external = Arc::new(Dashboard {
        clock: Mutex::new(None),
    });
    let built = container.build_up(external.clone()).unwrap();
    assert!(Arc::ptr_eq(&built, &external));
    assert!(!Arc::ptr_eq(&built, &cached));
    assert!(external.clock.lock().is_some());
}

#[tokio::test]
async fn test_reregistration_is_reflected_by_next_resolve() {
    let container = DiContainerImpl::new();
    container
        .register_mapping::<dyn Greeter, English, _>(None, LifetimeKind::ContainerControlled, |english| english)
        .unwrap();
    assert_eq!(container.resolve_dyn::<dyn Greeter>().unwrap().greet(), "hello");

    container
        .register_mapping::<dyn Greeter, French, _>(None, LifetimeKind::Transient, |french| french)
        .unwrap();
    let first = container.resolve_dyn::<dyn Greeter>().unwrap();
    let second = container.resolve_dyn::<dyn Greeter>().unwrap();
    assert_eq!(first.greet(), "bonjour");
    assert!(!Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn test_parent_reregistration_invalidates_child_plans() {
    let parent = DiContainerImpl::new();
    let child = parent.create_child_container().unwrap();
    parent
        .register_mapping::<dyn Greeter, English, _>(None, LifetimeKind::Transient, |english| english)
        .unwrap();
    assert_eq!(child.resolve_dyn::<dyn Greeter>().unwrap().greet(), "hello");

    parent
        .register_mapping::<dyn Greeter, French, _>(None, LifetimeKind::Transient, |french| french)
        .unwrap();
    assert_eq!(child.resolve_dyn::<dyn Greeter>().unwrap().greet(), "bonjour");
}

#[tokio::test]
async fn test_hierarchical_sharing() {
    let root = DiContainerImpl::new();
    root.register_type::<Clock>(None, LifetimeKind::Hierarchical).unwrap();

    let left = root.create_child_container().unwrap();
    let right = root.create_child_container().unwrap();
    let left_clock = left.resolve::<Clock>().unwrap();
    let right_clock = right.resolve::<Clock>().unwrap();
    assert!(!Arc::ptr_eq(&left_clock, &right_clock));
    assert!(Arc::ptr_eq(&left.resolve::<Clock>().unwrap(), &left_clock));

    // 孙容器复用最近祖先的值
    let nested = left.create_child_container().unwrap();
    assert!(Arc::ptr_eq(&nested.resolve::<Clock>().unwrap(), &left_clock));

    let root_clock = root.resolve::<Clock>().unwrap();
    let late = root.create_child_container().unwrap();
    assert!(Arc::ptr_eq(&late.resolve::<Clock>().unwrap(), &root_clock));
    assert!(Arc::ptr_eq(&right.resolve::<Clock>().unwrap(), &right_clock));

    // 子容器释放后，它缓存的值被丢弃
    let weak = Arc::downgrade(&left_clock);
    drop(left_clock);
    left.dispose();
    assert!(weak.upgrade().is_none());
}

#[tokio::test]
async fn test_pooled_round_robin() {
    let config = ContainerConfig::from_toml_str("default_pool_capacity = 2").unwrap();
    let container = DiContainerImpl::with_config(config);
    container.register_type::<Clock>(None, LifetimeKind::Pooled).unwrap();

    let values: Vec<_> = (0..5).map(|_| container.resolve::<Clock>().unwrap()).collect();
    assert!(!Arc::ptr_eq(&values[0], &values[1]));
    assert!(Arc::ptr_eq(&values[2], &values[0]));
    assert!(Arc::ptr_eq(&values[3], &values[1]));
    assert!(Arc::ptr_eq(&values[4], &values[0]));
    assert_eq!(container.stats().constructions, 2);
}

struct Pair {
    first: Arc<Clock>,
    second: Arc<Clock>,
}

#[tokio::test]
async fn test_per_resolve_shares_within_one_graph() {
    let container = DiContainerImpl::new();
    container.register_type::<Clock>(None, LifetimeKind::PerResolve).unwrap();
    let plan = MemberPlan::builder::<Pair>()
        .constructor(
            vec![ParameterSource::dependency::<Clock>(), ParameterSource::dependency::<Clock>()],
            |p| {
                Ok(Pair {
                    first: p.get::<Clock>(0)?,
                    second: p.get::<Clock>(1)?,
                })
            },
        )
        .build();
    container.register_plan(None, plan, LifetimeKind::Transient).unwrap();

    let one = container.resolve::<Pair>().unwrap();
    let two = container.resolve::<Pair>().unwrap();
    assert!(Arc::ptr_eq(&one.first, &one.second));
    assert!(!Arc::ptr_eq(&one.first, &two.first));
}

#[tokio::test]
async fn test_dispose_cascades_and_rejects() {
    let parent = DiContainerImpl::new();
    parent.register_type::<Clock>(None, LifetimeKind::ContainerControlled).unwrap();
    let child = parent.create_child_container().unwrap();
    child
        .register_mapping::<dyn Greeter, English, _>(None, LifetimeKind::ContainerControlled, |english| english)
        .unwrap();

    let external = Arc::new(French);
    parent
        .register_instance(Some("external"), external.clone(), LifetimeKind::ExternallyControlled)
        .unwrap();

    let clock = Arc::downgrade(&parent.resolve::<Clock>().unwrap());
    child.resolve_dyn::<dyn Greeter>().unwrap();
    assert_eq!(parent.stats().child_containers, 1);

    parent.dispose();
    assert_eq!(parent.state(), ContainerState::Disposed);
    assert_eq!(child.state(), ContainerState::Disposed);
    assert!(clock.upgrade().is_none());
    assert_eq!(Arc::strong_count(&external), 1);

    assert!(matches!(
        parent.resolve::<Clock>(),
        Err(DependencyError::ContainerDisposed { .. })
    ));
    assert!(matches!(
        child.resolve_dyn::<dyn Greeter>(),
        Err(DependencyError::ContainerDisposed { .. })
    ));
    assert!(parent.create_child_container().is_err());
}

#[tokio::test]
async fn test_child_dispose_leaves_parent_untouched() {
    let parent = DiContainerImpl::new();
    parent.register_type::<Clock>(None, LifetimeKind::ContainerControlled).unwrap();
    let child = parent.create_child_container().unwrap();

    let shared = child.resolve::<Clock>().unwrap();
    child.dispose();
    assert!(Arc::ptr_eq(&parent.resolve::<Clock>().unwrap(), &shared));
    assert_eq!(parent.state(), ContainerState::Active);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_dispose_waits_for_in_flight_resolution() {
    let started = Arc::new(AtomicBool::new(false));
    let finished = Arc::new(AtomicBool::new(false));
    let (entered, flag) = (started.clone(), finished.clone());
    let plan = MemberPlan::builder::<Counted>()
        .constructor(vec![], move |_| {
            entered.store(true, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(200));
            flag.store(true, Ordering::SeqCst);
            Ok(Counted)
        })
        .build();
    let container = DiContainerImpl::new();
    container.register_plan(None, plan, LifetimeKind::Transient).unwrap();

    let resolving = {
        let container = container.clone();
        tokio::task::spawn_blocking(move || container.resolve::<Counted>())
    };
    while !started.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let disposing = {
        let container = container.clone();
        let finished = finished.clone();
        tokio::task::spawn_blocking(move || {
            container.dispose();
            finished.load(Ordering::SeqCst)
        })
    };

    assert!(resolving.await.unwrap().is_ok());
    assert!(disposing.await.unwrap());
}

#[tokio::test]
async fn test_manager_reuse_is_rejected() {
    let container = DiContainerImpl::new();
    let manager: Arc<dyn LifetimeManager> = Arc::new(ExternallyControlledLifetimeManager::new());
    container
        .register_lifetime_manager(&BuildKey::of::<English>(), manager.clone())
        .unwrap();

    let other = container.create_child_container().unwrap();
    assert!(matches!(
        other.register_lifetime_manager(&BuildKey::of::<French>(), manager.clone()),
        Err(DependencyError::LifetimeManagerInUse { .. })
    ));
    other
        .register_lifetime_manager(&BuildKey::of::<French>(), manager.create_lifetime_manager())
        .unwrap();
}

#[tokio::test]
async fn test_enumerable_resolution() {
    let parent = DiContainerImpl::new();
    parent
        .register_mapping::<dyn Greeter, English, _>(Some("en"), LifetimeKind::Transient, |english| english)
        .unwrap();
    let child = parent.create_child_container().unwrap();
    child
        .register_mapping::<dyn Greeter, French, _>(Some("fr"), LifetimeKind::Transient, |french| french)
        .unwrap();
    child
        .register_mapping::<dyn Greeter, English, _>(None, LifetimeKind::Transient, |english| english)
        .unwrap();

    let greetings: Vec<String> = child
        .resolve_all_dyn::<dyn Greeter>()
        .unwrap()
        .iter()
        .map(|greeter| greeter.greet())
        .collect();
    assert_eq!(greetings, ["hello", "hello", "bonjour"]);
    assert_eq!(parent.resolve_all_dyn::<dyn Greeter>().unwrap().len(), 1);

    parent.register_type::<Clock>(Some("a"), LifetimeKind::Transient).unwrap();
    parent.register_type::<Clock>(Some("b"), LifetimeKind::Transient).unwrap();
    assert_eq!(parent.resolve_all::<Clock>().unwrap().len(), 2);
    assert!(parent.resolve_all::<Counted>().unwrap().is_empty());
}

#[tokio::test]
async fn test_named_registrations_fall_back_to_type_plan() {
    let container = DiContainerImpl::new();
    container.register_type::<Clock>(None, LifetimeKind::Transient).unwrap();
    container
        .register_lifetime_manager(
            &BuildKey::named::<Clock>("wall"),
            Arc::new(di_impl::ContainerControlledLifetimeManager::new()),
        )
        .unwrap();

    let wall = container.resolve_named::<Clock>("wall").unwrap();
    assert!(Arc::ptr_eq(&wall, &container.resolve_named::<Clock>("wall").unwrap()));
    assert!(!Arc::ptr_eq(&wall, &container.resolve::<Clock>().unwrap()));
}

#[tokio::test]
async fn test_validate_reports_missing_dependencies() {
    let container = DiContainerImpl::new();
    container.register_type::<Dashboard>(None, LifetimeKind::Transient).unwrap();
    container
        .register_redirect(BuildKey::of::<Left>(), BuildKey::of::<Right>(), LifetimeKind::Transient)
        .unwrap();

    let problems = container.validate().unwrap_err();
    assert_eq!(problems.len(), 2);
    assert!(problems
        .iter()
        .all(|problem| matches!(problem, DependencyError::RegistrationError { .. })));

    container.register_type::<Clock>(None, LifetimeKind::Transient).unwrap();
    container.policies().clear_all(&BuildKey::of::<Left>());
    assert!(container.validate().is_ok());
}

#[tokio::test]
async fn test_config_from_json_enables_monitoring() {
    let config = ContainerConfig::from_json_str(
        r#"{"enable_performance_monitoring": true, "max_resolution_depth": 16}"#,
    )
    .unwrap();
    let container = DiContainerImpl::with_config(config);
    container.register_type::<Clock>(None, LifetimeKind::Transient).unwrap();
    container.resolve::<Clock>().unwrap();

    let stats = container.stats();
    assert_eq!(stats.resolutions, 1);
    assert_eq!(stats.registered_components, 1);
    assert!(stats.average_resolution_time_ms >= 0.0);
    assert_eq!(container.config().max_resolution_depth, 16);
}
