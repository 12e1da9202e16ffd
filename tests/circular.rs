use ferrous_container::{
    Constructor, DiError, Injectable, Parameter, Resolver, ResolverCore, ServiceCollection,
    ServiceProvider, ServiceType,
};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

struct A;
struct B;
struct C;

impl Injectable for A {
    fn constructors() -> Vec<Constructor> {
        vec![Constructor::new(vec![Parameter::of::<B>()], |args| {
            args.get::<B>(0)?;
            Ok(A)
        })]
    }
}

impl Injectable for B {
    fn constructors() -> Vec<Constructor> {
        vec![Constructor::new(vec![Parameter::of::<C>()], |args| {
            args.get::<C>(0)?;
            Ok(B)
        })]
    }
}

impl Injectable for C {
    fn constructors() -> Vec<Constructor> {
        vec![Constructor::new(vec![Parameter::of::<A>()], |args| {
            args.get::<A>(0)?;
            Ok(C)
        })]
    }
}

fn cyclic_collection() -> ServiceCollection {
    let mut sc = ServiceCollection::new();
    sc.add_transient_self::<A>();
    sc.add_transient_self::<B>();
    sc.add_transient_self::<C>();
    sc
}

#[test]
fn test_three_node_cycle_reports_full_chain() {
    let sp = cyclic_collection().build();

    match sp.get::<A>() {
        Err(DiError::Circular(path)) => {
            assert_eq!(
                path,
                vec![
                    ServiceType::of::<A>(),
                    ServiceType::of::<B>(),
                    ServiceType::of::<C>(),
                    ServiceType::of::<A>(),
                ]
            );
        }
        other => panic!("expected Circular, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_cycle_message_is_readable() {
    let sp = cyclic_collection().build();
    let err = sp.get::<B>().err().expect("cycle");
    let message = err.to_string();
    assert!(message.starts_with("circular dependency:"));
    assert_eq!(message.matches(" -> ").count(), 3);
}

#[test]
fn test_failed_resolution_does_not_poison_later_ones() {
    struct Healthy;

    let mut sc = cyclic_collection();
    sc.add_singleton(Healthy);
    let sp = sc.build();

    assert!(sp.get::<A>().is_err());
    assert!(sp.get::<A>().is_err());
    assert!(sp.get_required::<Healthy>().is_ok());

    // a fresh scope is unaffected as well
    let scope = sp.create_scope();
    assert!(matches!(scope.get::<C>(), Err(DiError::Circular(_))));
    assert!(scope.get_required::<Healthy>().is_ok());
}

#[test]
fn test_self_referencing_singleton_factory_is_a_cycle_not_a_deadlock() {
    struct Node;

    let mut sc = ServiceCollection::new();
    sc.add_singleton_factory::<Node, _>(|r| {
        r.get_required::<Node>()?;
        Ok(Arc::new(Node))
    });
    let sp = sc.build();

    match sp.get::<Node>() {
        Err(DiError::Circular(path)) => assert_eq!(path.len(), 2),
        other => panic!("expected Circular, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_cycle_through_scoped_factories() {
    struct Left;
    struct Right;

    let mut sc = ServiceCollection::new();
    sc.add_scoped_factory::<Left, _>(|r| {
        r.get_required::<Right>()?;
        Ok(Arc::new(Left))
    });
    sc.add_scoped_factory::<Right, _>(|r| {
        r.get_required::<Left>()?;
        Ok(Arc::new(Right))
    });
    let sp = sc.build();
    let scope = sp.create_scope();

    assert!(matches!(scope.get::<Left>(), Err(DiError::Circular(_))));
}

#[test]
fn test_diamond_is_not_a_cycle() {
    struct Shared;
    struct Left {
        shared: Arc<Shared>,
    }
    struct Right {
        shared: Arc<Shared>,
    }
    struct Top {
        left: Arc<Left>,
        right: Arc<Right>,
    }

    let mut sc = ServiceCollection::new();
    sc.add_singleton_factory::<Shared, _>(|_| Ok(Arc::new(Shared)));
    sc.add_transient_factory::<Left, _>(|r| {
        Ok(Arc::new(Left {
            shared: r.get_required::<Shared>()?,
        }))
    });
    sc.add_transient_factory::<Right, _>(|r| {
        Ok(Arc::new(Right {
            shared: r.get_required::<Shared>()?,
        }))
    });
    sc.add_transient_factory::<Top, _>(|r| {
        Ok(Arc::new(Top {
            left: r.get_required::<Left>()?,
            right: r.get_required::<Right>()?,
        }))
    });
    let sp = sc.build();

    let top = sp.get_required::<Top>().unwrap();
    assert!(Arc::ptr_eq(&top.left.shared, &top.right.shared));
}

/// Runs `resolve` on a worker thread; a hang fails the test instead of
/// blocking the suite.
fn resolve_off_thread<F>(resolve: F) -> Result<(), DiError>
where
    F: FnOnce() -> Result<(), DiError> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .stack_size(8 * 1024 * 1024)
        .spawn(move || {
            let _ = tx.send(resolve());
        })
        .unwrap();
    rx.recv_timeout(Duration::from_secs(5))
        .expect("resolution did not finish")
}

#[test]
fn test_singleton_reaching_itself_through_the_root_provider_is_a_cycle() {
    struct Selfish;

    let mut sc = ServiceCollection::new();
    sc.add_singleton_factory::<Selfish, _>(|r| {
        r.get_required::<ServiceProvider>()?.get_required::<Selfish>()?;
        Ok(Arc::new(Selfish))
    });
    let sp = sc.build();

    let worker = sp.clone();
    match resolve_off_thread(move || worker.get::<Selfish>().map(|_| ())) {
        Err(DiError::Circular(path)) => {
            assert_eq!(path.last(), Some(&ServiceType::of::<Selfish>()));
        }
        other => panic!("expected Circular, got {:?}", other),
    }

    // the slot is released; a later request fails the same way
    assert!(matches!(sp.get::<Selfish>(), Err(DiError::Circular(_))));
}

#[test]
fn test_singleton_cycle_through_context_provider_is_detected() {
    struct Ping;
    struct Pong;

    let mut sc = ServiceCollection::new();
    sc.add_singleton_factory::<Ping, _>(|r| {
        r.provider().get_required::<Pong>()?;
        Ok(Arc::new(Ping))
    });
    sc.add_singleton_factory::<Pong, _>(|r| {
        r.provider().get_required::<Ping>()?;
        Ok(Arc::new(Pong))
    });
    let sp = sc.build();

    let worker = sp.clone();
    let result = resolve_off_thread(move || worker.get::<Ping>().map(|_| ()));
    assert!(matches!(result, Err(DiError::Circular(_))));
}

#[test]
fn test_transient_recursion_through_injected_resolver_is_bounded() {
    struct Echo;
    struct Quiet;

    let mut sc = ServiceCollection::new();
    sc.add_transient_factory::<Echo, _>(|r| {
        let resolver = r.get_required::<dyn ResolverCore>()?;
        resolver.get_required::<Echo>()?;
        Ok(Arc::new(Echo))
    });
    sc.add_transient_factory::<Quiet, _>(|r| {
        r.get_required::<ServiceProvider>()?;
        Ok(Arc::new(Quiet))
    });
    let sp = sc.build();

    let worker = sp.clone();
    let result = resolve_off_thread(move || {
        let scope = worker.create_scope();
        assert!(matches!(scope.get::<Echo>(), Err(DiError::DepthExceeded(_))));
        // the nesting budget is returned once the failed call unwinds
        worker.get_required::<Quiet>().map(|_| ())
    });
    assert!(result.is_ok());
}
