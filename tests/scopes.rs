use ferrous_container::{DiError, Resolver, ServiceCollection, ServiceProviderOptions};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct RequestContext {
    id: usize,
}

fn counting_collection(counter: Arc<AtomicUsize>) -> ServiceCollection {
    let mut sc = ServiceCollection::new();
    sc.add_scoped_factory::<RequestContext, _>(move |_| {
        Ok(Arc::new(RequestContext {
            id: counter.fetch_add(1, Ordering::SeqCst),
        }))
    });
    sc
}

#[test]
fn test_scoped_same_within_scope_distinct_across_scopes() {
    let counter = Arc::new(AtomicUsize::new(0));
    let sp = counting_collection(counter.clone()).build();

    let scope1 = sp.create_scope();
    let scope2 = sp.create_scope();

    let a1 = scope1.get_required::<RequestContext>().unwrap();
    let a2 = scope1.get_required::<RequestContext>().unwrap();
    let b = scope2.get_required::<RequestContext>().unwrap();

    assert!(Arc::ptr_eq(&a1, &a2));
    assert!(!Arc::ptr_eq(&a1, &b));
    assert_ne!(a1.id, b.id);
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[test]
fn test_scoped_from_root_fails_when_validating() {
    let sp = counting_collection(Arc::new(AtomicUsize::new(0))).build();

    match sp.get::<RequestContext>() {
        Err(DiError::ScopedWithoutScope(ty)) => assert!(ty.name().contains("RequestContext")),
        other => panic!("expected ScopedWithoutScope, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_scoped_from_root_without_validation_is_uncached() {
    let counter = Arc::new(AtomicUsize::new(0));
    let sp = counting_collection(counter.clone())
        .build_with_options(ServiceProviderOptions::new().with_validate_scopes(false))
        .unwrap();

    let a = sp.get_required::<RequestContext>().unwrap();
    let b = sp.get_required::<RequestContext>().unwrap();

    assert!(!Arc::ptr_eq(&a, &b));
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[test]
fn test_singletons_are_shared_by_every_scope() {
    struct Config;

    let mut sc = ServiceCollection::new();
    sc.add_singleton_factory::<Config, _>(|_| Ok(Arc::new(Config)));
    let sp = sc.build();

    let from_scope = sp.create_scope().get_required::<Config>().unwrap();
    let from_other = sp.create_scope().get_required::<Config>().unwrap();
    let from_root = sp.get_required::<Config>().unwrap();

    assert!(Arc::ptr_eq(&from_scope, &from_other));
    assert!(Arc::ptr_eq(&from_scope, &from_root));
}

#[test]
fn test_singleton_cannot_capture_scoped() {
    struct Session;
    struct Cache {
        _session: Arc<Session>,
    }

    let mut sc = ServiceCollection::new();
    sc.add_scoped_factory::<Session, _>(|_| Ok(Arc::new(Session)));
    sc.add_singleton_factory::<Cache, _>(|r| {
        Ok(Arc::new(Cache {
            _session: r.get_required::<Session>()?,
        }))
    });
    let sp = sc.build();
    let scope = sp.create_scope();

    // singleton dependencies resolve at the root, even when asked from a scope
    assert!(matches!(
        scope.get::<Cache>(),
        Err(DiError::ScopedWithoutScope(_))
    ));
}

#[test]
fn test_transient_in_scope_shares_scoped_dependency() {
    struct Connection;
    struct Repository {
        connection: Arc<Connection>,
    }

    let mut sc = ServiceCollection::new();
    sc.add_scoped_factory::<Connection, _>(|_| Ok(Arc::new(Connection)));
    sc.add_transient_factory::<Repository, _>(|r| {
        Ok(Arc::new(Repository {
            connection: r.get_required::<Connection>()?,
        }))
    });
    let sp = sc.build();
    let scope = sp.create_scope();

    let a = scope.get_required::<Repository>().unwrap();
    let b = scope.get_required::<Repository>().unwrap();
    assert!(!Arc::ptr_eq(&a, &b));
    assert!(Arc::ptr_eq(&a.connection, &b.connection));

    let other = sp.create_scope().get_required::<Repository>().unwrap();
    assert!(!Arc::ptr_eq(&a.connection, &other.connection));
}

#[test]
fn test_resolving_from_disposed_scope_fails() {
    let sp = counting_collection(Arc::new(AtomicUsize::new(0))).build();
    let scope = sp.create_scope();
    scope.get_required::<RequestContext>().unwrap();

    scope.dispose();
    assert!(scope.is_disposed());
    assert!(matches!(
        scope.get::<RequestContext>(),
        Err(DiError::Disposed("scope"))
    ));
}

#[test]
fn test_scope_clones_share_the_cache() {
    let sp = counting_collection(Arc::new(AtomicUsize::new(0))).build();
    let scope = sp.create_scope();
    let clone = scope.clone();

    let a = scope.get_required::<RequestContext>().unwrap();
    let b = clone.get_required::<RequestContext>().unwrap();
    assert!(Arc::ptr_eq(&a, &b));
}
