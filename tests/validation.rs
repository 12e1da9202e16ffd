use ferrous_container::{
    Constructor, DiError, Injectable, Parameter, Resolver, ServiceCollection, ServiceProviderOptions,
    ServiceType,
};
use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn validating() -> ServiceProviderOptions {
    ServiceProviderOptions::new().with_validate_on_build(true)
}

struct Missing;

struct Consumer;

impl Injectable for Consumer {
    fn constructors() -> Vec<Constructor> {
        vec![Constructor::new(vec![Parameter::of::<Missing>()], |_| Ok(Consumer))]
    }
}

#[test]
fn test_default_options() {
    let options = ServiceProviderOptions::default();
    assert!(options.validate_scopes);
    assert!(!options.validate_on_build);
}

#[test]
fn test_build_without_validation_defers_errors() {
    let mut sc = ServiceCollection::new();
    sc.add_transient_self::<Consumer>();
    let sp = sc.build_with_options(ServiceProviderOptions::default()).unwrap();

    assert!(matches!(
        sp.get::<Consumer>(),
        Err(DiError::UnresolvedDependency { .. })
    ));
}

#[test]
fn test_validation_reports_the_failing_service() {
    let mut sc = ServiceCollection::new();
    sc.add_transient_self::<Consumer>();

    let err = sc.build_with_options(validating()).err().expect("validation error");
    match &err {
        DiError::Validation { service, source } => {
            assert_eq!(*service, ServiceType::of::<Consumer>());
            assert!(matches!(**source, DiError::UnresolvedDependency { .. }));
        }
        other => panic!("expected Validation, got {:?}", other),
    }
    assert!(err.source().is_some());
}

#[test]
fn test_validation_catches_captive_scoped_dependency() {
    struct Session;
    struct Cache;

    let mut sc = ServiceCollection::new();
    sc.add_scoped_factory::<Session, _>(|_| Ok(Arc::new(Session)));
    sc.add_singleton_factory::<Cache, _>(|r| {
        r.get_required::<Session>()?;
        Ok(Arc::new(Cache))
    });

    let err = sc.build_with_options(validating()).err().expect("validation error");
    assert!(matches!(
        err,
        DiError::Validation { source, .. } if matches!(*source, DiError::ScopedWithoutScope(_))
    ));
}

#[test]
fn test_validation_catches_cycles() {
    struct Ping;
    struct Pong;

    let mut sc = ServiceCollection::new();
    sc.add_transient_factory::<Ping, _>(|r| {
        r.get_required::<Pong>()?;
        Ok(Arc::new(Ping))
    });
    sc.add_transient_factory::<Pong, _>(|r| {
        r.get_required::<Ping>()?;
        Ok(Arc::new(Pong))
    });

    let err = sc.build_with_options(validating()).err().expect("validation error");
    assert!(matches!(
        err,
        DiError::Validation { source, .. } if matches!(*source, DiError::Circular(_))
    ));
}

#[test]
fn test_valid_graph_builds_and_warms_singletons() {
    let built = Arc::new(AtomicUsize::new(0));
    let counter = built.clone();

    struct Config;
    struct Session;

    let mut sc = ServiceCollection::new();
    sc.add_singleton_factory::<Config, _>(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(Config))
    });
    sc.add_scoped_factory::<Session, _>(|r| {
        r.get_required::<Config>()?;
        Ok(Arc::new(Session))
    });

    let sp = sc.build_with_options(validating()).unwrap();
    assert_eq!(built.load(Ordering::SeqCst), 1);

    sp.create_scope().get_required::<Session>().unwrap();
    sp.get_required::<Config>().unwrap();
    assert_eq!(built.load(Ordering::SeqCst), 1);
}
