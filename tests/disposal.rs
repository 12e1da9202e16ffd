use ferrous_container::{
    Constructor, DiError, Dispose, Injectable, Lifetime, Resolver, ServiceCollection,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

type Log = Arc<Mutex<Vec<String>>>;

struct Tracked {
    name: String,
    log: Log,
}

impl Dispose for Tracked {
    fn dispose(&self) {
        self.log.lock().unwrap().push(self.name.clone());
    }
}

fn tracked_factory(
    sc: &mut ServiceCollection,
    lifetime: Lifetime,
    name: &'static str,
    log: &Log,
) {
    let log = log.clone();
    sc.add_factory::<Tracked, _>(lifetime, move |r| {
        let tracked = Arc::new(Tracked {
            name: name.to_string(),
            log: log.clone(),
        });
        r.register_disposer(tracked.clone());
        Ok(tracked)
    });
}

#[test]
fn test_scope_disposes_scoped_instances_once() {
    let log: Log = Arc::default();
    let mut sc = ServiceCollection::new();
    tracked_factory(&mut sc, Lifetime::Scoped, "scoped", &log);
    let sp = sc.build();

    let scope = sp.create_scope();
    scope.get_required::<Tracked>().unwrap();
    scope.get_required::<Tracked>().unwrap();

    scope.dispose();
    scope.dispose();
    assert_eq!(*log.lock().unwrap(), vec!["scoped".to_string()]);
}

#[test]
fn test_dropping_last_scope_handle_disposes() {
    let log: Log = Arc::default();
    let mut sc = ServiceCollection::new();
    tracked_factory(&mut sc, Lifetime::Scoped, "scoped", &log);
    let sp = sc.build();

    {
        let scope = sp.create_scope();
        scope.get_required::<Tracked>().unwrap();
        assert!(log.lock().unwrap().is_empty());
    }
    assert_eq!(log.lock().unwrap().len(), 1);
}

#[test]
fn test_scope_disposal_leaves_singletons_alone() {
    let log: Log = Arc::default();
    let mut sc = ServiceCollection::new();
    tracked_factory(&mut sc, Lifetime::Singleton, "singleton", &log);
    let sp = sc.build();

    let scope = sp.create_scope();
    scope.get_required::<Tracked>().unwrap();
    scope.dispose();
    assert!(log.lock().unwrap().is_empty());

    sp.dispose();
    assert_eq!(*log.lock().unwrap(), vec!["singleton".to_string()]);
}

#[test]
fn test_transients_are_not_tracked() {
    let log: Log = Arc::default();
    let mut sc = ServiceCollection::new();
    tracked_factory(&mut sc, Lifetime::Transient, "transient", &log);
    let sp = sc.build();

    let scope = sp.create_scope();
    scope.get_required::<Tracked>().unwrap();
    scope.dispose();
    sp.dispose();
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn test_provider_dispose_is_idempotent_and_blocks_resolution() {
    let log: Log = Arc::default();
    let mut sc = ServiceCollection::new();
    tracked_factory(&mut sc, Lifetime::Singleton, "singleton", &log);
    let sp = sc.build();
    let scope = sp.create_scope();

    sp.get_required::<Tracked>().unwrap();
    sp.dispose();
    sp.dispose();

    assert!(sp.is_disposed());
    assert_eq!(log.lock().unwrap().len(), 1);
    assert!(matches!(
        sp.get::<Tracked>(),
        Err(DiError::Disposed("service provider"))
    ));
    assert!(matches!(
        scope.get::<Tracked>(),
        Err(DiError::Disposed(_))
    ));
}

#[test]
fn test_panicking_disposer_does_not_stop_the_others() {
    struct Exploding;
    impl Dispose for Exploding {
        fn dispose(&self) {
            panic!("dispose failed");
        }
    }

    let log: Log = Arc::default();
    let mut sc = ServiceCollection::new();
    tracked_factory(&mut sc, Lifetime::Scoped, "survivor", &log);
    sc.add_scoped_factory::<Exploding, _>(|r| {
        let value = Arc::new(Exploding);
        r.register_disposer(value.clone());
        Ok(value)
    });
    let sp = sc.build();

    let scope = sp.create_scope();
    scope.get_required::<Tracked>().unwrap();
    scope.get_required::<Exploding>().unwrap();
    scope.dispose();

    assert_eq!(*log.lock().unwrap(), vec!["survivor".to_string()]);
}

#[test]
fn test_disposal_runs_newest_first() {
    struct First(Log);
    struct Second(Log);
    impl Dispose for First {
        fn dispose(&self) {
            self.0.lock().unwrap().push("first".into());
        }
    }
    impl Dispose for Second {
        fn dispose(&self) {
            self.0.lock().unwrap().push("second".into());
        }
    }

    let log: Log = Arc::default();
    let mut sc = ServiceCollection::new();
    let first_log = log.clone();
    sc.add_scoped_factory::<First, _>(move |r| {
        let value = Arc::new(First(first_log.clone()));
        r.register_disposer(value.clone());
        Ok(value)
    });
    let second_log = log.clone();
    sc.add_scoped_factory::<Second, _>(move |r| {
        let value = Arc::new(Second(second_log.clone()));
        r.register_disposer(value.clone());
        Ok(value)
    });
    let sp = sc.build();

    let scope = sp.create_scope();
    scope.get_required::<First>().unwrap();
    scope.get_required::<Second>().unwrap();
    scope.dispose();

    assert_eq!(*log.lock().unwrap(), vec!["second".to_string(), "first".to_string()]);
}

#[test]
fn test_disposable_constructor_registers_itself() {
    static DISPOSED: AtomicUsize = AtomicUsize::new(0);

    struct Connection;
    impl Dispose for Connection {
        fn dispose(&self) {
            DISPOSED.fetch_add(1, Ordering::SeqCst);
        }
    }
    impl Injectable for Connection {
        fn constructors() -> Vec<Constructor> {
            vec![Constructor::disposable(Vec::new(), |_| Ok(Connection))]
        }
    }

    let mut sc = ServiceCollection::new();
    sc.add_scoped_self::<Connection>();
    let sp = sc.build();

    let scope = sp.create_scope();
    scope.get_required::<Connection>().unwrap();
    drop(scope);
    assert_eq!(DISPOSED.load(Ordering::SeqCst), 1);
}

#[test]
fn test_caller_supplied_instances_are_not_disposed() {
    let log: Log = Arc::default();
    let mut sc = ServiceCollection::new();
    sc.add_singleton(Tracked {
        name: "external".into(),
        log: log.clone(),
    });
    let sp = sc.build();

    sp.get_required::<Tracked>().unwrap();
    sp.dispose();
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn test_try_create_scope_fails_after_dispose() {
    let sp = ServiceCollection::new().build();
    assert!(sp.try_create_scope().is_ok());

    sp.dispose();
    assert!(matches!(
        sp.try_create_scope(),
        Err(DiError::Disposed("service provider"))
    ));
}

#[test]
fn test_singleton_finished_after_dispose_is_released_immediately() {
    let log: Log = Arc::default();
    let factory_log = log.clone();

    let mut sc = ServiceCollection::new();
    sc.add_singleton_factory::<Tracked, _>(move |r| {
        let tracked = Arc::new(Tracked {
            name: "late".to_string(),
            log: factory_log.clone(),
        });
        r.register_disposer(tracked.clone());
        // the provider goes away while this singleton is still being built
        r.provider().dispose();
        Ok(tracked)
    });
    let sp = sc.build();

    assert!(matches!(
        sp.get::<Tracked>(),
        Err(DiError::Disposed("service provider"))
    ));
    assert_eq!(*log.lock().unwrap(), vec!["late".to_string()]);
}
