use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use scope_fnd::{
    ContextStore, Dispose, Error, RequestScope, ScopeContext, ScopeSettings, ScopedResource,
    StoreKind, ThreadStore,
};

#[derive(Debug)]
struct Session {
    id: usize,
    disposals: Arc<AtomicUsize>,
}

#[derive(Debug, thiserror::Error)]
#[error("session close failed")]
struct CloseError;

impl Dispose for Session {
    type Error = CloseError;

    fn dispose(&self) -> Result<(), CloseError> {
        self.disposals.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct Counters {
    created: Arc<AtomicUsize>,
    disposed: Arc<AtomicUsize>,
}

impl Counters {
    fn factory(&self) -> impl FnOnce() -> Session + '_ {
        move || Session {
            id: self.created.fetch_add(1, Ordering::SeqCst) + 1,
            disposals: Arc::clone(&self.disposed),
        }
    }

    fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    fn disposed(&self) -> usize {
        self.disposed.load(Ordering::SeqCst)
    }
}

fn context(namespace: &str, store: StoreKind) -> ScopeContext {
    ScopeContext::builder()
        .with_settings(ScopeSettings {
            namespace: namespace.into(),
            store,
            ..Default::default()
        })
        .build()
        .unwrap()
}

#[test]
fn test_db_session_scenario() {
    let ctx = context("scenario", StoreKind::Thread);
    let counters = Counters::default();

    let a = ctx.acquire_disposable::<Session, _, _>("db-session", counters.factory()).unwrap();
    assert!(a.is_root());
    assert_eq!(a.id, 1);
    assert_eq!(counters.created(), 1);

    let b = ctx.acquire_disposable::<Session, _, _>("db-session", counters.factory()).unwrap();
    assert!(!b.is_root());
    assert!(Arc::ptr_eq(&a.shared(), &b.shared()));
    assert_eq!(counters.created(), 1);

    b.close().unwrap();
    assert_eq!(counters.disposed(), 0);
    assert!(ThreadStore.get(a.slot()).is_some());

    let slot = a.slot().clone();
    a.close().unwrap();
    assert!(ThreadStore.get(&slot).is_none());
    assert_eq!(counters.disposed(), 1);

    let c = ctx.acquire_disposable::<Session, _, _>("db-session", counters.factory()).unwrap();
    assert!(c.is_root());
    assert_eq!(c.id, 2);
    assert_eq!(counters.created(), 2);
}

#[test]
fn test_deep_nesting_creates_once() {
    let ctx = context("deep", StoreKind::Thread);
    let counters = Counters::default();

    let holders: Vec<ScopedResource<Session>> = (0..8)
        .map(|_| {
            ctx.acquire_disposable::<Session, _, _>("deep", counters.factory())
                .unwrap()
        })
        .collect();

    assert_eq!(counters.created(), 1);
    assert_eq!(holders.iter().filter(|h| h.is_root()).count(), 1);
    assert!(holders[0].is_root());
    assert!(holders
        .iter()
        .all(|h| Arc::ptr_eq(&h.shared(), &holders[0].shared())));

    for holder in holders.into_iter().rev() {
        holder.close().unwrap();
    }
    assert_eq!(counters.disposed(), 1);
}

#[test]
fn test_root_release_disposes_once() {
    let ctx = context("once", StoreKind::Thread);
    let counters = Counters::default();

    let mut root = ctx.acquire_disposable::<Session, _, _>("once", counters.factory()).unwrap();
    root.release().unwrap();
    root.release().unwrap();
    root.release().unwrap();
    drop(root);

    assert_eq!(counters.disposed(), 1);
}

#[test]
fn test_scope_released_on_error_path() {
    fn failing_work(ctx: &ScopeContext, counters: &Counters) -> Result<(), Error> {
        let _session = ctx.acquire_disposable::<Session, _, _>("unwind", counters.factory())?;
        let _text = ctx.acquire::<String, _, _>("unwind", || None::<String>)?;
        Ok(())
    }

    let ctx = context("errors", StoreKind::Thread);
    let counters = Counters::default();

    let result = failing_work(&ctx, &counters);

    assert!(matches!(result, Err(Error::InvalidFactoryResult { .. })));
    assert_eq!(counters.disposed(), 1);
    let again = ctx.acquire_disposable::<Session, _, _>("unwind", counters.factory()).unwrap();
    assert!(again.is_root());
}

#[test]
fn test_failed_factory_leaves_no_binding() {
    let ctx = context("contract", StoreKind::Thread);
    let table = ThreadStore.current().unwrap();
    let before = table.len();

    let result = ctx.acquire::<Session, _, _>("contract", || None::<Session>);

    assert!(matches!(result, Err(Error::InvalidFactoryResult { .. })));
    assert_eq!(table.len(), before);
}

#[test]
fn test_key_and_type_partition_slots() {
    let ctx = context("partition", StoreKind::Thread);
    let counters = Counters::default();

    let first = ctx.acquire_disposable::<Session, _, _>("a", counters.factory()).unwrap();
    let second = ctx.acquire_disposable::<Session, _, _>("b", counters.factory()).unwrap();
    let text = ctx.acquire::<String, _, _>("a", || String::from("a")).unwrap();

    assert!(first.is_root());
    assert!(second.is_root());
    assert!(text.is_root());
    assert_eq!(counters.created(), 2);
}

#[test]
fn test_threads_get_their_own_instance() {
    let ctx = context("threads", StoreKind::Thread);
    let counters = Arc::new(Counters::default());

    let main = ctx
        .acquire_disposable::<Session, _, _>("shared", counters.factory())
        .unwrap();

    let worker = {
        let ctx = ctx.clone();
        let counters = Arc::clone(&counters);
        std::thread::spawn(move || {
            let held = ctx
                .acquire_disposable::<Session, _, _>("shared", counters.factory())
                .unwrap();
            (held.is_root(), held.id)
        })
    };
    let (worker_root, worker_id) = worker.join().unwrap();

    assert!(main.is_root());
    assert!(worker_root);
    assert_ne!(worker_id, main.id);
    assert_eq!(counters.disposed(), 1);
}

#[tokio::test]
async fn test_request_scope_shares_within_request() {
    let ctx = context("requests", StoreKind::Request);
    let counters = Arc::new(Counters::default());

    let handle = |ctx: ScopeContext, counters: Arc<Counters>| async move {
        let outer = ctx.acquire_disposable::<Session, _, _>("db", counters.factory()).unwrap();
        tokio::task::yield_now().await;
        let inner = ctx.acquire_disposable::<Session, _, _>("db", counters.factory()).unwrap();
        let same = Arc::ptr_eq(&outer.shared(), &inner.shared());
        inner.close().unwrap();
        outer.close().unwrap();
        same
    };

    let (first, second) = tokio::join!(
        RequestScope::run(handle(ctx.clone(), Arc::clone(&counters))),
        RequestScope::run(handle(ctx.clone(), Arc::clone(&counters))),
    );

    assert!(first && second);
    assert_eq!(counters.created(), 2);
    assert_eq!(counters.disposed(), 2);
}

#[test]
fn test_request_end_drops_unreleased_binding() {
    let ctx = context("leak", StoreKind::Request);
    let counters = Counters::default();

    RequestScope::run_sync(|| {
        let root = ctx.acquire_disposable::<Session, _, _>("leak", counters.factory()).unwrap();
        std::mem::forget(root);
    });

    RequestScope::run_sync(|| {
        let fresh = ctx.acquire_disposable::<Session, _, _>("leak", counters.factory()).unwrap();
        assert!(fresh.is_root());
    });
    assert_eq!(counters.created(), 2);
}

#[test]
fn test_global_context_defaults() {
    let outer = ScopedResource::<String>::new("global", || String::from("conn")).unwrap();
    let inner = ScopedResource::<String>::new("global", || String::from("other")).unwrap();

    assert!(outer.is_root());
    assert_eq!(inner.as_str(), "conn");
    assert_eq!(ScopeContext::global().settings(), &ScopeSettings::default());
}

#[test]
fn test_root_closed_inside_request_unbinds_thread_slot() {
    let ctx = context("auto-switch", StoreKind::Auto);
    let counters = Counters::default();

    let root = ctx
        .acquire_disposable::<Session, _, _>("db", counters.factory())
        .unwrap();
    let slot = root.slot().clone();

    RequestScope::run_sync(move || root.close()).unwrap();

    assert_eq!(counters.disposed(), 1);
    assert!(ThreadStore.get(&slot).is_none());
    let next = ctx
        .acquire_disposable::<Session, _, _>("db", counters.factory())
        .unwrap();
    assert!(next.is_root());
    assert_eq!(next.id, 2);
}

#[test]
fn test_root_released_on_another_thread_unbinds_origin() {
    let ctx = context("moved", StoreKind::Thread);
    let counters = Counters::default();

    let root = ctx
        .acquire_disposable::<Session, _, _>("db", counters.factory())
        .unwrap();
    let slot = root.slot().clone();

    std::thread::spawn(move || root.close()).join().unwrap().unwrap();

    assert_eq!(counters.disposed(), 1);
    assert!(ThreadStore.get(&slot).is_none());
    let next = ctx
        .acquire_disposable::<Session, _, _>("db", counters.factory())
        .unwrap();
    assert!(next.is_root());
    assert_eq!(counters.created(), 2);
}

#[test]
fn test_root_released_after_request_ended() {
    let ctx = context("escaped", StoreKind::Request);
    let counters = Counters::default();

    let root = RequestScope::run_sync(|| {
        ctx.acquire_disposable::<Session, _, _>("db", counters.factory())
            .unwrap()
    });

    root.close().unwrap();
    assert_eq!(counters.disposed(), 1);
}
