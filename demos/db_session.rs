use std::sync::atomic::{AtomicUsize, Ordering};

use scope_fnd::{Dispose, ScopeContext, ScopeSettings};

static OPENED: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug)]
struct DbSession {
    id: usize,
}

impl DbSession {
    fn open() -> Self {
        let id = OPENED.fetch_add(1, Ordering::SeqCst) + 1;
        println!("opening session {id}");
        Self { id }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("session {0} failed to close")]
struct CloseError(usize);

impl Dispose for DbSession {
    type Error = CloseError;

    fn dispose(&self) -> Result<(), CloseError> {
        println!("closing session {}", self.id);
        Ok(())
    }
}

fn load_order(ctx: &ScopeContext) -> Result<(), scope_fnd::Error> {
    let session = ctx.acquire_disposable::<DbSession, _, _>("db-session", DbSession::open)?;
    println!("load_order uses session {} (root={})", session.id, session.is_root());
    save_audit(ctx)?;
    session.close()
}

fn save_audit(ctx: &ScopeContext) -> Result<(), scope_fnd::Error> {
    let session = ctx.acquire_disposable::<DbSession, _, _>("db-session", DbSession::open)?;
    println!("save_audit uses session {} (root={})", session.id, session.is_root());
    Ok(())
}

fn main() -> Result<(), scope_fnd::Error> {
    let ctx = ScopeContext::builder()
        .with_settings(
            ScopeSettings::loader()
                .with_file("demos/scope.toml", false)
                .with_env("DEMO", "__")
                .load()?,
        )
        .build()?;

    // One session for the whole call tree
    load_order(&ctx)?;

    // The outer scope ended, so this opens a new one
    save_audit(&ctx)?;

    Ok(())
}
