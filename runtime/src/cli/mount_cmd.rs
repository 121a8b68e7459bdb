//! `travelers-map mount` — several views racing to initialize on one guard.

use crate::cli::output::{self, Styled};
use crate::cli::AppContext;
use crate::session::SessionStatus;
use anyhow::{bail, Result};
use std::time::{Duration, Instant};

pub async fn run(ctx: &AppContext, views: usize, unmount_after: Option<u64>) -> Result<()> {
    if views == 0 {
        bail!("--views must be at least 1");
    }
    let s = Styled::new();
    let start = Instant::now();
    output::print_header(&s);

    let mut tasks = Vec::with_capacity(views);
    for view in 0..views {
        let mut controller = ctx.controller(ctx.config.controller_options());
        if view == 0 {
            if let Some(ms) = unmount_after {
                let teardown = controller.teardown_signal();
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(ms)).await;
                    teardown.trigger();
                });
            }
        }
        let (center, zoom) = (ctx.config.center, ctx.config.zoom);
        tasks.push(tokio::spawn(async move {
            let outcome = controller.initialize(center, zoom).await.map(|s| s.id.clone());
            let status = controller.status().clone();
            controller.unmount();
            (view, outcome, status)
        }));
    }

    let mut rows = Vec::with_capacity(views);
    for joined in futures::future::join_all(tasks).await {
        rows.push(joined?);
    }

    if output::is_json() {
        let views: Vec<_> = rows
            .iter()
            .map(|(view, outcome, status)| {
                serde_json::json!({
                    "view": view,
                    "session_id": outcome.as_ref().ok(),
                    "error": outcome.as_ref().err().map(|e| e.to_string()),
                    "status": format!("{status:?}"),
                })
            })
            .collect();
        output::print_json(&serde_json::json!({
            "bootstraps": ctx.guard.load_count(),
            "polls": ctx.guard.poll_count(),
            "views": views,
        }));
        return Ok(());
    }

    for (view, outcome, status) in &rows {
        let label = format!("view {view}");
        match (outcome, status) {
            (Ok(id), _) => output::print_check(s.ok_sym(), &label, &s.dim(id)),
            (Err(_), SessionStatus::Unmounted) => {
                output::print_check(s.warn_sym(), &label, "unmounted before ready")
            }
            (Err(e), _) => output::print_check(s.fail_sym(), &label, &format!("{} ({e})", e.user_message())),
        }
    }
    eprintln!();
    eprintln!(
        "  SDK bootstraps: {}  {}",
        s.green(&ctx.guard.load_count().to_string()),
        s.dim(&format!("({})", output::format_elapsed(start.elapsed().as_millis())))
    );
    Ok(())
}
