//! `travelers-map route <origin> <destination>` — driving distance and time.

use crate::cli::output::{self, Styled};
use crate::cli::AppContext;
use crate::geo::Place;
use crate::session::RouteFailurePolicy;
use anyhow::{anyhow, Result};
use std::time::Instant;
use tracing::debug;

pub async fn run(ctx: &AppContext, origin: &str, destination: &str, strict: bool) -> Result<()> {
    let s = Styled::new();
    let start = Instant::now();
    output::print_header(&s);

    let mut options = ctx.config.controller_options();
    if strict {
        options.route_failure = RouteFailurePolicy::Propagate;
    }
    let mut controller = ctx
        .controller(options)
        .on_route_calculated(|distance, time| debug!("route calculated: {distance}, {time}"));

    controller
        .initialize(ctx.config.center, ctx.config.zoom)
        .await
        .map_err(|e| anyhow!("{} ({e})", e.user_message()))?;

    let origin = Place::parse(origin);
    let destination = Place::parse(destination);
    let result = controller
        .compute_route(Some(&origin), Some(&destination))
        .await;
    controller.unmount();
    let result = result?;

    let elapsed = start.elapsed().as_millis();
    if output::is_json() {
        output::print_json(&serde_json::json!({
            "origin": origin,
            "destination": destination,
            "route": result,
            "elapsed_ms": elapsed as u64,
        }));
        return Ok(());
    }

    match result {
        Some(route) => {
            eprintln!("  {} {} {}", s.bold(&origin.to_string()), s.dim("->"), s.bold(&destination.to_string()));
            output::print_check(s.ok_sym(), "Distance", &route.distance_text);
            output::print_check(s.ok_sym(), "Time", &route.time_text);
        }
        None => {
            eprintln!(
                "  {} No driving route found from {origin} to {destination}.",
                s.warn_sym()
            );
        }
    }
    if !output::is_quiet() {
        eprintln!();
        eprintln!("  {}", s.dim(&format!("done in {}", output::format_elapsed(elapsed))));
    }
    Ok(())
}
