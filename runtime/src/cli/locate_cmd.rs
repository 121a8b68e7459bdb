//! `travelers-map locate` — search a place or mark the device location.

use crate::cli::output::{self, Styled};
use crate::cli::AppContext;
use crate::geo::LatLng;
use anyhow::{anyhow, bail, Result};

pub async fn run(ctx: &AppContext, query: Option<&str>, device: Option<LatLng>) -> Result<()> {
    let s = Styled::new();
    output::print_header(&s);

    let mut controller = ctx.controller(ctx.config.controller_options());
    controller
        .initialize(ctx.config.center, ctx.config.zoom)
        .await
        .map_err(|e| anyhow!("{} ({e})", e.user_message()))?;

    let (label, position) = match (query, device) {
        (_, Some(position)) => {
            controller.show_device_location(position)?;
            ("Your location".to_string(), position)
        }
        (Some(query), None) => match controller.search(query).await? {
            Some(position) => (query.trim().to_string(), position),
            None => bail!("nothing to search for"),
        },
        (None, None) => bail!("pass a place to search for, or --device LAT,LNG"),
    };

    let (zoom, markers) = controller
        .session()
        .map(|session| (session.zoom, session.markers().len()))
        .unwrap_or_default();
    controller.unmount();

    if output::is_json() {
        output::print_json(&serde_json::json!({
            "label": label,
            "position": position,
            "zoom": zoom,
            "markers": markers,
        }));
        return Ok(());
    }

    eprintln!("  {}", s.bold(&label));
    output::print_check(s.ok_sym(), "Position", &s.cyan(&position.to_string()));
    output::print_check(s.ok_sym(), "Zoom", &zoom.to_string());
    Ok(())
}
