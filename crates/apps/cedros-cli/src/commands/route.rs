//! Route-prefix discovery command.

use crate::context::CliContext;
use crate::error::CliResult;
use crate::output::{OutputFormat, Render, RouteOutput};

/// Execute the route command.
pub async fn route(ctx: &CliContext, format: OutputFormat) -> CliResult<String> {
    let routes = ctx.managers.routes();
    let route_prefix = routes.resolve().await;

    let output = RouteOutput {
        server_url: routes.server_url().to_string(),
        route_prefix,
        resolved: routes.cached().is_some(),
    };
    Ok(output.render(format))
}
