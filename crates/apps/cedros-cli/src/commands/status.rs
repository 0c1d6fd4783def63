//! Transaction status command.

use crate::context::CliContext;
use crate::error::CliResult;
use crate::output::{OutputFormat, Render, StatusOutput};

/// Execute the status command.
pub async fn status(ctx: &CliContext, format: OutputFormat, signature: &str) -> CliResult<String> {
    let status = ctx.managers.x402().transaction_status(signature).await?;

    let output = StatusOutput {
        signature: signature.trim().to_string(),
        confirmed: status.as_ref().is_some_and(|s| s.is_confirmed()),
        status: status.map(|s| s.to_string()),
    };
    Ok(output.render(format))
}
