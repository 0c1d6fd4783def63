//! Credits payment command.

use tracing::info;

use crate::context::CliContext;
use crate::error::CliResult;
use crate::output::{CreditsOutput, OutputFormat, Render};

/// Execute the credits command: reserve a hold, then capture it.
pub async fn credits(
    ctx: &CliContext,
    format: OutputFormat,
    resource: &str,
    token: &str,
    coupon: Option<&str>,
) -> CliResult<String> {
    let manager = ctx.managers.credits();
    let hold = manager.create_hold(resource, coupon, token).await?;
    let settlement = manager.authorize(&hold.hold_id, resource, token).await?;
    info!(
        resource,
        hold_id = %hold.hold_id,
        transaction_id = %settlement.transaction_id,
        "Credits captured"
    );

    let output = CreditsOutput {
        resource: resource.to_string(),
        hold_id: hold.hold_id,
        amount: hold.amount,
        currency: hold.currency,
        transaction_id: settlement.transaction_id,
    };
    Ok(output.render(format))
}
