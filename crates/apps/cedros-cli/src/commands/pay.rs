//! Pay command.

use std::path::Path;

use solana_sdk::signature::read_keypair_file;
use tracing::info;

use cedros_x402::{LocalKeypairWallet, PaymentRequest};

use crate::context::CliContext;
use crate::error::{CliError, CliResult};
use crate::output::{OutputFormat, PaymentOutput, Render};

/// Execute the pay command.
///
/// Gasless and unknown-mint handling come from the context's configuration.
pub async fn pay(
    ctx: &CliContext,
    format: OutputFormat,
    resource: &str,
    keypair_path: &Path,
    coupon: Option<&str>,
) -> CliResult<String> {
    let keypair = read_keypair_file(keypair_path).map_err(|e| CliError::Keypair {
        path: keypair_path.display().to_string(),
        reason: e.to_string(),
    })?;
    let wallet = LocalKeypairWallet::new(keypair);

    let mut request = PaymentRequest::resource(resource);
    if let Some(code) = coupon {
        request = request.with_coupon(code);
    }

    let receipt = ctx.managers.x402().pay(request, &wallet).await?;
    info!(
        resource = %receipt.resource,
        transaction_id = %receipt.settlement.transaction_id,
        gasless = receipt.gasless,
        "Payment settled"
    );

    let output = PaymentOutput {
        resource: receipt.resource,
        payer: receipt.payer,
        tx_hash: receipt.settlement.settlement.and_then(|s| s.tx_hash),
        transaction_id: receipt.settlement.transaction_id,
        gasless: receipt.gasless,
        stages: receipt.stages.iter().map(|s| s.to_string()).collect(),
    };
    Ok(output.render(format))
}
