//! Hosted card checkout command.

use cedros_checkout::CheckoutRequest;

use crate::context::CliContext;
use crate::error::CliResult;
use crate::output::{CheckoutOutput, OutputFormat, Render};

/// Options for a checkout session.
#[derive(Debug, Default, Clone)]
pub struct CheckoutArgs {
    pub email: Option<String>,
    pub success_url: Option<String>,
    pub cancel_url: Option<String>,
    pub coupon: Option<String>,
}

/// Execute the checkout command.
pub async fn checkout(
    ctx: &CliContext,
    format: OutputFormat,
    resource: &str,
    args: CheckoutArgs,
) -> CliResult<String> {
    let mut request = CheckoutRequest::new(resource);
    if let Some(email) = args.email {
        request = request.with_email(email);
    }
    if let Some(code) = args.coupon {
        request = request.with_coupon(code);
    }
    request.success_url = args.success_url;
    request.cancel_url = args.cancel_url;

    let session = ctx.managers.checkout().create_session(&request).await?;

    let output = CheckoutOutput {
        resource: resource.to_string(),
        session_id: session.session_id,
        url: session.url,
    };
    Ok(output.render(format))
}
