//! Output formatting for CLI.

use colored::Colorize;
use serde::Serialize;

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" | "text" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use 'human' or 'json'.", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Human => write!(f, "human"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Trait for renderable output.
pub trait Render {
    /// Render as human-readable string.
    fn render_human(&self) -> String;

    /// Render as JSON string.
    fn render_json(&self) -> String;

    /// Render in the specified format.
    fn render(&self, format: OutputFormat) -> String {
        match format {
            OutputFormat::Human => self.render_human(),
            OutputFormat::Json => self.render_json(),
        }
    }
}

// =============================================================================
// Output Types
// =============================================================================

/// Output for init command.
#[derive(Debug, Serialize)]
pub struct InitOutput {
    pub config_path: String,
    pub server_url: String,
    pub network: String,
}

impl Render for InitOutput {
    fn render_human(&self) -> String {
        format!(
            "{} {}\n{} {}\n{} {}",
            "Configuration saved to:".green().bold(),
            self.config_path,
            "Server:".bold(),
            self.server_url,
            "Network:".bold(),
            self.network
        )
    }

    fn render_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Output for route command.
#[derive(Debug, Serialize)]
pub struct RouteOutput {
    pub server_url: String,
    pub route_prefix: String,
    /// Whether the prefix is cached (discovery succeeded).
    pub resolved: bool,
}

impl Render for RouteOutput {
    fn render_human(&self) -> String {
        let prefix = if self.route_prefix.is_empty() {
            "(none)".dimmed().to_string()
        } else {
            self.route_prefix.clone()
        };
        let mut lines = vec![
            format!("{} {}", "Server:".bold(), self.server_url),
            format!("{} {}", "Route prefix:".bold(), prefix),
        ];
        if !self.resolved {
            lines.push(format!(
                "{}",
                "Discovery failed; using no prefix for this call.".yellow()
            ));
        }
        lines.join("\n")
    }

    fn render_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Output for quote command.
#[derive(Debug, Serialize)]
pub struct QuoteOutput {
    pub resource: String,
    /// Amount in minor units.
    pub amount: u64,
    /// Amount in whole tokens.
    pub display_amount: String,
    pub asset: String,
    pub symbol: Option<String>,
    pub pay_to: String,
    pub network: String,
    pub gasless: bool,
    pub description: Option<String>,
    pub cart_id: Option<String>,
}

impl Render for QuoteOutput {
    fn render_human(&self) -> String {
        let symbol = self.symbol.as_deref().unwrap_or("tokens");
        let mut lines = vec![
            format!("{} {}", "Resource:".bold(), self.resource),
            format!(
                "{} {} {}",
                "Price:".green().bold(),
                self.display_amount,
                symbol
            ),
            format!("{} {}", "Asset:".bold(), self.asset),
            format!("{} {}", "Pay to:".bold(), self.pay_to),
            format!("{} {}", "Network:".bold(), self.network),
        ];
        if self.symbol.is_none() {
            lines.push(format!(
                "{}",
                "Mint is not on the stable asset allow-list.".yellow()
            ));
        }
        if self.gasless {
            lines.push(format!("{} backend pays network fees", "Gasless:".bold()));
        }
        if let Some(cart_id) = &self.cart_id {
            lines.push(format!("{} {}", "Cart:".bold(), cart_id));
        }
        if let Some(description) = &self.description {
            lines.push(format!("{} {}", "Description:".bold(), description));
        }
        lines.join("\n")
    }

    fn render_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Output for pay command.
#[derive(Debug, Serialize)]
pub struct PaymentOutput {
    pub resource: String,
    pub payer: String,
    pub transaction_id: String,
    pub tx_hash: Option<String>,
    pub gasless: bool,
    pub stages: Vec<String>,
}

impl Render for PaymentOutput {
    fn render_human(&self) -> String {
        let mut lines = vec![
            format!("{} {}", "Paid:".green().bold(), self.resource),
            format!("{} {}", "Payer:".bold(), self.payer),
            format!("{} {}", "Transaction:".bold(), self.transaction_id),
        ];
        if let Some(tx_hash) = &self.tx_hash {
            if tx_hash != &self.transaction_id {
                lines.push(format!("{} {}", "Settled as:".bold(), tx_hash));
            }
        }
        if self.gasless {
            lines.push(format!("{} yes", "Gasless:".bold()));
        }
        lines.push(format!("{} {}", "Stages:".dimmed(), self.stages.join(" -> ")));
        lines.join("\n")
    }

    fn render_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Output for checkout command.
#[derive(Debug, Serialize)]
pub struct CheckoutOutput {
    pub resource: String,
    pub session_id: String,
    pub url: Option<String>,
}

impl Render for CheckoutOutput {
    fn render_human(&self) -> String {
        let mut lines = vec![
            format!("{} {}", "Checkout session:".green().bold(), self.session_id),
            format!("{} {}", "Resource:".bold(), self.resource),
        ];
        if let Some(url) = &self.url {
            lines.push(format!("{} {}", "Open:".bold(), url.underline()));
        }
        lines.join("\n")
    }

    fn render_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Output for credits command.
#[derive(Debug, Serialize)]
pub struct CreditsOutput {
    pub resource: String,
    pub hold_id: String,
    pub amount: u64,
    pub currency: Option<String>,
    pub transaction_id: String,
}

impl Render for CreditsOutput {
    fn render_human(&self) -> String {
        format!(
            "{} {}\n{} {} {}\n{} {}\n{} {}",
            "Paid with credits:".green().bold(),
            self.resource,
            "Amount:".bold(),
            self.amount,
            self.currency.as_deref().unwrap_or("credits"),
            "Hold:".bold(),
            self.hold_id,
            "Transaction:".bold(),
            self.transaction_id
        )
    }

    fn render_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Output for status command.
#[derive(Debug, Serialize)]
pub struct StatusOutput {
    pub signature: String,
    /// `None` when the cluster has not seen the signature.
    pub status: Option<String>,
    pub confirmed: bool,
}

impl Render for StatusOutput {
    fn render_human(&self) -> String {
        let status = match &self.status {
            Some(s) if self.confirmed => s.green().to_string(),
            Some(s) if s.starts_with("failed") => s.red().to_string(),
            Some(s) => s.yellow().to_string(),
            None => "not found".dimmed().to_string(),
        };
        format!(
            "{} {}\n{} {}",
            "Signature:".bold(),
            self.signature,
            "Status:".bold(),
            status
        )
    }

    fn render_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parse() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("TEXT".parse::<OutputFormat>().unwrap(), OutputFormat::Human);
        assert!("yaml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_payment_output_json() {
        let output = PaymentOutput {
            resource: "article-1".into(),
            payer: "payer".into(),
            transaction_id: "sig".into(),
            tx_hash: None,
            gasless: false,
            stages: vec!["idle".into(), "success".into()],
        };
        let json: serde_json::Value = serde_json::from_str(&output.render(OutputFormat::Json)).unwrap();
        assert_eq!(json["transaction_id"], "sig");
        assert_eq!(json["stages"][1], "success");
        assert!(output.render_human().contains("idle -> success"));
    }

    #[test]
    fn test_route_output_unresolved() {
        let output = RouteOutput {
            server_url: "https://pay.example.com".into(),
            route_prefix: String::new(),
            resolved: false,
        };
        assert!(output.render_human().contains("Discovery failed"));
    }
}
