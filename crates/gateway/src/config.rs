//! Gateway configuration

use clap::{ArgAction, Parser, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "gateway")]
#[command(about = "Gateway - Validates agent envelopes at the trust boundary")]
pub struct GatewayConfig {
    /// Input file with captured envelopes ("-" reads stdin)
    #[arg(long, env = "ACP_GATEWAY_INPUT", default_value = "-")]
    pub input: String,

    /// Input framing
    #[arg(long, env = "ACP_GATEWAY_FORMAT", value_enum, default_value = "jsonl")]
    pub format: InputFormat,

    /// Accepted envelopes are written here as JSON Lines ("-" writes stdout)
    #[arg(long, env = "ACP_GATEWAY_OUTPUT", default_value = "-")]
    pub output: String,

    /// Optional JSON Lines file for rejection reports
    #[arg(long, env = "ACP_GATEWAY_REJECTIONS")]
    pub rejections: Option<String>,

    /// Whether to emit detailed rejection reasons
    #[arg(
        long,
        env = "ACP_GATEWAY_VERBOSE_REJECTIONS",
        default_value_t = true,
        action = ArgAction::Set
    )]
    pub verbose_rejections: bool,

    /// Exit with an error if any envelope was rejected
    #[arg(long, env = "ACP_GATEWAY_FAIL_ON_REJECT")]
    pub fail_on_reject: bool,

    /// Print a contract document and exit
    #[arg(long, value_enum)]
    pub print_contract: Option<ContractDocument>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InputFormat {
    /// One envelope per line
    Jsonl,
    /// text/event-stream, one envelope per event's data
    Sse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ContractDocument {
    Schema,
    Openapi,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_flags() {
        let config = GatewayConfig::try_parse_from([
            "gateway",
            "--input",
            "capture.sse",
            "--format",
            "sse",
            "--verbose-rejections",
            "false",
            "--fail-on-reject",
        ])
        .unwrap();

        assert_eq!(config.input, "capture.sse");
        assert_eq!(config.format, InputFormat::Sse);
        assert!(!config.verbose_rejections);
        assert!(config.fail_on_reject);
        assert_eq!(config.print_contract, None);
    }

    #[test]
    fn test_print_contract_values() {
        let config =
            GatewayConfig::try_parse_from(["gateway", "--print-contract", "openapi"]).unwrap();
        assert_eq!(config.print_contract, Some(ContractDocument::Openapi));
        assert!(GatewayConfig::try_parse_from(["gateway", "--format", "xml"]).is_err());
    }
}
