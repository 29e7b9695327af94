use std::collections::BTreeMap;

use clap::Args;
use volley_core::types::ExecutionConfig;

use crate::output::OutputFormat;

#[derive(Debug, Args, Clone)]
pub struct OutputArgs {
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

/// Overrides applied on top of what the workspace document declares.
#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    /// Requests in flight at once (`concurrentCalls`).
    #[arg(long)]
    pub concurrency: Option<usize>,
    /// Pause between batches in milliseconds (`delayBetweenCalls`).
    #[arg(long)]
    pub delay_ms: Option<u64>,
    #[arg(long)]
    pub stop_on_failure: bool,
    /// Environment id to resolve `{{variables}}` against.
    #[arg(long)]
    pub env: Option<String>,
    /// Auth profile id applied to every request.
    #[arg(long)]
    pub auth: Option<String>,
    /// Per-request timeout in milliseconds.
    #[arg(long, default_value_t = 30000)]
    pub timeout: u64,
    /// Stream engine events to stdout as JSON lines.
    #[arg(long)]
    pub events: bool,
}

impl RunArgs {
    pub fn apply_to(&self, config: &mut ExecutionConfig) {
        if let Some(c) = self.concurrency {
            config.concurrent_calls = c;
        }
        if let Some(d) = self.delay_ms {
            config.delay_between_calls = d;
        }
        if self.stop_on_failure {
            config.stop_on_failure = true;
        }
    }
}

/// Parse repeated `--var KEY=VALUE` flags. Later keys win.
pub fn parse_vars(vars: &[String]) -> Result<BTreeMap<String, String>, String> {
    vars.iter()
        .map(|kv| {
            kv.split_once('=')
                .map(|(k, v)| (k.trim().to_string(), v.to_string()))
                .filter(|(k, _)| !k.is_empty())
                .ok_or_else(|| format!("invalid --var '{kv}', expected KEY=VALUE"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_vars_splits_on_first_equals() {
        let vars = parse_vars(&["a=1".to_string(), "q=x=y".to_string()]).unwrap();
        assert_eq!(vars["a"], "1");
        assert_eq!(vars["q"], "x=y");
    }

    #[test]
    fn parse_vars_rejects_missing_key() {
        assert!(parse_vars(&["=1".to_string()]).is_err());
        assert!(parse_vars(&["novalue".to_string()]).is_err());
    }
}
