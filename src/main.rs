use anyhow::{anyhow, Result};
use devdnsd::error::Error::DNSError;
use devdnsd::{Config, RuleSet, Shared};
use is_terminal::IsTerminal;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_init();

    let mut first_args = std::env::args().take(2);
    let (program_name, config_file) = (
        first_args.next().unwrap_or("devdnsd".to_string()),
        first_args.next(),
    );

    let (config, rules) = config_init(&program_name, config_file)?;

    if std::io::stdout().is_terminal() {
        print_rules(&rules);
    }

    tracing::info!("DNS listening on UDP {}", &config.dns_udp_bind_addr);
    tracing::info!("DNS listening on TCP {}", &config.dns_tcp_bind_addr);
    if let Some(upstream) = config.passthrough {
        tracing::info!("passing unmatched queries through to {upstream}");
    }
    let dns_server = devdnsd::dns::new(config.clone(), rules).await?;
    let dns_handle = tokio::spawn(dns_server.block_until_done());

    tokio::select! {
        _ = signal::ctrl_c() => {
            tracing::info!("quitting from signal");
        },
        Ok(dns_res) = dns_handle => {
            if let Err(err) = dns_res {
                return Err(DNSError(err).into())
            }
        }
    }
    tracing::info!("goodbye");
    Ok(())
}

fn tracing_init() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "devdnsd=info".into()),
        )
        .init();
}

fn config_init(program_name: &str, config_file: Option<String>) -> Result<(Shared, RuleSet)> {
    match config_file {
        None => Err(anyhow!("usage: {program_name} /path/to/config.json")),
        Some(config_file) => {
            let (config, rules) = Config::load(&config_file)?;
            tracing::debug!("loaded config from {config_file}");
            Ok((Arc::new(config), rules))
        }
    }
}

fn print_rules(rules: &RuleSet) {
    println!("DevDNSd rules:");
    for (idx, rule) in rules.rules().iter().enumerate() {
        let types: Vec<&str> = rule
            .resolved_resource_classes()
            .iter()
            .map(|class| class.tag())
            .collect();
        let reply = match rule.source() {
            devdnsd::rules::ReplySource::Static(reply) => reply.as_str(),
            devdnsd::rules::ReplySource::Callback(_) => "<callback>",
        };
        println!("  {idx:>3}. {} [{}] -> {reply}", rule.pattern(), types.join(", "));
    }
}
