use coset_client::{
    ClientConfig, Coset, CosetError, CosetSchemeClient, OracleAccessor, UpdateOptions,
};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const USAGE: &str =
    "usage: coset-cli <read | needs-update | update [--force] | cost> [--chain]";

const COMMANDS: [&str; 4] = ["read", "needs-update", "update", "cost"];

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first().map(String::as_str).filter(|c| COMMANDS.contains(c)) else {
        eprintln!("{USAGE}");
        std::process::exit(2);
    };
    let force = args.iter().any(|a| a == "--force");
    // Read oracle state from the chain instead of the node's HTTP endpoints.
    let on_chain = args.iter().any(|a| a == "--chain");

    let output = match ClientConfig::from_env() {
        Ok(config) if on_chain => match Coset::from_config_on_chain(&config) {
            Ok(coset) => run(&coset, &config, command, force).await,
            Err(e) => Err(e),
        },
        Ok(config) => match Coset::from_config(&config) {
            Ok(coset) => run(&coset, &config, command, force).await,
            Err(e) => Err(e),
        },
        Err(e) => Err(e),
    };

    match output.and_then(|v| Ok(serde_json::to_string_pretty(&v)?)) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}

async fn run<A: OracleAccessor>(
    coset: &Coset<A, CosetSchemeClient>,
    config: &ClientConfig,
    command: &str,
    force: bool,
) -> Result<serde_json::Value, CosetError> {
    match command {
        "read" => Ok(serde_json::to_value(coset.read().await)?),
        "needs-update" => {
            let needed = coset.is_update_needed().await?;
            Ok(serde_json::json!({ "updateNeeded": needed }))
        }
        "update" => {
            let result = coset.update(UpdateOptions { force }).await;
            if !result.status {
                tracing::warn!(message = result.message.as_deref().unwrap_or(""), "update failed");
            }
            Ok(serde_json::to_value(result)?)
        }
        _ => {
            let cost = coset.update_cost().await?;
            Ok(serde_json::json!({
                "units": cost.units.to_string(),
                "amount": cost.to_string(),
                "token": config.payment_token.symbol(),
            }))
        }
    }
}
