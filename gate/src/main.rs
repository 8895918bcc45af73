// gate/src/main.rs
use clap::{Args, Parser, Subcommand};
use common::models::{SignedProof, WalletAddress};
use common::{setup_tracing, Config};
use std::process::ExitCode;
use std::sync::Arc;

use gate::{oracle, AuthServerClient, GateController, GateState, HandoffError, ProofSource, ProviderTokenVerifier};

/// Drive the token gate against a running auth server
#[derive(Parser, Debug)]
#[command(name = "gate", version, about)]
struct Cli {
    /// Auth server base URL (overrides configuration)
    #[arg(long, env = "AUTH_SERVER_URL", global = true)]
    auth_server: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Wait for a pending proof, verify it and check token ownership
    Check {
        #[arg(long)]
        wallet: String,
        /// Check a single time instead of polling until the ceiling
        #[arg(long)]
        once: bool,
    },
    /// Remove any pending proof for a wallet
    Clear {
        #[arg(long)]
        wallet: String,
    },
    /// Store a signed proof on the auth server, as the signing popup would
    Submit(SubmitArgs),
}

#[derive(Args, Debug)]
struct SubmitArgs {
    #[arg(long)]
    wallet: String,
    #[arg(long)]
    message: String,
    #[arg(long)]
    signature: String,
}

const EXIT_DENIED: u8 = 1;
const EXIT_NO_PROOF: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    setup_tracing();

    let cli = Cli::parse();
    let config = Config::from_env();
    let auth_server_url = cli.auth_server.clone().unwrap_or_else(|| config.auth_server_url.clone());

    let client = match AuthServerClient::new(&auth_server_url, config.chain.oracle_timeout()) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("Failed to build auth server client: {}", e);
            return ExitCode::from(EXIT_NO_PROOF);
        },
    };

    match cli.command {
        Command::Check { wallet, once } => check(&config, client, &wallet, once).await,
        Command::Clear { wallet } => clear(&client, &wallet).await,
        Command::Submit(args) => submit(&client, args).await,
    }
}

async fn check(config: &Config, client: AuthServerClient, wallet: &str, once: bool) -> ExitCode {
    let oracle = match oracle::from_config(&config.chain) {
        Ok(oracle) => oracle,
        Err(e) => {
            tracing::error!("Invalid chain configuration: {}", e);
            return ExitCode::from(EXIT_NO_PROOF);
        },
    };

    let mut controller =
        GateController::new(oracle, config.chain.oracle_timeout()).with_proof_source(Arc::new(client));

    if let Some(provider) = &config.identity_provider {
        match ProviderTokenVerifier::from_config(provider) {
            Ok(verifier) => controller = controller.with_provider(verifier),
            Err(e) => tracing::warn!("Identity provider disabled: {}", e),
        }
    }

    let outcome = if once {
        controller.check_handoff(wallet).await
    } else {
        controller
            .await_handoff(
                wallet,
                config.handoff.server_poll_interval(),
                config.handoff.poll_ceiling(),
            )
            .await
    };

    match outcome {
        Ok(GateState::Authenticated) => {
            print_json(controller.authenticated_state());
            ExitCode::SUCCESS
        },
        Ok(GateState::Denied(reason)) => {
            println!("Access denied: {}", reason);
            ExitCode::from(EXIT_DENIED)
        },
        Ok(other) => {
            tracing::error!("Gate stopped in unexpected state {:?}", other);
            ExitCode::from(EXIT_DENIED)
        },
        Err(HandoffError::NotFound) => {
            println!("{}", common::messages::NO_PROOF_MESSAGE);
            ExitCode::from(EXIT_NO_PROOF)
        },
        Err(e) => {
            tracing::error!("Handoff failed: {}", e);
            ExitCode::from(EXIT_NO_PROOF)
        },
    }
}

async fn clear(client: &AuthServerClient, wallet: &str) -> ExitCode {
    let wallet = match WalletAddress::parse(wallet) {
        Ok(wallet) => wallet,
        Err(e) => {
            tracing::error!("Invalid wallet address: {}", e);
            return ExitCode::from(EXIT_NO_PROOF);
        },
    };

    match client.discard(&wallet).await {
        Ok(()) => {
            println!("Session cleared");
            ExitCode::SUCCESS
        },
        Err(e) => {
            tracing::error!("Failed to clear session for {}: {}", wallet, e);
            ExitCode::from(EXIT_NO_PROOF)
        },
    }
}

async fn submit(client: &AuthServerClient, args: SubmitArgs) -> ExitCode {
    let wallet = match WalletAddress::parse(&args.wallet) {
        Ok(wallet) => wallet,
        Err(e) => {
            tracing::error!("Invalid wallet address: {}", e);
            return ExitCode::from(EXIT_NO_PROOF);
        },
    };

    let proof = SignedProof::new(wallet, args.message, args.signature);
    match client.save(&proof).await {
        Ok(saved) => {
            print_json(&saved);
            ExitCode::SUCCESS
        },
        Err(e) => {
            tracing::error!("Failed to save proof: {}", e);
            ExitCode::from(EXIT_NO_PROOF)
        },
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => tracing::error!("Failed to render output: {}", e),
    }
}
