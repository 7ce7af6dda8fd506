use anyhow::{Context, Result};
use clap::Parser;
use otp_proxy::auth::TotpVerifier;
use otp_proxy::cli::Cli;
use otp_proxy::config::{Settings, DEFAULT_USERNAME};
use otp_proxy::infrastructure::log_messages::application as messages;
use otp_proxy::Application;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter())),
        )
        .init();

    if cli.generate_secret {
        let secret = TotpVerifier::generate_secret();
        let verifier = TotpVerifier::new(&secret, 0, DEFAULT_USERNAME)?;
        println!("pass_key: {secret}");
        println!("otpauth:  {}", verifier.provisioning_uri());
        return Ok(());
    }

    let settings = Settings::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    if cli.show_code {
        let verifier = TotpVerifier::new(settings.pass_key()?, settings.totp_skew, &settings.username)?;
        println!("code:    {}", verifier.current_code()?);
        println!("otpauth: {}", verifier.provisioning_uri());
        return Ok(());
    }

    info!(config = %cli.config.display(), "{}", messages::STARTING);

    let app = Application::build(settings).await?;
    app.run().await?;

    Ok(())
}
