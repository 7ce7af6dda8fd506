//! Command-line arguments

use clap::Parser;
use std::path::PathBuf;

use crate::config::DEFAULT_CONFIG_FILE;

/// otp_proxy - reverse proxy guarded by one-time codes
#[derive(Parser, Debug)]
#[command(name = "otp_proxy")]
#[command(version)]
#[command(about = "Reverse proxy that forwards requests by path prefix behind a TOTP check")]
#[command(long_about = r#"
otp_proxy forwards /<name>/... to the upstream configured for <name>.
With "authenticated": true every proxied request must carry the current
one-time code in the x-google-code header.

Examples:
  # Serve with ./config.json
  otp_proxy

  # Create a secret for pass_key and enrol it in an authenticator app
  otp_proxy --generate-secret

  # Show the code that is valid right now
  otp_proxy -c /etc/otp_proxy/config.json --show-code
"#)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    pub verbose: bool,

    /// Print the current one-time code and the otpauth URI, then exit
    #[arg(short = 'q', long)]
    pub show_code: bool,

    /// Generate a new pass_key secret, print it and exit
    #[arg(short, long, conflicts_with = "show_code")]
    pub generate_secret: bool,
}

impl Cli {
    /// Default log filter when RUST_LOG is unset
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["otp_proxy"]).unwrap();

        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_FILE));
        assert!(!cli.verbose);
        assert!(!cli.show_code);
        assert!(!cli.generate_secret);
        assert_eq!(cli.log_filter(), "info");
    }

    #[test]
    fn test_short_flags() {
        let cli = Cli::try_parse_from(["otp_proxy", "-c", "/tmp/proxy.json", "-v", "-q"]).unwrap();

        assert_eq!(cli.config, PathBuf::from("/tmp/proxy.json"));
        assert!(cli.verbose);
        assert!(cli.show_code);
        assert_eq!(cli.log_filter(), "debug");
    }

    #[test]
    fn test_generate_and_show_conflict() {
        assert!(Cli::try_parse_from(["otp_proxy", "-g", "-q"]).is_err());
    }
}
