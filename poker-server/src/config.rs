//! Environment- and CLI-derived configuration (ambient, per SPEC_FULL §6.3).

use anyhow::{bail, Context, Result};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "poker-server")]
#[command(about = "Planning-poker room coordinator", long_about = None)]
pub struct Args {
    /// Address to bind the HTTP/WebSocket listener to.
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8080")]
    pub bind_addr: String,
}

/// One selectable guess value plus its client-facing label.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct GuessOption {
    pub guess: u32,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct GuessConfig {
    pub options: Vec<GuessOption>,
}

impl GuessConfig {
    /// Read `POSSIBLE_GUESSES` / `POSSIBLE_GUESSES_DESC` as equal-arity,
    /// comma-separated parallel lists. A mismatch (including one set
    /// but not the other) is a fatal startup error.
    pub fn from_env() -> Result<Self> {
        let guesses = std::env::var("POSSIBLE_GUESSES")
            .unwrap_or_else(|_| "0,1,2,3,5,8,13,21".to_string());
        let descriptions = std::env::var("POSSIBLE_GUESSES_DESC")
            .unwrap_or_else(|_| "0,1,2,3,5,8,13,21".to_string());
        Self::parse(&guesses, &descriptions)
    }

    fn parse(guesses: &str, descriptions: &str) -> Result<Self> {
        let guesses: Vec<&str> = guesses.split(',').map(str::trim).collect();
        let descriptions: Vec<&str> = descriptions.split(',').map(str::trim).collect();
        if guesses.len() != descriptions.len() {
            bail!(
                "POSSIBLE_GUESSES has {} entries but POSSIBLE_GUESSES_DESC has {}",
                guesses.len(),
                descriptions.len()
            );
        }
        let options = guesses
            .iter()
            .zip(descriptions.iter())
            .map(|(g, d)| {
                let guess = g
                    .parse::<u32>()
                    .with_context(|| format!("`{g}` is not a valid guess integer"))?;
                Ok(GuessOption {
                    guess,
                    description: d.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(GuessConfig { options })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatched_arity_is_rejected() {
        assert!(GuessConfig::parse("0,1,2", "zero,one").is_err());
    }

    #[test]
    fn non_integer_guess_is_rejected() {
        assert!(GuessConfig::parse("zero,one", "zero,one").is_err());
    }

    #[test]
    fn matching_lists_parse_in_order() {
        let config = GuessConfig::parse("0,1,2", "none,one,two").unwrap();
        assert_eq!(
            config.options,
            vec![
                GuessOption { guess: 0, description: "none".to_string() },
                GuessOption { guess: 1, description: "one".to_string() },
                GuessOption { guess: 2, description: "two".to_string() },
            ]
        );
    }
}
