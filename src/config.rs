//! Command-line arguments, environment, and the resolved run configuration.
//!
//! Arguments are parsed with `arrrg`.  Sampling parameters can also be given
//! positionally, in the order temperature, max tokens, top-p, frequency
//! penalty, presence penalty, which is handy from an editor filter:
//!
//! ```text
//! :%!gpt --vim --gpt4 0.2 512
//! ```

use std::path::PathBuf;
use std::str::FromStr;

use arrrg_derive::CommandLine;

use crate::credentials::API_KEY_ENV;
use crate::error::{Error, Result};
use crate::types::{KnownModel, Model};

/// Environment variable naming the directory transcript logs go to.
pub const LOG_DIR_ENV: &str = "OPENAI_LOG_DIR";

/// Environment variable overriding the API root.
pub const BASE_URL_ENV: &str = "OPENAI_BASE_URL";

/// Usage line shown by `--help` and on usage errors.
pub const USAGE: &str = "gpt [OPTIONS] (--gpt3|--gpt4|--model MODEL) [TEMPERATURE [MAX_TOKENS [TOP_P [FREQUENCY_PENALTY [PRESENCE_PENALTY]]]]] < transcript";

const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_TOP_P: f32 = 1.0;

/// Command-line arguments for the gpt tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct Args {
    /// Save an API key to the key store, print it, and exit.
    #[arrrg(optional, "Store KEY in the key store and exit", "KEY")]
    pub keyring: Option<String>,

    /// Use gpt-3.5-turbo.
    #[arrrg(flag, "Use gpt-3.5-turbo")]
    pub gpt3: bool,

    /// Use gpt-4.
    #[arrrg(flag, "Use gpt-4")]
    pub gpt4: bool,

    /// Use any other model.
    #[arrrg(optional, "Use MODEL", "MODEL")]
    pub model: Option<String>,

    /// Frame the response with separators for use as an editor filter.
    #[arrrg(flag, "Vim mode: print separators around the response")]
    pub vim: bool,

    /// Maximum tokens in the response.
    #[arrrg(optional, "Max tokens in the response (default: 0, no limit)", "TOKENS")]
    pub max_tokens: Option<u32>,

    /// Sampling temperature.
    #[arrrg(optional, "Temperature (default: 0.7)", "FLOAT")]
    pub temperature: Option<String>,

    /// Nucleus sampling.
    #[arrrg(optional, "Top-p sampling (default: 1.0)", "FLOAT")]
    pub top_p: Option<String>,

    /// Frequency penalty.
    #[arrrg(optional, "Frequency penalty (default: 0)", "FLOAT")]
    pub frequency_penalty: Option<String>,

    /// Presence penalty.
    #[arrrg(optional, "Presence penalty (default: 0)", "FLOAT")]
    pub presence_penalty: Option<String>,
}

/// Values read from the process environment once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    /// `OPENAI_API_KEY`, if set.
    pub api_key: Option<String>,
    /// `OPENAI_LOG_DIR`, if set and non-empty.
    pub log_dir: Option<PathBuf>,
    /// `OPENAI_BASE_URL`, if set and non-empty.
    pub base_url: Option<String>,
}

impl Environment {
    /// Snapshot the variables this tool reads.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build an environment from an arbitrary lookup function.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.is_empty());
        Self {
            api_key: non_empty(API_KEY_ENV),
            log_dir: non_empty(LOG_DIR_ENV).map(PathBuf::from),
            base_url: non_empty(BASE_URL_ENV),
        }
    }
}

/// Resolved configuration for one chat round-trip.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Model to ask.
    pub model: Model,
    /// Token limit; 0 lets the service decide.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Nucleus sampling mass.
    pub top_p: f32,
    /// Frequency penalty.
    pub frequency_penalty: f32,
    /// Presence penalty.
    pub presence_penalty: f32,
    /// Print separators around the response on the terminal.
    pub vim: bool,
    /// Directory for transcript logs.
    pub log_dir: PathBuf,
    /// API root override.
    pub base_url: Option<String>,
}

impl Config {
    /// A configuration with default sampling for `model`, logging to the
    /// system temp directory.
    pub fn new(model: Model) -> Self {
        Self {
            model,
            max_tokens: 0,
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            vim: false,
            log_dir: std::env::temp_dir(),
            base_url: None,
        }
    }

    /// Sets the log directory.
    pub fn with_log_dir(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.log_dir = log_dir.into();
        self
    }

    /// Enables or disables vim mode.
    pub fn with_vim(mut self, vim: bool) -> Self {
        self.vim = vim;
        self
    }

    /// Sets the maximum tokens per response.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Apply positional overrides, in order: temperature, max tokens, top-p,
    /// frequency penalty, presence penalty.  Extra arguments are ignored.
    pub fn apply_positional<S: AsRef<str>>(&mut self, positional: &[S]) -> Result<()> {
        for (pos, arg) in positional.iter().enumerate() {
            let arg = arg.as_ref();
            match pos {
                0 => self.temperature = positional_value(pos, arg)?,
                1 => self.max_tokens = positional_value(pos, arg)?,
                2 => self.top_p = positional_value(pos, arg)?,
                3 => self.frequency_penalty = positional_value(pos, arg)?,
                4 => self.presence_penalty = positional_value(pos, arg)?,
                _ => tracing::debug!(pos, arg, "ignoring extra positional argument"),
            }
        }
        Ok(())
    }
}

/// What the command line asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum Invocation {
    /// Save this key and exit.
    StoreKey(String),
    /// Run one chat round-trip.
    Chat(Config),
}

impl Invocation {
    /// Combine flags, positional arguments and environment.
    ///
    /// Positional values override flags.  Storing a key takes precedence over
    /// everything else; otherwise a model must be selected.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a value that does not parse or when no
    /// model was selected.
    pub fn resolve<S: AsRef<str>>(
        args: Args,
        positional: &[S],
        env: &Environment,
    ) -> Result<Self> {
        let model = if args.gpt3 {
            Some(Model::Known(KnownModel::Gpt35Turbo))
        } else if args.gpt4 {
            Some(Model::Known(KnownModel::Gpt4))
        } else {
            args.model.as_deref().map(|name| {
                name.parse::<Model>()
                    .unwrap_or_else(|never| match never {})
            })
        };

        let mut config = Config::new(model.clone().unwrap_or(Model::Known(KnownModel::Gpt4)))
            .with_vim(args.vim)
            .with_max_tokens(args.max_tokens.unwrap_or(0));
        if let Some(value) = args.temperature.as_deref() {
            config.temperature = flag_value("temperature", value)?;
        }
        if let Some(value) = args.top_p.as_deref() {
            config.top_p = flag_value("top-p", value)?;
        }
        if let Some(value) = args.frequency_penalty.as_deref() {
            config.frequency_penalty = flag_value("frequency-penalty", value)?;
        }
        if let Some(value) = args.presence_penalty.as_deref() {
            config.presence_penalty = flag_value("presence-penalty", value)?;
        }
        config.apply_positional(positional)?;

        if let Some(key) = args.keyring {
            return Ok(Invocation::StoreKey(key));
        }
        if model.is_none() {
            return Err(Error::validation(
                "no model selected: pass --gpt3, --gpt4 or --model MODEL",
                Some("model".to_string()),
            ));
        }
        if let Some(log_dir) = &env.log_dir {
            config.log_dir = log_dir.clone();
        }
        config.base_url = env.base_url.clone();
        Ok(Invocation::Chat(config))
    }
}

fn positional_value<T: FromStr>(pos: usize, arg: &str) -> Result<T> {
    arg.parse().map_err(|_| {
        Error::validation(
            format!("pos={pos} bad argument {arg}"),
            Some(format!("pos={pos}")),
        )
    })
}

fn flag_value<T: FromStr>(flag: &str, arg: &str) -> Result<T> {
    arg.parse().map_err(|_| {
        Error::validation(
            format!("--{flag}: bad argument {arg}"),
            Some(flag.to_string()),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const NONE: [&str; 0] = [];

    fn chat(args: Args, positional: &[&str]) -> Config {
        match Invocation::resolve(args, positional, &Environment::default()).unwrap() {
            Invocation::Chat(config) => config,
            other => panic!("expected chat, got {other:?}"),
        }
    }

    #[test]
    fn defaults() {
        let config = chat(
            Args {
                gpt4: true,
                ..Args::default()
            },
            &[],
        );
        assert_eq!(config.model, Model::Known(KnownModel::Gpt4));
        assert_eq!(config.max_tokens, 0);
        assert_eq!(config.temperature, 0.7);
        assert_eq!(config.top_p, 1.0);
        assert_eq!(config.frequency_penalty, 0.0);
        assert_eq!(config.presence_penalty, 0.0);
        assert!(!config.vim);
        assert_eq!(config.log_dir, std::env::temp_dir());
        assert_eq!(config.base_url, None);
    }

    #[test]
    fn gpt3_wins_over_gpt4_and_model() {
        let config = chat(
            Args {
                gpt3: true,
                gpt4: true,
                model: Some("other".to_string()),
                ..Args::default()
            },
            &[],
        );
        assert_eq!(config.model, Model::Known(KnownModel::Gpt35Turbo));
    }

    #[test]
    fn custom_model() {
        let config = chat(
            Args {
                model: Some("llama3:8b".to_string()),
                ..Args::default()
            },
            &[],
        );
        assert_eq!(config.model, Model::Custom("llama3:8b".to_string()));
    }

    #[test]
    fn missing_model_is_usage_error() {
        let err = Invocation::resolve(Args::default(), &NONE, &Environment::default())
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn keyring_needs_no_model() {
        let invocation = Invocation::resolve(
            Args {
                keyring: Some("sk-123".to_string()),
                ..Args::default()
            },
            &NONE,
            &Environment::default(),
        )
        .unwrap();
        assert_eq!(invocation, Invocation::StoreKey("sk-123".to_string()));
    }

    #[test]
    fn positional_overrides() {
        let config = chat(
            Args {
                gpt4: true,
                temperature: Some("0.1".to_string()),
                max_tokens: Some(9),
                ..Args::default()
            },
            &["0.3", "128", "0.9", "0.5", "-0.5", "ignored"],
        );
        assert_eq!(config.temperature, 0.3);
        assert_eq!(config.max_tokens, 128);
        assert_eq!(config.top_p, 0.9);
        assert_eq!(config.frequency_penalty, 0.5);
        assert_eq!(config.presence_penalty, -0.5);
    }

    #[test]
    fn bad_positional_reports_position() {
        let err = Invocation::resolve(
            Args {
                gpt4: true,
                ..Args::default()
            },
            &["0.3", "lots"],
            &Environment::default(),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "pos=1 bad argument lots");
    }

    #[test]
    fn max_tokens_must_be_integer() {
        let mut config = Config::new(Model::from("m"));
        assert!(config.apply_positional(&["0.5", "1.5"]).is_err());
        assert!(config.apply_positional(&["warm"]).is_err());
    }

    #[test]
    fn bad_flag_value() {
        let err = Invocation::resolve(
            Args {
                gpt4: true,
                top_p: Some("most".to_string()),
                ..Args::default()
            },
            &NONE,
            &Environment::default(),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "--top-p: bad argument most");
    }

    #[test]
    fn environment_lookup() {
        let env = Environment::from_lookup(|name| match name {
            "OPENAI_API_KEY" => Some("sk-env".to_string()),
            "OPENAI_LOG_DIR" => Some("/var/log/gpt".to_string()),
            "OPENAI_BASE_URL" => Some(String::new()),
            _ => None,
        });
        assert_eq!(env.api_key.as_deref(), Some("sk-env"));
        assert_eq!(env.log_dir, Some(PathBuf::from("/var/log/gpt")));
        assert_eq!(env.base_url, None);

        let config = match Invocation::resolve(
            Args {
                gpt3: true,
                vim: true,
                ..Args::default()
            },
            &NONE,
            &env,
        )
        .unwrap()
        {
            Invocation::Chat(config) => config,
            other => panic!("expected chat, got {other:?}"),
        };
        assert_eq!(config.log_dir, PathBuf::from("/var/log/gpt"));
        assert!(config.vim);
    }
}
