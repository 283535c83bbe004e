//! Smoke tests for CLAP audio effects.
//!
//! Every `.clap` found under a directory is loaded, checked for the
//! `audio-effect` feature, fed mono and stereo audio, and processed again
//! with randomized parameters. Results land in a [`RunReport`].

pub mod audio;
pub mod checks;
pub mod clap_effect;
pub mod config;
pub mod discover;
pub mod effect;
pub mod error;
pub mod report;
pub mod runner;

pub use audio::{load_test_signal, synthesize, AudioBuffer};
pub use checks::{CheckKind, CheckOutcome, CheckStatus, RandomizationOptions};
pub use clap_effect::ClapEffect;
pub use config::ValidateConfig;
pub use discover::{default_search_paths, discover_in, discover_plugins, PluginBinary};
pub use effect::{EffectUnderTest, ParameterInfo};
pub use error::{AudioError, ValidationError};
pub use report::{PluginReport, RunReport};
pub use runner::Validator;
