#![forbid(unsafe_code)]

pub mod config;
pub mod counterexample;
pub mod diagnose;
pub mod engine;
pub mod result;
pub mod scope;
pub mod solver;
pub mod tracker;
pub mod types;
pub mod width;
#[cfg(feature = "z3")]
pub mod translate;

pub use config::{find_manifest, ConfigError, SmtProfile, VerifyOptions, MANIFEST_FILE};
pub use counterexample::{Counterexample, CounterexampleBinding};
pub use diagnose::{Reason, Unsupported};
pub use engine::{PostconditionQuery, VerificationEngine, RESULT_SYMBOL};
pub use result::{ContractDiagnostic, ContractKind, ContractReport, VerificationResult, VerificationStatus};
pub use scope::length_symbol;
pub use solver::NO_Z3_MESSAGE;
pub use types::{resolve_type, BvInfo, SmtType, UnsupportedType};
#[cfg(feature = "z3")]
pub use translate::{Term, Translator};
