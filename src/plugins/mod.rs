pub mod npm_runner;

pub use npm_runner::{ENV_ALLOWLIST, NpmRunner};
