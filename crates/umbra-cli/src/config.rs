//! Loads the engine [`Config`] from a JSON file, overlaid by CLI flags.

use std::path::Path;

use umbra_core::schema::Config;

/// Read `path` as JSON and parse it into a [`Config`].
pub fn load(path: impl AsRef<Path>) -> eyre::Result<Config> {
    let bytes = std::fs::read(path)?;
    let config = serde_json::from_slice(&bytes)?;
    Ok(config)
}

/// Pretty-print the [`Config`] JSON schema, for `config schema`.
#[allow(clippy::print_stdout, reason = "prints schema to stdout")]
pub fn print_schema() -> eyre::Result<()> {
    let schema = schemars::schema_for!(Config);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}
