use color_eyre::eyre::Result;
use netprofile_config::Config;
use schemars::{schema::RootSchema, schema_for};
use std::fs;
use std::path::{Path, PathBuf};

/// Write schema to file
fn write_schema(path: PathBuf, schema: RootSchema) -> Result<()> {
    println!("Generating {}", path.display());
    fs::write(path, serde_json::to_string_pretty(&schema)?)?;
    Ok(())
}

/// Writes the JSON schema of `netprofile.json` into `out`.
pub fn run(out: &Path) -> Result<()> {
    fs::create_dir_all(out)?;
    write_schema(out.join("config.schema.json"), schema_for!(Config))
}
