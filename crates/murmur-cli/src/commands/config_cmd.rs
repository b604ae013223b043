//! `murmur config` -- print the resolved merged configuration.

use super::{load_host, HostOptions};

pub fn run(options: &HostOptions) -> anyhow::Result<()> {
    let (_, config) = load_host(options)?;
    println!("{}", serde_json::to_string_pretty(config.raw())?);
    Ok(())
}
