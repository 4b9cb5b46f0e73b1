//! `gantry list`: resource names by type, without connecting to anything.

use super::{ToolsArgs, registries};
use anyhow::Result;
use gantry_core::ResourceConfigs;
use gantry_core::config::decode;
use std::fmt::Write;

pub fn run(args: &ToolsArgs) -> Result<String> {
    let raw = args.server_config().load_raw_config()?;
    let configs = decode(raw, &registries()?)?;
    Ok(listing(&configs))
}

fn listing(configs: &ResourceConfigs) -> String {
    let sections: [(&str, Vec<&String>); 6] = [
        ("sources", configs.sources.keys().collect()),
        ("authServices", configs.auth_services.keys().collect()),
        ("tools", configs.tools.keys().collect()),
        ("toolsets", configs.toolsets.keys().collect()),
        ("prompts", configs.prompts.keys().collect()),
        ("promptsets", configs.promptsets.keys().collect()),
    ];

    let mut out = String::new();
    for (title, names) in sections {
        let _ = writeln!(out, "{title} ({}):", names.len());
        for name in names {
            let _ = writeln!(out, "  {name}");
        }
    }
    out.trim_end().to_string()
}
