//! Config command - show where settings and credentials come from.

use anyhow::Result;
use clap::Args;
use console::{Style, style};
use guardchat_config::{
    CredentialOverrides, EffectiveConfig, FieldName, LayeredSource, Provenance, resolve,
};
use serde_json::json;

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Output as JSON (for scripting)
    #[arg(long)]
    pub json: bool,
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    let defaults = ctx.defaults();
    let config = resolve(&defaults, &CredentialOverrides::new());

    if args.json {
        return print_json(ctx, &defaults, &config);
    }

    let dim = Style::new().dim();

    println!("{}\n", style("# Guardchat Configuration").bold());

    println!("Config files:");
    for file in &ctx.loaded.files {
        let status = if file.loaded {
            style("loaded").green()
        } else {
            style("not found").dim()
        };
        println!("  {}  {}", file.path.display(), status);
    }
    println!();

    if !ctx.loaded.warnings.is_empty() {
        println!("Warnings:");
        for warning in &ctx.loaded.warnings {
            println!("  {} {}", style("!").yellow(), warning);
        }
        println!();
    }

    println!("Proxy:");
    println!("  {:<16} {}", "base_url", ctx.settings.base_url);
    println!("  {:<16} {}", "model", ctx.settings.model);
    println!("  {:<16} {}s", "timeout", ctx.settings.timeout.as_secs());
    println!("  {:<16} {}", "retry_max", ctx.settings.retry_max);
    if let Some(ref prompt) = ctx.settings.system_prompt {
        println!("  {:<16} {}", "system_prompt", dim.apply_to(prompt));
    }
    println!();

    println!("Credentials:");
    print_fields(&config, Some(&defaults));
    println!();
    print_completeness(&config);

    Ok(())
}

/// One line per field: name, display-safe value, provenance.
pub fn print_fields(config: &EffectiveConfig, origins: Option<&LayeredSource>) {
    let dim = Style::new().dim();
    for field in FieldName::ALL {
        let resolved = config.field(field);
        let provenance = match resolved.provenance() {
            Provenance::UserOverridden => style(resolved.provenance().to_string()).cyan(),
            Provenance::Default => style(resolved.provenance().to_string()).green(),
            Provenance::Unset => style(resolved.provenance().to_string()).yellow(),
        };
        let origin = match (resolved.provenance(), origins) {
            (Provenance::Default, Some(layers)) => layers
                .origin_of(field)
                .map(|name| format!(" (from {})", name))
                .unwrap_or_default(),
            _ => String::new(),
        };
        println!(
            "  {:<16} {:<22} {}{}",
            field.to_string(),
            config.describe(field),
            provenance,
            dim.apply_to(origin)
        );
    }
}

/// "Configuration loaded" or the list of fields still missing.
pub fn print_completeness(config: &EffectiveConfig) {
    if config.is_complete() {
        println!("{}", style("Configuration loaded").green());
    } else {
        let missing: Vec<_> = config
            .missing_fields()
            .into_iter()
            .map(|f| f.display_name())
            .collect();
        println!(
            "{} {}",
            style("Please configure:").yellow(),
            missing.join(", ")
        );
    }
}

fn print_json(ctx: &Context, defaults: &LayeredSource, config: &EffectiveConfig) -> Result<()> {
    let fields: serde_json::Map<String, serde_json::Value> = FieldName::ALL
        .into_iter()
        .map(|field| {
            let resolved = config.field(field);
            let origin = match resolved.provenance() {
                Provenance::Default => defaults.origin_of(field),
                _ => None,
            };
            (
                field.to_string(),
                json!({
                    "value": config.describe(field),
                    "provenance": resolved.provenance(),
                    "origin": origin,
                }),
            )
        })
        .collect();

    let files: Vec<_> = ctx
        .loaded
        .files
        .iter()
        .map(|f| json!({ "path": f.path.display().to_string(), "loaded": f.loaded }))
        .collect();

    let output = json!({
        "files": files,
        "warnings": ctx.loaded.warnings,
        "proxy": {
            "base_url": ctx.settings.base_url,
            "model": ctx.settings.model,
            "timeout_secs": ctx.settings.timeout.as_secs(),
            "retry_max": ctx.settings.retry_max,
        },
        "credentials": fields,
        "complete": config.is_complete(),
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
