//! metaops CLI
//!
//! Inspect the registered operations and run images through the common
//! adjustments composite.

use anyhow::{anyhow, bail, Context, Result};
use metaops::prelude::*;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("metaops");

    let result = match args.get(1).map(String::as_str) {
        None | Some("help" | "--help" | "-h") => {
            print_usage(program);
            Ok(())
        }
        Some("list") => list_filters(&args[2..]),
        Some("info") => match args.get(2) {
            Some(id) => filter_info(id),
            None => Err(anyhow!("Please specify an operation id")),
        },
        Some("check") => check_declarations(),
        Some("process") => process_image(&args[2..]),
        Some(other) => {
            print_usage(program);
            Err(anyhow!("Unknown command: {}", other))
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn print_usage(program: &str) {
    println!("metaops v{}", metaops::VERSION);
    println!();
    println!("Usage: {} <command> [options]", program);
    println!();
    println!("Commands:");
    println!("  list [--search <text>]        List available operations, optionally filtered");
    println!("  info <id>                     Show the ports and parameters of an operation");
    println!("  check                         Check every operation's parameter declarations");
    println!("  process <in> <out> [options]  Run an image through {}", CommonAdjustments::ID);
    println!("  help                          Show this help message");
    println!();
    println!("Process options:");
    println!("  --set <name>=<value>   Set an exposed parameter (repeatable)");
    println!("  --preset <file>        Load parameter values from a .json or .toml preset");
    println!("  --save-preset <file>   Write the final parameter values to a preset");
    println!("  --sequential           Disable parallel execution");
    println!();
    println!("Set RUST_LOG=debug for detailed logs.");
}

fn list_filters(args: &[String]) -> Result<()> {
    let registry = FilterRegistry::with_builtins();

    match args.first().map(String::as_str) {
        None => {}
        Some("--search") => {
            let query = args.get(1).context("--search needs a value")?;
            let hits = registry.search(query);
            println!("Operations matching '{}' ({}):", query, hits.len());
            for id in hits {
                if let Some(metadata) = registry.get_metadata(id) {
                    println!("  {:<30} {}", metadata.id, metadata.name);
                }
            }
            return Ok(());
        }
        Some(other) => bail!("Unknown list option: {}", other),
    }

    println!("Available operations ({} total):", registry.len());
    println!();
    for (category, filters) in registry.grouped_by_category() {
        println!("  {}", category.display_name());
        for metadata in filters {
            println!("    {:<30} {}", metadata.id, metadata.name);
        }
        println!();
    }
    Ok(())
}

fn format_range(range: Option<(f64, f64)>) -> String {
    range
        .map(|(min, max)| format!("{} .. {}", min, max))
        .unwrap_or_else(|| "-".to_string())
}

fn filter_info(id: &str) -> Result<()> {
    let registry = FilterRegistry::with_builtins();
    let metadata = registry
        .get_metadata(id)
        .with_context(|| format!("Operation not found: {} (see 'list')", id))?;

    println!("{} ({})", metadata.name, metadata.id);
    println!("Category: {}", metadata.category.display_name());
    if let Some(hash) = &metadata.reference_hash {
        println!("Reference hash: {}", hash);
    }
    println!();
    println!("{}", metadata.description);
    println!();

    for (label, ports) in [("Inputs", &metadata.inputs), ("Outputs", &metadata.outputs)] {
        if ports.is_empty() {
            continue;
        }
        println!("{}:", label);
        for port in ports {
            let optional = if port.optional { " (optional)" } else { "" };
            println!("  {} [{}]{}", port.name, port.port_type, optional);
        }
        println!();
    }

    if !metadata.parameters.is_empty() {
        println!("Parameters:");
        for param in &metadata.parameters {
            println!(
                "  {:<14} {:<22} default {:<8} range {:<16} ui {}",
                param.name,
                param.display_name,
                param.default_value.to_string(),
                format_range(param.value_range()),
                format_range(param.slider_range()),
            );
            if let Some(gamma) = param.ui_gamma() {
                println!("  {:<14} gamma {}", "", gamma);
            }
            if let Some(unit) = param.unit() {
                println!("  {:<14} unit {}", "", unit);
            }
            if !param.description.is_empty() {
                println!("  {:<14} {}", "", param.description);
            }
        }
    }

    Ok(())
}

fn check_declarations() -> Result<()> {
    let registry = FilterRegistry::with_builtins();
    let mut failures = 0;

    for id in registry.filter_ids() {
        let Some(metadata) = registry.get_metadata(id) else {
            continue;
        };
        match validate_parameter_table(id, &metadata.parameters) {
            Ok(warnings) => {
                println!("ok    {}", id);
                for warning in warnings {
                    println!("      warning: {}", warning.message);
                }
            }
            Err(errors) => {
                failures += 1;
                println!("FAIL  {}", id);
                for error in errors {
                    println!("      {}", error);
                }
            }
        }
    }

    if let Err(e) = CommonAdjustments::descriptor().check() {
        failures += 1;
        println!("FAIL  {}: {}", CommonAdjustments::ID, e);
    }

    if failures > 0 {
        bail!("{} declaration check(s) failed", failures);
    }
    Ok(())
}

struct ProcessArgs {
    input: String,
    output: String,
    sets: Vec<(String, f64)>,
    preset: Option<String>,
    save_preset: Option<String>,
    sequential: bool,
}

fn parse_process_args(args: &[String]) -> Result<ProcessArgs> {
    let [input, output, rest @ ..] = args else {
        bail!("Usage: process <input> <output> [--set name=value]... [--preset FILE] [--save-preset FILE] [--sequential]");
    };

    let mut parsed = ProcessArgs {
        input: input.clone(),
        output: output.clone(),
        sets: Vec::new(),
        preset: None,
        save_preset: None,
        sequential: false,
    };

    let mut iter = rest.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--set" => {
                let pair = iter.next().context("--set needs name=value")?;
                let (name, value) = pair
                    .split_once('=')
                    .with_context(|| format!("Expected name=value, got '{}'", pair))?;
                let value: f64 = value
                    .parse()
                    .with_context(|| format!("'{}' is not a number", value))?;
                parsed.sets.push((name.to_string(), value));
            }
            "--preset" => {
                parsed.preset = Some(iter.next().context("--preset needs a file")?.clone());
            }
            "--save-preset" => {
                parsed.save_preset = Some(iter.next().context("--save-preset needs a file")?.clone());
            }
            "--sequential" => parsed.sequential = true,
            other => bail!("Unknown option: {}", other),
        }
    }

    Ok(parsed)
}

fn process_image(args: &[String]) -> Result<()> {
    let args = parse_process_args(args)?;
    let registry = FilterRegistry::with_builtins();
    let mut graph = ProcessingGraph::new().with_name("process");

    let load = graph.add_filter(registry.instantiate("metaops:load-image")?);
    graph.set_parameter(load, "path", Value::String(args.input.clone()))?;

    let adjust = graph.add_filter(registry.instantiate(CommonAdjustments::ID)?);

    let save = graph.add_filter(registry.instantiate("metaops:save-image")?);
    graph.set_parameter(save, "path", Value::String(args.output.clone()))?;

    graph.connect_chain(&[load, adjust, save])?;

    if let Some(path) = &args.preset {
        ParameterPreset::load(path)
            .and_then(|preset| preset.apply_to_node(&mut graph, adjust))
            .with_context(|| format!("Failed to apply preset {}", path))?;
    }
    for (name, value) in &args.sets {
        if AdjustmentParam::from_name(name).is_none() {
            bail!("Unknown parameter '{}' (see 'info {}')", name, CommonAdjustments::ID);
        }
        graph.set_parameter(adjust, name, Value::Float(*value))?;
    }

    if let Some(path) = &args.save_preset {
        let node = graph.get_node(adjust)?;
        let mut preset = ParameterPreset::new(CommonAdjustments::ID);
        for param in AdjustmentParam::ALL {
            let value = node
                .get_parameter(param.name())
                .and_then(|v| v.as_float())
                .with_context(|| format!("Parameter '{}' has no value", param.name()))?;
            preset = preset.with_value(param.name(), value);
        }
        preset.save(path)?;
        println!("Preset written to {}", path);
    }

    let report = ValidationPipeline::default().validate(&graph);
    for warning in &report.warnings {
        log::warn!("{}", warning.message);
    }
    if !report.can_execute() {
        bail!("Validation failed:\n  {}", report.detailed_errors().join("\n  "));
    }

    let options = ExecutionOptions::new().with_parallel(!args.sequential);
    let result = ExecutionEngine::new().execute(&graph, Some(options))?;

    println!(
        "Processed {} -> {} in {:?}",
        args.input, args.output, result.stats.total_duration
    );
    Ok(())
}
