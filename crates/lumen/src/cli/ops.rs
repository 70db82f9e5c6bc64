//! The `lumen ops` command: list the operation catalog.

use clap::Args;
use lumen_core::Operation;
use serde::Serialize;

/// Arguments for the `ops` command.
#[derive(Args, Debug)]
pub struct OpsArgs {
    /// Print the catalog as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct OperationInfo {
    name: &'static str,
    description: &'static str,
    output: &'static str,
}

fn catalog() -> Vec<OperationInfo> {
    Operation::ALL
        .into_iter()
        .map(|op| OperationInfo {
            name: op.name(),
            description: op.description(),
            output: op.output_format().mime_type(),
        })
        .collect()
}

pub async fn execute(args: OpsArgs) -> anyhow::Result<()> {
    let catalog = catalog();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&catalog)?);
        return Ok(());
    }

    for op in &catalog {
        println!("{:<10} {:<12} {}", op.name, op.output, op.description);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_lists_every_operation() {
        let names: Vec<&str> = catalog().iter().map(|op| op.name).collect();
        assert_eq!(
            names,
            vec!["grayscale", "invert", "blur", "to_png", "to_jpg", "to_webp"]
        );
    }

    #[test]
    fn transforms_produce_png() {
        let catalog = catalog();
        let blur = catalog.iter().find(|op| op.name == "blur").unwrap();
        assert_eq!(blur.output, "image/png");
    }
}
