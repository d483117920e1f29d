use std::path::Path;
use console::style;
use crate::cli::commands::ValidateArgs;
use crate::engine::{Environment, ParameterSet, TypeRegistry};
use crate::errors::PocError;
use crate::expr::{Program, NEW_REVERSE_CALL};
use crate::poc::{discover_pocs, load_poc, PocDefinition};
use tracing::warn;

pub async fn handle_validate(args: ValidateArgs, quiet: bool) -> Result<(), PocError> {
    let paths = discover_pocs(&args.poc)?;

    let mut failed = 0usize;
    for path in &paths {
        match validate_file(path).await {
            Ok(poc) => {
                if !quiet {
                    println!(
                        "{} {} ({}: {} set, {} rules)",
                        style("✓").green(),
                        path.display(),
                        poc.name,
                        poc.set.len(),
                        poc.rules.len()
                    );
                }
            }
            Err(e) => {
                failed += 1;
                println!("{} {} {}", style("✗").red(), path.display(), e);
            }
        }
    }

    if failed > 0 {
        return Err(PocError::DefinitionLoad(format!(
            "{} of {} POC files failed validation",
            failed,
            paths.len()
        )));
    }
    Ok(())
}

pub async fn validate_file(path: &Path) -> Result<PocDefinition, PocError> {
    let poc = load_poc(path).await?;
    validate_definition(&poc)?;
    Ok(poc)
}

/// Static checks that need no target: every `set` entry must declare and
/// type-check, and every rule expression must parse. Rule expressions are not
/// type-checked because search captures only exist at run time.
pub fn validate_definition(poc: &PocDefinition) -> Result<(), PocError> {
    let registry = TypeRegistry::for_poc(poc)?;
    let env = Environment::new(registry);
    let empty = ParameterSet::new();

    for (name, source) in &poc.set {
        if source == NEW_REVERSE_CALL {
            continue;
        }
        env.compile(source, &empty)
            .map_err(|cause| PocError::expression(name.as_str(), cause))?;
    }

    for (index, rule) in poc.rules.iter().enumerate() {
        Program::compile(&rule.expression)
            .map_err(|cause| PocError::expression(PocError::rule_label(index), cause))?;
        if let Some(pattern) = rule.search_pattern() {
            if let Err(e) = regex::bytes::Regex::new(pattern) {
                // Not fatal: at run time a bad pattern rejects instead of failing.
                warn!(poc = %poc.name, rule = index, error = %e, "Search pattern does not compile");
            }
        }
    }
    Ok(())
}
