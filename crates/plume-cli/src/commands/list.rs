//! List command

use anyhow::{Context, Result};
use plume_particles::{DeclarationKind, Definition, DefinitionTable};
use std::path::Path;

pub fn run(file: &Path) -> Result<()> {
    let table = DefinitionTable::load_file(file)
        .with_context(|| format!("Failed to load {}", file.display()))?;

    if table.is_empty() {
        println!("No effects defined in {}", file.display());
        return Ok(());
    }

    println!("{} effect(s) in {}:", table.len(), file.display());
    for definition in table.iter() {
        print_tree(definition, 1);
    }
    Ok(())
}

fn print_tree(definition: &Definition, depth: usize) {
    let kind = match &definition.kind {
        DeclarationKind::Group => "group".to_string(),
        DeclarationKind::Emitter(declaration) => declaration.to_lowercase(),
    };
    println!(
        "{:indent$}{} [{}] id={}",
        "",
        definition.name,
        kind,
        definition.id().raw(),
        indent = depth * 2
    );
    for child in &definition.children {
        print_tree(child, depth + 1);
    }
}
