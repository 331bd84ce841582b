use std::env;
use std::process::ExitCode;

use voxel_lattice::{append_lattice, flatten, LatticeBuilder, StructureConfig};

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args.len() > 3 {
        eprintln!("Usage: {} <structure.toml> [checkpoint.json]", args[0]);
        return ExitCode::FAILURE;
    }

    match run(&args[1], args.get(2).map(String::as_str)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(config_path: &str, output_path: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Lattice Builder ===\n");

    let config = StructureConfig::from_file(config_path)?;
    config.print_summary();

    let catalog = config.catalog();
    let grid = config.grid()?;

    println!("Building lattice...");
    let lattice = LatticeBuilder::build(&grid, &catalog, config.build.periodic)?;
    println!("  Nodes: {}", lattice.num_nodes());
    println!("  Cells: {}", lattice.num_cells());
    println!("  Total mass: {:.6e}", lattice.total_mass());
    println!(
        "  Reference spacing: ({:.4}, {:.4}, {:.4}) from type {}",
        lattice.spacing.x, lattice.spacing.y, lattice.spacing.z, lattice.majority_type
    );

    let max_valence = lattice
        .connectivity
        .surrounding_cells
        .iter()
        .map(Vec::len)
        .max()
        .unwrap_or(0);
    println!("  Max cells per node: {}", max_valence);

    if let Some(path) = output_path {
        println!("\nWriting checkpoint...");
        let mut record = flatten(&catalog, &grid);
        append_lattice(&mut record, &lattice);
        record.write_json(path)?;
        println!("  ✓ Wrote {} ({} keys)", path, record.len());
    }

    println!("\n=== Build Complete ===");
    Ok(())
}
