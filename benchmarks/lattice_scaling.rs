/// Lattice build timing for growing grids

use std::time::Instant;

use voxel_lattice::materials::tensor::diagonal_cell;
use voxel_lattice::{build_output, ElasticityTensor, Grid, LatticeBuilder, TypeCatalog, TypeRecord};

fn main() {
    println!("=== Lattice Build Scaling ===\n");

    let catalog = TypeCatalog::new()
        .with_type(0, "#FFFFFF", "empty")
        .with_type(1, "#0000FF", "fcu")
        .with_type(2, "#FF0000", "reo")
        .with_data(
            "fcu",
            TypeRecord::single(8.0, diagonal_cell(1.0, 1.0, 1.0), ElasticityTensor::isotropic(1.0, 1.0)),
        )
        .with_data(
            "reo",
            TypeRecord::single(6.0, diagonal_cell(1.0, 1.0, 1.0), ElasticityTensor::isotropic(0.5, 0.8)),
        );

    println!(
        "{:>8} {:>8} {:>10} {:>10} {:>12} {:>12}",
        "n", "periodic", "nodes", "cells", "build (ms)", "flat (ms)"
    );

    for n in [4, 8, 16, 32, 48] {
        // Checkerboard of material, a quarter of it empty
        let mut grid = Grid::empty([n, n, n]);
        for kappa in 0..n {
            for lambda in 0..n {
                for mu in 0..n {
                    let id = match (kappa + lambda + mu) % 4 {
                        0 => 0,
                        1 | 2 => 1,
                        _ => 2,
                    };
                    grid.set([kappa, lambda, mu], id);
                }
            }
        }

        for periodic in [true, false] {
            let start = Instant::now();
            let lattice = LatticeBuilder::build(&grid, &catalog, periodic).expect("build failed");
            let build_ms = start.elapsed().as_secs_f64() * 1e3;

            let start = Instant::now();
            let record = build_output(&catalog, &grid, periodic).expect("build_output failed");
            let flat_ms = start.elapsed().as_secs_f64() * 1e3;

            println!(
                "{:>8} {:>8} {:>10} {:>10} {:>12.2} {:>12.2}",
                n,
                periodic,
                lattice.num_nodes(),
                lattice.num_cells(),
                build_ms,
                flat_ms
            );
            assert!(!record.is_empty());
        }
    }
}
