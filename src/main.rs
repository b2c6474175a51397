// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file,
// You can obtain one at <https://mozilla.org/MPL/2.0/>.

use anyhow::{Context, Result};
use colored::*;
use ddmd::Config;
use std::env;

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let [_, path] = args.as_slice() else {
        eprintln!("Usage: ddmd <config.toml>");
        std::process::exit(2);
    };

    let config = Config::from_path(path).with_context(|| format!("loading {path}"))?;
    println!(
        "{}",
        format!(
            "Running {} atoms in {} chains on {} ranks...",
            config.system.n_atom(),
            config.system.n_molecule,
            config.domain.n_rank()
        )
        .green()
    );

    let summary = ddmd::run(&config)?;
    let thermo = summary.thermo();
    println!();
    println!(
        "{}",
        format!("Finished {} steps in {:?}", thermo.step, summary.wall_time).yellow()
    );
    println!("- atoms:       {}", summary.n_atom_total);
    println!("- bonds:       {}", summary.n_bond_total);
    println!("- exchanges:   {}", summary.n_exchange());
    println!("- temperature: {:.4}", thermo.temperature);
    println!("- pressure:    {:.4}", thermo.pressure);
    println!("- energy:      {:.6}", thermo.total());
    for (rank, ranked) in summary.ranks.iter().enumerate() {
        println!(
            "  rank {rank}: {} local, {} ghost, {} bonds",
            ranked.n_atom, ranked.n_ghost, ranked.n_bond
        );
    }
    Ok(())
}

fn main() {
    logging::init(logging::DEFAULT_CRATES);

    if let Err(err) = run() {
        eprintln!("{} {}", "Error:".red(), err);
        for cause in err.chain().skip(1) {
            eprintln!("because: {}", cause);
        }
        std::process::exit(1);
    }
}

// End of File
