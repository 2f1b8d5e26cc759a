use std::path::Path;

use anyhow::{Context, Result};
use clap::ArgMatches;

use hicmat_balance::{BalanceError, BalancerConfig, KnightRuiz};
use hicmat_io::{MatrixFormat, SaveOptions};

use crate::convert::handlers::{input_file, output_file};

/// Read the balancer settings, letting command line flags override the config file.
fn get_config(matches: &ArgMatches) -> Result<BalancerConfig> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => BalancerConfig::try_from(Path::new(path))
            .with_context(|| format!("Failed to read balancer config {}", path))?,
        None => BalancerConfig::default(),
    };

    if let Some(&tolerance) = matches.get_one::<f64>("tolerance") {
        config.tolerance = tolerance;
    }
    if let Some(&max_iterations) = matches.get_one::<usize>("max-iterations") {
        config.max_iterations = max_iterations;
    }
    config.validate()?;

    Ok(config)
}

pub fn run_balance(matches: &ArgMatches) -> Result<()> {
    let out = matches
        .get_one::<String>("out")
        .context("An output prefix is required.")?;
    let config = get_config(matches)?;

    let input = input_file(matches, MatrixFormat::HicPro)?;
    let mut matrix = input
        .load()
        .with_context(|| format!("Failed to load {}", input.matrix_path.display()))?;

    if !matches.get_flag("keep-empty-rows") {
        matrix.mask_empty_rows();
    }

    let balancer = KnightRuiz::new(config);
    let factors = match balancer.balance(&matrix) {
        Ok(balance) => balance.factors,
        Err(BalanceError::NonConvergence {
            iterations,
            residual,
            best,
        }) if matches.get_flag("accept-unconverged") => {
            log::warn!(
                "No convergence after {} iterations (residual {:e}), writing the best factors found",
                iterations,
                residual
            );
            best
        }
        Err(e) => return Err(e).context("Balancing failed"),
    };

    matrix.set_correction_factors(Some(factors))?;
    output_file(MatrixFormat::HicPro, out).save(
        &matrix,
        SaveOptions {
            symmetric: true,
            apply_correction: true,
        },
    )?;
    eprintln!("Balanced matrix written with prefix {}", out);

    Ok(())
}
