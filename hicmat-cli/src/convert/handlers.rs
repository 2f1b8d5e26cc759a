use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::ArgMatches;

use hicmat_io::{MatrixFile, MatrixFormat, SaveOptions};
use hicmat_zoom::build_pyramid;

///
/// Where a matrix with the given output prefix is written. HiC-Pro output
/// follows the `<prefix>.matrix` + `<prefix>_abs.bed` naming.
///
pub fn output_file(format: MatrixFormat, prefix: &str) -> MatrixFile {
    match format {
        MatrixFormat::HicPro => MatrixFile::new(format, format!("{}.matrix", prefix))
            .with_bed(format!("{}_abs.bed", prefix)),
        MatrixFormat::GInteractions => MatrixFile::new(format, format!("{}.tsv", prefix)),
    }
}

/// Build the input [MatrixFile] from the `--matrix`, `--bed` and `--biases` flags.
pub fn input_file(matches: &ArgMatches, format: MatrixFormat) -> Result<MatrixFile> {
    let matrix = matches
        .get_one::<String>("matrix")
        .context("A path to a contact matrix is required.")?;

    let mut file = MatrixFile::new(format, PathBuf::from(matrix));
    if let Some(bed) = matches.get_one::<String>("bed") {
        file = file.with_bed(bed);
    }
    if let Some(biases) = matches.try_get_one::<String>("biases").ok().flatten() {
        file = file.with_biases(biases);
    }
    Ok(file)
}

pub fn run_convert(matches: &ArgMatches) -> Result<()> {
    let input_format = matches
        .get_one::<String>("input-format")
        .map(|s| s.parse::<MatrixFormat>())
        .transpose()?
        .unwrap_or(MatrixFormat::HicPro);
    let output_format = matches
        .get_one::<String>("output-format")
        .map(|s| s.parse::<MatrixFormat>())
        .transpose()?
        .unwrap_or(MatrixFormat::HicPro);
    let out = matches
        .get_one::<String>("out")
        .context("An output prefix is required.")?;
    let resolutions: Vec<u64> = matches
        .get_many::<u64>("resolutions")
        .map(|values| values.copied().collect())
        .unwrap_or_default();

    let input = input_file(matches, input_format)?;
    let mut matrix = input
        .load()
        .with_context(|| format!("Failed to load {}", input.matrix_path.display()))?;

    if matches.get_flag("remove-correction") && matrix.correction_factors().is_some() {
        log::info!("Removing correction factors");
        matrix.set_correction_factors(None)?;
    }

    if resolutions.is_empty() {
        output_file(output_format, out).save(&matrix, SaveOptions::default())?;
        eprintln!("Matrix written with prefix {}", out);
        return Ok(());
    }

    if matrix.correction_factors().is_some() {
        log::info!("Correction factors do not carry over to merged resolutions and are dropped");
    }

    for (resolution, merged) in build_pyramid(&matrix, &resolutions)? {
        let prefix = format!("{}_{}", out, resolution);
        output_file(output_format, &prefix).save(&merged, SaveOptions::default())?;
        eprintln!("Resolution {} written with prefix {}", resolution, prefix);
    }

    Ok(())
}
