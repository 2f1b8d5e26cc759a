mod balance;
mod convert;

use anyhow::Result;
use clap::Command;

pub mod consts {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
    pub const BIN_NAME: &str = "hicmat";
}

fn build_parser() -> Command {
    Command::new(consts::BIN_NAME)
        .bin_name(consts::BIN_NAME)
        .version(consts::VERSION)
        .author("Databio")
        .about("Tools for Hi-C contact matrices: convert between formats, build lower resolutions and balance with Knight-Ruiz.")
        .subcommand_required(true)
        .subcommand(convert::cli::create_convert_cli())
        .subcommand(balance::cli::create_balance_cli())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let app = build_parser();
    let matches = app.get_matches();

    match matches.subcommand() {
        //
        // CONVERT
        //
        Some((convert::cli::CONVERT_CMD, matches)) => {
            convert::handlers::run_convert(matches)?;
        }

        //
        // BALANCE
        //
        Some((balance::cli::BALANCE_CMD, matches)) => {
            balance::handlers::run_balance(matches)?;
        }

        _ => unreachable!("Subcommand not found"),
    };

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_is_valid() {
        build_parser().debug_assert();
    }
}
