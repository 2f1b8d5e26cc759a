use clap::{ArgAction, Command, arg, value_parser};

pub const BALANCE_CMD: &str = "balance";

pub fn create_balance_cli() -> Command {
    Command::new(BALANCE_CMD)
        .author("Databio")
        .about("Balance a contact matrix with the Knight-Ruiz algorithm and write the corrected matrix.")
        .arg(arg!(--matrix <matrix> "HiC-Pro contact matrix to balance").required(true))
        .arg(arg!(--bed <bed> "Bed file describing the bins of the matrix").required(true))
        .arg(arg!(--out <prefix> "Output prefix").required(true))
        .arg(arg!(--config <config> "TOML file with balancer settings"))
        .arg(
            arg!(--tolerance <tolerance> "Maximum deviation of any row sum from the target")
                .value_parser(value_parser!(f64)),
        )
        .arg(
            arg!(--"max-iterations" <n> "Maximum number of Newton iterations")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            arg!(--"keep-empty-rows" "Do not mask rows without contacts (they make balancing fail)")
                .action(ArgAction::SetTrue),
        )
        .arg(
            arg!(--"accept-unconverged" "Write the best factors found when the iteration cap is hit")
                .action(ArgAction::SetTrue),
        )
}
