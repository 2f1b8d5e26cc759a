use clap::{Arg, ArgAction, Command, arg, value_parser};

pub const CONVERT_CMD: &str = "convert";
pub const DEFAULT_INPUT_FORMAT: &str = "hicpro";
pub const DEFAULT_OUTPUT_FORMAT: &str = "hicpro";

pub fn create_convert_cli() -> Command {
    Command::new(CONVERT_CMD)
        .author("Databio")
        .about("Convert a contact matrix between formats, optionally merging it to lower resolutions.")
        .arg(arg!(--matrix <matrix> "Contact matrix to convert").required(true))
        .arg(arg!(--bed <bed> "Bed file describing the bins of the matrix"))
        .arg(arg!(--biases <biases> "Correction factors, one per bin (nan marks a masked bin)"))
        .arg(
            arg!(--"input-format" <format> "Format of the input matrix")
                .default_value(DEFAULT_INPUT_FORMAT),
        )
        .arg(
            arg!(--"output-format" <format> "Format to write: hicpro or ginteractions")
                .default_value(DEFAULT_OUTPUT_FORMAT),
        )
        .arg(arg!(--out <prefix> "Output prefix").required(true))
        .arg(
            Arg::new("resolutions")
                .long("resolutions")
                .help("Resolutions (bp) to derive; each is written to <prefix>_<resolution>")
                .num_args(1..)
                .value_parser(value_parser!(u64)),
        )
        .arg(
            arg!(--"remove-correction" "Drop correction factors instead of writing them out")
                .action(ArgAction::SetTrue),
        )
}
