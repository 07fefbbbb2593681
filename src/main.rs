use clap::{Arg, Command as ClapCommand, ArgAction};
use std::process;
use log::error;

use rasterfetch::utils::logger::Logger;
use rasterfetch::commands::{CommandFactory, RasterfetchCommandFactory};

fn convert_command() -> ClapCommand {
    ClapCommand::new("convert")
        .about("Convert a GeoTIFF (or a directory of them) to an RGB image")
        .arg(
            Arg::new("source")
                .help("Source GeoTIFF or directory of GeoTIFFs")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .help("Output directory")
                .value_name("DIR")
                .default_value("out/"),
        )
        .arg(
            Arg::new("format")
                .long("format")
                .help("Output image format (png, jpeg, bmp, tiff, gif, tga)")
                .value_name("FORMAT")
                .default_value("png"),
        )
        .arg(
            Arg::new("min")
                .long("min")
                .help("Value mapped to 0; inferred from the image if omitted")
                .value_name("N")
                .allow_negative_numbers(true),
        )
        .arg(
            Arg::new("max")
                .long("max")
                .help("Value mapped to 255; inferred from the image if omitted")
                .value_name("N")
                .allow_negative_numbers(true),
        )
        .arg(
            Arg::new("channels")
                .long("channels")
                .help("1-indexed bands used as red, green, blue")
                .value_name("R,G,B")
                .default_value("1,2,3"),
        )
}

fn fetch_command() -> ClapCommand {
    ClapCommand::new("fetch")
        .about("Export a masked temporal mean composite and convert it to an image")
        .arg(
            Arg::new("catalog")
                .long("catalog")
                .help("TOML catalog of local observations")
                .value_name("FILE")
                .required(true),
        )
        .arg(
            Arg::new("storage")
                .long("storage")
                .help("Directory receiving exported GeoTIFFs")
                .value_name("DIR")
                .default_value("exports"),
        )
        .arg(
            Arg::new("data")
                .long("data")
                .help("Dataset id")
                .value_name("ID")
                .default_value("USDA/NAIP/DOQQ"),
        )
        .arg(
            Arg::new("region")
                .long("region")
                .help("Bounding rectangle corners: xmin ymin xmax ymax")
                .value_names(["XMIN", "YMIN", "XMAX", "YMAX"])
                .num_args(4)
                .allow_negative_numbers(true)
                .default_values(["-74.02065034469021", "40.7175360876491", "-73.96855111678494", "40.69053317927286"]),
        )
        .arg(
            Arg::new("start")
                .long("start")
                .help("Start date (yyyy-mm-dd), inclusive")
                .value_name("DATE")
                .default_value("2017-01-01"),
        )
        .arg(
            Arg::new("end")
                .long("end")
                .help("End date (yyyy-mm-dd), exclusive")
                .value_name("DATE")
                .default_value("2018-12-31"),
        )
        .arg(
            Arg::new("bands")
                .long("bands")
                .help("Bands to export")
                .value_name("BAND")
                .num_args(1..)
                .default_values(["R", "G", "B"]),
        )
        .arg(
            Arg::new("output_dir")
                .long("output_dir")
                .help("Folder inside the export storage")
                .value_name("DIR")
                .default_value("UtiliGEE_Exports"),
        )
        .arg(
            Arg::new("desc")
                .long("desc")
                .help("Description of the export, used as the file name root")
                .value_name("NAME")
                .required(true),
        )
        .arg(
            Arg::new("mpp")
                .long("mpp")
                .help("Metres per pixel; smaller values give higher resolution")
                .value_name("METERS")
                .default_value("30"),
        )
        .arg(
            Arg::new("format")
                .long("format")
                .help("Image format of the converted composite")
                .value_name("FORMAT")
                .default_value("png"),
        )
        .arg(
            Arg::new("min")
                .long("min")
                .help("Value mapped to 0; inferred from the image if omitted")
                .value_name("N")
                .allow_negative_numbers(true),
        )
        .arg(
            Arg::new("max")
                .long("max")
                .help("Value mapped to 255; inferred from the image if omitted")
                .value_name("N")
                .allow_negative_numbers(true),
        )
        .arg(
            Arg::new("out")
                .long("out")
                .help("Directory for the converted image")
                .value_name("DIR")
                .default_value("out/"),
        )
        .arg(
            Arg::new("poll-interval")
                .long("poll-interval")
                .help("Seconds between status checks")
                .value_name("SECS"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .help("Give up after this many seconds (default: wait indefinitely)")
                .value_name("SECS"),
        )
}

fn main() {
    let matches = ClapCommand::new("rasterfetch")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Export masked satellite composites and convert GeoTIFFs to RGB images")
        .subcommand_required(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable debug output")
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .subcommand(convert_command())
        .subcommand(fetch_command())
        .get_matches();

    let log_file = "rasterfetch.log";
    if let Err(e) = Logger::init_global_logger(log_file, matches.get_flag("verbose")) {
        eprintln!("Error setting up global logger: {}", e);
        process::exit(1);
    }

    let logger = match Logger::append(log_file) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Error initializing logger: {}", e);
            process::exit(1);
        }
    };

    let factory = RasterfetchCommandFactory::new();

    match factory.create_command(&matches, &logger) {
        Ok(command) => {
            if let Err(e) = command.execute() {
                error!("Command execution error: {}", e);
                process::exit(1);
            }
        },
        Err(e) => {
            error!("Failed to create command: {}", e);
            process::exit(1);
        }
    };
}
