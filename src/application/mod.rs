// Released under MIT License.
// Copyright (c) 2024 Ladislav Bartos

//! This module contains the implementation of the `ensfit` binary.

use clap::Parser;
use colored::Colorize;
use ensfit::{errors::ApplicationError, Analysis, ENSFIT_VERSION};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    long_about = "Calculate ensemble diffusion coefficients, heat capacities and melting temperatures from many independent simulation runs."
)]
pub struct Args {
    #[arg(
        help = "Config yaml file",
        long_help = "Configuration yaml file specifying the analysis settings."
    )]
    pub config: String,

    #[arg(
        long = "silent",
        help = "Print nothing but errors",
        default_value_t = false
    )]
    pub silent: bool,

    #[arg(
        long = "overwrite",
        help = "Overwrite output files without backing them up",
        default_value_t = false
    )]
    pub overwrite: bool,

    #[arg(
        long = "no-filter",
        visible_alias = "nofilter",
        help = "Ignore lists of outlier runs",
        long_help = "Ignore all lists of outlier runs and do not reject any runs inside the ensembles.",
        default_value_t = false
    )]
    pub no_filter: bool,
}

fn print_outcome(success: bool) {
    let (symbol, message) = if success {
        (
            "✔".to_string().bright_green().bold(),
            "ANALYSIS COMPLETED".to_string().bright_green().bold(),
        )
    } else {
        (
            "✖".to_string().red().bold(),
            "ANALYSIS FAILED".to_string().red().bold(),
        )
    };

    let prefix = format!(
        "{}{}{}",
        "[".to_string().blue().bold(),
        symbol,
        "]".to_string().blue().bold()
    );
    println!("{} {}", prefix, message);
}

pub(crate) fn run() -> Result<(), ApplicationError> {
    let args = Args::parse();

    let analysis = Analysis::from_file(&args.config);
    let silent = args.silent || analysis.as_ref().is_ok_and(|a| a.silent());

    if silent {
        colog::basic_builder()
            .filter(None, log::LevelFilter::Error)
            .init();
    } else {
        colog::init();
        let header = format!(">>> ENSFIT v{} <<<", ENSFIT_VERSION).bold();
        println!("\n{}\n", header);
    }

    let mut analysis = match analysis {
        Ok(analysis) => analysis,
        Err(e) => {
            log::error!("{}", e);
            if !silent {
                print_outcome(false);
            }
            return Err(e.into());
        }
    };

    if args.silent {
        analysis.set_silent(true);
    }
    if args.overwrite {
        analysis.set_overwrite(true);
    }
    if args.no_filter {
        analysis.set_no_filter(true);
    }

    log::info!("Read config file '{}'.", args.config);
    analysis.info();

    let result = analysis
        .run()
        .map_err(ApplicationError::from)
        .and_then(|results| {
            results
                .write(analysis.output_directory(), analysis.overwrite())
                .map_err(ApplicationError::from)
        });

    if let Err(e) = &result {
        log::error!("{}", e);
    }

    if !silent {
        print_outcome(result.is_ok());
    }

    result
}
