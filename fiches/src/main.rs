use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fiches_format::{decode_records, infer_families, to_gedcom, GedcomMeta, PartialDate, Person};
use structopt::StructOpt;

use structopt::clap::AppSettings::*;

#[derive(Debug, StructOpt)]
enum Commands {
    #[structopt(
        name = "c",
        visible_alias = "convert",
        about = "Convert FICHES files to a GEDCOM file"
    )]
    Convert {
        #[structopt(
            short,
            long,
            parse(from_os_str),
            help = "Write the GEDCOM output to this path instead of stdout"
        )]
        output: Option<PathBuf>,

        #[structopt(
            long,
            help = "Tag references with each file's stem even for a single input"
        )]
        scoped: bool,

        #[structopt(
            name = "files",
            parse(from_os_str),
            required = true,
            help = "FICHES files to convert"
        )]
        files: Vec<PathBuf>,
    },

    #[structopt(
        name = "l",
        visible_alias = "list",
        about = "List the person records of FICHES files"
    )]
    List {
        #[structopt(long, help = "Dump the decoded records as JSON")]
        json: bool,

        #[structopt(
            name = "files",
            parse(from_os_str),
            required = true,
            help = "FICHES files to list"
        )]
        files: Vec<PathBuf>,
    },
}

#[derive(Debug, StructOpt)]
#[structopt(
    name = "fiches",
    about = "Convert legacy FICHES genealogy exports to GEDCOM.",
    settings = &[SubcommandRequiredElseHelp, DisableHelpSubcommand, VersionlessSubcommands],
    usage = "fiches (c|l) [FLAGS|OPTIONS] <files>..."
)]
struct CliOpts {
    #[structopt(short, long, help = "Show verbose output", global = true)]
    verbose: bool,

    #[structopt(subcommand)]
    cmd: Commands,
}

fn source_tag(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Decode every input in order into one accumulated person list.
///
/// With more than one input each file's references are scoped by its stem,
/// so ids from different exports never collide.
fn decode_inputs(files: &[PathBuf], scoped: bool) -> Result<Vec<Person>> {
    let scoped = scoped || files.len() > 1;
    let mut persons = Vec::new();
    for path in files {
        let data =
            fs::read(path).with_context(|| format!("could not read {}", path.display()))?;
        let scope = scoped.then(|| source_tag(path));
        let decoded = decode_records(&data, scope.as_deref());

        let partial = decoded.iter().filter(|record| !record.errors.is_empty()).count();
        if partial > 0 {
            eprintln!(
                "{}: {} of {} records only decoded partially",
                path.display(),
                partial,
                decoded.len()
            );
        }
        persons.extend(decoded.into_iter().map(|record| record.person));
    }
    Ok(persons)
}

fn convert(files: Vec<PathBuf>, output: Option<PathBuf>, scoped: bool) -> Result<()> {
    let persons = decode_inputs(&files, scoped)?;
    let families = infer_families(&persons);

    let meta = GedcomMeta {
        source: "fiches".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        date: chrono::Local::now().format("%-d %b %Y").to_string(),
    };
    let gedcom = to_gedcom(&persons, &families, &meta);

    match output {
        Some(path) => fs::write(&path, gedcom)
            .with_context(|| format!("could not write {}", path.display()))?,
        None => print!("{}", gedcom),
    }
    Ok(())
}

fn dotted_date(date: Option<&PartialDate>) -> String {
    let component = |value: Option<u16>| match value {
        Some(value) => value.to_string(),
        None => "?".to_string(),
    };
    match date {
        Some(date) => format!(
            "{}.{}.{}",
            component(date.day),
            component(date.month),
            component(date.year)
        ),
        None => String::new(),
    }
}

fn list(files: Vec<PathBuf>, json: bool) -> Result<()> {
    let persons = decode_inputs(&files, false)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&persons)?);
        return Ok(());
    }

    for person in &persons {
        let id = person
            .id
            .as_ref()
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>10}  {:<32}  {:>12} {:<20}  {:>12} {:<20}",
            id,
            person.name.as_deref().unwrap_or(""),
            dotted_date(person.birthday.as_ref()),
            person.birth_place.as_deref().unwrap_or(""),
            dotted_date(person.death_date.as_ref()),
            person.death_place.as_deref().unwrap_or(""),
        );
    }
    Ok(())
}

fn main() {
    let opts = CliOpts::from_args();

    tracing_subscriber::fmt()
        .with_max_level(if opts.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        })
        .with_writer(std::io::stderr)
        .init();

    let result = match opts.cmd {
        Commands::Convert {
            output,
            scoped,
            files,
        } => convert(files, output, scoped),
        Commands::List { json, files } => list(files, json),
    };

    if let Err(e) = result {
        eprintln!("{:?}", e);
        std::process::exit(1);
    }
}
