#![warn(rust_2018_idioms)]

//! The steering function of the docbook2mdoc(1) program.

use std::io;
use std::io::Write;
use std::path::Path;
use std::process;

use clap::{crate_version, App, AppSettings, Arg, ErrorKind};
use log::error;

use docbook2mdoc::logger::setup_logger;
use docbook2mdoc::{mdoc, reorganize, xml, Document};

#[derive(Copy, Clone, PartialEq, Eq)]
enum OutType {
    Mdoc,
    Tree,
    Lint,
}

fn main() {
    process::exit(run());
}

fn run() -> i32 {
    let app = App::new("docbook2mdoc")
        .version(crate_version!())
        .about("Convert DocBook XML manual pages to mdoc(7)")
        .setting(AppSettings::DeriveDisplayOrder)
        .max_term_width(100)
        .args(&[
            Arg::with_name("warn")
                .short("W")
                .help("Enable warning messages"),
            Arg::with_name("debug")
                .short("d")
                .long("debug")
                .multiple(true)
                .help("Enable more logging, and up to `-dddd`"),
            Arg::with_name("section")
                .short("s")
                .number_of_values(1)
                .value_name("SECTION")
                .help("Override the manual volume number"),
            Arg::with_name("output")
                .short("T")
                .number_of_values(1)
                .value_name("FORMAT")
                .help("Output format: mdoc, tree, or lint"),
            Arg::with_name("file")
                .required(false)
                .value_name("INPUT-FILE")
                .help("File path to read (default: STDIN)"),
        ]);

    let m = match app.get_matches_safe() {
        Ok(m) => m,
        Err(e) => {
            match e.kind {
                ErrorKind::HelpDisplayed | ErrorKind::VersionDisplayed => {
                    print!("{}", e.message);
                    return 0;
                }
                _ => {
                    eprintln!("{}", e.message);
                    return 5;
                }
            }
        }
    };

    if let Err(e) = setup_logger(m.occurrences_of("debug") as u32) {
        eprintln!("logger: {}", e);
        return 5;
    }

    let outtype = match m.value_of("output") {
        None | Some("mdoc") => OutType::Mdoc,
        Some("tree") => OutType::Tree,
        Some("lint") => OutType::Lint,
        Some(other) => {
            eprintln!("{}: Bad argument", other);
            eprintln!("usage: docbook2mdoc [-W] [-s section] \
                [-T mdoc | tree | lint] [input_filename]");
            return 5;
        }
    };
    let warn = m.is_present("warn");
    let sec = m.value_of("section");

    // Open file or use standard input, then parse and reorganize.

    let fname = m.value_of("file").filter(|&f| f != "-");
    let mut doc = match fname {
        Some(f) => xml::parse_file(Path::new(f), warn),
        None => xml::parse_stdin(warn),
    };
    reorganize(&mut doc, sec);
    let rc = if doc.has_errors() {
        3
    } else if doc.has_warnings() {
        2
    } else {
        0
    };

    // Format.

    if outtype != OutType::Lint && doc.root_element().is_some() {
        if rc > 2 {
            eprintln!();
        }
        let stdout = io::stdout();
        let mut out = stdout.lock();
        let res = write_output(&mut doc, outtype, fname, &mut out)
            .and_then(|_| out.flush());
        if let Err(e) = res {
            error!("writing output: {}", e);
            return 3;
        }
        if rc > 2 {
            eprintln!("\nThe output may be incomplete, see the \
                parse error reported above.\n");
        }
    }
    rc
}

fn write_output<W: Write>(doc: &mut Document, outtype: OutType,
    fname: Option<&str>, out: &mut W) -> io::Result<()>
{
    match outtype {
        OutType::Mdoc => {
            if let Some(fname) = fname {
                let bname = Path::new(fname).file_name()
                    .map(|b| b.to_string_lossy().into_owned())
                    .unwrap_or_else(|| fname.to_string());
                writeln!(out,
                    ".\\\" automatically generated with docbook2mdoc {}",
                    bname)?;
            }
            mdoc::write_mdoc(doc, out)?;
        }
        OutType::Tree => {
            doc.write_tree(out)?;
        }
        OutType::Lint => {}
    }
    Ok(())
}
