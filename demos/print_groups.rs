//! Reads an HTML file, strips article bodies, runs detection and prints
//! the ranked groups.
//!
//! ```sh
//! cargo run --example print_groups -- page.html
//! ```

use feed_detector::formatter::PrintFormatter;
use feed_detector::{detect, parse_document, BodyRemovalFilter};
use std::io::Write;
use std::time::Instant;

fn init_logging() {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!("[{}] {}", record.level(), message))
        })
        .level(log::LevelFilter::Debug)
        .chain(std::io::stderr())
        .apply()
        .expect("logger init");
}

fn main() {
    init_logging();

    let Some(path) = std::env::args().nth(1) else {
        eprintln!("usage: print_groups <file.html>");
        std::process::exit(1);
    };
    let html = match std::fs::read_to_string(&path) {
        Ok(html) => html,
        Err(e) => {
            eprintln!("cannot read {}: {}", path, e);
            std::process::exit(1);
        }
    };
    let doc = match parse_document(&html) {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!("cannot parse {}: {}", path, e);
            std::process::exit(1);
        }
    };

    let started = Instant::now();
    // detection mutates the tree, so the original stays untouched here
    let mut working = doc.clone();
    BodyRemovalFilter::default().run(&mut working);
    let groups = detect(&mut working);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    PrintFormatter.run(&groups, &mut out).expect("write stdout");
    writeln!(out, "\n{:.6} secs.", started.elapsed().as_secs_f64()).expect("write stdout");
}
