use std::time::Instant;

use sheetscan::{format_identity, SheetReaderBuilder, DEFAULT_ANSWER_SLOTS};
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

fn main() {
    tracing_subscriber::fmt()
        .with_span_events(FmtSpan::CLOSE)
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let Some(input) = args.next() else {
        eprintln!("usage: sheetscan <image> [annotated-output]");
        std::process::exit(2);
    };
    let output = args.next();

    let reader = SheetReaderBuilder::new()
        .build()
        .expect("Default options are valid");
    let start = Instant::now();
    let sheet = match reader.try_decode_file(&input) {
        Ok(sheet) => sheet,
        Err(err) => {
            eprintln!("Failed to read {input}: {err}");
            std::process::exit(1);
        }
    };
    log::debug!("{:?}", start.elapsed());

    println!("identity: {}", format_identity(&sheet.identity));
    for (i, answer) in sheet
        .padded_answers(DEFAULT_ANSWER_SLOTS)
        .iter()
        .enumerate()
    {
        println!("{:>3}: {answer}", i + 1);
    }

    if let (Some(output), Some(annotated)) = (output, &sheet.annotated) {
        if let Err(err) = annotated.save(&output) {
            eprintln!("Failed to save {output}: {err}");
            std::process::exit(1);
        }
    }
}
