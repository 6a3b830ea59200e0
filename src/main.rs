use clap::Parser;
use ruuvi_ingest::app::{Options, decode_data, run_with_io};
use ruuvi_ingest::source::StdinSource;
use std::panic::{self, PanicHookInfo};

/// Exit codes for the application
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_PANIC: i32 = 2;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Set up panic hook to ensure clean exit codes for process managers
    // (e.g., systemd, Telegraf execd) that monitor exit status
    panic::set_hook(Box::new(move |info: &PanicHookInfo| {
        eprintln!("Panic! {}", info);
        std::process::exit(EXIT_PANIC);
    }));

    env_logger::init();

    let options = Options::parse();

    if let Some(hex) = options.decode_data.as_deref() {
        match decode_data(hex, &mut std::io::stdout()) {
            Ok(()) => std::process::exit(EXIT_SUCCESS),
            Err(why) => {
                eprintln!("error: {}", why);
                std::process::exit(EXIT_ERROR);
            }
        }
    }

    let mut out = std::io::stdout();
    let mut err = std::io::stderr();

    match run_with_io(options, &StdinSource, &mut out, &mut err).await {
        Ok(_) => std::process::exit(EXIT_SUCCESS),
        Err(why) => {
            eprintln!("error: {}", why);
            std::process::exit(EXIT_ERROR);
        }
    }
}
