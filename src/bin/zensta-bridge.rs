//! Permission bridge for the Zensta setup flow.
//!
//! Answers permission queries over stdin/stdout using length-prefixed JSON.
//! Logs go to stderr.

use log::error;

fn main() {
    zensta_lib::init_logging();

    if let Err(e) = zensta_lib::run_bridge() {
        // EOF is expected when the caller closes the connection
        if e.kind() != std::io::ErrorKind::UnexpectedEof {
            error!("Permission bridge error: {e}");
            std::process::exit(1);
        }
    }
}
