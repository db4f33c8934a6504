use log::error;

fn main() {
    zensta_lib::init_logging();

    if let Err(e) = zensta_lib::run() {
        error!("Zensta failed to start: {e}");
        std::process::exit(1);
    }
}
