fn main() {
    if let Err(err) = maskwatch_lib::run() {
        log::error!("maskwatch exited with error: {err:#}");
        eprintln!("maskwatch: {err:#}");
        std::process::exit(1);
    }
}
