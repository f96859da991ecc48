fn main() {
    if let Err(err) = asl_layout::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
