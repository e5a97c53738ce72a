fn main() {
    if let Err(e) = jerseychat::cli::main() {
        eprintln!("❌ {e}");
        std::process::exit(1);
    }
}
