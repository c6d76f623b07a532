fn main() {
    if let Err(err) = cutlayout::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
