//! crengine CLI binary.
//!
//! This is the minimal entrypoint: all logic is in the library, and
//! `cli::run()` handles its own diagnostic output. `main` only maps the
//! returned exit code to `std::process::exit`.

fn main() {
    if let Err(code) = crengine::cli::run() {
        std::process::exit(code.as_i32());
    }
}
