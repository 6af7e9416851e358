//! Lines meant for whoever's running the command, as opposed to [tracing]
//! output. Problems go to stderr, progress to stdout.

pub fn error(msg: &str) {
    eprintln!("Error: {}", msg);
}

pub fn warning(msg: &str) {
    eprintln!("Warning: {}", msg);
}

pub fn hint(msg: &str) {
    eprintln!("Hint: {}", msg);
}

pub fn status(msg: &str) {
    println!("{}", msg);
}
