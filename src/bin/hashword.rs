//! Prints an Argon2id hashword for MASTER_HASHWORD.
//!
//! Usage: `hashword <plaintext>`

use events_api::hashword::salt_and_hash;

fn main() {
    let mut args = std::env::args().skip(1);
    match (args.next(), args.next()) {
        (Some(plain), None) if !plain.is_empty() => match salt_and_hash(&plain) {
            Ok(hashword) => println!("{}", hashword),
            Err(e) => {
                eprintln!("{}", e.message());
                std::process::exit(1);
            }
        },
        _ => {
            eprintln!("usage: hashword <plaintext>");
            std::process::exit(2);
        }
    }
}
