//! List command implementation

use crate::programmers::available_programmers;

/// List all programmers compiled into this binary
pub fn list_programmers() {
    println!("Supported programmers:");
    println!();
    for info in available_programmers() {
        println!("  {:<16} - {}", info.name, info.description);
        if !info.aliases.is_empty() {
            println!("  {:<16}   aliases: {}", "", info.aliases.join(", "));
        }
    }
}
