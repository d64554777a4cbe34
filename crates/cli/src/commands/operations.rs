//! List supported operations.

use iqmetrix_dropship_channel::Operation;

/// Print every operation name, marking the ones that take a query document.
#[allow(clippy::print_stdout)]
pub fn list() {
    for operation in Operation::all() {
        let input = if operation.is_query() { "query" } else { "payload" };
        println!("{operation:<42} {input}");
    }
}
