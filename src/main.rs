//! Binary entrypoint for the student hub messaging command.

use std::process::ExitCode;

use student_hub::start_student_hub;

/// Open a conversation, optionally send a message, and print the result.
fn main() -> ExitCode {
    start_student_hub::run()
}
