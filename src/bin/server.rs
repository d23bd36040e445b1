//! LINE chat relay binary.
//! Run with: cargo run --bin line-chat-relay

use std::process::ExitCode;

use line_chat_relay::start_relay;

fn main() -> ExitCode {
    start_relay::run()
}
