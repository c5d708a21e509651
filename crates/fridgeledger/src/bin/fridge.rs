//! fridge - Track fridge inventory, expiry dates and consumption.
//!
//! Thin wrapper around [`fridgeledger::cmd::fridge`].

fn main() -> std::process::ExitCode {
    fridgeledger::cmd::fridge::main()
}
