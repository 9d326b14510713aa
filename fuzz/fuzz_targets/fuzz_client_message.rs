#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Client messages are normally only serialized, but a hostile or
    // buggy peer echoing them back must never panic the parser.
    let _ = serde_json::from_slice::<mini_games_client::protocol::ClientMessage>(data);

    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(msg) = serde_json::from_str::<mini_games_client::protocol::ClientMessage>(s) {
            // Anything that parses must re-serialize.
            let _ = serde_json::to_string(&msg);
        }
    }
});
