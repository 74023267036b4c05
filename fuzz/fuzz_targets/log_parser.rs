#![no_main]

use libfuzzer_sys::fuzz_target;
use tracemint::parser::LogParser;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // First line is the line expression, the rest is the log body
        let (pattern, body) = input.split_once('\n').unwrap_or((input, ""));
        if let Ok(parser) = LogParser::new(&[pattern], Some("^--$"), true) {
            let _ = parser.parse_str(body);
        }
        // Default expression accepts every line
        if let Ok(parser) = LogParser::new::<&str>(&[], None, false) {
            let _ = parser.parse_str(input);
        }
    }
});
