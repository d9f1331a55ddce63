// SPDX-License-Identifier: AGPL-3.0-or-later
//! Fuzz target for filesystem path parsing

#![no_main]

use libfuzzer_sys::fuzz_target;
use snapfs_core::path::{is_valid, FsPath};

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    match FsPath::parse(input) {
        Ok(path) => {
            assert!(is_valid(input));
            // a parsed path prints back to its input
            assert_eq!(path.to_path_string(), input);
            assert_eq!(FsPath::parse(&path.to_path_string()).unwrap(), path);

            let _ = path.snapshot();
            let _ = path.rest();
            let _ = path.name();
            if let Some(parent) = path.parent() {
                assert_eq!(parent.segments().len() + 1, path.segments().len());
            }

            if let Some(prefix) = input.get(..10) {
                if let Ok(joined) = path.join(prefix) {
                    assert!(is_valid(&joined.to_path_string()));
                }
            }
        }
        Err(_) => assert!(!is_valid(input)),
    }
});
