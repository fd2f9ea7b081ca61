//! Proptest generators for session inputs.

use proptest::prelude::*;

/// Generate server names the validators accept.
pub fn server_name_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("qs-view-server".to_string()),
        Just("active-metadata-store".to_string()),
        "[A-Za-z0-9][A-Za-z0-9._-]{0,30}",
    ]
}

/// Generate server names the validators reject.
pub fn invalid_server_name_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        Just("   ".to_string()),
        "[a-z]{1,8} [a-z]{1,8}",
        "[a-z]{1,8}/[a-z]{1,8}",
        "-[a-z]{1,8}",
    ]
}

/// Generate well-formed platform URLs.
pub fn platform_url_strategy() -> impl Strategy<Value = String> {
    (
        prop_oneof![Just("http"), Just("https")],
        prop_oneof![
            Just("localhost".to_string()),
            "[a-z][a-z0-9-]{0,15}(\\.[a-z]{2,6}){0,2}",
            (1u8..=254, 0u8..=255, 0u8..=255, 1u8..=254)
                .prop_map(|(a, b, c, d)| format!("{a}.{b}.{c}.{d}")),
        ],
        prop::option::of(1024u16..=65535),
    )
        .prop_map(|(scheme, host, port)| match port {
            Some(port) => format!("{scheme}://{host}:{port}"),
            None => format!("{scheme}://{host}"),
        })
}

/// Generate platform URLs that are empty, lack a scheme, or use another one.
pub fn invalid_platform_url_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        "host-[a-z]{1,8}:[0-9]{2,5}",
        "[a-z]{3,12}\\.[a-z]{2,4}/[a-z]{1,8}",
        "(ftp|file|ws)://[a-z]{3,12}",
    ]
}

/// Generate opaque bearer tokens.
pub fn token_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_-]{8,40}\\.[A-Za-z0-9_-]{8,40}\\.[A-Za-z0-9_-]{8,40}"
}

/// Generate user ids.
pub fn user_id_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("erinoverview".to_string()),
        Just("garygeeke".to_string()),
        "[a-z][a-z0-9]{3,15}",
    ]
}
