//! Opaque random id generation, used for event ids (spec §3: "keyed by opaque 16-char random
//! id") and OTC record ids.

use rand::distributions::Alphanumeric;
use rand::Rng;

pub fn random_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect()
}
