//! Provably-fair seed material
//!
//! A fresh client seed per session, optionally replaced by a debug override
//! parsed from a query string (`?serverSeed=..&nonce=..&clientSeed=..`).

use tracing::info;
use url::form_urlencoded;

use crate::types::SeedTriple;

/// Random client seed for a new session
pub fn generate_client_seed() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Seed triple supplied out-of-band for deterministic replays.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SeedOverride {
    pub server_seed: String,
    pub nonce: Option<u64>,
    pub client_seed: Option<String>,
}

impl SeedOverride {
    /// Parse a query string; only honoured when `serverSeed` is present.
    pub fn from_query(query: &str) -> Option<Self> {
        let query = query.trim_start_matches('?');
        let mut server_seed = None;
        let mut nonce = None;
        let mut client_seed = None;
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "serverSeed" if !value.is_empty() => server_seed = Some(value.into_owned()),
                "nonce" => nonce = value.parse().ok(),
                "clientSeed" if !value.is_empty() => client_seed = Some(value.into_owned()),
                _ => {}
            }
        }
        Some(Self {
            server_seed: server_seed?,
            nonce,
            client_seed,
        })
    }

    /// Apply on top of generated defaults.
    pub fn apply(&self, seeds: &mut SeedTriple) {
        info!(nonce = ?self.nonce, "seed override applied");
        seeds.server_seed = Some(self.server_seed.clone());
        if let Some(nonce) = self.nonce {
            seeds.nonce = nonce;
        }
        if let Some(client_seed) = &self.client_seed {
            seeds.client_seed = client_seed.clone();
        }
    }
}

/// Seeds for a new session: generated client seed, nonce 1, no server seed.
pub fn initial_seeds(overrides: Option<&SeedOverride>) -> SeedTriple {
    let mut seeds = SeedTriple {
        client_seed: generate_client_seed(),
        server_seed: None,
        nonce: 1,
    };
    if let Some(o) = overrides {
        o.apply(&mut seeds);
    }
    seeds
}
