//! Minimal U-Boot environment block decode: a leading CRC32 followed by a
//! flat run of NUL-terminated `name=value` strings. The full variable
//! grammar (including redundant/flash-wear-leveled layouts) is an external
//! collaborator and out of scope here.

use std::collections::HashMap;

use crate::error::Error;

pub struct UbootEnv {
    variables: HashMap<String, String>,
}

impl UbootEnv {
    /// Decodes an environment block, validating its leading CRC32 against
    /// the payload that follows.
    pub fn decode(buffer: &[u8]) -> Result<Self, Error> {
        if buffer.len() < 4 {
            return Err(Error::UbootEnvCrcMismatch);
        }
        let stored_crc = u32::from_le_bytes(buffer[0..4].try_into().unwrap());
        let payload = &buffer[4..];

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(payload);
        if hasher.finalize() != stored_crc {
            return Err(Error::UbootEnvCrcMismatch);
        }

        let mut variables = HashMap::new();
        for entry in payload.split(|&b| b == 0) {
            if entry.is_empty() {
                break;
            }
            if let Some(eq) = entry.iter().position(|&b| b == b'=') {
                let name = String::from_utf8_lossy(&entry[..eq]).into_owned();
                let value = String::from_utf8_lossy(&entry[eq + 1..]).into_owned();
                variables.insert(name, value);
            }
        }

        Ok(UbootEnv { variables })
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }
}

/// Encodes `variables` into an environment block of exactly `env_size`
/// bytes, for use by tests that need a round-trippable fixture.
#[cfg(test)]
pub fn encode(variables: &[(&str, &str)], env_size: usize) -> Vec<u8> {
    let mut payload = Vec::new();
    for (name, value) in variables {
        payload.extend_from_slice(name.as_bytes());
        payload.push(b'=');
        payload.extend_from_slice(value.as_bytes());
        payload.push(0);
    }
    payload.resize(env_size - 4, 0);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&payload);
    let crc = hasher.finalize();

    let mut buffer = Vec::with_capacity(env_size);
    buffer.extend_from_slice(&crc.to_le_bytes());
    buffer.extend_from_slice(&payload);
    buffer
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_variables() {
        let buffer = encode(&[("bootcount", "1"), ("foo", "bar")], 256);
        let env = UbootEnv::decode(&buffer).unwrap();
        assert_eq!(env.get("bootcount"), Some("1"));
        assert_eq!(env.get("foo"), Some("bar"));
        assert_eq!(env.get("missing"), None);
    }

    #[test]
    fn rejects_crc_mismatch() {
        let mut buffer = encode(&[("bootcount", "1")], 256);
        buffer[4] ^= 0xFF;
        assert!(matches!(UbootEnv::decode(&buffer), Err(Error::UbootEnvCrcMismatch)));
    }
}
