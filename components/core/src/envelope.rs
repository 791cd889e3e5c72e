//! Inscription Envelope Decoder (C3): extracts `(content_type, payload)` from a witness byte
//! stream, per spec §4.3. Never trusts the witness layout — malformed envelopes decode to `None`
//! rather than panicking or guessing.

const SENTINEL: [u8; 6] = [0x00, 0x63, 0x03, 0x6f, 0x72, 0x64];
const OP_0: u8 = 0x00;
const OP_ENDIF: u8 = 0x68;
/// The envelope's content-type field is keyed by a single `0x01` byte (`ord`'s convention).
const CONTENT_TYPE_KEY: [u8; 1] = [0x01];

pub struct Envelope {
    pub content_type: String,
    /// Base64-encoded inscription body, matching spec §4.3's return convention.
    pub payload_b64: String,
}

/// Reads one pushdata item starting at `pos`. Returns `(bytes, next_pos)`, or `None` if the
/// length byte or its payload runs past the end of `data`.
fn read_pushdata(data: &[u8], pos: usize) -> Option<(&[u8], usize)> {
    let op = *data.get(pos)?;
    let (len, header) = match op {
        1..=75 => (op as usize, 1),
        76 => {
            let n = *data.get(pos + 1)? as usize;
            (n, 2)
        }
        77 => {
            let b0 = *data.get(pos + 1)? as usize;
            let b1 = *data.get(pos + 2)? as usize;
            (b0 | (b1 << 8), 3)
        }
        78 => {
            let b0 = *data.get(pos + 1)? as usize;
            let b1 = *data.get(pos + 2)? as usize;
            let b2 = *data.get(pos + 3)? as usize;
            let b3 = *data.get(pos + 4)? as usize;
            (b0 | (b1 << 8) | (b2 << 16) | (b3 << 24), 5)
        }
        _ => return None,
    };
    let start = pos + header;
    let end = start.checked_add(len)?;
    if end > data.len() {
        return None;
    }
    Some((&data[start..end], end))
}

/// Finds the sentinel `00 63 03 6F 72 64` anywhere in `data` and decodes the envelope that
/// follows it. Returns `None` if the sentinel is absent or the structure is malformed.
pub fn decode(data: &[u8]) -> Option<Envelope> {
    let sentinel_at = data
        .windows(SENTINEL.len())
        .position(|w| w == SENTINEL)?;
    let mut pos = sentinel_at + SENTINEL.len();

    let mut fields: Vec<(Vec<u8>, Vec<u8>)> = Vec::new();
    loop {
        if *data.get(pos)? == OP_0 {
            pos += 1;
            break;
        }
        let (key, next) = read_pushdata(data, pos)?;
        let key = key.to_vec();
        pos = next;
        let (value, next) = read_pushdata(data, pos)?;
        fields.push((key, value.to_vec()));
        pos = next;
    }

    let mut body = Vec::new();
    loop {
        match data.get(pos) {
            Some(&OP_ENDIF) => break,
            Some(_) => {
                let (chunk, next) = read_pushdata(data, pos)?;
                body.extend_from_slice(chunk);
                pos = next;
            }
            None => return None,
        }
    }

    let content_type = fields
        .iter()
        .find(|(k, _)| k.as_slice() == CONTENT_TYPE_KEY)
        .map(|(_, v)| String::from_utf8_lossy(v).into_owned())?;

    Some(Envelope {
        content_type,
        payload_b64: base64::Engine::encode(&base64::engine::general_purpose::STANDARD, &body),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push(out: &mut Vec<u8>, bytes: &[u8]) {
        assert!(bytes.len() <= 75, "test helper only covers inline pushdata");
        out.push(bytes.len() as u8);
        out.extend_from_slice(bytes);
    }

    fn build_envelope(content_type: &str, body: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&SENTINEL);
        push(&mut out, &CONTENT_TYPE_KEY);
        push(&mut out, content_type.as_bytes());
        out.push(OP_0);
        push(&mut out, body);
        out.push(OP_ENDIF);
        out
    }

    #[test]
    fn test_decode_simple_envelope() {
        let data = build_envelope("text/plain;charset=utf-8", b"{\"p\":\"orc-20\"}");
        let env = decode(&data).expect("envelope decodes");
        assert_eq!(env.content_type, "text/plain;charset=utf-8");
        let decoded = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, &env.payload_b64).unwrap();
        assert_eq!(decoded, b"{\"p\":\"orc-20\"}");
    }

    #[test]
    fn test_decode_missing_sentinel_is_none() {
        let data = vec![0x01, 0x02, 0x03];
        assert!(decode(&data).is_none());
    }

    #[test]
    fn test_decode_truncated_pushdata_is_none() {
        let mut data = Vec::new();
        data.extend_from_slice(&SENTINEL);
        data.push(10); // claims 10 bytes but provides none
        assert!(decode(&data).is_none());
    }

    #[test]
    fn test_decode_multibyte_length_prefix() {
        let body = vec![b'x'; 100];
        let mut out = Vec::new();
        out.extend_from_slice(&SENTINEL);
        push(&mut out, &CONTENT_TYPE_KEY);
        push(&mut out, b"application/json");
        out.push(OP_0);
        out.push(76);
        out.push(100);
        out.extend_from_slice(&body);
        out.push(OP_ENDIF);

        let env = decode(&out).expect("envelope decodes");
        let decoded = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, &env.payload_b64).unwrap();
        assert_eq!(decoded, body);
    }

    #[test]
    fn test_decode_no_endif_is_none() {
        let mut out = Vec::new();
        out.extend_from_slice(&SENTINEL);
        push(&mut out, &CONTENT_TYPE_KEY);
        push(&mut out, b"text/plain");
        out.push(OP_0);
        push(&mut out, b"abc");
        assert!(decode(&out).is_none());
    }
}
