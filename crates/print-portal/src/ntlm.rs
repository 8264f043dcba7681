//! NTLM message codec for HTTP domain-challenge authentication
//!
//! Builds NEGOTIATE and NTLMv2 AUTHENTICATE messages and parses the server
//! CHALLENGE (MS-NLMP). Only what HTTP authentication needs is implemented:
//! no signing, sealing or session key exchange, so the AUTHENTICATE message
//! never carries an encrypted session key.
//!
//! Handshake over HTTP:
//! 1. Client → `Authorization: NTLM <negotiate>`
//! 2. Server → 401 `WWW-Authenticate: NTLM <challenge>`
//! 3. Client → `Authorization: NTLM <authenticate>`

use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use md4::{Digest, Md4};
use md5::Md5;
use rand::RngExt;

use crate::error::{Error, Result};

const SIGNATURE: &[u8; 8] = b"NTLMSSP\0";

const NEGOTIATE_MESSAGE: u32 = 1;
const CHALLENGE_MESSAGE: u32 = 2;
const AUTHENTICATE_MESSAGE: u32 = 3;

const NEGOTIATE_UNICODE: u32 = 0x0000_0001;
const NEGOTIATE_OEM: u32 = 0x0000_0002;
const REQUEST_TARGET: u32 = 0x0000_0004;
const NEGOTIATE_NTLM: u32 = 0x0000_0200;
const NEGOTIATE_ALWAYS_SIGN: u32 = 0x0000_8000;
const NEGOTIATE_EXTENDED_SESSIONSECURITY: u32 = 0x0008_0000;
const NEGOTIATE_128: u32 = 0x2000_0000;
const NEGOTIATE_56: u32 = 0x8000_0000;

/// Flags offered in NEGOTIATE and echoed in AUTHENTICATE.
const CLIENT_FLAGS: u32 = NEGOTIATE_UNICODE
    | NEGOTIATE_OEM
    | REQUEST_TARGET
    | NEGOTIATE_NTLM
    | NEGOTIATE_ALWAYS_SIGN
    | NEGOTIATE_EXTENDED_SESSIONSECURITY
    | NEGOTIATE_128
    | NEGOTIATE_56;

/// Fixed header length of an AUTHENTICATE message without version or MIC.
const AUTHENTICATE_HEADER_LEN: usize = 64;

const MSV_AV_EOL: u16 = 0;
const MSV_AV_TIMESTAMP: u16 = 7;

/// Seconds between 1601-01-01 (FILETIME epoch) and 1970-01-01.
const FILETIME_UNIX_OFFSET_SECS: u64 = 11_644_473_600;

/// Scheme name used in `Authorization` / `WWW-Authenticate` headers.
pub const SCHEME: &str = "NTLM";

type HmacMd5 = Hmac<Md5>;

/// Parsed server CHALLENGE message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub flags: u32,
    pub server_challenge: [u8; 8],
    /// Raw AV_PAIR list, echoed inside the NTLMv2 response.
    pub target_info: Vec<u8>,
}

impl Challenge {
    /// Server timestamp from the target info, if the server sent one.
    fn timestamp(&self) -> Option<u64> {
        let mut rest = self.target_info.as_slice();
        while rest.len() >= 4 {
            let id = u16::from_le_bytes([rest[0], rest[1]]);
            let len = u16::from_le_bytes([rest[2], rest[3]]) as usize;
            if id == MSV_AV_EOL {
                return None;
            }
            let value = rest.get(4..4 + len)?;
            if id == MSV_AV_TIMESTAMP && len == 8 {
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(value);
                return Some(u64::from_le_bytes(bytes));
            }
            rest = &rest[4 + len..];
        }
        None
    }
}

/// Who is authenticating. `domain` may be empty.
#[derive(Debug, Clone, Copy)]
pub struct Identity<'a> {
    pub domain: &'a str,
    pub user: &'a str,
    pub password: &'a str,
}

/// Build the NEGOTIATE message (no domain or workstation supplied).
pub fn negotiate_message() -> Vec<u8> {
    let mut message = Vec::with_capacity(32);
    message.extend_from_slice(SIGNATURE);
    message.extend_from_slice(&NEGOTIATE_MESSAGE.to_le_bytes());
    message.extend_from_slice(&CLIENT_FLAGS.to_le_bytes());
    // DomainNameFields + WorkstationFields, both empty
    message.extend_from_slice(&[0u8; 16]);
    message
}

/// Parse a CHALLENGE message.
pub fn parse_challenge(bytes: &[u8]) -> Result<Challenge> {
    if bytes.len() < 32 || &bytes[..8] != SIGNATURE {
        return Err(Error::Scraping("malformed NTLM challenge".into()));
    }
    let message_type = read_u32(bytes, 8);
    if message_type != CHALLENGE_MESSAGE {
        return Err(Error::Scraping(format!(
            "expected NTLM challenge, got message type {message_type}"
        )));
    }

    let flags = read_u32(bytes, 20);
    let mut server_challenge = [0u8; 8];
    server_challenge.copy_from_slice(&bytes[24..32]);

    // Target info fields are only present in the longer header form
    let target_info = if bytes.len() >= 48 {
        let len = read_u16(bytes, 40) as usize;
        let offset = read_u32(bytes, 44) as usize;
        bytes
            .get(offset..offset + len)
            .ok_or_else(|| Error::Scraping("NTLM target info out of bounds".into()))?
            .to_vec()
    } else {
        Vec::new()
    };

    Ok(Challenge {
        flags,
        server_challenge,
        target_info,
    })
}

/// Build the AUTHENTICATE message for a challenge using a fresh client
/// challenge and the current time.
pub fn authenticate_message(challenge: &Challenge, identity: Identity<'_>) -> Vec<u8> {
    let mut client_challenge = [0u8; 8];
    rand::rng().fill(&mut client_challenge);
    authenticate_message_with(challenge, identity, client_challenge, filetime_now())
}

/// Deterministic core of [`authenticate_message`].
///
/// When the server supplied a timestamp, it replaces `timestamp` and the LM
/// response is sent as zeros (MS-NLMP 3.1.5.1.2).
pub fn authenticate_message_with(
    challenge: &Challenge,
    identity: Identity<'_>,
    client_challenge: [u8; 8],
    timestamp: u64,
) -> Vec<u8> {
    let response_key = nt_owf_v2(identity.domain, identity.user, identity.password);
    let server_timestamp = challenge.timestamp();

    let nt_response = nt_v2_response(
        &response_key,
        &challenge.server_challenge,
        &client_challenge,
        server_timestamp.unwrap_or(timestamp),
        &challenge.target_info,
    );
    let lm_response = match server_timestamp {
        Some(_) => vec![0u8; 24],
        None => lm_v2_response(&response_key, &challenge.server_challenge, &client_challenge)
            .to_vec(),
    };

    let domain = utf16le(identity.domain);
    let user = utf16le(identity.user);

    let mut message = vec![0u8; AUTHENTICATE_HEADER_LEN];
    message[..8].copy_from_slice(SIGNATURE);
    message[8..12].copy_from_slice(&AUTHENTICATE_MESSAGE.to_le_bytes());

    // Payload order: domain, user, workstation (empty), LM, NT
    append_field(&mut message, 28, &domain);
    append_field(&mut message, 36, &user);
    append_field(&mut message, 44, &[]);
    append_field(&mut message, 12, &lm_response);
    append_field(&mut message, 20, &nt_response);
    append_field(&mut message, 52, &[]);
    message[60..64].copy_from_slice(&CLIENT_FLAGS.to_le_bytes());
    message
}

/// `Authorization` header value for a message.
pub fn header_value(message: &[u8]) -> String {
    format!("{SCHEME} {}", STANDARD.encode(message))
}

/// Whether a `WWW-Authenticate` value offers NTLM (bare or with a token).
pub fn offers_ntlm(www_authenticate: &str) -> bool {
    let scheme = www_authenticate.split_whitespace().next().unwrap_or("");
    scheme.eq_ignore_ascii_case(SCHEME)
}

/// Decode the challenge token from a `WWW-Authenticate: NTLM <b64>` value.
///
/// Returns `None` for a bare `NTLM` offer or a value that is not NTLM.
pub fn challenge_token(www_authenticate: &str) -> Option<Vec<u8>> {
    let mut parts = www_authenticate.split_whitespace();
    let scheme = parts.next()?;
    if !scheme.eq_ignore_ascii_case(SCHEME) {
        return None;
    }
    STANDARD.decode(parts.next()?).ok()
}

/// NTOWFv1: MD4 of the UTF-16LE password.
fn nt_owf_v1(password: &str) -> [u8; 16] {
    let digest = Md4::digest(utf16le(password));
    let mut out = [0u8; 16];
    out.copy_from_slice(&digest);
    out
}

/// NTOWFv2: HMAC-MD5 keyed by NTOWFv1 over upper-cased user + domain.
fn nt_owf_v2(domain: &str, user: &str, password: &str) -> [u8; 16] {
    let mut subject = user.to_uppercase();
    subject.push_str(domain);
    hmac_md5(&nt_owf_v1(password), &[&utf16le(&subject)[..]])
}

fn lm_v2_response(
    key: &[u8; 16],
    server_challenge: &[u8; 8],
    client_challenge: &[u8; 8],
) -> [u8; 24] {
    let proof = hmac_md5(key, &[&server_challenge[..], &client_challenge[..]]);
    let mut out = [0u8; 24];
    out[..16].copy_from_slice(&proof);
    out[16..].copy_from_slice(client_challenge);
    out
}

fn nt_v2_response(
    key: &[u8; 16],
    server_challenge: &[u8; 8],
    client_challenge: &[u8; 8],
    timestamp: u64,
    target_info: &[u8],
) -> Vec<u8> {
    // Responserversion, HiResponserversion, Z(6)
    let mut blob = vec![1u8, 1, 0, 0, 0, 0, 0, 0];
    blob.extend_from_slice(&timestamp.to_le_bytes());
    blob.extend_from_slice(client_challenge);
    blob.extend_from_slice(&[0u8; 4]);
    blob.extend_from_slice(target_info);
    blob.extend_from_slice(&[0u8; 4]);

    let proof = hmac_md5(key, &[&server_challenge[..], &blob[..]]);
    let mut response = proof.to_vec();
    response.extend_from_slice(&blob);
    response
}

fn hmac_md5(key: &[u8], parts: &[&[u8]]) -> [u8; 16] {
    let mut mac = HmacMd5::new_from_slice(key).expect("HMAC accepts keys of any length");
    for part in parts {
        mac.update(part);
    }
    let tag = mac.finalize().into_bytes();
    let mut out = [0u8; 16];
    out.copy_from_slice(&tag);
    out
}

fn filetime_now() -> u64 {
    let since_epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    (since_epoch.as_secs() + FILETIME_UNIX_OFFSET_SECS) * 10_000_000
        + u64::from(since_epoch.subsec_nanos() / 100)
}

fn utf16le(s: &str) -> Vec<u8> {
    s.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

/// Append a payload and write its (len, maxlen, offset) descriptor at `at`.
fn append_field(message: &mut Vec<u8>, at: usize, payload: &[u8]) {
    let offset = message.len() as u32;
    let len = payload.len() as u16;
    message[at..at + 2].copy_from_slice(&len.to_le_bytes());
    message[at + 2..at + 4].copy_from_slice(&len.to_le_bytes());
    message[at + 4..at + 8].copy_from_slice(&offset.to_le_bytes());
    message.extend_from_slice(payload);
}

fn read_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// Build a CHALLENGE message the way a server would. Used by mock portals.
#[cfg(test)]
pub(crate) fn challenge_message(server_challenge: [u8; 8], target_info: &[u8]) -> Vec<u8> {
    let mut message = vec![0u8; 48];
    message[..8].copy_from_slice(SIGNATURE);
    message[8..12].copy_from_slice(&CHALLENGE_MESSAGE.to_le_bytes());
    // Empty target name at the end of the header
    message[16..20].copy_from_slice(&48u32.to_le_bytes());
    message[20..24].copy_from_slice(&CLIENT_FLAGS.to_le_bytes());
    message[24..32].copy_from_slice(&server_challenge);
    append_field(&mut message, 40, target_info);
    message
}

/// Decode the message type and user name from an `Authorization` value.
#[cfg(test)]
pub(crate) fn inspect_authorization(header: &str) -> Option<(u32, Option<String>)> {
    let token = header.strip_prefix("NTLM ")?;
    let bytes = STANDARD.decode(token).ok()?;
    if bytes.len() < 12 || &bytes[..8] != SIGNATURE {
        return None;
    }
    let message_type = read_u32(&bytes, 8);
    if message_type != AUTHENTICATE_MESSAGE {
        return Some((message_type, None));
    }
    let len = read_u16(&bytes, 36) as usize;
    let offset = read_u32(&bytes, 40) as usize;
    let units: Vec<u16> = bytes
        .get(offset..offset + len)?
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    Some((message_type, String::from_utf16(&units).ok()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERVER_CHALLENGE: [u8; 8] = [0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef];
    const CLIENT_CHALLENGE: [u8; 8] = [0xaa; 8];

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    #[test]
    fn nt_owf_v1_matches_reference_vector() {
        // MS-NLMP 4.2.2.1.2
        assert_eq!(hex(&nt_owf_v1("Password")), "a4f49c406510bdcab6824ee7c30fd852");
    }

    #[test]
    fn nt_owf_v2_matches_reference_vector() {
        // MS-NLMP 4.2.4.1.1
        assert_eq!(
            hex(&nt_owf_v2("Domain", "User", "Password")),
            "0c868a403bfd7a93a3001ef22eb2e90a"
        );
    }

    #[test]
    fn lm_v2_response_matches_reference_vector() {
        // MS-NLMP 4.2.4.2.1
        let key = nt_owf_v2("Domain", "User", "Password");
        let response = lm_v2_response(&key, &SERVER_CHALLENGE, &CLIENT_CHALLENGE);
        assert_eq!(
            hex(&response),
            "86c35097ac9cec102554764a57cccc19aaaaaaaaaaaaaaaa"
        );
    }

    #[test]
    fn negotiate_message_has_signature_type_and_flags() {
        let message = negotiate_message();
        assert_eq!(message.len(), 32);
        assert_eq!(&message[..8], SIGNATURE);
        assert_eq!(read_u32(&message, 8), NEGOTIATE_MESSAGE);
        assert_eq!(read_u32(&message, 12) & NEGOTIATE_NTLM, NEGOTIATE_NTLM);
        assert_eq!(read_u32(&message, 12) & NEGOTIATE_UNICODE, NEGOTIATE_UNICODE);
    }

    #[test]
    fn parse_challenge_reads_server_challenge_and_target_info() {
        let target_info = [0x02, 0x00, 0x02, 0x00, b'D', 0x00, 0x00, 0x00, 0x00, 0x00];
        let message = challenge_message(SERVER_CHALLENGE, &target_info);
        let challenge = parse_challenge(&message).unwrap();
        assert_eq!(challenge.server_challenge, SERVER_CHALLENGE);
        assert_eq!(challenge.target_info, target_info);
        assert_eq!(challenge.timestamp(), None);
    }

    #[test]
    fn parse_challenge_rejects_bad_signature() {
        let mut message = challenge_message(SERVER_CHALLENGE, &[]);
        message[0] = b'X';
        assert!(matches!(parse_challenge(&message), Err(Error::Scraping(_))));
    }

    #[test]
    fn parse_challenge_rejects_wrong_message_type() {
        let mut message = negotiate_message();
        message.extend_from_slice(&[0u8; 16]);
        assert!(matches!(parse_challenge(&message), Err(Error::Scraping(_))));
    }

    #[test]
    fn parse_challenge_rejects_out_of_bounds_target_info() {
        let mut message = challenge_message(SERVER_CHALLENGE, &[0u8; 4]);
        // Claim far more target info than the message holds
        message[40..42].copy_from_slice(&500u16.to_le_bytes());
        assert!(matches!(parse_challenge(&message), Err(Error::Scraping(_))));
    }

    #[test]
    fn authenticate_message_carries_user_and_responses() {
        let challenge = parse_challenge(&challenge_message(SERVER_CHALLENGE, &[])).unwrap();
        let identity = Identity {
            domain: "",
            user: "jdoe42",
            password: "secret",
        };
        let message = authenticate_message_with(&challenge, identity, CLIENT_CHALLENGE, 0);

        assert_eq!(&message[..8], SIGNATURE);
        assert_eq!(read_u32(&message, 8), AUTHENTICATE_MESSAGE);

        let (message_type, user) = inspect_authorization(&header_value(&message)).unwrap();
        assert_eq!(message_type, AUTHENTICATE_MESSAGE);
        assert_eq!(user.as_deref(), Some("jdoe42"));

        // LMv2 response (24 bytes) ends with the client challenge
        let lm_len = read_u16(&message, 12) as usize;
        let lm_offset = read_u32(&message, 16) as usize;
        assert_eq!(lm_len, 24);
        assert_eq!(&message[lm_offset + 16..lm_offset + 24], &CLIENT_CHALLENGE);

        // NTv2 response = 16-byte proof + 32-byte blob (no target info)
        let nt_len = read_u16(&message, 20) as usize;
        assert_eq!(nt_len, 16 + 32);
    }

    #[test]
    fn server_timestamp_zeroes_lm_response() {
        let mut target_info = Vec::new();
        target_info.extend_from_slice(&MSV_AV_TIMESTAMP.to_le_bytes());
        target_info.extend_from_slice(&8u16.to_le_bytes());
        target_info.extend_from_slice(&42u64.to_le_bytes());
        target_info.extend_from_slice(&[0u8; 4]);
        let challenge =
            parse_challenge(&challenge_message(SERVER_CHALLENGE, &target_info)).unwrap();
        assert_eq!(challenge.timestamp(), Some(42));

        let identity = Identity {
            domain: "",
            user: "u",
            password: "p",
        };
        let message = authenticate_message_with(&challenge, identity, CLIENT_CHALLENGE, 7);
        let lm_offset = read_u32(&message, 16) as usize;
        assert_eq!(&message[lm_offset..lm_offset + 24], &[0u8; 24]);
    }

    #[test]
    fn same_inputs_produce_same_message() {
        let challenge = parse_challenge(&challenge_message(SERVER_CHALLENGE, &[])).unwrap();
        let identity = Identity {
            domain: "CALVIN",
            user: "user",
            password: "pw",
        };
        let a = authenticate_message_with(&challenge, identity, CLIENT_CHALLENGE, 1);
        let b = authenticate_message_with(&challenge, identity, CLIENT_CHALLENGE, 1);
        assert_eq!(a, b);
        let c = authenticate_message_with(&challenge, identity, CLIENT_CHALLENGE, 2);
        assert_ne!(a, c);
    }

    #[test]
    fn header_helpers_round_trip_the_challenge() {
        let message = challenge_message(SERVER_CHALLENGE, &[]);
        let header = header_value(&message);
        assert!(offers_ntlm(&header));
        assert!(offers_ntlm("NTLM"));
        assert!(offers_ntlm("ntlm"));
        assert!(!offers_ntlm("Negotiate"));
        assert_eq!(challenge_token(&header), Some(message));
        assert_eq!(challenge_token("NTLM"), None);
        assert_eq!(challenge_token("Basic abc"), None);
    }
}
