// Copyright 2023 Matthew Ingwersen.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you
// may not use this file except in compliance with the License. You may
// obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied. See the License for the specific language governing
// permissions and limitations under the License.

//! Interpretation of on-chain content hashes.
//!
//! A content hash is an opaque octet string stored in a domain's text
//! resolver. It encodes a multicodec namespace followed by a CID: for
//! example, an IPFS hash is `0xe3 0x01` (the `ipfs-ns` codec as an
//! unsigned varint) followed by the binary CID of the content.
//!
//! Two interpretations matter to the engine. First, the *sentinel*:
//! a hash consisting of 23 zero octets (or no octets at all) means
//! "no content hash," which disables gateway-record synthesis.
//! Second, the textual form used in `dnslink=` TXT records:
//! `/ipfs/<cid>` or `/ipns/<cid>`, where a dag-pb/sha2-256 CID keeps
//! its conventional base58btc `Qm…` spelling and anything else is
//! spelled as a lowercase base32 CIDv1 (`b…`). A hash that cannot be
//! decoded has no textual form; that is never an error.

/// The length of the zero sentinel.
const SENTINEL_LEN: usize = 23;

/// The `ipfs-ns` multicodec.
const IPFS_NS: u64 = 0xe3;

/// The `ipns-ns` multicodec.
const IPNS_NS: u64 = 0xe5;

/// The `dag-pb` multicodec.
const DAG_PB: u64 = 0x70;

/// Returns whether a stored content hash means "absent": either no
/// octets at all, or the 23-octet all-zero sentinel.
pub fn is_absent(hash: &[u8]) -> bool {
    hash.is_empty() || (hash.len() == SENTINEL_LEN && hash.iter().all(|&octet| octet == 0))
}

/// Renders a content hash in the textual form used for `dnslink=` TXT
/// records, or `None` if the hash does not decode.
pub fn to_text(hash: &[u8]) -> Option<String> {
    let (namespace, cid_start) = read_uvarint(hash, 0)?;
    let scheme = match namespace {
        IPFS_NS => "ipfs",
        IPNS_NS => "ipns",
        _ => return None,
    };
    let cid = cid_text(&hash[cid_start..])?;
    Some(format!("/{}/{}", scheme, cid))
}

/// Renders a binary CID as text.
fn cid_text(cid: &[u8]) -> Option<String> {
    // A bare sha2-256 multihash is a CIDv0 and is spelled base58btc.
    if is_sha256_multihash(cid) {
        return Some(base58btc(cid));
    }

    let (version, codec_start) = read_uvarint(cid, 0)?;
    if version != 1 {
        return None;
    }
    let (codec, multihash_start) = read_uvarint(cid, codec_start)?;
    let multihash = &cid[multihash_start..];

    // Validate the multihash structure: code, digest length, digest.
    let (_, digest_len_start) = read_uvarint(multihash, 0)?;
    let (digest_len, digest_start) = read_uvarint(multihash, digest_len_start)?;
    if multihash.len() - digest_start != digest_len as usize {
        return None;
    }

    if codec == DAG_PB && is_sha256_multihash(multihash) {
        // The canonical spelling of a dag-pb/sha2-256 CID is its v0
        // form.
        Some(base58btc(multihash))
    } else {
        let mut out = String::from("b");
        base32_lower_into(cid, &mut out);
        Some(out)
    }
}

/// Returns whether `octets` is exactly a sha2-256 multihash (code
/// 0x12, length 0x20, 32 octets of digest).
fn is_sha256_multihash(octets: &[u8]) -> bool {
    octets.len() == 34 && octets[0] == 0x12 && octets[1] == 0x20
}

/// Reads an unsigned varint at `start`, returning its value and the
/// index after it. Values wider than 63 bits are rejected.
fn read_uvarint(octets: &[u8], start: usize) -> Option<(u64, usize)> {
    let mut value: u64 = 0;
    let mut shift = 0;
    for (i, &octet) in octets.get(start..)?.iter().enumerate() {
        if shift > 56 {
            return None;
        }
        value |= u64::from(octet & 0x7f) << shift;
        if octet & 0x80 == 0 {
            return Some((value, start + i + 1));
        }
        shift += 7;
    }
    None
}

/// Encodes `input` in base58btc.
fn base58btc(input: &[u8]) -> String {
    const ALPHABET: &[u8; 58] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

    // Base-256 to base-58 long division, least significant digit
    // first.
    let mut digits: Vec<u8> = Vec::with_capacity(input.len() * 138 / 100 + 1);
    for &octet in input {
        let mut carry = octet as u32;
        for digit in digits.iter_mut() {
            carry += (*digit as u32) << 8;
            *digit = (carry % 58) as u8;
            carry /= 58;
        }
        while carry > 0 {
            digits.push((carry % 58) as u8);
            carry /= 58;
        }
    }

    let leading_zeros = input.iter().take_while(|&&octet| octet == 0).count();
    let mut out = String::with_capacity(leading_zeros + digits.len());
    for _ in 0..leading_zeros {
        out.push('1');
    }
    for &digit in digits.iter().rev() {
        out.push(ALPHABET[digit as usize] as char);
    }
    out
}

/// Appends the unpadded lowercase base32 ([RFC 4648]) encoding of
/// `input` to `out`.
///
/// [RFC 4648]: https://datatracker.ietf.org/doc/html/rfc4648
fn base32_lower_into(input: &[u8], out: &mut String) {
    const ALPHABET: &[u8; 32] = b"abcdefghijklmnopqrstuvwxyz234567";

    let mut buffer: u32 = 0;
    let mut bits = 0;
    for &octet in input {
        buffer = (buffer << 8) | u32::from(octet);
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(ALPHABET[(buffer >> bits) as usize & 0x1f] as char);
        }
    }
    if bits > 0 {
        out.push(ALPHABET[(buffer << (5 - bits)) as usize & 0x1f] as char);
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
