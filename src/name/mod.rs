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

//! Implementation of data structures related to domain names.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::FusedIterator;
use std::str::FromStr;

use arrayvec::ArrayVec;

mod error;
mod label;
pub use error::Error;
pub use label::Label;

/// The maximum number of labels in a domain name. The 255-octet limit
/// on the wire representation implies at most 128 labels (127 one-octet
/// labels plus the null terminal).
const MAX_LABELS: usize = 128;

/// The maximum length of the uncompressed on-the-wire representation of
/// a domain name.
const MAX_WIRE_LEN: usize = 255;

/// The maximum length of a label in a domain name (not including the
/// octet that provides the length).
const MAX_LABEL_LEN: usize = 63;

/// A scratch buffer for label offsets while assembling a name.
type OffsetBuf = ArrayVec<u8, MAX_LABELS>;

////////////////////////////////////////////////////////////////////////
// NAME STRUCTURE                                                     //
////////////////////////////////////////////////////////////////////////

/// An absolute domain name.
///
/// Every `Name` is fully qualified: its last label is always the null
/// label, so the dotted rendition always ends with `.`. A `Name` is
/// stored as its uncompressed on-the-wire representation ([RFC 1035
/// § 3.1]) together with the offset of each label, which makes label
/// indexing and suffix extraction cheap.
///
/// Comparisons ([`PartialEq`], [`Ord`], [`Hash`]) are
/// ASCII-case-insensitive; case is preserved in the representation.
/// The [`Ord`] implementation uses DNSSEC's canonical ordering of
/// domain names ([RFC 4034 § 6.1]): names are compared as strings of
/// labels read right to left.
///
/// `Name`s are constructed from dotted strings through the [`FromStr`]
/// implementation and from wire-format octets through
/// [`Name::from_wire`] and [`Name::from_wire_all`].
///
/// [RFC 1035 § 3.1]: https://datatracker.ietf.org/doc/html/rfc1035#section-3.1
/// [RFC 4034 § 6.1]: https://datatracker.ietf.org/doc/html/rfc4034#section-6.1
#[derive(Clone)]
pub struct Name {
    /// The offset of each label in `wire`.
    offsets: Box<[u8]>,

    /// The uncompressed on-the-wire representation.
    wire: Box<[u8]>,
}

impl Name {
    /// Constructs a `Name` from parts already validated by the caller.
    fn from_parts(offsets: &[u8], wire: Vec<u8>) -> Self {
        Self {
            offsets: offsets.into(),
            wire: wire.into_boxed_slice(),
        }
    }

    /// Returns the DNS root name, `.`.
    pub fn root() -> Self {
        Self::from_parts(&[0], vec![0])
    }

    /// Returns the number of labels in this `Name`, counting the null
    /// terminal label.
    pub fn label_count(&self) -> usize {
        self.offsets.len()
    }

    /// Returns whether the `Name` is the DNS root `.`.
    pub fn is_root(&self) -> bool {
        self.label_count() == 1
    }

    /// Returns whether the `Name` is a wildcard domain name (i.e.,
    /// whether its first label is `*`).
    pub fn is_wildcard(&self) -> bool {
        self.label(0).is_asterisk()
    }

    /// Returns the `index`-th label. Panics if `index` is out of
    /// bounds.
    pub fn label(&self, index: usize) -> &Label {
        let offset = self.offsets[index] as usize;
        let len = self.wire[offset] as usize;
        Label::from_unchecked(&self.wire[offset + 1..offset + 1 + len])
    }

    /// Returns an iterator over the labels of this `Name`.
    pub fn labels(&self) -> Labels {
        Labels {
            name: self,
            front: 0,
            back: self.label_count(),
        }
    }

    /// Returns the (uncompressed) on-the-wire representation of the
    /// `Name`.
    pub fn wire_repr(&self) -> &[u8] {
        &self.wire
    }

    /// Returns whether this `Name` is equal to or a subdomain of
    /// `other`.
    pub fn eq_or_subdomain_of(&self, other: &Name) -> bool {
        self.label_count() >= other.label_count()
            && self
                .labels()
                .rev()
                .zip(other.labels().rev())
                .all(|(a, b)| a == b)
    }

    /// Returns the suffix of this `Name` obtained by skipping the
    /// first `skip` labels, or `None` if there aren't enough labels.
    pub fn suffix(&self, skip: usize) -> Option<Name> {
        if skip >= self.label_count() {
            return None;
        }
        let start = self.offsets[skip] as usize;
        let offsets: OffsetBuf = self.offsets[skip..]
            .iter()
            .map(|&offset| offset - start as u8)
            .collect();
        Some(Self::from_parts(&offsets, self.wire[start..].to_vec()))
    }

    /// Returns the parent domain of this `Name`, or `None` for the
    /// root.
    pub fn parent(&self) -> Option<Name> {
        if self.is_root() {
            None
        } else {
            self.suffix(1)
        }
    }

    /// Returns a new `Name` with `label` prepended as the first label.
    pub fn prepend(&self, label: &[u8]) -> Result<Name, Error> {
        if label.is_empty() {
            return Err(Error::NullNonTerminal);
        } else if label.len() > MAX_LABEL_LEN {
            return Err(Error::LabelTooLong);
        } else if self.wire.len() + label.len() + 1 > MAX_WIRE_LEN {
            return Err(Error::NameTooLong);
        }

        let mut wire = Vec::with_capacity(self.wire.len() + label.len() + 1);
        wire.push(label.len() as u8);
        wire.extend_from_slice(label);
        wire.extend_from_slice(&self.wire);
        let mut offsets = OffsetBuf::new();
        offsets.push(0);
        let shift = (label.len() + 1) as u8;
        for &offset in self.offsets.iter() {
            offsets.push(offset + shift);
        }
        Ok(Self::from_parts(&offsets, wire))
    }

    /// Returns this `Name` with its first label replaced by the
    /// asterisk label, per the DNS wildcard convention, or `None` for
    /// the root (which has no first label to replace).
    pub fn to_wildcard(&self) -> Option<Name> {
        // Replacing a label with "*" never grows the name, so prepend
        // cannot fail here.
        Some(self.parent()?.prepend(b"*").unwrap())
    }

    /// Rewrites the `old_suffix` of this `Name` to `new_suffix`,
    /// keeping the leading labels, as in DNAME substitution ([RFC 6672
    /// § 2.2]).
    ///
    /// Fails with [`Error::SuffixMismatch`] if the name does not end
    /// with `old_suffix`, and with [`Error::NameTooLong`] if the
    /// substituted name would exceed 255 octets.
    ///
    /// [RFC 6672 § 2.2]: https://datatracker.ietf.org/doc/html/rfc6672#section-2.2
    pub fn with_suffix_replaced(&self, old_suffix: &Name, new_suffix: &Name) -> Result<Name, Error> {
        if !self.eq_or_subdomain_of(old_suffix) {
            return Err(Error::SuffixMismatch);
        }

        let keep = self.label_count() - old_suffix.label_count();
        let prefix_len = self.offsets[keep] as usize;
        if prefix_len + new_suffix.wire.len() > MAX_WIRE_LEN {
            return Err(Error::NameTooLong);
        }

        let mut wire = Vec::with_capacity(prefix_len + new_suffix.wire.len());
        wire.extend_from_slice(&self.wire[..prefix_len]);
        wire.extend_from_slice(&new_suffix.wire);
        let mut offsets = OffsetBuf::new();
        offsets.extend(self.offsets[..keep].iter().copied());
        for &offset in new_suffix.offsets.iter() {
            offsets.push(offset + prefix_len as u8);
        }
        Ok(Self::from_parts(&offsets, wire))
    }

    /// Returns a copy of this `Name` with all ASCII letters folded to
    /// lower case.
    pub fn to_lowercase(&self) -> Name {
        let mut copy = self.clone();
        copy.make_ascii_lowercase();
        copy
    }

    /// Makes all ASCII letters in this `Name` lowercase.
    pub fn make_ascii_lowercase(&mut self) {
        // Label length octets are at most 63 and therefore not ASCII
        // letters, so the whole buffer can be folded in one pass.
        self.wire.make_ascii_lowercase();
    }

    /// Tries to parse an uncompressed name starting at index `start` of
    /// `octets`. The name need not extend to the end of the buffer. On
    /// success, returns the `Name` and the number of octets it occupied.
    ///
    /// Compression pointers are rejected with [`Error::PointerLabel`]:
    /// the RRSET blobs this crate reads are packed without compression.
    pub fn from_wire(octets: &[u8], start: usize) -> Result<(Name, usize), Error> {
        let mut offsets = OffsetBuf::new();
        let mut cursor = start;
        loop {
            let len = *octets.get(cursor).ok_or(Error::UnexpectedEom)? as usize;
            if len > MAX_LABEL_LEN {
                // The two high bits signal a compression pointer; any
                // other value over 63 is equally invalid here.
                return Err(Error::PointerLabel);
            }
            if cursor - start + len + 1 > MAX_WIRE_LEN {
                return Err(Error::NameTooLong);
            }
            if octets.len() < cursor + len + 1 {
                return Err(Error::UnexpectedEom);
            }
            offsets
                .try_push((cursor - start) as u8)
                .map_err(|_| Error::NameTooLong)?;
            cursor += len + 1;
            if len == 0 {
                break;
            }
        }
        let name = Self::from_parts(&offsets, octets[start..cursor].to_vec());
        Ok((name, cursor - start))
    }

    /// Like [`Name::from_wire`], but fails with [`Error::ExtraData`] if
    /// the name does not occupy the entire buffer.
    pub fn from_wire_all(octets: &[u8]) -> Result<Name, Error> {
        let (name, consumed) = Self::from_wire(octets, 0)?;
        if consumed == octets.len() {
            Ok(name)
        } else {
            Err(Error::ExtraData)
        }
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_root() {
            f.write_str(".")
        } else {
            for label in self.labels() {
                if !label.is_null() {
                    write!(f, "{}.", label)?;
                }
            }
            Ok(())
        }
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "\"{}\"", self)
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.label_count() == other.label_count()
            && self.labels().zip(other.labels()).all(|(a, b)| a == b)
    }
}

impl Eq for Name {}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Name {
    fn cmp(&self, other: &Self) -> Ordering {
        self.labels()
            .rev()
            .zip(other.labels().rev())
            .find_map(|(a, b)| Some(a.cmp(b)).filter(|ordering| ordering.is_ne()))
            .unwrap_or_else(|| self.label_count().cmp(&other.label_count()))
    }
}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for label in self.labels() {
            label.hash(state);
        }
    }
}

////////////////////////////////////////////////////////////////////////
// ITERATION OVER A NAME'S LABELS                                     //
////////////////////////////////////////////////////////////////////////

/// An iterator over the [`Label`]s of a [`Name`]; see
/// [`Name::labels`].
#[derive(Clone, Debug)]
pub struct Labels<'a> {
    name: &'a Name,
    front: usize,
    back: usize,
}

impl<'a> Iterator for Labels<'a> {
    type Item = &'a Label;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front < self.back {
            let this_one = self.front;
            self.front += 1;
            Some(self.name.label(this_one))
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.back - self.front;
        (len, Some(len))
    }
}

impl DoubleEndedIterator for Labels<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.back > self.front {
            self.back -= 1;
            Some(self.name.label(self.back))
        } else {
            None
        }
    }
}

impl ExactSizeIterator for Labels<'_> {}

impl FusedIterator for Labels<'_> {}

////////////////////////////////////////////////////////////////////////
// PARSING OF NAMES FROM RUST STRINGS                                 //
////////////////////////////////////////////////////////////////////////

/// Converts a dotted, strictly ASCII, fully qualified string (e.g.
/// `"example.test."`) into a [`Name`]. Relative names (without the
/// trailing dot) are rejected with [`Error::NonNullTerminal`].
impl FromStr for Name {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(Error::StrEmpty);
        } else if !s.is_ascii() {
            return Err(Error::StrNotAscii);
        } else if s == "." {
            return Ok(Name::root());
        } else if !s.ends_with('.') {
            return Err(Error::NonNullTerminal);
        }

        let mut offsets = OffsetBuf::new();
        let mut wire = Vec::with_capacity(s.len() + 1);
        for label in s[..s.len() - 1].split('.') {
            if label.is_empty() {
                return Err(Error::NullNonTerminal);
            } else if label.len() > MAX_LABEL_LEN {
                return Err(Error::LabelTooLong);
            } else if wire.len() + label.len() + 2 > MAX_WIRE_LEN {
                return Err(Error::NameTooLong);
            }
            offsets
                .try_push(wire.len() as u8)
                .map_err(|_| Error::NameTooLong)?;
            wire.push(label.len() as u8);
            wire.extend_from_slice(label.as_bytes());
        }
        offsets
            .try_push(wire.len() as u8)
            .map_err(|_| Error::NameTooLong)?;
        wire.push(0);
        Ok(Self::from_parts(&offsets, wire))
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    fn name(from: &str) -> Name {
        from.parse().unwrap()
    }

    #[test]
    fn root_has_expected_characteristics() {
        let root = Name::root();
        assert!(root.is_root());
        assert_eq!(root.label_count(), 1);
        assert_eq!(root.wire_repr(), &[0]);
        assert_eq!(root.to_string(), ".");
    }

    #[test]
    fn fromstr_works() {
        let parsed = name("example.test.");
        assert_eq!(parsed.wire_repr(), b"\x07example\x04test\x00");
        assert_eq!(parsed.label_count(), 3);
        assert_eq!(parsed.to_string(), "example.test.");
    }

    #[test]
    fn fromstr_works_for_root() {
        assert_eq!(name("."), Name::root());
    }

    #[test]
    fn fromstr_rejects_empty() {
        assert_eq!("".parse::<Name>(), Err(Error::StrEmpty));
    }

    #[test]
    fn fromstr_rejects_non_ascii() {
        assert_eq!("✈.aero.".parse::<Name>(), Err(Error::StrNotAscii));
    }

    #[test]
    fn fromstr_rejects_non_fqdn() {
        assert_eq!("non.fqdn".parse::<Name>(), Err(Error::NonNullTerminal));
    }

    #[test]
    fn fromstr_rejects_null_non_terminal() {
        assert_eq!("a.b..c.".parse::<Name>(), Err(Error::NullNonTerminal));
    }

    #[test]
    fn fromstr_rejects_long_label() {
        assert_eq!(
            "xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx."
                .parse::<Name>(),
            Err(Error::LabelTooLong)
        );
    }

    #[test]
    fn fromstr_rejects_long_name() {
        let long: String = std::iter::repeat("x.").take(128).collect();
        assert_eq!(long.parse::<Name>(), Err(Error::NameTooLong));
    }

    #[test]
    fn equality_is_case_insensitive() {
        assert_eq!(name("Example.TEST."), name("example.test."));
    }

    #[test]
    fn is_wildcard_works() {
        assert!(name("*.example.test.").is_wildcard());
        assert!(!name("example.test.").is_wildcard());
        assert!(!name("x.*.example.test.").is_wildcard());
    }

    #[test]
    fn suffix_works() {
        let full = name("sub.example.test.");
        assert_eq!(full.suffix(0), Some(full.clone()));
        assert_eq!(full.suffix(1), Some(name("example.test.")));
        assert_eq!(full.suffix(2), Some(name("test.")));
        assert_eq!(full.suffix(3), Some(Name::root()));
        assert_eq!(full.suffix(4), None);
    }

    #[test]
    fn parent_works() {
        assert_eq!(name("example.test.").parent(), Some(name("test.")));
        assert_eq!(name("test.").parent(), Some(Name::root()));
        assert_eq!(Name::root().parent(), None);
    }

    #[test]
    fn eq_or_subdomain_of_works() {
        let subdomain = name("subdomain.example.test.");
        let domain = name("example.test.");
        let other = name("other.test.");
        let root = Name::root();
        assert!(subdomain.eq_or_subdomain_of(&subdomain));
        assert!(subdomain.eq_or_subdomain_of(&domain));
        assert!(subdomain.eq_or_subdomain_of(&root));
        assert!(!domain.eq_or_subdomain_of(&subdomain));
        assert!(!domain.eq_or_subdomain_of(&other));
        assert!(!root.eq_or_subdomain_of(&domain));
    }

    #[test]
    fn prepend_works() {
        assert_eq!(
            name("example.test.").prepend(b"hostmaster").unwrap(),
            name("hostmaster.example.test."),
        );
    }

    #[test]
    fn to_wildcard_works() {
        assert_eq!(
            name("www.example.test.").to_wildcard(),
            Some(name("*.example.test.")),
        );
        assert_eq!(
            name("*.example.test.").to_wildcard(),
            Some(name("*.example.test.")),
        );
        assert_eq!(name("test.").to_wildcard(), Some(name("*.")));
        assert_eq!(Name::root().to_wildcard(), None);
    }

    #[test]
    fn with_suffix_replaced_works() {
        let qname = name("foo.foo.example.com.");
        let owner = name("foo.example.com.");
        let target = name("bar.example.com.");
        assert_eq!(
            qname.with_suffix_replaced(&owner, &target).unwrap(),
            name("foo.bar.example.com."),
        );
    }

    #[test]
    fn with_suffix_replaced_handles_equal_names() {
        let owner = name("foo.example.com.");
        let target = name("bar.example.com.");
        assert_eq!(
            owner.with_suffix_replaced(&owner, &target).unwrap(),
            target,
        );
    }

    #[test]
    fn with_suffix_replaced_rejects_non_suffix() {
        let qname = name("foo.example.com.");
        assert_eq!(
            qname.with_suffix_replaced(&name("example.net."), &name("x.")),
            Err(Error::SuffixMismatch),
        );
    }

    #[test]
    fn with_suffix_replaced_rejects_overlong_result() {
        let prefix: String = std::iter::repeat("x.").take(100).collect();
        let qname: Name = format!("{}example.com.", prefix).parse().unwrap();
        let long_label = "y".repeat(63);
        let target: Name = format!("{0}.{0}.com.", long_label).parse().unwrap();
        assert_eq!(
            qname.with_suffix_replaced(&"example.com.".parse().unwrap(), &target),
            Err(Error::NameTooLong),
        );
    }

    #[test]
    fn from_wire_works() {
        let buf = b"\x03www\x07example\x04test\x00extra";
        let (parsed, consumed) = Name::from_wire(buf, 0).unwrap();
        assert_eq!(parsed, name("www.example.test."));
        assert_eq!(consumed, 18);
    }

    #[test]
    fn from_wire_rejects_pointers() {
        assert_eq!(
            Name::from_wire(b"\xc0\x0c", 0),
            Err(Error::PointerLabel),
        );
    }

    #[test]
    fn from_wire_rejects_truncation() {
        assert_eq!(
            Name::from_wire(b"\x07exam", 0),
            Err(Error::UnexpectedEom),
        );
    }

    #[test]
    fn from_wire_all_rejects_extra_data() {
        assert_eq!(
            Name::from_wire_all(b"\x04test\x00extra"),
            Err(Error::ExtraData),
        );
    }

    #[test]
    fn lowercasing_works() {
        let mut upper = name("UPPERCASE.Domain.Test.");
        upper.make_ascii_lowercase();
        assert_eq!(upper.wire_repr(), b"\x09uppercase\x06domain\x04test\x00");
    }

    #[test]
    fn ord_uses_canonical_ordering() {
        // This ordered list is from RFC 4034 § 6.1.
        let names: Vec<Name> = [
            "example.",
            "a.example.",
            "yljkjljk.a.example.",
            "Z.a.example.",
            "zABC.a.EXAMPLE.",
            "z.example.",
            "*.z.example.",
        ]
        .into_iter()
        .map(|n| n.parse().unwrap())
        .collect();

        for (i, ni) in names.iter().enumerate() {
            for (j, nj) in names.iter().enumerate() {
                assert_eq!(i.cmp(&j), ni.cmp(nj), "{} vs {}", ni, nj);
            }
        }
    }
}
