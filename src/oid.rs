//! Object Identifier (OID) type.
//!
//! OIDs are stored as `SmallVec<[u32; 16]>` to avoid heap allocation for common OIDs.
//! The raw type may hold empty or single-arc sequences while it is being built; an OID
//! is *valid* once it has at least two arcs and a first arc of 0, 1 or 2.

use crate::error::{DecodeErrorKind, Error, OidErrorKind, OidErrors, Result};
use smallvec::SmallVec;
use std::fmt;

/// Maximum number of arcs (subidentifiers) accepted when decoding an OID.
///
/// Per RFC 2578 Section 3.5: "there are at most 128 sub-identifiers in a value".
pub const MAX_OID_LEN: usize = 128;

/// Object Identifier.
///
/// Equality is element-wise and length-sensitive; ordering is lexicographic over arcs,
/// which is the order agents walk the tree in.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Oid {
    arcs: SmallVec<[u32; 16]>,
}

impl Oid {
    /// Create an empty OID.
    pub fn empty() -> Self {
        Self {
            arcs: SmallVec::new(),
        }
    }

    /// Create an OID from arc values.
    ///
    /// ```
    /// use snmp_lite::oid::Oid;
    ///
    /// let oid = Oid::new(vec![1, 3, 6, 1, 2, 1]);
    /// assert_eq!(oid.arcs(), &[1, 3, 6, 1, 2, 1]);
    /// ```
    pub fn new(arcs: impl IntoIterator<Item = u32>) -> Self {
        Self {
            arcs: arcs.into_iter().collect(),
        }
    }

    /// Create an OID from a slice of arcs.
    pub fn from_slice(arcs: &[u32]) -> Self {
        Self {
            arcs: SmallVec::from_slice(arcs),
        }
    }

    /// Parse an OID from dotted decimal notation.
    ///
    /// Grammar: decimal segments separated by single dots. A leading dot is ignored.
    /// A trailing dot, consecutive dots, anything other than ASCII digits, a segment
    /// above `u32::MAX`, or a result that fails [`validate`](Self::validate) is an
    /// error. Leading zeros are plain decimal digits.
    ///
    /// ```
    /// use snmp_lite::oid::Oid;
    ///
    /// assert_eq!(Oid::parse("1.3.6.1.2.1").unwrap().arcs(), &[1, 3, 6, 1, 2, 1]);
    /// assert_eq!(Oid::parse(".1.3").unwrap().arcs(), &[1, 3]);
    ///
    /// for bad in ["", "1", "1.3.", "1..3", "1.-3", "1.4294967296", "3.1.2", "1.x"] {
    ///     assert!(Oid::parse(bad).is_err(), "{bad:?} should not parse");
    /// }
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let body = s.strip_prefix('.').unwrap_or(s);
        if body.is_empty() {
            return Err(Error::invalid_oid_with_input(OidErrorKind::Empty, s));
        }

        let mut arcs = SmallVec::new();
        let mut segments = body.split('.').peekable();

        while let Some(segment) = segments.next() {
            if segment.is_empty() {
                let kind = if segments.peek().is_none() {
                    OidErrorKind::TrailingDot
                } else {
                    OidErrorKind::EmptySegment
                };
                return Err(Error::invalid_oid_with_input(kind, s));
            }
            arcs.push(parse_arc(segment).map_err(|kind| Error::invalid_oid_with_input(kind, s))?);
        }

        let oid = Self { arcs };
        let violations = oid.violations();
        if !violations.is_empty() {
            return Err(Error::InvalidOid {
                errors: OidErrors(violations),
                input: Some(s.into()),
            });
        }
        Ok(oid)
    }

    /// Get the arc values.
    pub fn arcs(&self) -> &[u32] {
        &self.arcs
    }

    /// Get the number of arcs.
    pub fn len(&self) -> usize {
        self.arcs.len()
    }

    /// Check if the OID is empty.
    pub fn is_empty(&self) -> bool {
        self.arcs.is_empty()
    }

    /// Check if this OID starts with another OID.
    ///
    /// An OID always starts with itself, and any OID starts with an empty OID.
    pub fn starts_with(&self, other: &Oid) -> bool {
        self.arcs.len() >= other.arcs.len() && self.arcs[..other.arcs.len()] == other.arcs[..]
    }

    /// True if `self` is a prefix of `other`, including `self == other`.
    ///
    /// ```
    /// use snmp_lite::oid;
    ///
    /// let root = oid!(1, 3, 6);
    /// assert!(root.is_root_of(&oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 1)));
    /// assert!(root.is_root_of(&root));
    /// assert!(!oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 1).is_root_of(&oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 2)));
    /// ```
    pub fn is_root_of(&self, other: &Oid) -> bool {
        other.starts_with(self)
    }

    /// Inverse of [`is_root_of`](Self::is_root_of): true if `parent` is a prefix of `self`.
    pub fn is_child_of(&self, parent: &Oid) -> bool {
        parent.is_root_of(self)
    }

    /// True if the OID addresses a scalar instance: more than one arc and a final arc of 0.
    ///
    /// ```
    /// use snmp_lite::{Oid, oid};
    ///
    /// assert!(oid!(1, 3, 6, 1, 2, 0).is_scalar());
    /// assert!(!oid!(1, 3, 6, 1, 2, 1).is_scalar());
    /// assert!(!Oid::empty().is_scalar());
    /// ```
    pub fn is_scalar(&self) -> bool {
        self.arcs.len() > 1 && self.arcs.last() == Some(&0)
    }

    /// Get the parent OID (all arcs except the last).
    ///
    /// Returns `None` if the OID is empty.
    pub fn parent(&self) -> Option<Oid> {
        if self.arcs.is_empty() {
            None
        } else {
            Some(Oid {
                arcs: SmallVec::from_slice(&self.arcs[..self.arcs.len() - 1]),
            })
        }
    }

    /// Create a child OID by appending an arc.
    pub fn child(&self, arc: u32) -> Oid {
        let mut arcs = self.arcs.clone();
        arcs.push(arc);
        Oid { arcs }
    }

    /// Every rule this OID breaks, in check order.
    ///
    /// Arcs are `u32`, so the negative and 32-bit overflow rules can only be broken by
    /// text input and are reported by [`parse`](Self::parse).
    pub fn violations(&self) -> Vec<OidErrorKind> {
        let mut found = Vec::new();
        if self.arcs.len() < 2 {
            found.push(OidErrorKind::TooShort);
        }
        if let Some(&first) = self.arcs.first()
            && first > 2
        {
            found.push(OidErrorKind::InvalidFirstArc(first));
        }
        if let [first @ (0 | 1), second, ..] = self.arcs[..]
            && second >= 40
        {
            found.push(OidErrorKind::InvalidSecondArc { first, second });
        }
        found
    }

    /// Validate the OID, reporting all violations at once.
    ///
    /// ```
    /// use snmp_lite::oid::Oid;
    /// use snmp_lite::error::OidErrorKind;
    ///
    /// let err = Oid::from_slice(&[7]).validate().unwrap_err();
    /// assert_eq!(
    ///     err.oid_errors(),
    ///     &[OidErrorKind::TooShort, OidErrorKind::InvalidFirstArc(7)]
    /// );
    /// ```
    pub fn validate(&self) -> Result<()> {
        let violations = self.violations();
        if violations.is_empty() {
            Ok(())
        } else {
            Err(Error::InvalidOid {
                errors: OidErrors(violations),
                input: None,
            })
        }
    }

    /// True if [`validate`](Self::validate) succeeds.
    pub fn is_valid(&self) -> bool {
        self.violations().is_empty()
    }

    /// Encode to BER content octets, returning bytes in a stack-allocated buffer.
    ///
    /// OID encoding (X.690 Section 8.19):
    /// - First two arcs encoded as (arc1 * 40) + arc2 using base-128
    /// - Remaining arcs encoded as base-128 variable length
    ///
    /// The first subidentifier is packed in 64 bits, so `2.4294967295` encodes
    /// as `4294967375` rather than being clipped.
    pub fn to_ber_smallvec(&self) -> SmallVec<[u8; 64]> {
        let mut bytes = SmallVec::new();

        match self.arcs.as_slice() {
            [] => {}
            [first] => encode_subidentifier(&mut bytes, u64::from(*first) * 40),
            [first, second, rest @ ..] => {
                encode_subidentifier(&mut bytes, u64::from(*first) * 40 + u64::from(*second));
                for &arc in rest {
                    encode_subidentifier(&mut bytes, u64::from(arc));
                }
            }
        }

        bytes
    }

    /// Encode to BER content octets.
    pub fn to_ber(&self) -> Vec<u8> {
        self.to_ber_smallvec().to_vec()
    }

    /// Decode from BER content octets.
    ///
    /// Empty content decodes to the empty OID. Fails on an unterminated
    /// subidentifier group, an arc above 32 bits, or more than
    /// [`MAX_OID_LEN`] arcs. The packed first subidentifier may exceed 32 bits
    /// as long as its second arc does not.
    pub fn from_ber(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Ok(Self::empty());
        }

        let mut arcs = SmallVec::new();

        let (first_subid, consumed) = decode_subidentifier(data, 0, FIRST_SUBID_MAX)?;
        // both casts are in range: FIRST_SUBID_MAX - 80 == u32::MAX
        match first_subid {
            0..40 => {
                arcs.push(0);
                arcs.push(first_subid as u32);
            }
            40..80 => {
                arcs.push(1);
                arcs.push((first_subid - 40) as u32);
            }
            _ => {
                arcs.push(2);
                arcs.push((first_subid - 80) as u32);
            }
        }

        let mut i = consumed;
        while i < data.len() {
            let (arc, bytes_consumed) = decode_subidentifier(&data[i..], i, u64::from(u32::MAX))?;
            arcs.push(arc as u32);
            i += bytes_consumed;

            if arcs.len() > MAX_OID_LEN {
                return Err(Error::decode(
                    i,
                    DecodeErrorKind::OidTooLong {
                        count: arcs.len(),
                        max: MAX_OID_LEN,
                    },
                ));
            }
        }

        Ok(Self { arcs })
    }
}

/// Parse one dotted segment into an arc.
fn parse_arc(segment: &str) -> std::result::Result<u32, OidErrorKind> {
    if let Some(digits) = segment.strip_prefix('-')
        && !digits.is_empty()
        && digits.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(OidErrorKind::NegativeArc);
    }
    if !segment.bytes().all(|b| b.is_ascii_digit()) {
        return Err(OidErrorKind::InvalidCharacter);
    }
    segment.parse::<u32>().map_err(|_| OidErrorKind::ArcOverflow)
}

/// Largest packed first subidentifier: `2.4294967295`.
const FIRST_SUBID_MAX: u64 = 80 + u32::MAX as u64;

/// Encode a subidentifier in base-128 variable length.
#[inline]
fn encode_subidentifier(bytes: &mut SmallVec<[u8; 64]>, value: u64) {
    if value == 0 {
        bytes.push(0);
        return;
    }

    let mut temp = value;
    let mut count = 0;
    while temp > 0 {
        count += 1;
        temp >>= 7;
    }

    for i in (0..count).rev() {
        let mut byte = ((value >> (i * 7)) & 0x7F) as u8;
        if i > 0 {
            byte |= 0x80;
        }
        bytes.push(byte);
    }
}

/// Decode a subidentifier no larger than `max`, returning (value, bytes_consumed).
fn decode_subidentifier(data: &[u8], base_offset: usize, max: u64) -> Result<(u64, usize)> {
    let mut value: u64 = 0;
    let mut i = 0;

    loop {
        let Some(&byte) = data.get(i) else {
            return Err(Error::decode(
                base_offset + i,
                DecodeErrorKind::UnterminatedSubidentifier,
            ));
        };
        i += 1;

        value = (value << 7) | u64::from(byte & 0x7F);
        if value > max {
            return Err(Error::decode(
                base_offset + i,
                DecodeErrorKind::SubidentifierOverflow,
            ));
        }

        if byte & 0x80 == 0 {
            break;
        }
    }

    Ok((value, i))
}

impl fmt::Debug for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Oid({})", self)
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for arc in &self.arcs {
            if !first {
                write!(f, ".")?;
            }
            write!(f, "{}", arc)?;
            first = false;
        }
        Ok(())
    }
}

impl std::str::FromStr for Oid {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<&[u32]> for Oid {
    fn from(arcs: &[u32]) -> Self {
        Self::from_slice(arcs)
    }
}

impl<const N: usize> From<[u32; N]> for Oid {
    fn from(arcs: [u32; N]) -> Self {
        Self::new(arcs)
    }
}

impl PartialOrd for Oid {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Oid {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.arcs.cmp(&other.arcs)
    }
}

/// Build an OID from literal arcs.
///
/// ```
/// use snmp_lite::oid;
///
/// let sys_descr = oid!(1, 3, 6, 1, 2, 1, 1, 1, 0);
/// assert_eq!(sys_descr.to_string(), "1.3.6.1.2.1.1.1.0");
/// assert!(sys_descr.is_child_of(&oid!(1, 3, 6, 1, 2, 1, 1)));
/// ```
#[macro_export]
macro_rules! oid {
    ($($arc:expr),* $(,)?) => {
        $crate::oid::Oid::from_slice(&[$($arc),*])
    };
}
