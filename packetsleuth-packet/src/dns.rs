//! DNS message well-formedness check
//!
//! The classifier only needs to know whether a UDP/53 payload is a DNS
//! message, so this walks the header, questions and resource records without
//! keeping names or record data. Every record the header counts must be
//! present and in bounds.

/// Why a payload is not a DNS message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DnsError {
    /// Payload shorter than the 12-byte header
    ShortHeader,
    /// A name, question or record runs past the payload
    Truncated(usize),
    /// Label length with a reserved prefix (0x40 or 0x80)
    BadLabel(usize),
    /// Compression pointers nested too deep or out of range
    BadPointer(usize),
}

/// Fixed DNS header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DnsHeader {
    pub id: u16,
    pub flags: u16,
    pub questions: u16,
    pub answers: u16,
    pub authorities: u16,
    pub additionals: u16,
}

impl DnsHeader {
    pub const SIZE: usize = 12;

    pub fn parse(payload: &[u8]) -> Result<Self, DnsError> {
        if payload.len() < Self::SIZE {
            return Err(DnsError::ShortHeader);
        }

        let word = |i: usize| u16::from_be_bytes([payload[i], payload[i + 1]]);
        Ok(DnsHeader {
            id: word(0),
            flags: word(2),
            questions: word(4),
            answers: word(6),
            authorities: word(8),
            additionals: word(10),
        })
    }

    fn record_count(&self) -> usize {
        self.answers as usize + self.authorities as usize + self.additionals as usize
    }
}

/// Maximum compression pointer hops per name
const MAX_POINTER_DEPTH: usize = 10;

/// Validate a full DNS message, returning its header
pub fn validate(payload: &[u8]) -> Result<DnsHeader, DnsError> {
    let header = DnsHeader::parse(payload)?;
    let mut offset = DnsHeader::SIZE;

    for _ in 0..header.questions {
        offset = skip_name(payload, offset)?;
        offset = advance(payload, offset, 4)?; // QTYPE + QCLASS
    }

    for _ in 0..header.record_count() {
        offset = skip_name(payload, offset)?;
        let fixed = payload
            .get(offset..offset + 10)
            .ok_or(DnsError::Truncated(offset))?;
        let rdlength = u16::from_be_bytes([fixed[8], fixed[9]]) as usize;
        offset = advance(payload, offset, 10 + rdlength)?;
    }

    Ok(header)
}

/// Convenience predicate used by the classifier
pub fn is_well_formed(payload: &[u8]) -> bool {
    validate(payload).is_ok()
}

fn advance(payload: &[u8], offset: usize, len: usize) -> Result<usize, DnsError> {
    let end = offset + len;
    if end > payload.len() {
        return Err(DnsError::Truncated(offset));
    }
    Ok(end)
}

/// Skip an encoded name starting at `offset`, returning the offset just past it
fn skip_name(payload: &[u8], mut offset: usize) -> Result<usize, DnsError> {
    let mut resume = None;
    let mut depth = 0;

    loop {
        let len = *payload.get(offset).ok_or(DnsError::Truncated(offset))? as usize;

        match len & 0xC0 {
            0x00 if len == 0 => {
                return Ok(resume.unwrap_or(offset + 1));
            }
            0x00 => {
                offset = advance(payload, offset + 1, len)?;
            }
            0xC0 => {
                let low = *payload.get(offset + 1).ok_or(DnsError::Truncated(offset))?;
                let pointer = ((len & 0x3F) << 8) | low as usize;
                depth += 1;
                if depth > MAX_POINTER_DEPTH || pointer >= payload.len() {
                    return Err(DnsError::BadPointer(offset));
                }
                resume.get_or_insert(offset + 2);
                offset = pointer;
            }
            _ => return Err(DnsError::BadLabel(offset)),
        }
    }
}
