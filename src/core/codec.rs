//! Fixed-layout binary payload codec.
//!
//! Every block carries exactly [`DATA_LEN`] bytes laid out as:
//!
//! ```text
//! [0..50]    signer public key, checksummed text, NUL-padded
//! [50..53]   signature length, 3 ASCII decimal digits
//! [53..153]  signature text; bytes past the length MUST be NUL
//! [153]      type tag: '0' Upload, '1' Transfer, '2' Stake, '9' Faucet
//! [154..158] body length, 4 ASCII decimal digits
//! [158..]    type-specific fields, back-to-back, then NUL padding
//! ```
//!
//! Numeric fields are fixed-width ASCII decimal strings: amounts 16 digits,
//! timestamps 10 digits. The signed message is always `payload[153..]`
//! regardless of the actual signature length.

use crate::types::address::{Address, NodeId, ADDRESS_LEN, NODE_ID_LEN};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Total payload size in bytes.
pub const DATA_LEN: usize = 4096;

/// Offset of the type tag; the signed message starts here.
pub const MESSAGE_OFFSET: usize = 153;

/// Maximum signature text length; the slot `[53..153]` is reserved for it.
pub const SIG_MAX_LEN: usize = 100;

const SIG_LEN_OFFSET: usize = ADDRESS_LEN;
const SIG_LEN_DIGITS: usize = 3;
const SIG_OFFSET: usize = SIG_LEN_OFFSET + SIG_LEN_DIGITS;
const BODY_LEN_OFFSET: usize = MESSAGE_OFFSET + 1;
const BODY_LEN_DIGITS: usize = 4;
const BODY_OFFSET: usize = BODY_LEN_OFFSET + BODY_LEN_DIGITS;

const AMOUNT_DIGITS: usize = 16;
const TIME_DIGITS: usize = 10;

/// Largest amount a 16-digit field can carry.
pub const MAX_AMOUNT: u64 = 9_999_999_999_999_999;

/// Native currency amounts.
pub type Amount = u64;

/// Errors produced while decoding a payload.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("payload must be exactly {DATA_LEN} bytes, got {0}")]
    BadLength(usize),

    #[error("malformed {0} field")]
    MalformedField(&'static str),

    #[error("unknown transaction type tag {0:#04x}")]
    UnknownType(u8),
}

/// Errors produced while assembling a payload.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error("{0} does not fit its fixed-width field")]
    FieldTooLong(&'static str),

    #[error("amount exceeds the {AMOUNT_DIGITS}-digit field maximum")]
    AmountTooLarge,
}

/// Decoded view of a payload: the tagged transaction union.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionRecord {
    /// Debits the fixed upload fee from the signer, credits it to the
    /// unallocated pool. The chunk data itself lives in the free-form body.
    Upload(UploadRecord),
    /// Debits the sender, credits the recipient; no pool effect.
    Transfer(TransferRecord),
    /// Locks `amount` from the reward address for `[start, end)`; pays a
    /// computed reward out of the pool once matured.
    Stake(StakeRecord),
    /// Credits the recipient out of the unallocated pool.
    Faucet(FaucetRecord),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRecord {
    pub sender: Address,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub amount: Amount,
    pub sender: Address,
    pub recipient: Address,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeRecord {
    pub node: NodeId,
    pub reward_address: Address,
    pub start: u64,
    pub end: u64,
    pub amount: Amount,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaucetRecord {
    pub amount: Amount,
    pub recipient: Address,
}

impl TransactionRecord {
    /// The single-character tag identifying this variant on the wire.
    pub fn type_tag(&self) -> u8 {
        match self {
            TransactionRecord::Upload(_) => b'0',
            TransactionRecord::Transfer(_) => b'1',
            TransactionRecord::Stake(_) => b'2',
            TransactionRecord::Faucet(_) => b'9',
        }
    }

    fn fixed_body_len(&self) -> usize {
        match self {
            TransactionRecord::Upload(_) => 0,
            TransactionRecord::Transfer(_) => AMOUNT_DIGITS + 2 * ADDRESS_LEN,
            TransactionRecord::Stake(_) => {
                NODE_ID_LEN + ADDRESS_LEN + 2 * TIME_DIGITS + AMOUNT_DIGITS
            }
            TransactionRecord::Faucet(_) => AMOUNT_DIGITS + ADDRESS_LEN,
        }
    }
}

/// The fixed-length binary payload embedded in a block.
///
/// Boxed: at 4 KiB a payload should not live on the stack or be copied
/// implicitly.
#[derive(Clone, PartialEq, Eq)]
pub struct Payload(Box<[u8; DATA_LEN]>);

impl Payload {
    /// Wraps raw bytes, requiring exactly [`DATA_LEN`] of them.
    pub fn from_bytes(bytes: &[u8]) -> Result<Payload, DecodeError> {
        if bytes.len() != DATA_LEN {
            return Err(DecodeError::BadLength(bytes.len()));
        }
        let mut data = Box::new([0u8; DATA_LEN]);
        data.copy_from_slice(bytes);
        Ok(Payload(data))
    }

    /// An all-NUL payload, used for genesis blocks that carry no transaction.
    pub fn zeroed() -> Payload {
        Payload(Box::new([0u8; DATA_LEN]))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0[..]
    }

    /// The signed message region: type tag through the end of the payload.
    pub fn message(&self) -> &[u8] {
        &self.0[MESSAGE_OFFSET..]
    }

    /// The signer's public-key text from the header region.
    pub fn signer_text(&self) -> Result<&str, DecodeError> {
        read_text(&self.0[..ADDRESS_LEN], "signer public key")
    }

    /// The signer as an account address.
    pub fn signer(&self) -> Result<Address, DecodeError> {
        Ok(Address::new(self.signer_text()?))
    }

    /// The signature text, validated against its length header.
    ///
    /// The slot between the signature end and the type tag is reserved
    /// padding; a non-NUL byte there makes the payload malformed.
    pub fn signature_text(&self) -> Result<&str, DecodeError> {
        let sig_len = read_digits(
            &self.0[SIG_LEN_OFFSET..SIG_LEN_OFFSET + SIG_LEN_DIGITS],
            "signature length",
        )? as usize;
        if sig_len > SIG_MAX_LEN {
            return Err(DecodeError::MalformedField("signature length"));
        }
        if self.0[SIG_OFFSET + sig_len..MESSAGE_OFFSET]
            .iter()
            .any(|&b| b != 0)
        {
            return Err(DecodeError::MalformedField("signature padding"));
        }
        std::str::from_utf8(&self.0[SIG_OFFSET..SIG_OFFSET + sig_len])
            .map_err(|_| DecodeError::MalformedField("signature"))
    }

    /// Decodes the typed transaction record.
    pub fn record(&self) -> Result<TransactionRecord, DecodeError> {
        let body_len = read_digits(
            &self.0[BODY_LEN_OFFSET..BODY_LEN_OFFSET + BODY_LEN_DIGITS],
            "body length",
        )? as usize;
        if body_len > DATA_LEN - BODY_OFFSET {
            return Err(DecodeError::MalformedField("body length"));
        }

        let body = &self.0[BODY_OFFSET..];
        let record = match self.0[MESSAGE_OFFSET] {
            b'0' => TransactionRecord::Upload(UploadRecord {
                sender: self.signer()?,
            }),
            b'1' => {
                let amount = read_digits(&body[..AMOUNT_DIGITS], "transfer amount")?;
                let sender = read_text(
                    &body[AMOUNT_DIGITS..AMOUNT_DIGITS + ADDRESS_LEN],
                    "transfer sender",
                )?;
                let recipient = read_text(
                    &body[AMOUNT_DIGITS + ADDRESS_LEN..AMOUNT_DIGITS + 2 * ADDRESS_LEN],
                    "transfer recipient",
                )?;
                TransactionRecord::Transfer(TransferRecord {
                    amount,
                    sender: Address::new(sender),
                    recipient: Address::new(recipient),
                })
            }
            b'2' => {
                let node = read_text(&body[..NODE_ID_LEN], "stake node")?;
                let reward_address = read_text(
                    &body[NODE_ID_LEN..NODE_ID_LEN + ADDRESS_LEN],
                    "stake reward address",
                )?;
                let mut at = NODE_ID_LEN + ADDRESS_LEN;
                let start = read_digits(&body[at..at + TIME_DIGITS], "stake start")?;
                at += TIME_DIGITS;
                let end = read_digits(&body[at..at + TIME_DIGITS], "stake end")?;
                at += TIME_DIGITS;
                let amount = read_digits(&body[at..at + AMOUNT_DIGITS], "stake amount")?;
                TransactionRecord::Stake(StakeRecord {
                    node: NodeId::new(node),
                    reward_address: Address::new(reward_address),
                    start,
                    end,
                    amount,
                })
            }
            b'9' => {
                let amount = read_digits(&body[..AMOUNT_DIGITS], "faucet amount")?;
                let recipient = read_text(
                    &body[AMOUNT_DIGITS..AMOUNT_DIGITS + ADDRESS_LEN],
                    "faucet recipient",
                )?;
                TransactionRecord::Faucet(FaucetRecord {
                    amount,
                    recipient: Address::new(recipient),
                })
            }
            other => return Err(DecodeError::UnknownType(other)),
        };

        // The upload body is free-form chunk data; for the typed variants,
        // anything past the fixed fields must be NUL padding.
        if !matches!(record, TransactionRecord::Upload(_)) {
            let fixed = record.fixed_body_len();
            if body_len != fixed {
                return Err(DecodeError::MalformedField("body length"));
            }
            if body[fixed..].iter().any(|&b| b != 0) {
                return Err(DecodeError::MalformedField("body padding"));
            }
        }

        Ok(record)
    }

    /// Assembles a full payload from the signer text, signature text, and an
    /// already encoded message region.
    pub fn assemble(
        signer: &str,
        signature: &str,
        message: &[u8; DATA_LEN - MESSAGE_OFFSET],
    ) -> Result<Payload, EncodeError> {
        let mut data = Box::new([0u8; DATA_LEN]);
        write_text(&mut data[..ADDRESS_LEN], signer, "signer public key")?;
        if signature.len() > SIG_MAX_LEN {
            return Err(EncodeError::FieldTooLong("signature"));
        }
        write_fixed_digits(
            &mut data[SIG_LEN_OFFSET..SIG_LEN_OFFSET + SIG_LEN_DIGITS],
            signature.len() as u64,
        );
        data[SIG_OFFSET..SIG_OFFSET + signature.len()].copy_from_slice(signature.as_bytes());
        data[MESSAGE_OFFSET..].copy_from_slice(message);
        Ok(Payload(data))
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Payload(tag {:#04x})", self.0[MESSAGE_OFFSET])
    }
}

/// Encodes a record into the message region that gets signed:
/// type tag, body length digits, fixed fields, NUL padding.
pub fn encode_message(
    record: &TransactionRecord,
) -> Result<[u8; DATA_LEN - MESSAGE_OFFSET], EncodeError> {
    let mut out = [0u8; DATA_LEN - MESSAGE_OFFSET];
    out[0] = record.type_tag();
    write_fixed_digits(
        &mut out[1..1 + BODY_LEN_DIGITS],
        record.fixed_body_len() as u64,
    );

    let body = &mut out[1 + BODY_LEN_DIGITS..];
    match record {
        TransactionRecord::Upload(_) => {}
        TransactionRecord::Transfer(t) => {
            write_amount(&mut body[..AMOUNT_DIGITS], t.amount)?;
            write_text(
                &mut body[AMOUNT_DIGITS..AMOUNT_DIGITS + ADDRESS_LEN],
                t.sender.as_str(),
                "transfer sender",
            )?;
            write_text(
                &mut body[AMOUNT_DIGITS + ADDRESS_LEN..AMOUNT_DIGITS + 2 * ADDRESS_LEN],
                t.recipient.as_str(),
                "transfer recipient",
            )?;
        }
        TransactionRecord::Stake(s) => {
            write_text(&mut body[..NODE_ID_LEN], s.node.as_str(), "stake node")?;
            write_text(
                &mut body[NODE_ID_LEN..NODE_ID_LEN + ADDRESS_LEN],
                s.reward_address.as_str(),
                "stake reward address",
            )?;
            let mut at = NODE_ID_LEN + ADDRESS_LEN;
            write_time(&mut body[at..at + TIME_DIGITS], s.start)?;
            at += TIME_DIGITS;
            write_time(&mut body[at..at + TIME_DIGITS], s.end)?;
            at += TIME_DIGITS;
            write_amount(&mut body[at..at + AMOUNT_DIGITS], s.amount)?;
        }
        TransactionRecord::Faucet(f) => {
            write_amount(&mut body[..AMOUNT_DIGITS], f.amount)?;
            write_text(
                &mut body[AMOUNT_DIGITS..AMOUNT_DIGITS + ADDRESS_LEN],
                f.recipient.as_str(),
                "faucet recipient",
            )?;
        }
    }

    Ok(out)
}

/// Parses a fixed-width ASCII decimal field as an unsigned integer.
fn read_digits(field: &[u8], name: &'static str) -> Result<u64, DecodeError> {
    let mut value: u64 = 0;
    for &b in field {
        if !b.is_ascii_digit() {
            return Err(DecodeError::MalformedField(name));
        }
        value = value * 10 + u64::from(b - b'0');
    }
    Ok(value)
}

/// Reads a NUL-padded text field, requiring the content to be printable ASCII.
fn read_text<'a>(field: &'a [u8], name: &'static str) -> Result<&'a str, DecodeError> {
    let content_len = field
        .iter()
        .rposition(|&b| b != 0)
        .map_or(0, |last| last + 1);
    let content = &field[..content_len];
    if content.iter().any(|&b| !(b' '..=b'~').contains(&b)) {
        return Err(DecodeError::MalformedField(name));
    }
    std::str::from_utf8(content).map_err(|_| DecodeError::MalformedField(name))
}

/// Writes a text field, NUL-padding to the full width.
fn write_text(field: &mut [u8], text: &str, name: &'static str) -> Result<(), EncodeError> {
    if text.len() > field.len() {
        return Err(EncodeError::FieldTooLong(name));
    }
    field[..text.len()].copy_from_slice(text.as_bytes());
    Ok(())
}

/// Writes a zero-padded decimal field; the caller guarantees it fits.
fn write_fixed_digits(field: &mut [u8], mut value: u64) {
    for slot in field.iter_mut().rev() {
        *slot = b'0' + (value % 10) as u8;
        value /= 10;
    }
}

fn write_amount(field: &mut [u8], amount: Amount) -> Result<(), EncodeError> {
    if amount > MAX_AMOUNT {
        return Err(EncodeError::AmountTooLarge);
    }
    write_fixed_digits(field, amount);
    Ok(())
}

fn write_time(field: &mut [u8], timestamp: u64) -> Result<(), EncodeError> {
    // 10 digits cap out in the year 2286.
    if timestamp > 9_999_999_999 {
        return Err(EncodeError::FieldTooLong("timestamp"));
    }
    write_fixed_digits(field, timestamp);
    Ok(())
}
