// Shared little-endian decoding for instruction data
use solana_program::{program_error::ProgramError, pubkey::Pubkey};

use crate::vrf_state::MAX_NUM_WORDS;

pub(crate) fn unpack_u64(input: &[u8]) -> Result<(u64, &[u8]), ProgramError> {
    let value = input
        .get(..8)
        .and_then(|slice| slice.try_into().ok())
        .map(u64::from_le_bytes)
        .ok_or(ProgramError::InvalidInstructionData)?;
    Ok((value, &input[8..]))
}

pub(crate) fn unpack_u32(input: &[u8]) -> Result<(u32, &[u8]), ProgramError> {
    let value = input
        .get(..4)
        .and_then(|slice| slice.try_into().ok())
        .map(u32::from_le_bytes)
        .ok_or(ProgramError::InvalidInstructionData)?;
    Ok((value, &input[4..]))
}

pub(crate) fn unpack_u16(input: &[u8]) -> Result<(u16, &[u8]), ProgramError> {
    let value = input
        .get(..2)
        .and_then(|slice| slice.try_into().ok())
        .map(u16::from_le_bytes)
        .ok_or(ProgramError::InvalidInstructionData)?;
    Ok((value, &input[2..]))
}

pub(crate) fn unpack_fixed_bytes<const N: usize>(input: &[u8]) -> Result<([u8; N], &[u8]), ProgramError> {
    let value: [u8; N] = input
        .get(..N)
        .and_then(|slice| slice.try_into().ok())
        .ok_or(ProgramError::InvalidInstructionData)?;
    Ok((value, &input[N..]))
}

pub(crate) fn unpack_pubkey(input: &[u8]) -> Result<(Pubkey, &[u8]), ProgramError> {
    let (bytes, rest) = unpack_fixed_bytes::<32>(input)?;
    Ok((Pubkey::new_from_array(bytes), rest))
}

/// A one-byte count followed by that many u64 words, at most `MAX_NUM_WORDS`.
pub(crate) fn unpack_words(input: &[u8]) -> Result<(Vec<u64>, &[u8]), ProgramError> {
    let (count, mut rest) = input.split_first().ok_or(ProgramError::InvalidInstructionData)?;
    if u32::from(*count) > MAX_NUM_WORDS {
        return Err(ProgramError::InvalidInstructionData);
    }
    let mut words = Vec::with_capacity(*count as usize);
    for _ in 0..*count {
        let (word, next) = unpack_u64(rest)?;
        words.push(word);
        rest = next;
    }
    Ok((words, rest))
}

/// Words past `MAX_NUM_WORDS` are not encoded; builders cap before packing.
pub(crate) fn pack_words(buf: &mut Vec<u8>, words: &[u64]) {
    let words = &words[..words.len().min(MAX_NUM_WORDS as usize)];
    let count = u8::try_from(words.len()).unwrap_or(u8::MAX);
    buf.push(count);
    for word in words {
        buf.extend_from_slice(&word.to_le_bytes());
    }
}
