// The same crate builds either program; `mock-coordinator` selects the coordinator.
#![cfg(not(feature = "no-entrypoint"))]

use solana_program::entrypoint;

#[cfg(not(feature = "mock-coordinator"))]
use crate::process_instruction;
#[cfg(not(feature = "mock-coordinator"))]
entrypoint!(process_instruction);

#[cfg(feature = "mock-coordinator")]
use crate::process_vrf_instruction;
#[cfg(feature = "mock-coordinator")]
entrypoint!(process_vrf_instruction);
