//! JSON interface description of the raffle program, published to the frontend.

use raffle::raffle_error::RaffleError;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Idl {
    pub name: String,
    pub address: String,
    pub instructions: Vec<IdlInstruction>,
    pub accounts: Vec<IdlTypeDef>,
    pub events: Vec<IdlTypeDef>,
    pub errors: Vec<IdlError>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IdlInstruction {
    pub name: String,
    /// Leading tag byte of the instruction data
    pub tag: u8,
    pub accounts: Vec<IdlAccount>,
    pub args: Vec<IdlField>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IdlAccount {
    pub name: String,
    pub is_mut: bool,
    pub is_signer: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IdlField {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IdlTypeDef {
    pub name: String,
    pub fields: Vec<IdlField>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IdlError {
    pub code: u32,
    pub name: String,
    pub msg: String,
}

fn field(name: &str, ty: &str) -> IdlField {
    IdlField {
        name: name.to_string(),
        ty: ty.to_string(),
    }
}

fn account(name: &str, is_mut: bool, is_signer: bool) -> IdlAccount {
    IdlAccount {
        name: name.to_string(),
        is_mut,
        is_signer,
    }
}

fn instruction(name: &str, tag: u8, accounts: Vec<IdlAccount>, args: Vec<IdlField>) -> IdlInstruction {
    IdlInstruction {
        name: name.to_string(),
        tag,
        accounts,
        args,
    }
}

fn type_def(name: &str, fields: Vec<IdlField>) -> IdlTypeDef {
    IdlTypeDef {
        name: name.to_string(),
        fields,
    }
}

pub fn raffle_idl() -> Idl {
    Idl {
        name: "raffle".to_string(),
        address: raffle::id().to_string(),
        instructions: vec![
            instruction(
                "initialize",
                0,
                vec![
                    account("deployer", false, true),
                    account("raffle", true, false),
                    account("vrfCoordinator", false, false),
                ],
                vec![
                    field("subscriptionId", "u64"),
                    field("gasLane", "[u8; 32]"),
                    field("interval", "u64"),
                    field("entranceFee", "u64"),
                    field("callbackGasLimit", "u32"),
                ],
            ),
            instruction(
                "enterRaffle",
                1,
                vec![
                    account("player", true, true),
                    account("raffle", true, false),
                    account("systemProgram", false, false),
                ],
                vec![field("amount", "u64")],
            ),
            instruction(
                "performUpkeep",
                2,
                vec![
                    account("caller", true, true),
                    account("raffle", true, false),
                    account("consumerAuthority", false, false),
                    account("vrfCoordinator", false, false),
                    account("coordinatorConfig", true, false),
                    account("subscription", false, false),
                    account("request", true, false),
                    account("systemProgram", false, false),
                ],
                vec![],
            ),
            instruction(
                "fulfillRandomWords",
                raffle::vrf_instruction::RAW_FULFILL_RANDOM_WORDS,
                vec![
                    account("coordinatorAuthority", false, true),
                    account("raffle", true, false),
                    account("winner", true, false),
                ],
                vec![field("requestId", "u64"), field("randomWords", "Vec<u64>")],
            ),
        ],
        accounts: vec![type_def(
            "Raffle",
            vec![
                field("isInitialized", "bool"),
                field("state", "RaffleState"),
                field("entranceFee", "u64"),
                field("interval", "u64"),
                field("lastTimestamp", "i64"),
                field("recentWinner", "publicKey"),
                field("vrfCoordinator", "publicKey"),
                field("subscriptionId", "u64"),
                field("gasLane", "[u8; 32]"),
                field("callbackGasLimit", "u32"),
                field("pendingRequestId", "u64"),
                field("players", "Vec<publicKey>"),
            ],
        )],
        events: vec![
            type_def("RaffleEnter", vec![field("player", "publicKey")]),
            type_def("RequestedRaffleWinner", vec![field("requestId", "u64")]),
            type_def("WinnerPicked", vec![field("winner", "publicKey")]),
        ],
        errors: RaffleError::ALL
            .iter()
            .map(|error| IdlError {
                code: *error as u32,
                name: format!("{error:?}"),
                msg: error.to_string(),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_every_error_code() {
        let idl = raffle_idl();
        assert_eq!(idl.errors.len(), RaffleError::ALL.len());
        assert_eq!(idl.errors[0].code, 0);
        assert!(idl.errors.iter().any(|error| error.name == "UpkeepNotNeeded"));
    }

    #[test]
    fn serializes_type_key() {
        let json = serde_json::to_value(raffle_idl()).unwrap();
        assert_eq!(json["instructions"][1]["args"][0]["type"], "u64");
        assert_eq!(json["instructions"][1]["accounts"][0]["isSigner"], true);
    }
}
